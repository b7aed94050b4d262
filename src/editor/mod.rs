//! 编辑会话：文档的唯一写入方
//!
//! 每次修改都会递增版本号。重新生成以票据的形式发起，完成时只有
//! 该章节最新的票据才会被应用，过期结果静默丢弃。

use std::collections::HashMap;

use tracing::debug;

use crate::types::{Document, SectionId};

/// 一次进行中的重新生成请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationTicket {
    pub section: SectionId,
    pub ticket_id: u64,
    /// 发起时的文档版本
    pub issued_at_version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// 票据已被更新的请求、用户编辑或新文档取代
    Stale,
}

pub struct EditingSession {
    document: Document,
    version: u64,
    next_ticket: u64,
    in_flight: HashMap<SectionId, u64>,
}

impl EditingSession {
    pub fn new(mut document: Document) -> Self {
        document.normalize();
        Self {
            document,
            version: 0,
            next_ticket: 0,
            in_flight: HashMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.set_title(title);
        self.version += 1;
    }

    /// 用户直接编辑章节，同时作废该章节进行中的重新生成
    pub fn edit_section(&mut self, section: SectionId, content: impl Into<String>) {
        self.document.set_section(section, content);
        self.version += 1;
        if self.in_flight.remove(&section).is_some() {
            debug!(section = %section, "user edit superseded in-flight regeneration");
        }
    }

    /// 发起重新生成，取代该章节之前的票据
    pub fn begin_regeneration(&mut self, section: SectionId) -> RegenerationTicket {
        self.next_ticket += 1;
        self.in_flight.insert(section, self.next_ticket);
        RegenerationTicket {
            section,
            ticket_id: self.next_ticket,
            issued_at_version: self.version,
        }
    }

    pub fn is_pending(&self, section: SectionId) -> bool {
        self.in_flight.contains_key(&section)
    }

    /// 应用重新生成的结果
    pub fn apply_regeneration(
        &mut self,
        ticket: RegenerationTicket,
        content: impl Into<String>,
    ) -> ApplyOutcome {
        if self.in_flight.get(&ticket.section) != Some(&ticket.ticket_id) {
            debug!(
                section = %ticket.section,
                ticket = ticket.ticket_id,
                "discarding stale regeneration result"
            );
            return ApplyOutcome::Stale;
        }

        self.in_flight.remove(&ticket.section);
        self.document.set_section(ticket.section, content);
        self.version += 1;
        ApplyOutcome::Applied
    }

    /// 换成一份新文档，所有进行中的请求失效
    pub fn replace_document(&mut self, mut document: Document) {
        document.normalize();
        self.document = document;
        self.version += 1;
        self.in_flight.clear();
    }
}
