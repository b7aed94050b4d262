//! 图表渲染状态
//!
//! 每个代码块一个槽位：`Pending → Rendering → {Rendered | Failed}`。
//! 源码变化时槽位获得新的修订号并回到 `Pending`，旧修订的渲染结果会被丢弃。

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::diagram::{
    DiagramBlock, DiagramRenderer, RenderedDiagram, error_card, extract_blocks, placeholder,
};
use crate::error::DiagramError;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Pending,
    Rendering,
    Rendered(RenderedDiagram),
    Failed(DiagramError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramSlot {
    pub block: DiagramBlock,
    pub revision: u64,
    pub state: RenderState,
}

/// 交给渲染器的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub index: usize,
    pub revision: u64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub job: RenderJob,
    pub result: Result<RenderedDiagram, DiagramError>,
}

#[derive(Debug, Default)]
pub struct DiagramBoard {
    slots: Vec<DiagramSlot>,
    next_revision: u64,
}

impl DiagramBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut board = Self::new();
        board.sync(text);
        board
    }

    pub fn slots(&self) -> &[DiagramSlot] {
        &self.slots
    }

    pub fn state(&self, index: usize) -> Option<&RenderState> {
        self.slots.get(index).map(|slot| &slot.state)
    }

    /// 按最新文本重建槽位，返回被重置为 Pending 的槽位数
    ///
    /// 源码未变的槽位保留原有状态。
    pub fn sync(&mut self, text: &str) -> usize {
        let blocks = extract_blocks(text);
        let mut reset = 0;

        for block in &blocks {
            match self.slots.get_mut(block.index) {
                Some(slot) if slot.block.source == block.source => {
                    slot.block.span = block.span.clone();
                }
                Some(slot) => {
                    self.next_revision += 1;
                    slot.block = block.clone();
                    slot.revision = self.next_revision;
                    slot.state = RenderState::Pending;
                    reset += 1;
                }
                None => {
                    self.next_revision += 1;
                    self.slots.push(DiagramSlot {
                        block: block.clone(),
                        revision: self.next_revision,
                        state: RenderState::Pending,
                    });
                    reset += 1;
                }
            }
        }
        self.slots.truncate(blocks.len());
        reset
    }

    /// 取出所有待渲染的任务，对应槽位进入 Rendering
    pub fn begin_pending(&mut self) -> Vec<RenderJob> {
        self.slots
            .iter_mut()
            .filter(|slot| slot.state == RenderState::Pending)
            .map(|slot| {
                slot.state = RenderState::Rendering;
                RenderJob {
                    index: slot.block.index,
                    revision: slot.revision,
                    source: slot.block.source.clone(),
                }
            })
            .collect()
    }

    /// 应用渲染结果，过期结果返回 `false` 并被丢弃
    pub fn complete(&mut self, outcome: RenderOutcome) -> bool {
        let RenderOutcome { job, result } = outcome;
        let Some(slot) = self.slots.get_mut(job.index) else {
            debug!(index = job.index, "discarding render for removed diagram");
            return false;
        };
        if slot.revision != job.revision || slot.block.source != job.source {
            debug!(
                index = job.index,
                revision = job.revision,
                current = slot.revision,
                "discarding stale diagram render"
            );
            return false;
        }

        slot.state = match result {
            Ok(rendered) => RenderState::Rendered(rendered),
            Err(e) => {
                warn!(index = job.index, error = %e, "diagram render failed");
                RenderState::Failed(e)
            }
        };
        true
    }

    /// 并发渲染所有待渲染的图表，返回失败的 (序号, 错误)
    ///
    /// 每个任务运行在独立的 tokio 任务中，渲染器 panic 只会让对应图表失败。
    pub async fn render_all(
        &mut self,
        renderer: Arc<dyn DiagramRenderer>,
    ) -> Vec<(usize, DiagramError)> {
        let jobs = self.begin_pending();
        let handles = jobs.into_iter().map(|job| {
            let renderer = renderer.clone();
            let source = job.source.clone();
            let handle = tokio::spawn(async move { renderer.render(&source).await });
            async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(DiagramError::Render(e.to_string())),
                };
                RenderOutcome { job, result }
            }
        });
        let outcomes = join_all(handles).await;

        let mut failures = Vec::new();
        for outcome in outcomes {
            let failure = match &outcome.result {
                Err(e) => Some((outcome.job.index, e.clone())),
                Ok(_) => None,
            };
            if self.complete(outcome)
                && let Some(failure) = failure
            {
                failures.push(failure);
            }
        }
        failures
    }

    /// 已渲染的图表
    pub fn rendered(&self) -> impl Iterator<Item = (usize, &RenderedDiagram)> {
        self.slots.iter().filter_map(|slot| match &slot.state {
            RenderState::Rendered(rendered) => Some((slot.block.index, rendered)),
            _ => None,
        })
    }

    /// 图表在预览中的 HTML 片段
    pub fn html_fragment(&self, index: usize) -> Option<String> {
        self.slots.get(index).map(|slot| match &slot.state {
            RenderState::Rendered(rendered) => {
                format!("<div class=\"diagram\">{}</div>", rendered.svg)
            }
            RenderState::Failed(error) => error_card(error),
            RenderState::Pending | RenderState::Rendering => placeholder().to_string(),
        })
    }
}
