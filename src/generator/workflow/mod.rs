use crate::config::Config;
use crate::diagram::{DiagramBoard, SvgDiagramRenderer};
use crate::editor::{ApplyOutcome, EditingSession};
use crate::export::{
    DocumentExporter, DocxExporter, ExportFormat, HtmlExporter, JsonExporter, PlainTextExporter,
    artifact_file_name, export_document,
};
use crate::generator::context::GeneratorContext;
use crate::generator::engine::GenerationEngine;
use crate::generator::outlet::{DiskOutlet, Outlet};
use crate::generator::regenerate::SectionRegenerator;
use crate::notify::Notification;
use crate::types::{Document, ProjectRequest, SectionId};

use anyhow::Result;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: std::time::Instant,
    phase_start_times: HashMap<&'static str, std::time::Instant>,
    phase_durations: Vec<(&'static str, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &'static str) {
        self.phase_start_times
            .insert(phase_name, std::time::Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &'static str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations.push((phase_name, duration));
        Some(duration)
    }

    /// 获取所有阶段的执行时间，按结束顺序
    pub fn get_phase_durations(&self) -> &[(&'static str, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const GENERATION: &'static str = "generation";
    pub const REGENERATION: &'static str = "regeneration";
    pub const DIAGRAMS: &'static str = "diagrams";
    pub const EXPORT: &'static str = "export";
}

/// 一次报告任务
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub request: ProjectRequest,
    /// 生成后再重新生成的章节
    pub regenerate: Vec<SectionId>,
}

impl ReportJob {
    pub fn new(request: ProjectRequest) -> Self {
        Self {
            request,
            regenerate: Vec::new(),
        }
    }
}

/// 工作流执行结果
#[derive(Debug)]
pub struct WorkflowSummary {
    /// 最终文档，导出失败时可用于重试
    pub document: Document,
    /// 成功写入的导出文件
    pub artifacts: Vec<PathBuf>,
    pub diagram_files: Vec<PathBuf>,
    pub diagram_failures: usize,
    pub export_failures: usize,
}

impl WorkflowSummary {
    pub fn is_success(&self) -> bool {
        self.export_failures == 0
    }
}

/// 启动报告生成工作流
pub async fn launch(config: &Config, job: &ReportJob) -> Result<WorkflowSummary> {
    let context = GeneratorContext::new(config.clone());
    launch_with_context(context, job).await
}

/// 使用给定上下文执行工作流
///
/// 各步骤的失败均在本地恢复。导出失败只计入 `export_failures`，
/// 文档仍随结果返回，可再次导出。
pub async fn launch_with_context(
    context: GeneratorContext,
    job: &ReportJob,
) -> Result<WorkflowSummary> {
    let mut timing = TimingScope::new();
    let config = context.config.clone();

    println!("\n📝 正在生成报告: {}", job.request.title());
    timing.start_phase(TimingKeys::GENERATION);
    let engine = GenerationEngine::new(context.clone());
    let document = engine.generate(&job.request).await;
    timing.end_phase(TimingKeys::GENERATION);

    let mut session = EditingSession::new(document);
    if !job.regenerate.is_empty() {
        timing.start_phase(TimingKeys::REGENERATION);
        regenerate_sections(&context, &mut session, &job.regenerate).await;
        timing.end_phase(TimingKeys::REGENERATION);
    }
    let document = session.into_document();

    let outlet = DiskOutlet::new(&config.output_path);
    let mut board = DiagramBoard::from_text(document.section(SectionId::Diagrams));
    let mut diagram_files = Vec::new();
    let mut diagram_failures = 0;
    if config.diagrams.enabled {
        timing.start_phase(TimingKeys::DIAGRAMS);
        let failures = board.render_all(Arc::new(SvgDiagramRenderer)).await;
        diagram_failures = failures.len();
        for (index, error) in failures {
            context.sink.notify(Notification::DiagramFailed {
                index,
                message: error.to_string(),
            });
        }
        if config.diagrams.write_svg_files {
            diagram_files = write_diagrams(&outlet, &document, &board).await;
        }
        timing.end_phase(TimingKeys::DIAGRAMS);
    }

    timing.start_phase(TimingKeys::EXPORT);
    let mut artifacts = Vec::new();
    let mut export_failures = 0;
    for format in dedup_formats(&config.export_formats) {
        let exporter = exporter_for(format, &config, &board);
        let artifact = match export_document(&document, exporter, context.sink.as_ref()).await {
            Ok(artifact) => artifact,
            Err(_) => {
                export_failures += 1;
                continue;
            }
        };
        match outlet.save(&artifact).await {
            Ok(path) => {
                context
                    .sink
                    .notify(Notification::ExportSucceeded { path: path.clone() });
                artifacts.push(path);
            }
            Err(e) => {
                warn!(error = %e, "failed to write export artifact");
                context.sink.notify(Notification::ExportFailed {
                    file_name: artifact.file_name.clone(),
                    message: format!("{:#}", e),
                });
                export_failures += 1;
            }
        }
    }
    timing.end_phase(TimingKeys::EXPORT);

    context.shutdown().await;

    if config.verbose {
        println!("\n{}", timing.generate_timing_report());
    }
    info!(
        artifacts = artifacts.len(),
        export_failures, diagram_failures, "workflow finished"
    );

    Ok(WorkflowSummary {
        document,
        artifacts,
        diagram_files,
        diagram_failures,
        export_failures,
    })
}

/// 并发重新生成多个章节，结果按票据应用
async fn regenerate_sections(
    context: &GeneratorContext,
    session: &mut EditingSession,
    sections: &[SectionId],
) {
    let regenerator = SectionRegenerator::new(context.clone());
    let snapshot = session.document().clone();
    let tickets: Vec<_> = sections
        .iter()
        .map(|section| session.begin_regeneration(*section))
        .collect();

    let results = join_all(
        tickets
            .iter()
            .map(|ticket| regenerator.regenerate(&snapshot, ticket.section)),
    )
    .await;

    for (ticket, result) in tickets.into_iter().zip(results) {
        let from_model = result.is_from_model();
        if session.apply_regeneration(ticket, result.content) == ApplyOutcome::Applied {
            context.sink.notify(Notification::SectionRegenerated {
                section: ticket.section.title().to_string(),
                from_model,
            });
        }
    }
}

async fn write_diagrams(
    outlet: &DiskOutlet,
    document: &Document,
    board: &DiagramBoard,
) -> Vec<PathBuf> {
    let stem = artifact_file_name(document.title(), "svg");
    let stem = stem.trim_end_matches(".svg");
    let mut written = Vec::new();
    for (index, rendered) in board.rendered() {
        let file_name = format!("{}_diagram_{}.svg", stem, index + 1);
        match outlet.save_svg(&file_name, &rendered.svg).await {
            Ok(path) => written.push(path),
            Err(e) => warn!(error = %e, "failed to write diagram"),
        }
    }
    written
}

fn dedup_formats(formats: &[ExportFormat]) -> Vec<ExportFormat> {
    let mut unique = Vec::with_capacity(formats.len());
    for format in formats {
        if !unique.contains(format) {
            unique.push(*format);
        }
    }
    unique
}

fn exporter_for(
    format: ExportFormat,
    config: &Config,
    board: &DiagramBoard,
) -> Arc<dyn DocumentExporter> {
    match format {
        ExportFormat::Docx => Arc::new(DocxExporter),
        ExportFormat::Text => Arc::new(PlainTextExporter::new(config.strip_markdown_in_text)),
        ExportFormat::Html => Arc::new(HtmlExporter::new().with_board(board)),
        ExportFormat::Json => Arc::new(JsonExporter),
    }
}
