pub mod cli;
pub mod config;
pub mod diagram;
pub mod editor;
pub mod error;
pub mod export;
pub mod generator;
pub mod llm;
pub mod notify;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use editor::{ApplyOutcome, EditingSession};
pub use export::{ExportFormat, export_document};
pub use generator::context::GeneratorContext;
pub use generator::engine::GenerationEngine;
pub use generator::regenerate::SectionRegenerator;
pub use generator::workflow::{ReportJob, WorkflowSummary, launch, launch_with_context};
pub use notify::{Notification, StatusSink};
pub use types::{Document, ProjectRequest, ProjectType, SectionId};
