pub mod context;
pub mod engine;
pub mod outlet;
pub mod prompt;
pub mod regenerate;
pub mod templates;
pub mod workflow;
