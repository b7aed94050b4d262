pub mod document;
pub mod project;
pub mod section;

pub use document::Document;
pub use project::{ProjectRequest, ProjectType};
pub use section::SectionId;
