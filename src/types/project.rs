use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// 报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "Technical Project")]
    #[default]
    TechnicalProject,
    #[serde(rename = "Research Paper")]
    ResearchPaper,
    #[serde(rename = "Business Report")]
    BusinessReport,
    #[serde(rename = "Academic Thesis")]
    AcademicThesis,
}

impl ProjectType {
    pub const ALL: [ProjectType; 4] = [
        ProjectType::TechnicalProject,
        ProjectType::ResearchPaper,
        ProjectType::BusinessReport,
        ProjectType::AcademicThesis,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::TechnicalProject => "Technical Project",
            ProjectType::ResearchPaper => "Research Paper",
            ProjectType::BusinessReport => "Business Report",
            ProjectType::AcademicThesis => "Academic Thesis",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for ProjectType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical project" | "technical" | "project" => Ok(ProjectType::TechnicalProject),
            "research paper" | "research" | "paper" => Ok(ProjectType::ResearchPaper),
            "business report" | "business" => Ok(ProjectType::BusinessReport),
            "academic thesis" | "academic" | "thesis" => Ok(ProjectType::AcademicThesis),
            _ => Err(InputError::UnknownProjectType(s.to_string())),
        }
    }
}

/// 一次生成请求的表单输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequest {
    title: String,
    problem_statement: String,
    project_type: ProjectType,
}

impl ProjectRequest {
    /// 校验并创建请求，标题与问题描述不能为空
    pub fn new(
        title: impl Into<String>,
        problem_statement: impl Into<String>,
        project_type: ProjectType,
    ) -> Result<Self, InputError> {
        let title = title.into().trim().to_string();
        let problem_statement = problem_statement.into().trim().to_string();

        if title.is_empty() {
            return Err(InputError::EmptyTitle);
        }
        if problem_statement.is_empty() {
            return Err(InputError::EmptyProblemStatement);
        }

        Ok(Self {
            title,
            problem_statement,
            project_type,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn problem_statement(&self) -> &str {
        &self.problem_statement
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_input() {
        let request = ProjectRequest::new(
            "  Smart Traffic System ",
            "Urban congestion reduces quality of life\n",
            ProjectType::TechnicalProject,
        )
        .unwrap();
        assert_eq!(request.title(), "Smart Traffic System");
        assert_eq!(
            request.problem_statement(),
            "Urban congestion reduces quality of life"
        );
    }

    #[test]
    fn test_request_rejects_blank_fields() {
        assert_eq!(
            ProjectRequest::new("   ", "x", ProjectType::default()),
            Err(InputError::EmptyTitle)
        );
        assert_eq!(
            ProjectRequest::new("Title", "\t", ProjectType::default()),
            Err(InputError::EmptyProblemStatement)
        );
    }

    #[test]
    fn test_project_type_parsing() {
        for project_type in ProjectType::ALL {
            assert_eq!(
                project_type.display_name().parse::<ProjectType>().unwrap(),
                project_type
            );
        }
        assert_eq!("thesis".parse::<ProjectType>().unwrap(), ProjectType::AcademicThesis);
        assert!("novel".parse::<ProjectType>().is_err());
        assert_eq!(ProjectType::default(), ProjectType::TechnicalProject);
    }
}
