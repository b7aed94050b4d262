//! 章节提示词构建

use crate::types::{ProjectRequest, ProjectType, SectionId};

/// 所有章节共用的系统提示词
pub const SYSTEM_PROMPT: &str = "You are an experienced technical writer who drafts sections of \
project reports. Answer with the section body only, in plain prose or Markdown, without repeating \
the instructions and without a leading section heading.";

/// 把问题描述改写为可嵌入句中的形式
///
/// 首字母小写（首词为缩写时保留原样），去掉句末标点。
pub fn inline_statement(problem: &str) -> String {
    let trimmed = problem.trim().trim_end_matches(['.', '!', '?', ';']);
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let second_is_upper = chars.next().is_some_and(|c| c.is_uppercase());
    if second_is_upper {
        return trimmed.to_string();
    }
    first.to_lowercase().chain(trimmed.chars().skip(1)).collect()
}

/// 带不定冠词的报告类型，如 "an academic thesis"
pub fn project_type_phrase(project_type: ProjectType) -> String {
    let name = project_type.display_name().to_lowercase();
    let article = match name.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    };
    format!("{} {}", article, name)
}

/// 为指定章节构建提示词
pub fn build_prompt(request: &ProjectRequest, section: SectionId) -> String {
    let title = request.title();
    let problem = request.problem_statement();
    let inline = inline_statement(problem);
    let kind = project_type_phrase(request.project_type());

    let directive = match section {
        SectionId::Abstract => format!(
            "Write the abstract of {kind} titled \"{title}\". The work addresses {inline}. \
             In a single paragraph of about 120 words, summarize the motivation, the approach, \
             the implementation and the key findings."
        ),
        SectionId::Introduction => format!(
            "Write the introduction of {kind} titled \"{title}\".\n\
             Problem statement: {problem}\n\
             Explain the background, why addressing {inline} matters today, \
             the objectives of the work and its scope."
        ),
        SectionId::Methodology => format!(
            "Write the methodology section of {kind} titled \"{title}\". \
             Describe the research approach, the system design principles, the development \
             strategy and the tools and technologies used to address {inline}."
        ),
        SectionId::Implementation => format!(
            "Write the implementation section of {kind} titled \"{title}\". \
             Describe the system architecture, its main components, the key features and \
             the challenges met while building a solution to {inline}."
        ),
        SectionId::Results => format!(
            "Write the results and evaluation section of {kind} titled \"{title}\". \
             Present performance metrics, testing outcomes and a comparison with existing \
             approaches to {inline}."
        ),
        SectionId::Conclusion => format!(
            "Write the conclusion of {kind} titled \"{title}\". \
             Summarize how the work addressed {inline}, the key achievements, \
             the limitations and directions for future work."
        ),
        SectionId::Diagrams => format!(
            "Produce a Mermaid flowchart inside a ```mermaid fenced block that shows the \
             architecture of the system described in {kind} titled \"{title}\", \
             which addresses {inline}. Add one sentence of explanation before the block."
        ),
        SectionId::References => format!(
            "List six to eight academic references in APA style that are relevant to \
             {kind} titled \"{title}\" about {inline}. Number each reference."
        ),
    };

    format!("{}\n\n{}:", directive, section.title())
}
