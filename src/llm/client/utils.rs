use crate::config::LLMConfig;

/// 选择首选模型以及失败后的兜底模型
pub fn evaluate_befitting_model(llm_config: &LLMConfig) -> (String, Option<String>) {
    let efficient = llm_config.model_efficient.trim();
    let powerful = llm_config.model_powerful.trim();

    if efficient.is_empty() {
        return (powerful.to_string(), None);
    }
    if powerful.is_empty() || powerful == efficient {
        return (efficient.to_string(), None);
    }
    (efficient.to_string(), Some(powerful.to_string()))
}
