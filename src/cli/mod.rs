use crate::config::{Config, LLMProvider};
use crate::export::ExportFormat;
use crate::generator::workflow::ReportJob;
use crate::types::{ProjectRequest, ProjectType, SectionId};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "report-forge.toml";

/// Report Forge - 由Rust与AI驱动的项目报告生成器
#[derive(Parser, Debug)]
#[command(name = "report-forge")]
#[command(
    about = "Generates a structured eight-section project report from a title and a problem statement, using a language model with built-in template fallback, and exports it as DOCX, text, HTML or JSON."
)]
#[command(version)]
pub struct Args {
    /// 报告标题
    #[arg(short, long)]
    pub title: String,

    /// 问题描述
    #[arg(short, long)]
    pub problem: String,

    /// 报告类型 (technical, research, business, academic)
    #[arg(long, default_value = "Technical Project")]
    pub project_type: String,

    /// 导出格式，可重复 (docx, txt, html, json)
    #[arg(short, long = "format")]
    pub formats: Vec<ExportFormat>,

    /// 生成后重新生成的章节，可重复
    #[arg(short, long)]
    pub regenerate: Vec<String>,

    /// 输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 不调用模型，全部使用模板内容
    #[arg(long)]
    pub offline: bool,

    /// 模板回退时随机选择变体
    #[arg(long)]
    pub randomize_fallback: bool,

    /// 纯文本导出时去掉 Markdown 标记
    #[arg(long)]
    pub strip_markdown: bool,

    /// 不渲染图表
    #[arg(long)]
    pub no_diagrams: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，优先用于章节生成
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 最大并发推理数
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// 单次推理超时（秒）
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,
}

impl Args {
    /// 校验表单输入并组装任务
    pub fn to_job(&self) -> Result<ReportJob> {
        let project_type: ProjectType = self.project_type.parse()?;
        let request = ProjectRequest::new(&self.title, &self.problem, project_type)?;
        let regenerate = self
            .regenerate
            .iter()
            .map(|section| section.parse::<SectionId>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReportJob {
            request,
            regenerate,
        })
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .context(format!("无法读取配置文件 {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path)
                    .context(format!("无法读取默认配置文件 {:?}", default_config_path))?
            } else {
                Config::default()
            }
        };

        // 覆盖配置文件中的设置
        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }
        if !self.formats.is_empty() {
            config.export_formats = self.formats;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = Some(temperature);
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels.max(1);
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            config.llm.timeout_seconds = timeout_seconds;
        }

        // 其他配置，开关只打开不关闭
        config.offline |= self.offline;
        config.randomize_fallback |= self.randomize_fallback;
        config.strip_markdown_in_text |= self.strip_markdown;
        config.verbose |= self.verbose;
        if self.no_diagrams {
            config.diagrams.enabled = false;
        }

        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
