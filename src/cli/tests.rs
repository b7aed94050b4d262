#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::LLMProvider;
    use crate::export::ExportFormat;
    use crate::types::{ProjectType, SectionId};
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;

    const BASE: [&str; 5] = [
        "report-forge",
        "--title",
        "Smart Traffic System",
        "--problem",
        "Traffic congestion in urban areas",
    ];

    fn parse(extra: &[&str]) -> Args {
        let mut argv = BASE.to_vec();
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_args_default_values() {
        let args = parse(&[]);

        assert_eq!(args.title, "Smart Traffic System");
        assert_eq!(args.project_type, "Technical Project");
        assert!(args.formats.is_empty());
        assert!(args.regenerate.is_empty());
        assert!(args.output_path.is_none());
        assert!(!args.offline);
        assert!(!args.randomize_fallback);
        assert!(!args.verbose);
    }

    #[test]
    fn test_title_and_problem_are_required() {
        assert!(Args::try_parse_from(["report-forge"]).is_err());
        assert!(Args::try_parse_from(["report-forge", "--title", "Only title"]).is_err());
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from([
            "report-forge",
            "-t", "Edge Cache",
            "-p", "Latency hurts",
            "-o", "/test/output",
            "-f", "txt",
            "-f", "word",
            "-r", "abstract",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.title, "Edge Cache");
        assert_eq!(args.output_path, Some(PathBuf::from("/test/output")));
        assert_eq!(args.formats, vec![ExportFormat::Text, ExportFormat::Docx]);
        assert_eq!(args.regenerate, vec!["abstract".to_string()]);
        assert!(args.verbose);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut argv = BASE.to_vec();
        argv.extend_from_slice(&["--format", "pdf"]);
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_args_llm_options() {
        let args = parse(&[
            "--llm-provider", "deepseek",
            "--llm-api-key", "test-key",
            "--llm-api-base-url", "https://api.deepseek.com",
            "--model-efficient", "deepseek-chat",
            "--model-powerful", "deepseek-reasoner",
            "--temperature", "0.4",
            "--max-parallels", "5",
            "--timeout-seconds", "20",
        ]);

        let config = args.into_config().unwrap();
        assert_eq!(config.llm.provider, LLMProvider::DeepSeek);
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.api_base_url, "https://api.deepseek.com");
        assert_eq!(config.llm.model_efficient, "deepseek-chat");
        assert_eq!(config.llm.model_powerful, "deepseek-reasoner");
        assert_eq!(config.llm.temperature, Some(0.4));
        assert_eq!(config.llm.max_parallels, 5);
        assert_eq!(config.llm.timeout_seconds, 20);
    }

    #[test]
    fn test_into_config_switches() {
        let config = parse(&[
            "--offline",
            "--randomize-fallback",
            "--strip-markdown",
            "--no-diagrams",
            "-f", "html",
        ])
        .into_config()
        .unwrap();

        assert!(config.offline);
        assert!(config.randomize_fallback);
        assert!(config.strip_markdown_in_text);
        assert!(!config.diagrams.enabled);
        assert_eq!(config.export_formats, vec![ExportFormat::Html]);
    }

    #[test]
    fn test_config_file_is_loaded_then_overridden() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "output_path = \"/from/file\"\nexport_formats = [\"json\"]\n\n[llm]\nmodel_efficient = \"file-model\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["-c", &path, "--model-efficient", "cli-model"])
            .into_config()
            .unwrap();
        assert_eq!(config.output_path, PathBuf::from("/from/file"));
        assert_eq!(config.export_formats, vec![ExportFormat::Json]);
        assert_eq!(config.llm.model_efficient, "cli-model");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = parse(&["-c", "/definitely/not/here.toml"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_to_job() {
        let job = parse(&["--project-type", "research", "-r", "Results", "-r", "conclusion"])
            .to_job()
            .unwrap();

        assert_eq!(job.request.project_type(), ProjectType::ResearchPaper);
        assert_eq!(job.regenerate, vec![SectionId::Results, SectionId::Conclusion]);
    }

    #[test]
    fn test_to_job_rejects_bad_input() {
        assert!(parse(&["--project-type", "poem"]).to_job().is_err());
        assert!(parse(&["-r", "summary"]).to_job().is_err());

        let blank = Args::try_parse_from(["report-forge", "--title", "  ", "--problem", "x"])
            .unwrap();
        assert!(blank.to_job().is_err());
    }
}
