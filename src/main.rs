use anyhow::Result;
use clap::Parser;
use report_forge::cli::Args;
use report_forge::launch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG 优先，其次由 --verbose 决定
    let default_filter = if args.verbose {
        "report_forge=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let job = args.to_job()?;
    let config = args.into_config()?;

    let summary = launch(&config, &job).await?;
    if !summary.is_success() {
        anyhow::bail!("{} export(s) failed", summary.export_failures);
    }
    Ok(())
}
