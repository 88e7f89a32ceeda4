use handlens::{
    cli::{Cli, CliHandler, EXIT_BATCH_FAILED, EXIT_INVALID_ARGUMENTS},
    error::AnalysisError,
};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("❌ Argument parsing failed: {}", e);
            process::exit(EXIT_INVALID_ARGUMENTS);
        }
    };

    // RUST_LOG wins; otherwise -v / -d pick the level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let handler = CliHandler::new(cli);

    let exit_code = match handler.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Execution failed: {}", e);
            match e {
                AnalysisError::InvalidArguments(_) | AnalysisError::Configuration(_) => {
                    EXIT_INVALID_ARGUMENTS
                }
                _ => EXIT_BATCH_FAILED,
            }
        }
    };

    process::exit(exit_code);
}
