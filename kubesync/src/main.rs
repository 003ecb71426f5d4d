use std::process::ExitCode;

use clap::Parser;
use kubesync::cli::{exit_code, run, Cli, EXIT_USER_QUIT};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for the report and the diff.
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, arguments parsed");

    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = exit_code(&e);
            if code == EXIT_USER_QUIT {
                eprintln!("{e}");
            } else {
                tracing::error!(error = %e, "CLI exited with error");
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(code)
        }
    }
}
