//! Lockfetch CLI - download locked Python packages for a target platform
//!
//! Entry point for the lockfetch command-line application.

use anyhow::Result;

use lockfetch::cli::output::display_error;
use lockfetch::cli::Cli;
use lockfetch::infra::host::HostPlatform;

#[tokio::main]
async fn main() -> Result<()> {
    let host = HostPlatform::detect();
    let cli = Cli::parse_with_host(&host);

    // Initialize tracing subscriber
    let output_config = cli.output_config();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(output_config.log_level().into()),
        )
        .init();

    // Run the fetch and handle errors
    match cli.run(host).await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
