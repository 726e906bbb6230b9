//! Background Removal Workflow CLI Tool
//!
//! Command-line front end that drives the image workflow with an external
//! background-removal command.

#[cfg(feature = "cli")]
use bgremove_workflow::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
