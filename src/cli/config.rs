//! Configuration conversion utilities for CLI arguments

use crate::backends::CommandRemover;
use crate::cli::main_impl::Cli;
use crate::config::WorkflowConfig;
use anyhow::{Context, Result};

/// Converts CLI arguments into workflow configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the workflow configuration: `--config` file first, flags on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<WorkflowConfig> {
        let mut config = match &cli.config {
            Some(path) => WorkflowConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => WorkflowConfig::default(),
        };

        if let Some(file_name) = &cli.file_name {
            config.download_file_name.clone_from(file_name);
        }
        if let Some(dir) = &cli.output_dir {
            config.download_dir = Some(dir.clone());
        }
        if cli.no_auto_process {
            config.auto_process = false;
        }
        if cli.no_dimensions {
            config.probe_preview_dimensions = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Build the removal capability from `--remover-command`
    pub(crate) fn remover(cli: &Cli) -> Result<CommandRemover> {
        CommandRemover::from_command_line(&cli.remover_command)
            .context("Invalid --remover-command")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        let stdin_inputs = cli.input.iter().filter(|input| *input == "-").count();
        if stdin_inputs > 1 {
            anyhow::bail!("stdin (-) can only be used once");
        }
        if cli.drop && stdin_inputs > 0 {
            anyhow::bail!("--drop expects file paths, not stdin (-)");
        }
        if cli.media_type.is_some() && stdin_inputs == 0 {
            anyhow::bail!("--media-type only applies to stdin (-) input");
        }
        Self::remover(cli)?;
        Ok(())
    }
}
