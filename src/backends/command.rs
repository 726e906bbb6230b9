//! Background removal through an external program
//!
//! The image is written to the program's stdin and the result is read from
//! its stdout, which matches `imgly-bgremove - -o -`.

use crate::remover::BackgroundRemover;
use crate::types::FileCandidate;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Environment variable carrying the declared media type
pub const MEDIA_TYPE_ENV: &str = "BGREMOVE_MEDIA_TYPE";

/// Environment variable carrying the selected file name
pub const FILE_NAME_ENV: &str = "BGREMOVE_FILE_NAME";

/// Longest stderr excerpt kept in error messages
const STDERR_EXCERPT_LEN: usize = 512;

/// Capability backed by an external command
#[derive(Debug, Clone)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
}

impl CommandRemover {
    /// Create a remover that runs `program` with `args`
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a whitespace-separated command line such as `"imgly-bgremove - -o -"`
    pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            bail!("Remover command line is empty");
        };
        Ok(Self::new(program, parts))
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl BackgroundRemover for CommandRemover {
    #[instrument(skip(self, file), fields(program = %self.program, file_name = %file.name()))]
    async fn remove_background(&self, file: &FileCandidate) -> anyhow::Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(MEDIA_TYPE_ENV, file.media_type())
            .env(FILE_NAME_ENV, file.name())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start remover command '{}'", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .context("Remover command stdin was not captured")?;
        let input = file.bytes().to_vec();
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        });

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for remover command")?;
        let write_result = writer.await.context("Remover stdin writer panicked")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
            bail!(
                "Remover command '{}' exited with {}: {}",
                self.program,
                output.status,
                excerpt
            );
        }
        write_result.context("Failed to write image to remover command")?;

        if output.stdout.is_empty() {
            bail!("Remover command '{}' produced no output", self.program);
        }

        debug!(
            input_bytes = file.len(),
            output_bytes = output.stdout.len(),
            "Remover command finished"
        );
        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let remover = CommandRemover::from_command_line("imgly-bgremove - -o - ").unwrap();
        assert_eq!(remover.program(), "imgly-bgremove");
        assert_eq!(remover.args(), ["-", "-o", "-"]);
        assert!(CommandRemover::from_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pipes_bytes_through_program() {
        let remover = CommandRemover::new("cat", Vec::<String>::new());
        let file = FileCandidate::new("cat.png", "image/png", b"P1-bytes".to_vec());
        let output = remover.remove_background(&file).await.unwrap();
        assert_eq!(output, b"P1-bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exposes_file_metadata_in_environment() {
        let remover = CommandRemover::new("sh", ["-c", "cat >/dev/null; printf '%s' \"$BGREMOVE_MEDIA_TYPE\""]);
        let file = FileCandidate::new("cat.webp", "image/webp", vec![1, 2, 3]);
        let output = remover.remove_background(&file).await.unwrap();
        assert_eq!(output, b"image/webp");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let remover = CommandRemover::new("sh", ["-c", "cat >/dev/null; echo corrupt image >&2; exit 3"]);
        let file = FileCandidate::new("cat.png", "image/png", vec![0; 8]);
        let err = remover.remove_background(&file).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("corrupt image"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let remover = CommandRemover::new("sh", ["-c", "cat >/dev/null"]);
        let file = FileCandidate::new("cat.png", "image/png", vec![0; 8]);
        assert!(remover.remove_background(&file).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let remover = CommandRemover::new("bgremove-definitely-not-installed", Vec::<String>::new());
        let file = FileCandidate::new("cat.png", "image/png", vec![0; 8]);
        assert!(remover.remove_background(&file).await.is_err());
    }
}
