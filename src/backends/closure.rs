//! Closure-backed capability for embedding applications

use crate::remover::BackgroundRemover;
use crate::types::FileCandidate;
use async_trait::async_trait;
use std::future::Future;

/// Adapts an async closure into a [`BackgroundRemover`]
///
/// ```rust
/// use bgremove_workflow::backends::FnRemover;
///
/// let remover = FnRemover::new("echo", |file| async move { Ok(file.bytes().to_vec()) });
/// ```
pub struct FnRemover<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnRemover<F>
where
    F: Fn(FileCandidate) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send,
{
    pub fn new<S: Into<String>>(name: S, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> BackgroundRemover for FnRemover<F>
where
    F: Fn(FileCandidate) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send,
{
    async fn remove_background(&self, file: &FileCandidate) -> anyhow::Result<Vec<u8>> {
        (self.f)(file.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_remover() {
        let remover = FnRemover::new("reverse", |file: FileCandidate| async move {
            let mut bytes = file.bytes().to_vec();
            bytes.reverse();
            Ok(bytes)
        });
        let file = FileCandidate::new("a.png", "image/png", vec![1, 2, 3]);
        assert_eq!(remover.remove_background(&file).await.unwrap(), vec![3, 2, 1]);
        assert_eq!(remover.name(), "reverse");
    }
}
