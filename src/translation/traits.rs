use anyhow::Result;
use async_trait::async_trait;

/// Text-in/text-out generative language service.
/// Chat replies and listing translations both go through this.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Send one prompt, get the model's text back
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the name of the backing service
    fn service_name(&self) -> &'static str;
}
