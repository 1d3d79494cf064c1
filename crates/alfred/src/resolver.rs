use alfred_core::{ModelClient, ModelId, ModelResolver, ResolveError};
use alfred_openai_model::{OpenAIConfig, OpenAIConfigBuilder, OpenAIProvider};

use crate::settings::OpenAISettings;

/// Base URL of a local Ollama server.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Resolves model references to OpenAI-compatible endpoints.
///
/// | provider | endpoint |
/// |---|---|
/// | `openai` or none | `[openai]` settings, or the public API |
/// | `ollama` | [`OLLAMA_BASE_URL`], without a key |
#[derive(Clone, Debug, Default)]
pub struct EndpointResolver {
    openai: OpenAISettings,
}

impl EndpointResolver {
    /// Creates a resolver using `openai` for the `openai` provider.
    #[inline]
    pub fn new(openai: OpenAISettings) -> Self {
        Self { openai }
    }

    /// Returns the connection settings for `id` without creating a client.
    pub fn endpoint(&self, id: &ModelId) -> Result<OpenAIConfig, ResolveError> {
        let builder = OpenAIConfigBuilder::with_model(id.name());
        let builder = match id.provider() {
            None | Some("openai") => {
                let mut builder = builder;
                if let Some(base_url) = &self.openai.base_url {
                    builder = builder.with_base_url(base_url);
                }
                if let Some(api_key) = &self.openai.api_key {
                    builder = builder.with_api_key(api_key);
                }
                builder
            }
            Some("ollama") => builder.with_base_url(OLLAMA_BASE_URL),
            Some(other) => {
                return Err(ResolveError::UnknownProvider(other.to_owned()));
            }
        };
        Ok(builder.build())
    }
}

impl ModelResolver for EndpointResolver {
    fn resolve(&self, id: &ModelId) -> Result<ModelClient, ResolveError> {
        let config = self.endpoint(id)?;
        debug!(model = %id, base_url = config.base_url(), "resolved model");
        let provider = OpenAIProvider::new(config);
        Ok(ModelClient::new(provider).with_label(id.to_string()))
    }
}
