use alfred_model::ModelProvider;

use super::{Agent, AgentConfig};
use crate::error::{ConfigError, Error};
use crate::model_client::ModelClient;
use crate::model_ref::{ModelRef, ModelResolver};
use crate::tool::{AnyTool, Tool};

enum ModelChoice {
    Raw(String),
    Ref(ModelRef),
}

/// Assembles an [`AgentConfig`].
///
/// Only the name and the instructions are required. The model defaults to
/// [`DEFAULT_MODEL`](crate::DEFAULT_MODEL) and the tool list to empty.
///
/// ```
/// use alfred_core::{AgentBuilder, DEFAULT_MODEL};
///
/// let config = AgentBuilder::new("alfred", "You are a helpful assistant.")
///     .config()
///     .unwrap();
/// assert_eq!(config.model().to_string(), DEFAULT_MODEL);
/// assert!(config.tools().is_empty());
/// ```
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: Option<ModelChoice>,
    tools: Vec<AnyTool>,
}

impl AgentBuilder {
    /// Creates a builder with the two required fields.
    #[inline]
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: None,
            tools: vec![],
        }
    }

    /// Sets the model by reference, e.g. `openai/gpt-4o-mini`.
    ///
    /// The string is parsed by [`config`](Self::config).
    #[inline]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(ModelChoice::Raw(model.into()));
        self
    }

    /// Sets the model directly.
    #[inline]
    pub fn with_model_ref(mut self, model: impl Into<ModelRef>) -> Self {
        self.model = Some(ModelChoice::Ref(model.into()));
        self
    }

    /// Uses `provider` as the model, bypassing resolution.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        self,
        provider: P,
    ) -> Self {
        self.with_model_ref(ModelClient::new(provider))
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(AnyTool::new(tool));
        self
    }

    /// Registers already erased tools, keeping their order.
    #[inline]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = AnyTool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Produces the configuration record.
    pub fn config(self) -> Result<AgentConfig, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let model = match self.model {
            None => ModelRef::default(),
            Some(ModelChoice::Ref(model)) => model,
            Some(ModelChoice::Raw(raw)) => match raw.parse() {
                Ok(id) => ModelRef::Id(id),
                Err(source) => {
                    return Err(ConfigError::InvalidModel {
                        agent: self.name,
                        source,
                    });
                }
            },
        };
        Ok(AgentConfig {
            name: self.name,
            model,
            instruction: self.instructions,
            tools: self.tools,
        })
    }

    /// Produces the record and creates an agent from it.
    #[inline]
    pub fn build<R>(self, resolver: &R) -> Result<Agent, Error>
    where
        R: ModelResolver + ?Sized,
    {
        Agent::new(self.config()?, resolver)
    }
}

impl From<AgentConfig> for AgentBuilder {
    /// Starts a new record from an existing one, e.g. to swap its model.
    fn from(config: AgentConfig) -> Self {
        Self {
            name: config.name,
            instructions: config.instruction,
            model: Some(ModelChoice::Ref(config.model)),
            tools: config.tools,
        }
    }
}
