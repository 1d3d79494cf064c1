use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use crate::error::{ParseModelIdError, ResolveError};
use crate::model_client::ModelClient;

/// Model used by agents that do not name one.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss:20b";

/// A textual model reference such as `openai/gpt-oss:20b`.
///
/// The part before the first `/` names the provider, the rest is the
/// model name as the provider knows it. A reference without `/` has no
/// provider and leaves the choice to the resolver.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelId {
    provider: Option<String>,
    name: String,
}

impl ModelId {
    /// Returns the reference named by [`DEFAULT_MODEL`].
    pub fn default_model() -> Self {
        Self {
            provider: Some("openai".to_owned()),
            name: "gpt-oss:20b".to_owned(),
        }
    }

    /// Returns the provider prefix, if any.
    #[inline]
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns the model name without the provider prefix.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ModelId {
    #[inline]
    fn default() -> Self {
        Self::default_model()
    }
}

impl FromStr for ModelId {
    type Err = ParseModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseModelIdError::Empty);
        }
        if s.contains(char::is_whitespace) {
            return Err(ParseModelIdError::Whitespace(s.to_owned()));
        }
        let Some((provider, name)) = s.split_once('/') else {
            return Ok(Self {
                provider: None,
                name: s.to_owned(),
            });
        };
        if provider.is_empty() {
            return Err(ParseModelIdError::EmptyProvider(s.to_owned()));
        }
        if name.is_empty() {
            return Err(ParseModelIdError::EmptyName(s.to_owned()));
        }
        Ok(Self {
            provider: Some(provider.to_owned()),
            name: name.to_owned(),
        })
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "{provider}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// The model an agent talks to: either a reference resolved when the
/// agent is created, or a client built by the caller.
#[derive(Clone)]
pub enum ModelRef {
    /// Resolved through a [`ModelResolver`].
    Id(ModelId),
    /// Used as is.
    Client(ModelClient),
}

impl ModelRef {
    /// Returns the model reference, if this is not a prebuilt client.
    #[inline]
    pub fn id(&self) -> Option<&ModelId> {
        match self {
            ModelRef::Id(id) => Some(id),
            ModelRef::Client(_) => None,
        }
    }
}

impl Default for ModelRef {
    #[inline]
    fn default() -> Self {
        ModelRef::Id(ModelId::default_model())
    }
}

impl From<ModelId> for ModelRef {
    #[inline]
    fn from(id: ModelId) -> Self {
        ModelRef::Id(id)
    }
}

impl From<ModelClient> for ModelRef {
    #[inline]
    fn from(client: ModelClient) -> Self {
        ModelRef::Client(client)
    }
}

impl Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Id(id) => f.debug_tuple("Id").field(id).finish(),
            ModelRef::Client(client) => {
                f.debug_tuple("Client").field(&client.label()).finish()
            }
        }
    }
}

impl Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Id(id) => Display::fmt(id, f),
            ModelRef::Client(client) => f.write_str(client.label()),
        }
    }
}

/// Turns a [`ModelId`] into a client.
///
/// This is where provider prefixes get their meaning. Closures with the
/// matching signature are resolvers too.
pub trait ModelResolver {
    /// Builds a client for `id`. Must not perform I/O.
    fn resolve(&self, id: &ModelId) -> Result<ModelClient, ResolveError>;
}

impl<F> ModelResolver for F
where
    F: Fn(&ModelId) -> Result<ModelClient, ResolveError>,
{
    #[inline]
    fn resolve(&self, id: &ModelId) -> Result<ModelClient, ResolveError> {
        self(id)
    }
}
