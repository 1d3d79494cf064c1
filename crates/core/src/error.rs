use alfred_model::ErrorKind;
use thiserror::Error;

/// A model reference string could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseModelIdError {
    /// The string was empty.
    #[error("model reference is empty")]
    Empty,
    /// Contains whitespace, which no provider accepts.
    #[error("model reference `{0}` contains whitespace")]
    Whitespace(String),
    /// Nothing before the `/`.
    #[error("model reference `{0}` has an empty provider")]
    EmptyProvider(String),
    /// Nothing after the `/`.
    #[error("model reference `{0}` has an empty model name")]
    EmptyName(String),
}

/// An agent configuration is unusable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The agent name is blank.
    #[error("agent name must not be empty")]
    EmptyName,
    /// The model string given to the builder does not parse.
    #[error("invalid model for agent `{agent}`: {source}")]
    InvalidModel {
        /// Name of the offending agent.
        agent: String,
        /// Why parsing failed.
        #[source]
        source: ParseModelIdError,
    },
    /// Another agent already uses this name.
    #[error("an agent named `{0}` is already registered")]
    DuplicateName(String),
}

/// A model reference could not be turned into a client.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No backend is known for the provider prefix.
    #[error("unknown model provider `{0}`")]
    UnknownProvider(String),
    /// The backend exists but cannot serve this model.
    #[error("model `{id}` is unavailable: {reason}")]
    Unavailable {
        /// The reference as written.
        id: String,
        /// What went wrong.
        reason: String,
    },
}

/// Errors returned by [`Agent`](crate::Agent).
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`ResolveError`].
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The model provider failed, after retries if the failure was
    /// retryable.
    #[error("model request failed ({kind}): {message}")]
    Model {
        /// Classification reported by the provider.
        kind: ErrorKind,
        /// The provider's message.
        message: String,
    },
    /// The model kept asking for tools past the step budget.
    #[error("no final answer after {0} model steps")]
    StepLimitExceeded(usize),
}
