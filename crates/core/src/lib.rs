//! Agent configuration and the turn loop that drives it.
//!
//! An agent is described by an [`AgentConfig`]: a name, a model reference,
//! an instruction and a list of tools. [`AgentBuilder`] assembles one,
//! filling in [`DEFAULT_MODEL`] and an empty tool list when they are not
//! given, and [`Agent`] runs conversations against it.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
mod model_client;
mod model_ref;
mod registry;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentConfig, AgentOptions, Reply, ToolCallRecord,
};
pub use conversation::TranscriptSource;
pub use error::{ConfigError, Error, ParseModelIdError, ResolveError};
pub use model_client::{ModelClient, ModelClientResponse, RetryPolicy};
pub use model_ref::{DEFAULT_MODEL, ModelId, ModelRef, ModelResolver};
pub use registry::AgentRegistry;
