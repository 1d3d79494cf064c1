//! Alfred, a helpful assistant in the terminal.
//!
//! The crate defines the built-in `alfred` agent, reads additional agents
//! from a settings file, resolves model references to OpenAI-compatible
//! endpoints, and runs the result as an interactive chat:
//!
//! ```no_run
//! use alfred::{EndpointResolver, Runner, agents};
//!
//! # fn main() -> anyhow::Result<()> {
//! let agent = agents::root_agent().build(&EndpointResolver::default())?;
//! Runner::new(agent).run()
//! # }
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod agents;
mod resolver;
mod runner;
pub mod settings;
pub mod tools;

pub use resolver::{EndpointResolver, OLLAMA_BASE_URL};
pub use runner::Runner;
pub use settings::Settings;

/// Re-exports of [`alfred_core`] crate.
pub mod core {
    pub use alfred_core::*;
}
