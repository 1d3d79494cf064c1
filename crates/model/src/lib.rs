//! Provider-agnostic types shared by the agent runtime and model backends.
//!
//! A backend implements [`ModelProvider`]: it accepts a [`ModelRequest`]
//! and streams [`ModelResponseEvent`]s back through a [`ModelResponse`].
//! The agent never sees wire formats, so swapping one backend for another
//! does not touch the core crate.
//!
//! Nothing here performs I/O. Backends live in their own crates.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
