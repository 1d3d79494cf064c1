use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors surfaced by a [`ModelProvider`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies this error.
    fn kind(&self) -> ErrorKind;
}

/// A model backend.
///
/// Providers behave as stateless handles: the agent may clone the request,
/// send it several times (for retries), and drop the provider at any
/// point. Any connection pooling is an implementation detail.
pub trait ModelProvider: Send + Sync {
    /// Error returned when a request cannot be started or fails midway.
    type Error: ModelProviderError;

    /// The streamed response.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a request.
    ///
    /// The returned future must not borrow `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
