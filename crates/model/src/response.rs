use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::provider::ModelProviderError;

/// A streamed response from a [`ModelProvider`](crate::ModelProvider).
pub trait ModelResponse: Sized + Send + 'static {
    /// Error produced while streaming.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// - `Poll::Pending`: no event yet, the task will be woken.
    /// - `Poll::Ready(Ok(Some(event)))`: an event, more may follow.
    /// - `Poll::Ready(Ok(None))`: the stream is finished. Every later call
    ///   returns this as well.
    /// - `Poll::Ready(Err(err))`: the stream failed.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Returns the complete assistant message in the backend's own format.
    ///
    /// Only meaningful once the stream is finished. Repeated calls return
    /// the same message. Backends that can replay plain text return `None`.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// Why the model stopped producing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model wants tool results before continuing.
    ToolCalls,
    /// The model finished its answer.
    Stop,
    /// The provider cut the answer at its output limit.
    Length,
}

/// A tool call the model asked for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned id, echoed back in the result.
    pub id: String,
    /// Name of the tool.
    pub name: String,
    /// Arguments object.
    pub arguments: Value,
}

/// One event of a streamed response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// A piece of assistant text.
    MessageDelta(String),
    /// A fully assembled tool call.
    ToolCall(ToolCallRequest),
    /// The response is complete.
    Completed(ModelFinishReason),
}
