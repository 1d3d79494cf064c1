use std::fmt::{self, Debug};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use alfred_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
    ToolCallRequest,
};
use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;

use crate::error::Error;

pub(crate) type TranscriptFn = Arc<dyn Fn(&str) + Send + Sync>;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Option<TranscriptFn>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A type-erased handle to a model provider.
///
/// Cloning is cheap and clones share the provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    label: Arc<str>,
}

impl ModelClient {
    /// Wraps `provider`, labelled with its type name.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {req:?}");
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_transcript).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            label: Arc::from(std::any::type_name::<P>()),
        }
    }

    /// Replaces the label shown in logs and by `Display` on
    /// [`ModelRef`](crate::ModelRef).
    #[inline]
    pub fn with_label<S: AsRef<str>>(mut self, label: S) -> Self {
        self.label = Arc::from(label.as_ref());
        self
    }

    /// Returns the label of this client.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sends a request and collects the whole response.
    ///
    /// `on_transcript` receives every text delta as it streams in.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        (self.handler_fn)(req, Some(Arc::new(on_transcript))).await
    }

    /// Sends a request, retrying rate limited attempts with exponential
    /// backoff until `policy` gives up.
    pub(crate) async fn send_with_retry(
        &self,
        req: &ModelRequest,
        policy: &RetryPolicy,
        on_transcript: Option<TranscriptFn>,
    ) -> Result<ModelClientResponse, Error> {
        let attempts = AtomicU32::new(0);
        let max_attempts = policy.max_attempts.max(1);
        let operation = || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let fut = (self.handler_fn)(req.clone(), on_transcript.clone());
            async move {
                match fut.await {
                    Ok(resp) => Ok(resp),
                    Err(err)
                        if err.kind() == ErrorKind::RateLimitExceeded
                            && attempt < max_attempts =>
                    {
                        Err(backoff::Error::transient(err))
                    }
                    Err(err) => Err(backoff::Error::permanent(err)),
                }
            }
        };
        let notify = |err: Box<dyn ModelProviderError>, wait: Duration| {
            warn!(model = %self.label, "{err}, retrying in {wait:?}");
        };

        backoff::future::retry_notify(policy.backoff(), operation, notify)
            .await
            .map_err(|err| Error::Model {
                kind: err.kind(),
                message: err.to_string(),
            })
    }
}

impl Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// Concatenated text deltas.
    pub transcript: String,
    /// Provider-specific form of the message, replayed in later requests.
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// How rate limited model requests are retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of a single wait.
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    #[inline]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: Option<TranscriptFn>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            debug!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("response stream failed: {err}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(&msg);
                }
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alfred_model::ModelMessage;
    use alfred_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;

    fn hello() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("How ".to_owned()),
            PresetEvent::MessageDelta("are ".to_owned()),
            PresetEvent::MessageDelta("you?".to_owned()),
        ]));

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let deltas = Arc::new(Mutex::new(Vec::<String>::new()));
            let resp = model_client
                .send_request(hello(), {
                    let deltas = Arc::clone(&deltas);
                    move |delta| deltas.lock().unwrap().push(delta.to_owned())
                })
                .await
                .unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert!(resp.opaque_msg.is_some());
            assert_eq!(deltas.lock().unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_client = ModelClient::new(TestModelProvider::default());
        let Err(err) = model_client.send_request(hello(), |_| {}).await else {
            panic!("an empty script cannot answer");
        };
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let mut provider = TestModelProvider::default();
        provider.add_user_turn(PresetResponse::with_text("Hi").with_failures(2));
        let client = ModelClient::new(provider.clone());

        let resp = client
            .send_with_retry(&hello(), &fast_retry(3), None)
            .await
            .unwrap();
        assert_eq!(resp.transcript, "Hi");
        assert_eq!(provider.received_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let mut provider = TestModelProvider::default();
        provider.add_user_turn(PresetResponse::with_text("Hi").with_failures(0));
        let client = ModelClient::new(provider.clone());

        let err = client
            .send_with_retry(&hello(), &fast_retry(3), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Model {
                kind: ErrorKind::RateLimitExceeded,
                ..
            }
        ));
        assert_eq!(provider.received_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let provider = TestModelProvider::default();
        let client = ModelClient::new(provider.clone());

        let err = client
            .send_with_retry(&hello(), &fast_retry(5), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Model {
                kind: ErrorKind::Other,
                ..
            }
        ));
        assert_eq!(provider.received_requests().len(), 1);
    }

    #[test]
    fn test_label() {
        let client = ModelClient::new(TestModelProvider::default());
        assert!(client.label().ends_with("TestModelProvider"));
        let client = client.with_label("scripted");
        assert_eq!(client.label(), "scripted");
    }
}
