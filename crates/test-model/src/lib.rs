//! A scripted model provider for tests.
//!
//! [`TestModelProvider`] replays a conversation script instead of calling a
//! real model. The position in the script is derived from the request
//! itself: every non-system message in the history consumes one step, so
//! a request with one user message is answered by step 1, a follow-up
//! after two tool results by step 3, and so on.

#[macro_use]
extern crate tracing;

mod preset;

use std::collections::{HashMap, VecDeque};
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use alfred_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

/// Error returned when the script cannot answer a request.
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The assistant message replayed into the history by the agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedMessage {
    /// Step that produced the message.
    pub step: usize,
    /// Full assistant text.
    pub text: String,
    /// Tool calls the step asked for.
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Streamed response of a scripted step.
pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
    message: ScriptedMessage,
    finished: bool,
}

impl ModelResponse for TestModelResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let timer = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(timer.as_mut().poll(cx));
        this.sleep = None;

        let event = this.events.pop_front();
        if event.is_none() {
            this.finished = true;
        }
        Poll::Ready(Ok(event))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let id = format!("msg:{}", self.message.step);
        Some(OpaqueMessage::new(id, self.message.clone()))
    }
}

#[derive(Clone, Debug)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
    ToolResult,
}

#[derive(Default)]
struct Shared {
    attempts: HashMap<usize, u64>,
    requests: Vec<ModelRequest>,
}

/// A fake provider answering from a conversation script.
///
/// Clones share their attempt counters and request log, so a clone handed
/// to an agent can still be inspected by the test.
///
/// # Note
///
/// Every request and step is cloned freely. This type is meant for tests
/// only.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<ConversationStep>,
    delay: Option<Duration>,
    shared: Arc<Mutex<Shared>>,
}

impl TestModelProvider {
    /// Expects a user message at this position.
    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.script.push(ConversationStep::UserInput);
    }

    /// Answers the request arriving at this position.
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.script.push(ConversationStep::AssistantResponse(preset));
    }

    /// Expects `count` tool results at this position.
    #[inline]
    pub fn add_tool_result_steps(&mut self, count: usize) {
        for _ in 0..count {
            self.script.push(ConversationStep::ToolResult);
        }
    }

    /// Shorthand for a user message followed by its answer.
    #[inline]
    pub fn add_user_turn(&mut self, preset: PresetResponse) {
        self.add_user_input_step();
        self.add_assistant_response_step(preset);
    }

    /// Sets the delay between two streamed events. Defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, failed attempts included.
    pub fn received_requests(&self) -> Vec<ModelRequest> {
        self.lock_shared().requests.clone()
    }

    fn lock_shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn answer(&self, req: &ModelRequest) -> Result<TestModelResponse, Error> {
        let step_idx = req
            .messages
            .iter()
            .filter(|msg| !matches!(msg, ModelMessage::System(_)))
            .count();

        let mut shared = self.lock_shared();
        shared.requests.push(req.clone());

        let preset = match self.script.get(step_idx) {
            Some(ConversationStep::AssistantResponse(preset)) => preset,
            Some(step) => {
                return Err(Error::new(
                    format!("step {step_idx} is {step:?}, not a response"),
                    ErrorKind::Other,
                ));
            }
            None => {
                return Err(Error::new(
                    format!("script has no step {step_idx}"),
                    ErrorKind::Other,
                ));
            }
        };

        let attempt = shared.attempts.entry(step_idx).or_default();
        *attempt += 1;
        if preset.should_fail(*attempt) {
            debug!("step {step_idx} fails on attempt {attempt}");
            return Err(Error::new(
                "scripted failure",
                ErrorKind::RateLimitExceeded,
            ));
        }

        let mut text = String::new();
        let mut tool_calls = vec![];
        let mut events: VecDeque<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(delta) => {
                    text.push_str(delta);
                    ModelResponseEvent::MessageDelta(delta.clone())
                }
                PresetEvent::ToolCall(call) => {
                    tool_calls.push(call.clone());
                    ModelResponseEvent::ToolCall(call.clone())
                }
            })
            .collect();
        events.push_back(ModelResponseEvent::Completed(
            if preset.has_tool_calls() {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            },
        ));

        Ok(TestModelResponse {
            events,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
            message: ScriptedMessage {
                step: step_idx,
                text,
                tool_calls,
            },
            finished: false,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.answer(req))
    }
}
