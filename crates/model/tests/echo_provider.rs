//! Exercises the provider traits with a minimal echoing backend.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use alfred_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo failed: {}", self.0)
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct EchoResponse {
    words: VecDeque<String>,
    delay: Option<Pin<Box<Sleep>>>,
    done: bool,
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(Ok(None));
        }

        let delay = this
            .delay
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(delay.as_mut().poll(cx));
        this.delay = None;

        let event = match this.words.pop_front() {
            Some(word) => ModelResponseEvent::MessageDelta(word),
            None => {
                this.done = true;
                ModelResponseEvent::Completed(ModelFinishReason::Stop)
            }
        };
        Poll::Ready(Ok(Some(event)))
    }
}

/// Repeats the last user message back, one word per event.
struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let result = match last_user {
            Some(text) => {
                let words = format!("You said {text}")
                    .split_inclusive(' ')
                    .map(ToOwned::to_owned)
                    .collect();
                Ok(EchoResponse {
                    words,
                    delay: None,
                    done: false,
                })
            }
            None => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(resp: EchoResponse) -> (String, Option<ModelFinishReason>) {
    let mut resp = Box::pin(resp);
    let mut text = String::new();
    let mut finish_reason = None;
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
            ModelResponseEvent::ToolCall(call) => {
                unreachable!("unexpected tool call: {call:?}")
            }
        }
    }
    (text, finish_reason)
}

#[tokio::test]
async fn test_streams_words_then_completes() {
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("You are a parrot.".to_owned()),
            ModelMessage::User("Good morning".to_owned()),
        ],
        tools: vec![],
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, finish_reason) = collect(resp).await;
    assert_eq!(text, "You said Good morning");
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_error_kind_is_exposed() {
    let req = ModelRequest::default();
    let Err(err) = EchoProvider.send_request(&req).await else {
        panic!("request without user input should fail");
    };
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.to_string(), "echo failed: other");
}
