use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};

use alfred_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::{Map, Value};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, FunctionCall, Message, ToolCall};

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks into events and the final assistant message.
///
/// Text deltas are emitted as they arrive. Tool calls are only emitted
/// once the stream has finished, since their arguments arrive in pieces.
#[derive(Default)]
pub(crate) struct Accumulator {
    id: Option<String>,
    content: String,
    reasoning: Option<String>,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<ModelFinishReason>,
}

impl Accumulator {
    pub fn apply(
        &mut self,
        chunk: ChatCompletionChunk,
        out: &mut VecDeque<ModelResponseEvent>,
    ) -> Result<(), Error> {
        if let Some(id) = chunk.id {
            match &self.id {
                Some(known) if *known != id => {
                    return Err(Error::new(
                        format!("chunk id changed from {known} to {id}"),
                        ErrorKind::Other,
                    ));
                }
                Some(_) => {}
                None => self.id = Some(id),
            }
        }

        // Only one choice is ever requested. Usage-only chunks have none.
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(());
        };

        let delta = choice.delta;
        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            self.content.push_str(&content);
            out.push_back(ModelResponseEvent::MessageDelta(content));
        }
        if let Some(reasoning) = delta.reasoning_content {
            self.reasoning.get_or_insert_default().push_str(&reasoning);
        }
        for (position, fragment) in
            delta.tool_calls.into_iter().flatten().enumerate()
        {
            let index = fragment.index.unwrap_or(position as u32);
            let call = self.tool_calls.entry(index).or_default();
            if let Some(id) = fragment.id {
                call.id.push_str(&id);
            }
            if let Some(function) = fragment.function {
                if let Some(name) = function.name {
                    call.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    call.arguments.push_str(&arguments);
                }
            }
        }

        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(match reason.as_str() {
                "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
                "length" => ModelFinishReason::Length,
                _ => ModelFinishReason::Stop,
            });
        }
        Ok(())
    }

    /// Emits the assembled tool calls followed by the completion event.
    pub fn finish(&mut self, out: &mut VecDeque<ModelResponseEvent>) {
        for call in self.tool_calls.values() {
            out.push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: parse_arguments(&call.name, &call.arguments),
            }));
        }
        let reason = self.finish_reason.unwrap_or(if self.tool_calls.is_empty() {
            ModelFinishReason::Stop
        } else {
            ModelFinishReason::ToolCalls
        });
        out.push_back(ModelResponseEvent::Completed(reason));
    }

    /// Converts the accumulated state into a replayable message.
    pub fn into_message(self) -> (String, Message) {
        static LOCAL_IDS: AtomicU64 = AtomicU64::new(1);

        let id = self.id.unwrap_or_else(|| {
            format!("local-{}", LOCAL_IDS.fetch_add(1, Ordering::Relaxed))
        });
        let tool_calls: Vec<_> = self
            .tool_calls
            .into_values()
            .map(|call| ToolCall {
                id: call.id,
                r#type: "function",
                function: FunctionCall {
                    name: call.name,
                    arguments: call.arguments,
                },
            })
            .collect();
        let msg = Message::Assistant {
            content: Some(self.content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            reasoning_content: self.reasoning,
        };
        (id, msg)
    }
}

fn parse_arguments(name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            // Let the tool report the bad input back to the model.
            warn!("arguments for `{name}` are not valid JSON: {err}");
            Value::String(raw.to_owned())
        }
    }
}

struct StreamState {
    sse: Sse,
    acc: Accumulator,
    pending: VecDeque<ModelResponseEvent>,
    ended: bool,
}

type Step = Result<(Option<ModelResponseEvent>, StreamState), Error>;

async fn advance(mut state: StreamState) -> Step {
    loop {
        if let Some(event) = state.pending.pop_front() {
            return Ok((Some(event), state));
        }
        if state.ended {
            return Ok((None, state));
        }

        let data = state.sse.next_event().await.map_err(|err| {
            Error::new(format!("broken event stream: {err:?}"), ErrorKind::Other)
        })?;
        match data {
            Some(data) if data != "[DONE]" => {
                trace!("got sse event: {data}");
                let chunk = serde_json::from_str::<ChatCompletionChunk>(&data)
                    .map_err(|err| {
                        Error::new(format!("bad chunk: {err}"), ErrorKind::Other)
                    })?;
                state.acc.apply(chunk, &mut state.pending)?;
            }
            _ => {
                state.acc.finish(&mut state.pending);
                state.ended = true;
            }
        }
    }
}

/// Streamed chat completion.
pub struct OpenAIResponse {
    next: Option<Pin<Box<dyn Future<Output = Step> + Send>>>,
    message: Option<(String, Message)>,
}

impl OpenAIResponse {
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let state = StreamState {
            sse,
            acc: Accumulator::default(),
            pending: VecDeque::new(),
            ended: false,
        };
        Self {
            next: Some(Box::pin(advance(state))),
            message: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let Some(next) = &mut this.next else {
            return Poll::Ready(Ok(None));
        };

        match ready!(next.as_mut().poll(cx)) {
            Ok((Some(event), state)) => {
                this.next = Some(Box::pin(advance(state)));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, state)) => {
                this.next = None;
                this.message = Some(state.acc.into_message());
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                this.next = None;
                Poll::Ready(Err(err))
            }
        }
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.message
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id.as_str(), msg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;

    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn drain(
        resp: &mut OpenAIResponse,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| Pin::new(&mut *resp).poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_call_stream() {
        let chunks =
            Chunks::from_static(&[include_bytes!("../fixtures/tool_calls.txt")]);
        let mut resp = OpenAIResponse::from_sse(Sse::new(chunks));
        let events = drain(&mut resp).await.unwrap();

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me ".to_owned()),
                ModelResponseEvent::MessageDelta("check.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_a".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: json!({ "city": "Paris" }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_b".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: json!({ "city": "Oslo" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        let opaque = resp.make_opaque_message().unwrap();
        assert_eq!(opaque.id(), "chatcmpl-42");
        let Message::Assistant {
            content,
            tool_calls,
            reasoning_content,
        } = opaque.downcast_ref::<Message>().unwrap()
        else {
            panic!("expected an assistant message");
        };
        assert_eq!(content.as_deref(), Some("Let me check."));
        assert_eq!(reasoning_content.as_deref(), Some("User wants weather."));
        let tool_calls = tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[1].function.arguments, r#"{"city":"Oslo"}"#);

        // Polling past the end keeps returning `None`.
        assert!(drain(&mut resp).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_text_without_done_marker() {
        let chunks = Chunks::from_static(&[
            br#"data: {"id":"c1","choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#,
            b"\n\n",
            br#"data: {"id":"c1","choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            b"\n\n",
        ]);
        let mut resp = OpenAIResponse::from_sse(Sse::new(chunks));
        let events = drain(&mut resp).await.unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hi".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
        let opaque = resp.make_opaque_message().unwrap();
        let Message::Assistant { tool_calls, .. } =
            opaque.downcast_ref::<Message>().unwrap()
        else {
            panic!("expected an assistant message");
        };
        assert!(tool_calls.is_none());
    }

    #[tokio::test]
    async fn test_malformed_chunk_fails() {
        let chunks = Chunks::from_static(&[b"data: {not json}\n\n"]);
        let mut resp = OpenAIResponse::from_sse(Sse::new(chunks));
        let err = drain(&mut resp).await.unwrap_err();
        assert!(err.message().starts_with("bad chunk"));
        assert!(resp.make_opaque_message().is_none());
    }

    #[test]
    fn test_unparsable_arguments_are_kept_raw() {
        assert_eq!(parse_arguments("t", ""), json!({}));
        assert_eq!(parse_arguments("t", "{\"a\":1}"), json!({ "a": 1 }));
        assert_eq!(parse_arguments("t", "{\"a\":"), json!("{\"a\":"));
    }
}
