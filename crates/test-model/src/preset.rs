use alfred_model::ToolCallRequest;
use serde::{Deserialize, Serialize};

/// One scripted event of an assistant step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PresetEvent {
    /// Streams a piece of assistant text.
    MessageDelta(String),
    /// Asks for a tool call.
    ToolCall(ToolCallRequest),
}

/// The scripted reply of an assistant step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events streamed in order. A `Completed` event is appended
    /// automatically.
    pub events: Vec<PresetEvent>,
    /// Number of rate-limited attempts before the step succeeds.
    /// `Some(0)` means the step never succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a response streaming the given events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a response streaming `text` as a single delta.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Makes the first `failures` attempts fail with a rate limit error.
    /// `0` makes every attempt fail.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    pub(crate) fn has_tool_calls(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)))
    }

    pub(crate) fn should_fail(&self, attempt: u64) -> bool {
        match self.failures {
            None => false,
            Some(0) => true,
            Some(failures) => attempt <= failures,
        }
    }
}
