use serde_json::Value;

use crate::OpaqueMessage;

/// Everything a provider needs to produce the next assistant message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// Conversation so far, oldest first. A system message, if any, comes
    /// first.
    pub messages: Vec<ModelMessage>,
    /// Tools the model may call in its reply.
    pub tools: Vec<ModelTool>,
}

/// One history entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// Agent instructions.
    System(String),
    /// Text typed by the user.
    User(String),
    /// Plain assistant text, used when the backend left no opaque message.
    Assistant(String),
    /// Output of a tool the model asked for.
    Tool(ToolCallResult),
    /// A backend-specific assistant message.
    Opaque(OpaqueMessage),
}

/// Output of a single tool call, addressed by the call id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// Id of the [`ToolCallRequest`](crate::ToolCallRequest) this answers.
    pub id: String,
    /// Text handed back to the model.
    pub content: String,
}

/// A tool definition as advertised to the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name the model uses to call the tool.
    pub name: String,
    /// What the tool does, for the model's benefit.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}
