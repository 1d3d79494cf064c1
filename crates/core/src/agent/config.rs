use crate::model_ref::ModelRef;
use crate::tool::AnyTool;

/// The description of an agent.
///
/// Built by [`AgentBuilder`](crate::AgentBuilder) with defaults applied and
/// never changed afterwards.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub(super) name: String,
    pub(super) model: ModelRef,
    pub(super) instruction: String,
    pub(super) tools: Vec<AnyTool>,
}

impl AgentConfig {
    /// Returns the agent name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model the agent talks to.
    #[inline]
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Returns the system instruction.
    #[inline]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Returns the tools, in registration order.
    #[inline]
    pub fn tools(&self) -> &[AnyTool] {
        &self.tools
    }

    /// Returns the tool names, in registration order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(AnyTool::name)
    }
}
