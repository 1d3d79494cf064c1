//! Agent definitions.

use alfred_core::{AgentBuilder, AgentRegistry};
use anyhow::{Context, Result, anyhow};

use crate::settings::{AgentSettings, Settings};
use crate::tools::{TOOL_NAMES, WeatherTool, find_tool};

/// Name of the built-in agent.
pub const ROOT_AGENT: &str = "alfred";

/// The built-in agent: a helpful assistant on the default model that can
/// look up the weather.
pub fn root_agent() -> AgentBuilder {
    AgentBuilder::new(ROOT_AGENT, "You are a helpful assistant.")
        .with_tool(WeatherTool::new())
}

/// Turns an `[[agents]]` entry into a builder.
pub fn agent_from_settings(settings: &AgentSettings) -> Result<AgentBuilder> {
    let tools = settings
        .tools
        .iter()
        .map(|name| {
            find_tool(name).ok_or_else(|| {
                anyhow!(
                    "agent `{}` uses unknown tool `{name}`, known tools: {}",
                    settings.name,
                    TOOL_NAMES.join(", ")
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut builder = AgentBuilder::new(&settings.name, &settings.instructions)
        .with_tools(tools);
    if let Some(model) = &settings.model {
        builder = builder.with_model(model);
    }
    Ok(builder)
}

/// Registers the built-in agent followed by the agents of `settings`.
pub fn registry(settings: &Settings) -> Result<AgentRegistry> {
    let mut registry = AgentRegistry::default();
    registry.register(root_agent().config()?)?;
    for agent in &settings.agents {
        let config = agent_from_settings(agent)?
            .config()
            .with_context(|| format!("invalid agent `{}`", agent.name))?;
        registry.register(config)?;
    }
    Ok(registry)
}
