use std::future::ready;

use alfred_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Arguments of [`WeatherTool`].
#[derive(Deserialize, JsonSchema)]
pub struct WeatherToolParameters {
    #[schemars(description = "The city to get the weather for.")]
    city: String,
}

/// A tool reporting the weather of a city.
///
/// The weather is always sunny.
pub struct WeatherTool {
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates a new weather tool.
    #[inline]
    pub fn new() -> Self {
        WeatherTool {
            parameter_schema: schema_for!(WeatherToolParameters).to_value(),
        }
    }
}

impl Default for WeatherTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Describes the weather in `city`.
pub fn get_weather(city: &str) -> String {
    format!("The weather in {city} is sunny.")
}

impl Tool for WeatherTool {
    type Input = WeatherToolParameters;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the weather for a city."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let city = input.city.trim();
        let result = if city.is_empty() {
            Err(ToolError::invalid_input().with_reason("city must not be empty"))
        } else {
            Ok(get_weather(city))
        };
        ready(result)
    }
}
