use std::fmt::{self, Debug};
use std::future::ready;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{Error, Tool, ToolResult};

type Handler = Arc<dyn Fn(String) -> String + Send + Sync>;

/// A tool backed by a plain function taking one string argument.
///
/// ```
/// use alfred_core::tool::FunctionTool;
///
/// let tool = FunctionTool::new("shout", "Upper-cases the text.", "text", |text| {
///     text.to_uppercase()
/// });
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameter: String,
    schema: Value,
    handler: Handler,
}

impl FunctionTool {
    /// Creates a tool named `name` whose single string argument is called
    /// `parameter`.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        let parameter = parameter.into();
        let schema = schema_for(&parameter, None);
        Self {
            name: name.into(),
            description: description.into(),
            parameter,
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Documents the argument for the model.
    pub fn with_parameter_description(
        mut self,
        description: impl AsRef<str>,
    ) -> Self {
        self.schema = schema_for(&self.parameter, Some(description.as_ref()));
        self
    }
}

fn schema_for(parameter: &str, description: Option<&str>) -> Value {
    let mut property = json!({ "type": "string" });
    if let Some(description) = description {
        property["description"] = Value::from(description);
    }
    let mut properties = Map::new();
    properties.insert(parameter.to_owned(), property);
    json!({
        "type": "object",
        "properties": properties,
        "required": [parameter],
    })
}

impl Tool for FunctionTool {
    type Input = Map<String, Value>;

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        mut input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = match input.remove(&self.parameter) {
            Some(Value::String(arg)) => Ok((self.handler)(arg)),
            Some(other) => Err(Error::invalid_input().with_reason(format!(
                "`{}` must be a string, got {other}",
                self.parameter
            ))),
            None => Err(Error::invalid_input()
                .with_reason(format!("missing argument `{}`", self.parameter))),
        };
        ready(result)
    }
}

impl Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("parameter", &self.parameter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{AnyTool, ErrorKind};

    fn echo() -> AnyTool {
        AnyTool::new(
            FunctionTool::new("echo", "Echoes the text.", "text", |text| {
                format!("echo: {text}")
            })
            .with_parameter_description("What to echo"),
        )
    }

    #[test]
    fn test_schema() {
        let tool = echo();
        assert_eq!(
            tool.parameter_schema(),
            &json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "What to echo" },
                },
                "required": ["text"],
            })
        );
        assert_eq!(tool.definition().name, "echo");
    }

    #[tokio::test]
    async fn test_call() {
        let tool = echo();
        let output = tool.call(json!({ "text": "hi" })).await;
        assert_eq!(output, Ok("echo: hi".to_owned()));

        let err = tool.call(json!({ "text": 3 })).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = tool.call(json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = tool.call(json!("hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
