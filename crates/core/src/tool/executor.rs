use std::collections::BTreeMap;

use alfred_model::{ModelTool, ToolCallRequest};
use futures_util::future::join_all;
use serde_json::Value;
use tracing::Instrument;

use crate::tool::{AnyTool, BoxedToolFuture, Error, ToolResult};

/// The result of one tool call, in the order it was requested.
#[derive(Clone, Debug)]
pub struct ToolOutcome {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

impl ToolOutcome {
    /// Returns the text reported to the model.
    pub fn output(&self) -> String {
        match &self.result {
            Ok(output) => output.clone(),
            Err(err) => format!("Error: {}", err.reason()),
        }
    }
}

/// An executor that handles tool call requests from the model.
pub struct Executor {
    tools: BTreeMap<String, AnyTool>,
}

impl Executor {
    pub fn with_tools<'a>(tools: impl IntoIterator<Item = &'a AnyTool>) -> Self {
        let mut tool_map = BTreeMap::new();
        for tool in tools {
            let name = tool.name().to_owned();
            if tool_map.insert(name, tool.clone()).is_some() {
                warn!("duplicate tool `{}`, keeping the last one", tool.name());
            }
        }
        Self { tools: tool_map }
    }

    /// Tool definitions, sorted by name.
    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.values().map(AnyTool::definition).collect()
    }

    pub async fn run(&self, requests: &[ToolCallRequest]) -> Vec<ToolOutcome> {
        let calls = requests.iter().map(|req| {
            let fut: BoxedToolFuture = match self.tools.get(&req.name) {
                Some(tool) => {
                    trace!("calling `{}` with args: {}", req.name, req.arguments);
                    tool.call(req.arguments.clone())
                }
                None => {
                    warn!("tool not found: {}", req.name);
                    Box::pin(std::future::ready(Err(Error::not_found()
                        .with_reason(format!("no tool named `{}`", req.name)))))
                }
            };
            let span = debug_span!("tool", name = %req.name, id = %req.id);
            async move {
                let result = fut.await;
                if let Err(err) = &result {
                    debug!("tool failed: {err}");
                }
                ToolOutcome {
                    id: req.id.clone(),
                    name: req.name.clone(),
                    arguments: req.arguments.clone(),
                    result,
                }
            }
            .instrument(span)
        });
        join_all(calls).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::tool::{ErrorKind, FunctionTool, Tool};

    struct SlowTool;

    impl Tool for SlowTool {
        type Input = serde_json::Value;

        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Answers after a while"
        }

        fn parameter_schema(&self) -> &Value {
            static SCHEMA: std::sync::LazyLock<Value> =
                std::sync::LazyLock::new(|| json!({ "type": "object" }));
            &SCHEMA
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok("slow".to_owned())
            }
        }
    }

    fn upper(name: &str) -> AnyTool {
        AnyTool::new(FunctionTool::new(name, "Upper-cases", "text", |text| {
            text.to_uppercase()
        }))
    }

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments: json!({ "text": id }),
        }
    }

    #[test]
    fn test_definitions_are_sorted_and_unique() {
        let tools = [upper("zeta"), upper("alpha"), upper("zeta")];
        let executor = Executor::with_tools(&tools);
        let names: Vec<_> =
            executor.definitions().into_iter().map(|tool| tool.name).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let tools = [AnyTool::new(SlowTool), upper("upper")];
        let executor = Executor::with_tools(&tools);

        let outcomes = executor
            .run(&[call("a", "slow"), call("b", "upper"), call("c", "missing")])
            .await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(outcomes[0].output(), "slow");
        assert_eq!(outcomes[1].output(), "B");
        let err = outcomes[2].result.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(outcomes[2].output(), "Error: no tool named `missing`");
    }
}
