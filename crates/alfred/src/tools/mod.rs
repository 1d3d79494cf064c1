//! Built-in tools that agents can be given by name.

mod weather;

use alfred_core::tool::AnyTool;

pub use weather::{WeatherTool, get_weather};

/// Names accepted by [`find_tool`].
pub const TOOL_NAMES: &[&str] = &["get_weather"];

/// Creates the built-in tool called `name`.
pub fn find_tool(name: &str) -> Option<AnyTool> {
    match name {
        "get_weather" => Some(AnyTool::new(WeatherTool::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_consistent() {
        for name in TOOL_NAMES {
            let tool = find_tool(name).unwrap();
            assert_eq!(tool.name(), *name);
        }
        assert!(find_tool("shell").is_none());
    }
}
