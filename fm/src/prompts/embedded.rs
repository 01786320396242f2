//! Embedded prompts
//!
//! Compiled into the binary and used when no override file is present.

/// System prompt for the planner
pub const PLANNER_SYSTEM: &str = include_str!("../../prompts/planner-system.pmt");

/// Per-step request: goal, roots, catalog and history
pub const PLANNER_REQUEST: &str = include_str!("../../prompts/planner-request.pmt");

/// Get embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "planner-system" => Some(PLANNER_SYSTEM),
        "planner-request" => Some(PLANNER_REQUEST),
        _ => None,
    }
}
