// Router - Conditional routing predicates
//
// Each predicate is a pure function of the current state's `errors`.
use super::graph::NodeName;
use super::state::WorkflowState;

/// After classify: research unless an error was recorded
pub fn should_continue_to_research(state: &WorkflowState) -> NodeName {
    if conditions::has_errors(state) {
        NodeName::Finish
    } else {
        NodeName::Research
    }
}

/// After research: script generation unless an error was recorded
pub fn should_continue_to_script(state: &WorkflowState) -> NodeName {
    if conditions::has_errors(state) {
        NodeName::Finish
    } else {
        NodeName::ScriptGeneration
    }
}

/// After script generation: thumbnails unless an error was recorded
pub fn should_continue_to_thumbnails(state: &WorkflowState) -> NodeName {
    if conditions::has_errors(state) {
        NodeName::Finish
    } else {
        NodeName::ThumbnailGeneration
    }
}

/// Predefined condition helpers
pub mod conditions {
    use super::WorkflowState;

    pub fn has_errors(state: &WorkflowState) -> bool {
        !state.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::create_initial_state;

    #[test]
    fn test_warnings_do_not_gate_routing() {
        let mut state = create_initial_state("q", 10);
        state.warnings.push("Using fallback data for game: X".to_string());
        assert_eq!(should_continue_to_research(&state), NodeName::Research);
        assert_eq!(should_continue_to_script(&state), NodeName::ScriptGeneration);
        assert_eq!(should_continue_to_thumbnails(&state), NodeName::ThumbnailGeneration);
    }

    #[test]
    fn test_any_error_routes_to_finish() {
        let mut state = create_initial_state("q", 10);
        state.errors.push("research error: no game name".to_string());
        assert_eq!(should_continue_to_research(&state), NodeName::Finish);
        assert_eq!(should_continue_to_script(&state), NodeName::Finish);
        assert_eq!(should_continue_to_thumbnails(&state), NodeName::Finish);
    }
}
