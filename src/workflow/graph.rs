// StateGraph - explicit routing table for the content pipeline
//
// Every edge points strictly forward in pipeline order, so no cycle is
// reachable. `ROUTES_ARE_FORWARD` checks this at compile time.
use super::router;
use super::state::WorkflowState;
use crate::error::EngineError;
use std::fmt;

/// Pipeline nodes, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeName {
    Classify = 0,
    Research = 1,
    ScriptGeneration = 2,
    ThumbnailGeneration = 3,
    Finish = 4,
}

impl NodeName {
    pub const ENTRY: NodeName = NodeName::Classify;

    pub const ALL: [NodeName; 5] = [
        NodeName::Classify,
        NodeName::Research,
        NodeName::ScriptGeneration,
        NodeName::ThumbnailGeneration,
        NodeName::Finish,
    ];

    /// Nodes backed by a collaborator.
    pub const STEPS: [NodeName; 4] = [
        NodeName::Classify,
        NodeName::Research,
        NodeName::ScriptGeneration,
        NodeName::ThumbnailGeneration,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeName::Classify => "classify",
            NodeName::Research => "research",
            NodeName::ScriptGeneration => "script_generation",
            NodeName::ThumbnailGeneration => "thumbnail_generation",
            NodeName::Finish => "finish",
        }
    }

    /// Position in pipeline order.
    pub const fn rank(&self) -> u8 {
        *self as u8
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, NodeName::Finish)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure routing predicate.
pub type RouterFunction = fn(&WorkflowState) -> NodeName;

#[derive(Clone, Copy)]
pub enum EdgeType {
    /// Always follows this path
    Fixed(NodeName),
    /// Router decides between the declared targets
    Conditional {
        router: RouterFunction,
        targets: [NodeName; 2],
    },
}

impl fmt::Debug for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Fixed(target) => write!(f, "Fixed({})", target),
            EdgeType::Conditional { targets, .. } => {
                write!(f, "Conditional({} | {})", targets[0], targets[1])
            }
        }
    }
}

impl EdgeType {
    pub fn targets(&self) -> Vec<NodeName> {
        match self {
            EdgeType::Fixed(target) => vec![*target],
            EdgeType::Conditional { targets, .. } => targets.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub from: NodeName,
    pub edge: EdgeType,
}

/// The routing table: node -> predicate -> next node.
pub const ROUTES: [Route; 4] = [
    Route {
        from: NodeName::Classify,
        edge: EdgeType::Conditional {
            router: router::should_continue_to_research,
            targets: [NodeName::Research, NodeName::Finish],
        },
    },
    Route {
        from: NodeName::Research,
        edge: EdgeType::Conditional {
            router: router::should_continue_to_script,
            targets: [NodeName::ScriptGeneration, NodeName::Finish],
        },
    },
    Route {
        from: NodeName::ScriptGeneration,
        edge: EdgeType::Conditional {
            router: router::should_continue_to_thumbnails,
            targets: [NodeName::ThumbnailGeneration, NodeName::Finish],
        },
    },
    // Thumbnail generation is best-effort and never gates the run
    Route {
        from: NodeName::ThumbnailGeneration,
        edge: EdgeType::Fixed(NodeName::Finish),
    },
];

const fn routes_are_forward(routes: &[Route]) -> bool {
    let mut i = 0;
    while i < routes.len() {
        let from = routes[i].from.rank();
        match routes[i].edge {
            EdgeType::Fixed(to) => {
                if to.rank() <= from {
                    return false;
                }
            }
            EdgeType::Conditional { targets, .. } => {
                let mut j = 0;
                while j < targets.len() {
                    if targets[j].rank() <= from {
                        return false;
                    }
                    j += 1;
                }
            }
        }
        i += 1;
    }
    true
}

const ROUTES_ARE_FORWARD: () = assert!(routes_are_forward(&ROUTES), "routing table has a backward edge");

/// StateGraph - The workflow graph
#[derive(Debug, Clone)]
pub struct StateGraph {
    routes: &'static [Route],
    entry_point: NodeName,
}

impl StateGraph {
    /// The classify -> research -> script -> thumbnails -> finish pipeline.
    pub fn standard() -> Self {
        let () = ROUTES_ARE_FORWARD;
        Self {
            routes: &ROUTES,
            entry_point: NodeName::ENTRY,
        }
    }

    /// Graph over a caller-supplied routing table. Checked by [`StateGraph::validate`]
    /// when an executor is built from it.
    pub fn from_routes(routes: &'static [Route], entry_point: NodeName) -> Self {
        Self {
            routes,
            entry_point,
        }
    }

    pub fn entry_point(&self) -> NodeName {
        self.entry_point
    }

    pub fn edge(&self, from: NodeName) -> Option<&EdgeType> {
        self.routes.iter().find(|r| r.from == from).map(|r| &r.edge)
    }

    /// Validate the table: one route per non-terminal node, none out of the terminal.
    pub fn validate(&self) -> Result<(), EngineError> {
        for node in NodeName::ALL {
            let count = self.routes.iter().filter(|r| r.from == node).count();
            match (node.is_terminal(), count) {
                (true, 0) | (false, 1) => {}
                _ => return Err(EngineError::Unroutable(node.to_string())),
            }
        }
        if !routes_are_forward(self.routes) {
            return Err(EngineError::Unroutable("backward edge".to_string()));
        }
        Ok(())
    }

    /// Next node after `current`, `None` once the terminal node has run.
    pub fn get_next_node(
        &self,
        current: NodeName,
        state: &WorkflowState,
    ) -> Result<Option<NodeName>, EngineError> {
        if current.is_terminal() {
            return Ok(None);
        }
        let edge = self
            .edge(current)
            .ok_or_else(|| EngineError::Unroutable(current.to_string()))?;
        let next = match edge {
            EdgeType::Fixed(target) => *target,
            EdgeType::Conditional { router, targets } => {
                let chosen = router(state);
                if !targets.contains(&chosen) {
                    return Err(EngineError::Unroutable(format!(
                        "{} routed to undeclared target {}",
                        current, chosen
                    )));
                }
                chosen
            }
        };
        Ok(Some(next))
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::create_initial_state;

    #[test]
    fn test_standard_graph_validates() {
        let graph = StateGraph::standard();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.entry_point(), NodeName::Classify);
    }

    #[test]
    fn test_every_edge_moves_forward() {
        for route in ROUTES {
            for target in route.edge.targets() {
                assert!(
                    target.rank() > route.from.rank(),
                    "{} -> {} is not forward",
                    route.from,
                    target
                );
            }
        }
    }

    #[test]
    fn test_every_path_reaches_finish_within_node_count() {
        // Walk every combination of router outcomes from the entry point.
        let graph = StateGraph::standard();
        let mut frontier = vec![(graph.entry_point(), 0usize)];
        while let Some((node, depth)) = frontier.pop() {
            assert!(depth < NodeName::ALL.len(), "path longer than node count");
            if node.is_terminal() {
                continue;
            }
            let edge = graph.edge(node).expect("non-terminal node has a route");
            for target in edge.targets() {
                frontier.push((target, depth + 1));
            }
        }
    }

    #[test]
    fn test_finish_has_no_outgoing_edge() {
        let graph = StateGraph::standard();
        let state = create_initial_state("q", 10);
        assert!(graph.edge(NodeName::Finish).is_none());
        assert_eq!(graph.get_next_node(NodeName::Finish, &state).unwrap(), None);
    }

    #[test]
    fn test_errors_short_circuit_every_conditional_edge() {
        let graph = StateGraph::standard();
        let clean = create_initial_state("q", 10);
        let mut failed = clean.clone();
        failed.errors.push("classify error: boom".to_string());

        let expected = [
            (NodeName::Classify, NodeName::Research),
            (NodeName::Research, NodeName::ScriptGeneration),
            (NodeName::ScriptGeneration, NodeName::ThumbnailGeneration),
            (NodeName::ThumbnailGeneration, NodeName::Finish),
        ];
        for (from, next) in expected {
            assert_eq!(graph.get_next_node(from, &clean).unwrap(), Some(next));
            assert_eq!(graph.get_next_node(from, &failed).unwrap(), Some(NodeName::Finish));
        }
    }
}
