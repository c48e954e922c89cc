//! The input module graph.

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;

use sanvar_core::errors::GraphError;
use sanvar_core::types::collections::FxHashMap;
use sanvar_core::types::LinkKind;

use crate::module::ModuleDecl;

/// The static dependency graph as declared: one node per module, edges
/// from consumer to dependency tagged with the link kind.
#[derive(Debug)]
pub struct ModuleGraph {
    graph: StableDiGraph<ModuleDecl, LinkKind>,
    by_name: FxHashMap<String, NodeIndex>,
}

impl ModuleGraph {
    /// Build the graph from declarations. Fails on duplicate module names
    /// and on dependency names that resolve to nothing.
    pub fn build(modules: Vec<ModuleDecl>) -> Result<Self, GraphError> {
        let mut graph = StableDiGraph::new();
        let mut by_name = FxHashMap::default();

        for module in modules {
            let name = module.name.clone();
            let idx = graph.add_node(module);
            if by_name.insert(name.clone(), idx).is_some() {
                return Err(GraphError::DuplicateModule(name));
            }
        }

        let indices: Vec<NodeIndex> = graph.node_indices().collect();
        for idx in indices {
            let lists = {
                let m = &graph[idx];
                [
                    (m.shared_libs.clone(), LinkKind::Shared),
                    (m.static_libs.clone(), LinkKind::Static),
                    (m.whole_static_libs.clone(), LinkKind::WholeStatic),
                ]
            };
            for (names, link) in lists {
                for dep_name in names {
                    let dep_idx = by_name.get(&dep_name).copied().ok_or_else(|| {
                        GraphError::MissingDependency {
                            module: graph[idx].name.clone(),
                            dependency: dep_name.clone(),
                        }
                    })?;
                    graph.add_edge(idx, dep_idx, link);
                }
            }
        }

        tracing::debug!(modules = by_name.len(), "built module graph");
        Ok(Self { graph, by_name })
    }

    pub fn module(&self, idx: NodeIndex) -> &ModuleDecl {
        &self.graph[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node indices sorted by module name, so seeding order never depends
    /// on declaration order.
    pub fn sorted_indices(&self) -> Vec<NodeIndex> {
        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
        indices
    }

    /// Outgoing dependency edges of a module, in deterministic order
    /// (shared, then static, then whole-static; by dependency name within
    /// a group).
    pub fn dependencies(&self, idx: NodeIndex) -> Vec<(NodeIndex, LinkKind)> {
        let rank = |link: &LinkKind| match link {
            LinkKind::Shared => 0u8,
            LinkKind::Static => 1,
            LinkKind::WholeStatic => 2,
        };
        let mut deps: Vec<(NodeIndex, LinkKind)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (petgraph::visit::EdgeRef::target(&e), *e.weight()))
            .collect();
        deps.sort_by(|(a_idx, a_link), (b_idx, b_link)| {
            rank(a_link)
                .cmp(&rank(b_link))
                .then_with(|| self.graph[*a_idx].name.cmp(&self.graph[*b_idx].name))
        });
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_modules_rejected() {
        let err = ModuleGraph::build(vec![
            ModuleDecl::binary("bin"),
            ModuleDecl::binary("bin"),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateModule(name) if name == "bin"));
    }

    #[test]
    fn missing_dependency_rejected() {
        let err = ModuleGraph::build(vec![
            ModuleDecl::binary("bin").with_shared_libs(&["libmissing"]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingDependency { ref dependency, .. } if dependency == "libmissing"
        ));
    }

    #[test]
    fn edges_resolve_by_name() {
        let graph = ModuleGraph::build(vec![
            ModuleDecl::binary("bin").with_shared_libs(&["libshared"]),
            ModuleDecl::shared_library("libshared"),
        ])
        .unwrap();

        let bin = graph.index_of("bin").unwrap();
        let deps = graph.dependencies(bin);
        assert_eq!(deps.len(), 1);
        assert_eq!(graph.module(deps[0].0).name, "libshared");
        assert_eq!(deps[0].1, LinkKind::Shared);
    }
}
