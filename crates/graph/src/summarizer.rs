use crate::types::*;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

/// Vertex that can be grouped by its type chain
pub trait TypeKeyed {
    fn type_chain(&self) -> &[TypeId];

    /// Original objects this vertex stands for
    fn members(&self) -> &[ObjectId];

    /// How many of those objects are GC roots
    fn root_count(&self) -> usize;
}

impl TypeKeyed for ObjectVertex {
    fn type_chain(&self) -> &[TypeId] {
        &self.type_chain
    }

    fn members(&self) -> &[ObjectId] {
        std::slice::from_ref(&self.object_id)
    }

    fn root_count(&self) -> usize {
        usize::from(self.is_root())
    }
}

impl TypeKeyed for TypeVertex {
    fn type_chain(&self) -> &[TypeId] {
        &self.type_chain
    }

    fn members(&self) -> &[ObjectId] {
        &self.members
    }

    fn root_count(&self) -> usize {
        self.root_count
    }
}

/// Graph whose vertices can be condensed by type chain
pub trait Summarizable {
    type Vertex: TypeKeyed;

    fn digraph(&self) -> &DiGraph<Self::Vertex, EdgeLabel>;
}

impl Summarizable for ObjectGraph {
    type Vertex = ObjectVertex;

    fn digraph(&self) -> &DiGraph<ObjectVertex, EdgeLabel> {
        &self.graph
    }
}

impl Summarizable for TypeGraph {
    type Vertex = TypeVertex;

    fn digraph(&self) -> &DiGraph<TypeVertex, EdgeLabel> {
        &self.graph
    }
}

/// Quotient of a graph by type chain equality
///
/// Every group of vertices with element-wise equal type chains becomes one
/// representative carrying the group's size. Every input edge is rewritten onto
/// the representatives, so edges inside a group turn into self-edges and
/// parallel edges stay distinct. The input graph is left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeGraphSummarizer;

impl TypeGraphSummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize<G: Summarizable>(&self, input: &G) -> TypeGraph {
        let graph = input.digraph();
        let mut condensed = TypeGraph::new();

        // Representatives are created in first-seen order
        let mut representative: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());
        for idx in graph.node_indices() {
            let vertex = &graph[idx];
            let chain = vertex.type_chain();

            let rep = match condensed.chain_index.get(chain) {
                Some(&rep) => rep,
                None => {
                    let rep = condensed.graph.add_node(TypeVertex {
                        type_chain: chain.to_vec(),
                        count: 0,
                        root_count: 0,
                        members: Vec::new(),
                    });
                    condensed.chain_index.insert(chain.to_vec(), rep);
                    rep
                }
            };

            let merged = &mut condensed.graph[rep];
            merged.count += vertex.members().len();
            merged.root_count += vertex.root_count();
            merged.members.extend_from_slice(vertex.members());
            representative.push(rep);
        }

        for edge in graph.edge_references() {
            condensed.graph.add_edge(
                representative[edge.source().index()],
                representative[edge.target().index()],
                edge.weight().clone(),
            );
        }

        log::debug!(
            "Summarized {} vertices / {} edges into {} types",
            graph.node_count(),
            graph.edge_count(),
            condensed.node_count()
        );

        condensed
    }
}

/// Condense `graph` with the default summarizer
pub fn summarize<G: Summarizable>(graph: &G) -> TypeGraph {
    TypeGraphSummarizer::new().summarize(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chain(ids: &[u64]) -> TypeChain {
        ids.iter().map(|&id| TypeId::Class(id)).collect()
    }

    fn object_graph(vertices: &[(ObjectId, TypeChain)], edges: &[(ObjectId, ObjectId)]) -> ObjectGraph {
        let mut graph = ObjectGraph::new();
        for (id, type_chain) in vertices {
            graph.add_vertex(ObjectVertex::new(*id, VertexKind::Instance, type_chain.clone()));
        }
        for (i, (from, to)) in edges.iter().enumerate() {
            let from = graph.find_vertex(*from).unwrap();
            let to = graph.find_vertex(*to).unwrap();
            graph.add_edge(from, to, EdgeLabel::Index(i));
        }
        graph
    }

    #[test]
    fn test_same_chain_merges_into_self_edge() {
        let graph = object_graph(&[(1, chain(&[0xb, 0xa])), (2, chain(&[0xb, 0xa]))], &[(1, 2)]);
        let condensed = summarize(&graph);

        assert_eq!(condensed.node_count(), 1);
        assert_eq!(condensed.edge_count(), 1);
        let rep = condensed.find_chain(&chain(&[0xb, 0xa])).unwrap();
        assert_eq!(rep.count, 2);
        assert_eq!(rep.members, vec![1, 2]);
        assert_eq!(condensed.edges_between(&chain(&[0xb, 0xa]), &chain(&[0xb, 0xa])), 1);

        // input is untouched
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_chain_order_matters() {
        let graph = object_graph(&[(1, chain(&[0xb, 0xa])), (2, chain(&[0xa, 0xb])), (3, chain(&[0xb]))], &[]);
        assert_eq!(summarize(&graph).node_count(), 3);
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let graph = object_graph(
            &[(1, chain(&[0xa])), (2, chain(&[0xa])), (3, chain(&[0xc])), (4, chain(&[0xc]))],
            &[(1, 3), (2, 4), (1, 3), (3, 1)],
        );
        let condensed = summarize(&graph);

        assert_eq!(condensed.node_count(), 2);
        assert_eq!(condensed.edge_count(), 4);
        assert_eq!(condensed.edges_between(&chain(&[0xa]), &chain(&[0xc])), 3);
        assert_eq!(condensed.edges_between(&chain(&[0xc]), &chain(&[0xa])), 1);
    }

    #[test]
    fn test_root_counts_accumulate() {
        let mut graph = object_graph(&[(1, chain(&[0xa])), (2, chain(&[0xa])), (3, chain(&[0xa]))], &[]);
        graph.vertex_mut(1).unwrap().roots.push(RootKind::Unknown);
        graph.vertex_mut(3).unwrap().roots.push(RootKind::MonitorUsed);
        graph.vertex_mut(3).unwrap().roots.push(RootKind::StickyClass);

        let condensed = summarize(&graph);
        assert_eq!(condensed.find_chain(&chain(&[0xa])).unwrap().root_count, 2);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let graph = object_graph(
            &[(1, chain(&[0xa])), (2, chain(&[0xa])), (3, chain(&[0xc]))],
            &[(1, 2), (2, 3)],
        );
        let once = summarize(&graph);
        let twice = summarize(&once);

        assert_eq!(twice.node_count(), once.node_count());
        assert_eq!(twice.edge_count(), once.edge_count());
        for vertex in once.vertices() {
            assert_eq!(twice.find_chain(&vertex.type_chain), Some(vertex));
        }
    }
}
