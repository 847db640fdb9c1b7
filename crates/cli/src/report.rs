use heapvis_graph::{
    DispatchStats, GraphStats, HeapSnapshot, ObjectId, ObjectVertex, TypeChain, TypeGraph,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TypeGraphReport {
    pub objects: usize,
    pub types: Vec<TypeNodeReport>,
    pub edges: Vec<EdgeReport<usize>>,
    pub graph: GraphStats,
    pub records: DispatchStats,
}

#[derive(Debug, Serialize)]
pub struct TypeNodeReport {
    pub id: usize,
    /// Readable type chain, declared class first
    pub names: Vec<String>,
    pub chain: TypeChain,
    pub count: usize,
    pub root_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EdgeReport<Id> {
    pub source: Id,
    pub target: Id,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ObjectGraphReport<'a> {
    pub objects: Vec<ObjectReport<'a>>,
    pub edges: Vec<EdgeReport<ObjectId>>,
    pub graph: GraphStats,
    pub records: &'a DispatchStats,
}

#[derive(Debug, Serialize)]
pub struct ObjectReport<'a> {
    pub names: Vec<String>,
    #[serde(flatten)]
    pub vertex: &'a ObjectVertex,
}

#[derive(Debug, Serialize)]
pub struct StatsReport<'a> {
    pub strings: usize,
    pub classes: usize,
    pub class_names: usize,
    pub graph: GraphStats,
    pub types: usize,
    pub records: &'a DispatchStats,
}

pub fn type_graph_report(snapshot: &HeapSnapshot, condensed: &TypeGraph) -> TypeGraphReport {
    let graph = &condensed.graph;
    let types = graph
        .node_indices()
        .map(|idx| {
            let vertex = &graph[idx];
            TypeNodeReport {
                id: idx.index(),
                names: snapshot.type_names(&vertex.type_chain),
                chain: vertex.type_chain.clone(),
                count: vertex.count,
                root_count: vertex.root_count,
            }
        })
        .collect();

    let edges = graph
        .raw_edges()
        .iter()
        .map(|edge| EdgeReport {
            source: edge.source().index(),
            target: edge.target().index(),
            label: edge.weight.to_string(),
        })
        .collect();

    TypeGraphReport {
        objects: condensed.total_count(),
        types,
        edges,
        graph: snapshot.graph.stats(),
        records: snapshot.stats.clone(),
    }
}

pub fn object_graph_report(snapshot: &HeapSnapshot) -> ObjectGraphReport<'_> {
    let graph = &snapshot.graph.graph;
    let objects = graph
        .node_weights()
        .map(|vertex| ObjectReport {
            names: snapshot.type_names(&vertex.type_chain),
            vertex,
        })
        .collect();

    let edges = graph
        .raw_edges()
        .iter()
        .map(|edge| EdgeReport {
            source: graph[edge.source()].object_id,
            target: graph[edge.target()].object_id,
            label: edge.weight.to_string(),
        })
        .collect();

    ObjectGraphReport {
        objects,
        edges,
        graph: snapshot.graph.stats(),
        records: &snapshot.stats,
    }
}

pub fn stats_report<'a>(snapshot: &'a HeapSnapshot, condensed: &TypeGraph) -> StatsReport<'a> {
    StatsReport {
        strings: snapshot.symbols.string_count(),
        classes: snapshot.symbols.class_count(),
        class_names: snapshot.symbols.class_name_count(),
        graph: snapshot.graph.stats(),
        types: condensed.node_count(),
        records: &snapshot.stats,
    }
}
