use crate::record::{BasicType, Value};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type StringId = u64;
pub type ClassId = u64;
pub type ObjectId = u64;

/// One element of a type chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TypeId {
    /// Instance class or one of its ancestors
    Class(ClassId),

    /// Array of references to the given element class
    ObjectArray(ClassId),

    /// Array of primitive elements
    PrimitiveArray(BasicType),

    /// Reference target that is a dumped class object
    ClassObject,

    /// Reference target that was never dumped
    Unknown,
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(id) => write!(f, "class@{id:#x}"),
            Self::ObjectArray(id) => write!(f, "class@{id:#x}[]"),
            Self::PrimitiveArray(ty) => write!(f, "{ty}[]"),
            Self::ClassObject => write!(f, "<class>"),
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// Declared class first, then every ancestor up to the root
pub type TypeChain = Vec<TypeId>;

/// Why an edge exists: the field or the array slot holding the reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLabel {
    Field(String),
    Index(usize),
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// GC root marker, with the payload of the root record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RootKind {
    Unknown,
    JniGlobal { jni_global_ref_id: u64 },
    JniLocal { thread_serial: u32, frame: i32 },
    JavaFrame { thread_serial: u32, frame: i32 },
    NativeStack { thread_serial: u32 },
    StickyClass,
    ThreadBlock { thread_serial: u32 },
    MonitorUsed,
    ThreadObject { thread_serial: u32, stack_trace_serial: u32 },
}

/// Non-fatal problem recorded on a vertex during decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum VertexIssue {
    /// Ancestor metadata missing; fields hold the prefix resolved before it
    UnresolvedClass { class_id: ClassId },

    /// Field name string missing; the placeholder name was used
    UnresolvedReference { string_id: StringId },

    /// Only recorded under the best-effort field count policy
    FieldCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub name: String,
    pub value: Value,
}

impl ResolvedField {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum VertexKind {
    Instance,
    ObjectArray { length: usize },
    PrimitiveArray { length: usize },
    /// Stand-in for a reference target that was never dumped
    Placeholder,
}

/// One decoded heap object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectVertex {
    pub object_id: ObjectId,

    pub kind: VertexKind,

    /// Grouping key for summarization
    pub type_chain: TypeChain,

    /// Declared class fields first, then ancestors'
    #[serde(default)]
    pub fields: Vec<ResolvedField>,

    #[serde(default)]
    pub roots: Vec<RootKind>,

    #[serde(default)]
    pub issues: Vec<VertexIssue>,
}

impl ObjectVertex {
    pub fn new(object_id: ObjectId, kind: VertexKind, type_chain: TypeChain) -> Self {
        Self {
            object_id,
            kind,
            type_chain,
            fields: Vec::new(),
            roots: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn is_root(&self) -> bool {
        !self.roots.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

/// Object reference graph built by the decode pass
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    /// Directed graph (object -> referenced object, labeled by field or index)
    pub graph: DiGraph<ObjectVertex, EdgeLabel>,

    /// Object id -> NodeIndex mapping for fast lookup
    pub object_index: HashMap<ObjectId, NodeIndex>,

    /// Roots whose object never became a vertex
    pub unattached_roots: Vec<(ObjectId, RootKind)>,

    /// Edges dropped because their target was never dumped
    pub dropped_edges: usize,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add vertex to graph; the caller guarantees the object id is new
    pub(crate) fn add_vertex(&mut self, vertex: ObjectVertex) -> NodeIndex {
        let object_id = vertex.object_id;
        let idx = self.graph.add_node(vertex);
        self.object_index.insert(object_id, idx);
        idx
    }

    pub(crate) fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, label: EdgeLabel) {
        self.graph.add_edge(from, to, label);
    }

    pub fn find_vertex(&self, object_id: ObjectId) -> Option<NodeIndex> {
        self.object_index.get(&object_id).copied()
    }

    pub fn vertex(&self, object_id: ObjectId) -> Option<&ObjectVertex> {
        self.find_vertex(object_id)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    pub(crate) fn vertex_mut(&mut self, object_id: ObjectId) -> Option<&mut ObjectVertex> {
        let idx = self.find_vertex(object_id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &ObjectVertex> {
        self.graph.node_weights()
    }

    /// Outgoing references of an object, in insertion order
    pub fn references(&self, object_id: ObjectId) -> Vec<(ObjectId, &EdgeLabel)> {
        use petgraph::visit::EdgeRef;

        let Some(idx) = self.find_vertex(object_id) else {
            return Vec::new();
        };
        let mut refs: Vec<_> = self
            .graph
            .edges(idx)
            .map(|e| (e.id(), self.graph[e.target()].object_id, e.weight()))
            .collect();
        // petgraph walks outgoing edges newest first
        refs.sort_by_key(|(edge, _, _)| *edge);
        refs.into_iter().map(|(_, target, label)| (target, label)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            vertices: self.node_count(),
            edges: self.edge_count(),
            dropped_edges: self.dropped_edges,
            unattached_roots: self.unattached_roots.len(),
            ..GraphStats::default()
        };
        for vertex in self.vertices() {
            if vertex.is_degraded() {
                stats.degraded += 1;
            }
            if vertex.is_root() {
                stats.roots += 1;
            }
            if vertex.kind == VertexKind::Placeholder {
                stats.placeholders += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub vertices: usize,
    pub edges: usize,
    pub degraded: usize,
    pub roots: usize,
    pub placeholders: usize,
    pub dropped_edges: usize,
    pub unattached_roots: usize,
}

/// Representative vertex standing in for every object sharing a type chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVertex {
    pub type_chain: TypeChain,

    /// Number of original objects merged into this vertex
    pub count: usize,

    /// How many of those objects are GC roots
    pub root_count: usize,

    /// Object ids of the merged objects, in graph order
    pub members: Vec<ObjectId>,
}

/// Condensed graph: one vertex per distinct type chain, edges kept with multiplicity
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    pub graph: DiGraph<TypeVertex, EdgeLabel>,

    /// Type chain -> representative vertex
    pub chain_index: HashMap<TypeChain, NodeIndex>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_chain(&self, chain: &[TypeId]) -> Option<&TypeVertex> {
        self.chain_index
            .get(chain)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &TypeVertex> {
        self.graph.node_weights()
    }

    /// Sum of merged object counts over all representatives
    pub fn total_count(&self) -> usize {
        self.vertices().map(|v| v.count).sum()
    }

    /// Number of edges between two representatives (self-edges when equal)
    pub fn edges_between(&self, from: &[TypeId], to: &[TypeId]) -> usize {
        match (self.chain_index.get(from), self.chain_index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.edges_connecting(a, b).count(),
            _ => 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
