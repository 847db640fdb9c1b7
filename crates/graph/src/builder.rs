use crate::config::DecoderConfig;
use crate::error::{HeapGraphError, Result};
use crate::record::{BasicType, Value};
use crate::resolver::FieldResolver;
use crate::symbols::SymbolTable;
use crate::types::*;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Reference seen during decode; the target may not be dumped yet
#[derive(Debug, Clone)]
struct PendingEdge {
    source: NodeIndex,
    target: ObjectId,
    label: EdgeLabel,
}

/// Build the object graph from object-bearing records, in stream order
pub struct GraphBuilder {
    config: DecoderConfig,
    graph: ObjectGraph,
    pending_edges: Vec<PendingEdge>,
    pending_roots: HashMap<ObjectId, Vec<RootKind>>,
}

impl GraphBuilder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            graph: ObjectGraph::new(),
            pending_edges: Vec::new(),
            pending_roots: HashMap::new(),
        }
    }

    /// Vertices created so far (edges appear only after `finish`)
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Resolve an instance's fields and add it with one edge per non-null reference
    pub fn add_instance(
        &mut self,
        symbols: &SymbolTable,
        object_id: ObjectId,
        declared_class_id: ClassId,
        values: &[Value],
    ) -> Result<()> {
        self.ensure_new(object_id)?;

        let resolved = FieldResolver::new(symbols, &self.config).resolve_fields(
            object_id,
            declared_class_id,
            values,
        )?;

        let mut vertex = ObjectVertex::new(object_id, VertexKind::Instance, resolved.type_chain);
        vertex.fields = resolved.fields;
        vertex.issues = resolved.issues;

        let references: Vec<(ObjectId, EdgeLabel)> = vertex
            .fields
            .iter()
            .filter_map(|f| {
                f.value
                    .as_reference()
                    .map(|target| (target, EdgeLabel::Field(f.name.clone())))
            })
            .collect();

        if !self.config.keep_field_values {
            vertex.fields.clear();
        }

        let idx = self.insert(vertex);
        self.queue_edges(idx, references);
        Ok(())
    }

    /// Add an object array; element order survives as the edge index label
    pub fn add_object_array(
        &mut self,
        object_id: ObjectId,
        element_class_id: ClassId,
        elements: &[ObjectId],
    ) -> Result<()> {
        self.ensure_new(object_id)?;

        let vertex = ObjectVertex::new(
            object_id,
            VertexKind::ObjectArray {
                length: elements.len(),
            },
            vec![TypeId::ObjectArray(element_class_id)],
        );
        let references = elements
            .iter()
            .enumerate()
            .filter(|(_, target)| **target != 0)
            .map(|(i, &target)| (target, EdgeLabel::Index(i)))
            .collect();

        let idx = self.insert(vertex);
        self.queue_edges(idx, references);
        Ok(())
    }

    /// Add a primitive array; its elements are never references
    pub fn add_primitive_array(
        &mut self,
        object_id: ObjectId,
        element_type: BasicType,
        elements: &[Value],
    ) -> Result<()> {
        self.ensure_new(object_id)?;

        let vertex = ObjectVertex::new(
            object_id,
            VertexKind::PrimitiveArray {
                length: elements.len(),
            },
            vec![TypeId::PrimitiveArray(element_type)],
        );
        self.insert(vertex);
        Ok(())
    }

    /// Mark an object as a GC root, now or once it is dumped
    pub fn add_root(&mut self, object_id: ObjectId, kind: RootKind) {
        match self.graph.vertex_mut(object_id) {
            Some(vertex) => vertex.roots.push(kind),
            None => self.pending_roots.entry(object_id).or_default().push(kind),
        }
    }

    /// Materialize buffered edges and leftover roots
    pub fn finish(mut self, symbols: &SymbolTable) -> ObjectGraph {
        let pending_edges = std::mem::take(&mut self.pending_edges);
        for edge in pending_edges {
            let target = match self.graph.find_vertex(edge.target) {
                Some(idx) => idx,
                None if self.config.materialize_dangling => {
                    self.insert_placeholder(symbols, edge.target)
                }
                None => {
                    self.graph.dropped_edges += 1;
                    continue;
                }
            };
            self.graph.add_edge(edge.source, target, edge.label);
        }

        let mut leftover: Vec<_> = self.pending_roots.drain().collect();
        leftover.sort_by_key(|(id, _)| *id);
        for (object_id, roots) in leftover {
            if self.config.materialize_dangling {
                let idx = self.insert_placeholder(symbols, object_id);
                self.graph.graph[idx].roots.extend(roots);
            } else {
                self.graph
                    .unattached_roots
                    .extend(roots.into_iter().map(|kind| (object_id, kind)));
            }
        }

        let stats = self.graph.stats();
        if stats.dropped_edges > 0 {
            log::warn!(
                "Dropped {} edges to objects missing from the dump",
                stats.dropped_edges
            );
        }
        if stats.degraded > 0 {
            log::warn!("{} objects decoded with missing metadata", stats.degraded);
        }
        log::info!(
            "Built object graph: {} vertices, {} edges, {} roots, {} placeholders",
            stats.vertices,
            stats.edges,
            stats.roots,
            stats.placeholders
        );

        self.graph
    }

    fn ensure_new(&self, object_id: ObjectId) -> Result<()> {
        if self.graph.find_vertex(object_id).is_some() {
            return Err(HeapGraphError::DuplicateObject(object_id));
        }
        Ok(())
    }

    fn insert(&mut self, mut vertex: ObjectVertex) -> NodeIndex {
        if let Some(roots) = self.pending_roots.remove(&vertex.object_id) {
            vertex.roots.extend(roots);
        }
        self.graph.add_vertex(vertex)
    }

    fn queue_edges(&mut self, source: NodeIndex, references: Vec<(ObjectId, EdgeLabel)>) {
        self.pending_edges
            .extend(references.into_iter().map(|(target, label)| PendingEdge {
                source,
                target,
                label,
            }));
    }

    fn insert_placeholder(&mut self, symbols: &SymbolTable, object_id: ObjectId) -> NodeIndex {
        if let Some(idx) = self.graph.find_vertex(object_id) {
            return idx;
        }
        let ty = if symbols.is_class(object_id) {
            TypeId::ClassObject
        } else {
            TypeId::Unknown
        };
        log::debug!("Placeholder {ty} for object {object_id:#x}");
        self.graph
            .add_vertex(ObjectVertex::new(object_id, VertexKind::Placeholder, vec![ty]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldDecl;
    use crate::symbols::ClassInfo;

    fn node_symbols() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        symbols.put_string(1, "next").unwrap();
        symbols.put_string(2, "size").unwrap();
        symbols
            .put_class(ClassInfo::new(
                0x10,
                0,
                12,
                vec![
                    FieldDecl::new(1, BasicType::Object),
                    FieldDecl::new(2, BasicType::Int),
                ],
            ))
            .unwrap();
        symbols
    }

    #[test]
    fn test_instance_edges_follow_references() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::default());
        builder
            .add_instance(&symbols, 0xa, 0x10, &[Value::Object(0xb), Value::Int(1)])
            .unwrap();
        builder
            .add_instance(&symbols, 0xb, 0x10, &[Value::Object(0), Value::Int(2)])
            .unwrap();
        let graph = builder.finish(&symbols);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let refs = graph.references(0xa);
        assert_eq!(refs, vec![(0xb, &EdgeLabel::Field("next".to_string()))]);
        assert_eq!(graph.vertex(0xb).unwrap().field("size"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_object_array_keeps_duplicates_and_order() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::default());
        builder.add_object_array(0x1, 0x10, &[0xa, 0, 0xa]).unwrap();
        builder
            .add_instance(&symbols, 0xa, 0x10, &[Value::Object(0), Value::Int(0)])
            .unwrap();
        let graph = builder.finish(&symbols);

        assert_eq!(
            graph.references(0x1),
            vec![(0xa, &EdgeLabel::Index(0)), (0xa, &EdgeLabel::Index(2))]
        );
        assert_eq!(
            graph.vertex(0x1).unwrap().kind,
            VertexKind::ObjectArray { length: 3 }
        );
    }

    #[test]
    fn test_roots_attach_before_and_after_dump() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::default());
        builder.add_root(0x5, RootKind::Unknown);
        builder
            .add_primitive_array(0x5, BasicType::Byte, &[Value::Byte(1), Value::Byte(2)])
            .unwrap();
        builder.add_root(0x5, RootKind::MonitorUsed);
        let graph = builder.finish(&symbols);

        let vertex = graph.vertex(0x5).unwrap();
        assert_eq!(vertex.roots, vec![RootKind::Unknown, RootKind::MonitorUsed]);
        assert_eq!(vertex.type_chain, vec![TypeId::PrimitiveArray(BasicType::Byte)]);
        assert_eq!(graph.stats().roots, 1);
    }

    #[test]
    fn test_dangling_targets_become_placeholders() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::default());
        builder.add_object_array(0x1, 0x10, &[0x10, 0x99]).unwrap();
        builder.add_root(0x77, RootKind::StickyClass);
        let graph = builder.finish(&symbols);

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.vertex(0x10).unwrap().type_chain, vec![TypeId::ClassObject]);
        assert_eq!(graph.vertex(0x99).unwrap().type_chain, vec![TypeId::Unknown]);
        assert_eq!(graph.vertex(0x77).unwrap().roots, vec![RootKind::StickyClass]);
        assert_eq!(graph.stats().placeholders, 3);
    }

    #[test]
    fn test_dangling_targets_dropped_when_disabled() {
        let symbols = node_symbols();
        let config = DecoderConfig {
            materialize_dangling: false,
            ..Default::default()
        };
        let mut builder = GraphBuilder::new(config);
        builder.add_object_array(0x1, 0x10, &[0x99]).unwrap();
        builder.add_root(0x77, RootKind::StickyClass);
        let graph = builder.finish(&symbols);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.dropped_edges, 1);
        assert_eq!(graph.unattached_roots, vec![(0x77, RootKind::StickyClass)]);
    }

    #[test]
    fn test_duplicate_object_is_fatal() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::default());
        builder.add_primitive_array(0x5, BasicType::Int, &[]).unwrap();
        assert_eq!(
            builder.add_object_array(0x5, 0x10, &[]),
            Err(HeapGraphError::DuplicateObject(0x5))
        );
    }

    #[test]
    fn test_field_values_can_be_dropped() {
        let symbols = node_symbols();
        let mut builder = GraphBuilder::new(DecoderConfig::for_summary());
        builder
            .add_instance(&symbols, 0xa, 0x10, &[Value::Object(0xa), Value::Int(1)])
            .unwrap();
        let graph = builder.finish(&symbols);

        assert!(graph.vertex(0xa).unwrap().fields.is_empty());
        assert_eq!(graph.edge_count(), 1);
    }
}
