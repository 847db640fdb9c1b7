//! # Heapvis Graph
//!
//! Object-reference graphs reconstructed from decoded heap-snapshot records,
//! condensed into type graphs for visualization.
//!
//! ## Features
//!
//! - **Progressive symbol resolution** - strings and class layouts become visible in stream order
//! - **Field reconstruction** - flat instance values named through the class hierarchy
//! - **Object graph** - one vertex per object, one edge per non-null reference
//! - **Type graph** - objects with identical type chains merged, edges kept with multiplicity
//!
//! ## Architecture
//!
//! ```text
//! Record stream (already tokenized)
//!     │
//!     ├──> Record Dispatcher (single forward pass)
//!     │      ├─ utf8_string / load_class / class_dump ──> Symbol Table
//!     │      └─ instance / array dumps, GC roots ──────> Graph Builder
//!     │                                                    └─ Field Resolver
//!     │
//!     ├──> Object Graph (petgraph)
//!     │      ├─ Nodes: objects (type chain, fields, roots)
//!     │      └─ Edges: references labeled by field name or array index
//!     │
//!     └──> Type Graph Summarizer
//!            └─ Nodes: one per distinct type chain, with object counts
//! ```
//!
//! ## Example
//!
//! ```rust
//! use heapvis_graph::{decode, BasicType, DecoderConfig, FieldDecl, Record, Value};
//!
//! let records = vec![
//!     Record::Utf8String { id: 1, value: "next".to_string() },
//!     Record::ClassDump {
//!         class_object_id: 0x10,
//!         stack_trace_serial: 0,
//!         super_class_id: 0,
//!         class_loader_id: 0,
//!         instance_size: 8,
//!         constants: vec![],
//!         static_fields: vec![],
//!         instance_fields: vec![FieldDecl::new(1, BasicType::Object)],
//!     },
//!     Record::InstanceDump {
//!         object_id: 0xa,
//!         stack_trace_serial: 0,
//!         class_object_id: 0x10,
//!         values: vec![Value::Object(0xb)],
//!     },
//!     Record::InstanceDump {
//!         object_id: 0xb,
//!         stack_trace_serial: 0,
//!         class_object_id: 0x10,
//!         values: vec![Value::Object(0)],
//!     },
//! ];
//!
//! let snapshot = decode(records, DecoderConfig::default()).unwrap();
//! let types = snapshot.summarize();
//! assert_eq!(types.node_count(), 1);
//! assert_eq!(types.edge_count(), 1);
//! ```

mod builder;
mod config;
mod dispatcher;
mod error;
mod record;
mod resolver;
mod summarizer;
mod symbols;
mod types;

pub use builder::GraphBuilder;
pub use config::{DecoderConfig, FieldCountPolicy};
pub use dispatcher::{decode, DispatchStats, HeapSnapshot, RecordDispatcher};
pub use error::{HeapGraphError, Result, SymbolKind};
pub use record::{
    AllocSite, BasicType, ConstantPoolEntry, CpuSample, FieldDecl, Record, StaticField, Value,
};
pub use resolver::{FieldResolver, ResolvedFields};
pub use summarizer::{summarize, Summarizable, TypeGraphSummarizer, TypeKeyed};
pub use symbols::{ClassInfo, SymbolTable};
pub use types::{
    ClassId, EdgeLabel, GraphStats, ObjectGraph, ObjectId, ObjectVertex, ResolvedField,
    RootKind, StringId, TypeChain, TypeGraph, TypeId, TypeVertex, VertexIssue, VertexKind,
};
