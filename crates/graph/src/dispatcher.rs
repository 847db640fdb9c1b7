use crate::builder::GraphBuilder;
use crate::config::DecoderConfig;
use crate::error::Result;
use crate::record::Record;
use crate::summarizer::TypeGraphSummarizer;
use crate::symbols::{ClassInfo, SymbolTable};
use crate::types::{ObjectGraph, TypeGraph, TypeId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-kind record counters for one decode pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub records: usize,

    /// Records that carried no graph or symbol information
    pub ignored: usize,

    pub by_kind: BTreeMap<&'static str, usize>,
}

/// Routes decoded records, in stream order, to the symbol table or the graph builder
pub struct RecordDispatcher {
    config: DecoderConfig,
    symbols: SymbolTable,
    builder: GraphBuilder,
    stats: DispatchStats,
}

impl RecordDispatcher {
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: GraphBuilder::new(config.clone()),
            config,
            symbols: SymbolTable::new(),
            stats: DispatchStats::default(),
        })
    }

    /// Symbols visible to the next record
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Handle one record. A fatal error leaves the pass unusable; callers stop there.
    pub fn handle(&mut self, record: &Record) -> Result<()> {
        self.stats.records += 1;
        *self.stats.by_kind.entry(record.kind()).or_default() += 1;

        if let Some((object_id, kind)) = record.as_root() {
            self.builder.add_root(object_id, kind);
            return Ok(());
        }

        match record {
            Record::Utf8String { id, value } => self.symbols.put_string(*id, value.as_str())?,
            Record::LoadClass {
                class_object_id,
                name_string_id,
                ..
            } => self
                .symbols
                .put_class_name(*class_object_id, *name_string_id)?,
            Record::ClassDump {
                class_object_id,
                super_class_id,
                instance_size,
                instance_fields,
                ..
            } => self.symbols.put_class(ClassInfo::new(
                *class_object_id,
                *super_class_id,
                *instance_size,
                instance_fields.clone(),
            ))?,
            Record::InstanceDump {
                object_id,
                class_object_id,
                values,
                ..
            } => self
                .builder
                .add_instance(&self.symbols, *object_id, *class_object_id, values)?,
            Record::ObjectArrayDump {
                object_id,
                element_class_id,
                elements,
                ..
            } => self
                .builder
                .add_object_array(*object_id, *element_class_id, elements)?,
            Record::PrimitiveArrayDump {
                object_id,
                element_type,
                elements,
                ..
            } => self
                .builder
                .add_primitive_array(*object_id, *element_type, elements)?,
            Record::Header {
                format, id_size, ..
            } => {
                log::debug!("Snapshot format {format}, {id_size}-byte ids");
                self.stats.ignored += 1;
            }
            other => {
                log::trace!("Ignoring {} record", other.kind());
                self.stats.ignored += 1;
            }
        }
        Ok(())
    }

    /// End the pass and hand the graph over
    pub fn finish(self) -> HeapSnapshot {
        let graph = self.builder.finish(&self.symbols);
        log::debug!(
            "Decoded {} records ({} ignored), {} strings, {} classes",
            self.stats.records,
            self.stats.ignored,
            self.symbols.string_count(),
            self.symbols.class_count()
        );
        HeapSnapshot {
            config: self.config,
            symbols: self.symbols,
            graph,
            stats: self.stats,
        }
    }
}

/// Run a complete forward pass over `records`
pub fn decode<I>(records: I, config: DecoderConfig) -> Result<HeapSnapshot>
where
    I: IntoIterator<Item = Record>,
{
    let mut dispatcher = RecordDispatcher::new(config)?;
    for (index, record) in records.into_iter().enumerate() {
        dispatcher.handle(&record).map_err(|err| {
            log::error!("Decode aborted at record #{index} ({}): {err}", record.kind());
            err
        })?;
    }
    Ok(dispatcher.finish())
}

/// Result of a finished decode pass
#[derive(Debug, Clone)]
pub struct HeapSnapshot {
    pub config: DecoderConfig,
    pub symbols: SymbolTable,
    pub graph: ObjectGraph,
    pub stats: DispatchStats,
}

impl HeapSnapshot {
    pub fn summarize(&self) -> TypeGraph {
        TypeGraphSummarizer::new().summarize(&self.graph)
    }

    /// Readable names for a type chain
    pub fn type_names(&self, chain: &[TypeId]) -> Vec<String> {
        chain
            .iter()
            .map(|ty| self.symbols.type_name(ty, &self.config.unknown_name))
            .collect()
    }
}
