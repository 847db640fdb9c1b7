use crate::error::{HeapGraphError, Result};
use crate::types::{ClassId, ObjectId, RootKind, StringId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element/field type tag of the heap-snapshot format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicType {
    Object,
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl BasicType {
    /// Wire code used by the snapshot format
    pub const fn code(self) -> u8 {
        match self {
            Self::Object => 2,
            Self::Boolean => 4,
            Self::Char => 5,
            Self::Float => 6,
            Self::Double => 7,
            Self::Byte => 8,
            Self::Short => 9,
            Self::Int => 10,
            Self::Long => 11,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Float => "float",
            Self::Double => "double",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
        }
    }
}

impl TryFrom<u8> for BasicType {
    type Error = HeapGraphError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            2 => Self::Object,
            4 => Self::Boolean,
            5 => Self::Char,
            6 => Self::Float,
            7 => Self::Double,
            8 => Self::Byte,
            9 => Self::Short,
            10 => Self::Int,
            11 => Self::Long,
            other => return Err(HeapGraphError::InvalidBasicType(other)),
        })
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field, static or array element value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Object reference; id 0 is null
    Object(ObjectId),
    Boolean(bool),
    Char(u16),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl Value {
    pub const fn basic_type(&self) -> BasicType {
        match self {
            Self::Object(_) => BasicType::Object,
            Self::Boolean(_) => BasicType::Boolean,
            Self::Char(_) => BasicType::Char,
            Self::Float(_) => BasicType::Float,
            Self::Double(_) => BasicType::Double,
            Self::Byte(_) => BasicType::Byte,
            Self::Short(_) => BasicType::Short,
            Self::Int(_) => BasicType::Int,
            Self::Long(_) => BasicType::Long,
        }
    }

    /// Target of a non-null object reference
    pub const fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) if *id != 0 => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(0) => write!(f, "null"),
            Self::Object(id) => write!(f, "@{id:#x}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "{c:?}"),
                None => write!(f, "\\u{v:04x}"),
            },
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
        }
    }
}

/// Instance field declaration of a class dump
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name_string_id: StringId,
    #[serde(rename = "type")]
    pub declared_type: BasicType,
}

impl FieldDecl {
    pub fn new(name_string_id: StringId, declared_type: BasicType) -> Self {
        Self {
            name_string_id,
            declared_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticField {
    pub name_string_id: StringId,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantPoolEntry {
    pub index: u16,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocSite {
    /// `None` when the site does not allocate arrays
    pub array_of: Option<BasicType>,
    pub class_serial: u32,
    pub stack_trace_serial: u32,
    pub live_bytes: u32,
    pub live_instances: u32,
    pub bytes_allocated: u32,
    pub instances_allocated: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSample {
    pub samples: u32,
    pub stack_trace_serial: u32,
}

/// One decoded unit of the heap-snapshot stream, as delivered by the upstream tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Header {
        format: String,
        id_size: u32,
        timestamp_ms: u64,
    },
    Utf8String {
        id: StringId,
        value: String,
    },
    LoadClass {
        class_serial: u32,
        class_object_id: ClassId,
        stack_trace_serial: u32,
        name_string_id: StringId,
    },
    UnloadClass {
        class_serial: u32,
    },
    StackFrame {
        frame_id: u64,
        method_name_string_id: StringId,
        method_signature_string_id: StringId,
        source_file_string_id: StringId,
        class_serial: u32,
        /// Line number, or 0 / -1 / -2 / -3 for none / unknown / compiled / native
        location: i32,
    },
    StackTrace {
        stack_trace_serial: u32,
        thread_serial: u32,
        frame_ids: Vec<u64>,
    },
    AllocSites {
        flags: u16,
        cutoff_ratio: f32,
        total_live_bytes: u32,
        total_live_instances: u32,
        total_bytes_allocated: u64,
        total_instances_allocated: u64,
        sites: Vec<AllocSite>,
    },
    HeapSummary {
        total_live_bytes: u32,
        total_live_instances: u32,
        total_bytes_allocated: u64,
        total_instances_allocated: u64,
    },
    StartThread {
        thread_serial: u32,
        thread_object_id: ObjectId,
        stack_trace_serial: u32,
        name_string_id: StringId,
        group_name_string_id: StringId,
        parent_group_name_string_id: StringId,
    },
    EndThread {
        thread_serial: u32,
    },
    HeapDump,
    HeapDumpSegment,
    HeapDumpEnd,
    CpuSamples {
        total_samples: u32,
        samples: Vec<CpuSample>,
    },
    ControlSettings {
        flags: u32,
        stack_trace_depth: u16,
    },

    RootUnknown {
        object_id: ObjectId,
    },
    RootJniGlobal {
        object_id: ObjectId,
        jni_global_ref_id: u64,
    },
    RootJniLocal {
        object_id: ObjectId,
        thread_serial: u32,
        frame: i32,
    },
    RootJavaFrame {
        object_id: ObjectId,
        thread_serial: u32,
        frame: i32,
    },
    RootNativeStack {
        object_id: ObjectId,
        thread_serial: u32,
    },
    RootStickyClass {
        object_id: ObjectId,
    },
    RootThreadBlock {
        object_id: ObjectId,
        thread_serial: u32,
    },
    RootMonitorUsed {
        object_id: ObjectId,
    },
    RootThreadObject {
        object_id: ObjectId,
        thread_serial: u32,
        stack_trace_serial: u32,
    },
    ClassDump {
        class_object_id: ClassId,
        stack_trace_serial: u32,
        /// 0 for the root of the hierarchy
        super_class_id: ClassId,
        class_loader_id: ObjectId,
        instance_size: u32,
        #[serde(default)]
        constants: Vec<ConstantPoolEntry>,
        #[serde(default)]
        static_fields: Vec<StaticField>,
        #[serde(default)]
        instance_fields: Vec<FieldDecl>,
    },
    InstanceDump {
        object_id: ObjectId,
        stack_trace_serial: u32,
        class_object_id: ClassId,
        #[serde(default)]
        values: Vec<Value>,
    },
    ObjectArrayDump {
        object_id: ObjectId,
        stack_trace_serial: u32,
        element_class_id: ClassId,
        #[serde(default)]
        elements: Vec<ObjectId>,
    },
    PrimitiveArrayDump {
        object_id: ObjectId,
        stack_trace_serial: u32,
        element_type: BasicType,
        #[serde(default)]
        elements: Vec<Value>,
    },
}

impl Record {
    /// Stable snake_case name of the record kind
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Header { .. } => "header",
            Self::Utf8String { .. } => "utf8_string",
            Self::LoadClass { .. } => "load_class",
            Self::UnloadClass { .. } => "unload_class",
            Self::StackFrame { .. } => "stack_frame",
            Self::StackTrace { .. } => "stack_trace",
            Self::AllocSites { .. } => "alloc_sites",
            Self::HeapSummary { .. } => "heap_summary",
            Self::StartThread { .. } => "start_thread",
            Self::EndThread { .. } => "end_thread",
            Self::HeapDump => "heap_dump",
            Self::HeapDumpSegment => "heap_dump_segment",
            Self::HeapDumpEnd => "heap_dump_end",
            Self::CpuSamples { .. } => "cpu_samples",
            Self::ControlSettings { .. } => "control_settings",
            Self::RootUnknown { .. } => "root_unknown",
            Self::RootJniGlobal { .. } => "root_jni_global",
            Self::RootJniLocal { .. } => "root_jni_local",
            Self::RootJavaFrame { .. } => "root_java_frame",
            Self::RootNativeStack { .. } => "root_native_stack",
            Self::RootStickyClass { .. } => "root_sticky_class",
            Self::RootThreadBlock { .. } => "root_thread_block",
            Self::RootMonitorUsed { .. } => "root_monitor_used",
            Self::RootThreadObject { .. } => "root_thread_object",
            Self::ClassDump { .. } => "class_dump",
            Self::InstanceDump { .. } => "instance_dump",
            Self::ObjectArrayDump { .. } => "object_array_dump",
            Self::PrimitiveArrayDump { .. } => "primitive_array_dump",
        }
    }

    /// Object id and root kind for GC-root records
    pub fn as_root(&self) -> Option<(ObjectId, RootKind)> {
        let root = match *self {
            Self::RootUnknown { object_id } => (object_id, RootKind::Unknown),
            Self::RootJniGlobal {
                object_id,
                jni_global_ref_id,
            } => (object_id, RootKind::JniGlobal { jni_global_ref_id }),
            Self::RootJniLocal {
                object_id,
                thread_serial,
                frame,
            } => (
                object_id,
                RootKind::JniLocal {
                    thread_serial,
                    frame,
                },
            ),
            Self::RootJavaFrame {
                object_id,
                thread_serial,
                frame,
            } => (
                object_id,
                RootKind::JavaFrame {
                    thread_serial,
                    frame,
                },
            ),
            Self::RootNativeStack {
                object_id,
                thread_serial,
            } => (object_id, RootKind::NativeStack { thread_serial }),
            Self::RootStickyClass { object_id } => (object_id, RootKind::StickyClass),
            Self::RootThreadBlock {
                object_id,
                thread_serial,
            } => (object_id, RootKind::ThreadBlock { thread_serial }),
            Self::RootMonitorUsed { object_id } => (object_id, RootKind::MonitorUsed),
            Self::RootThreadObject {
                object_id,
                thread_serial,
                stack_trace_serial,
            } => (
                object_id,
                RootKind::ThreadObject {
                    thread_serial,
                    stack_trace_serial,
                },
            ),
            _ => return None,
        };
        Some(root)
    }
}
