use thiserror::Error;

use crate::types::{ClassId, ObjectId, StringId};

pub type Result<T> = std::result::Result<T, HeapGraphError>;

/// Which write-once table a duplicate binding was attempted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    String,
    Class,
    ClassName,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Class => write!(f, "class"),
            Self::ClassName => write!(f, "class name"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeapGraphError {
    /// A write-once symbol was bound again to a different value (fatal)
    #[error("Duplicate {kind} id {id:#x} bound to a different value")]
    DuplicateId { kind: SymbolKind, id: u64 },

    /// String id not present at lookup time (callers substitute a placeholder)
    #[error("Unresolved string reference {0:#x}")]
    UnresolvedReference(StringId),

    /// Class metadata not present at lookup time
    #[error("Unresolved class {0:#x}")]
    UnresolvedClass(ClassId),

    /// Flat instance values disagree with the class chain's declared fields (fatal)
    #[error(
        "Field count mismatch for object {object_id:#x} of class {class_id:#x}: \
         class chain declares {expected} fields, instance carries {actual} values"
    )]
    FieldCountMismatch {
        object_id: ObjectId,
        class_id: ClassId,
        expected: usize,
        actual: usize,
    },

    /// A superclass chain loops back on itself (fatal)
    #[error("Cyclic class hierarchy through class {0:#x}")]
    CyclicHierarchy(ClassId),

    /// The same object id was dumped twice (fatal)
    #[error("Duplicate object {0:#x} in heap dump")]
    DuplicateObject(ObjectId),

    #[error("Invalid basic type code: {0}")]
    InvalidBasicType(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HeapGraphError {
    pub fn duplicate(kind: SymbolKind, id: u64) -> Self {
        Self::DuplicateId { kind, id }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Fatal errors abort the decode of the current stream
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId { .. }
                | Self::FieldCountMismatch { .. }
                | Self::CyclicHierarchy(_)
                | Self::DuplicateObject(_)
                | Self::InvalidBasicType(_)
                | Self::InvalidConfig(_)
        )
    }
}
