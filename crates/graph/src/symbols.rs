use crate::error::{HeapGraphError, Result, SymbolKind};
use crate::record::FieldDecl;
use crate::types::{ClassId, StringId, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Class layout captured from a class dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub class_id: ClassId,

    /// 0 when the class has no ancestor
    pub super_class_id: ClassId,

    pub instance_size: u32,

    /// The class's own instance fields, in dump order
    pub instance_fields: Vec<FieldDecl>,
}

impl ClassInfo {
    pub fn new(
        class_id: ClassId,
        super_class_id: ClassId,
        instance_size: u32,
        instance_fields: Vec<FieldDecl>,
    ) -> Self {
        Self {
            class_id,
            super_class_id,
            instance_size,
            instance_fields,
        }
    }

    pub fn has_super(&self) -> bool {
        self.super_class_id != 0
    }
}

/// Write-once tables of strings and class metadata, filled in stream order
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: HashMap<StringId, String>,
    classes: HashMap<ClassId, ClassInfo>,
    class_names: HashMap<ClassId, StringId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a string id; rebinding to the same value is accepted
    pub fn put_string(&mut self, id: StringId, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match self.strings.get(&id) {
            Some(existing) if *existing == value => Ok(()),
            Some(_) => Err(HeapGraphError::duplicate(SymbolKind::String, id)),
            None => {
                self.strings.insert(id, value);
                Ok(())
            }
        }
    }

    pub fn lookup_string(&self, id: StringId) -> Result<&str> {
        self.strings
            .get(&id)
            .map(String::as_str)
            .ok_or(HeapGraphError::UnresolvedReference(id))
    }

    pub fn put_class(&mut self, info: ClassInfo) -> Result<()> {
        match self.classes.get(&info.class_id) {
            Some(existing) if *existing == info => Ok(()),
            Some(_) => Err(HeapGraphError::duplicate(SymbolKind::Class, info.class_id)),
            None => {
                self.classes.insert(info.class_id, info);
                Ok(())
            }
        }
    }

    /// `UnresolvedClass` ends a superclass walk
    pub fn lookup_class(&self, id: ClassId) -> Result<&ClassInfo> {
        self.classes
            .get(&id)
            .ok_or(HeapGraphError::UnresolvedClass(id))
    }

    pub fn is_class(&self, id: ClassId) -> bool {
        self.classes.contains_key(&id) || self.class_names.contains_key(&id)
    }

    /// Bind a class object to its name string (from a load-class record)
    pub fn put_class_name(&mut self, class_id: ClassId, name_string_id: StringId) -> Result<()> {
        match self.class_names.get(&class_id) {
            Some(&existing) if existing == name_string_id => Ok(()),
            Some(_) => Err(HeapGraphError::duplicate(SymbolKind::ClassName, class_id)),
            None => {
                self.class_names.insert(class_id, name_string_id);
                Ok(())
            }
        }
    }

    pub fn class_name(&self, class_id: ClassId) -> Result<&str> {
        let string_id = self
            .class_names
            .get(&class_id)
            .copied()
            .ok_or(HeapGraphError::UnresolvedClass(class_id))?;
        self.lookup_string(string_id)
    }

    /// Human readable label of a type identity, `unknown` when unnamed
    pub fn type_name(&self, ty: &TypeId, unknown: &str) -> String {
        match ty {
            TypeId::Class(id) => self.class_name(*id).unwrap_or(unknown).to_string(),
            TypeId::ObjectArray(id) => format!("{}[]", self.class_name(*id).unwrap_or(unknown)),
            TypeId::PrimitiveArray(_) | TypeId::ClassObject | TypeId::Unknown => ty.to_string(),
        }
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_name_count(&self) -> usize {
        self.class_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BasicType;

    #[test]
    fn test_strings_are_write_once() {
        let mut symbols = SymbolTable::new();
        symbols.put_string(1, "value").unwrap();
        symbols.put_string(1, "value").unwrap();

        let err = symbols.put_string(1, "other").unwrap_err();
        assert_eq!(err, HeapGraphError::duplicate(SymbolKind::String, 1));
        assert!(err.is_fatal());
        assert_eq!(symbols.lookup_string(1).unwrap(), "value");
    }

    #[test]
    fn test_lookup_before_insert_is_unresolved() {
        let mut symbols = SymbolTable::new();
        assert_eq!(
            symbols.lookup_string(9),
            Err(HeapGraphError::UnresolvedReference(9))
        );
        assert!(!HeapGraphError::UnresolvedReference(9).is_fatal());

        symbols.put_string(9, "late").unwrap();
        assert_eq!(symbols.lookup_string(9).unwrap(), "late");
    }

    #[test]
    fn test_classes_are_write_once() {
        let mut symbols = SymbolTable::new();
        let info = ClassInfo::new(0x10, 0, 8, vec![FieldDecl::new(1, BasicType::Int)]);
        symbols.put_class(info.clone()).unwrap();
        symbols.put_class(info).unwrap();

        let changed = ClassInfo::new(0x10, 0x20, 8, Vec::new());
        assert!(matches!(
            symbols.put_class(changed),
            Err(HeapGraphError::DuplicateId {
                kind: SymbolKind::Class,
                id: 0x10
            })
        ));
        assert_eq!(
            symbols.lookup_class(0x30),
            Err(HeapGraphError::UnresolvedClass(0x30))
        );
    }

    #[test]
    fn test_type_names() {
        let mut symbols = SymbolTable::new();
        symbols.put_string(1, "java/lang/String").unwrap();
        symbols.put_class_name(0x10, 1).unwrap();

        assert_eq!(symbols.type_name(&TypeId::Class(0x10), "?"), "java/lang/String");
        assert_eq!(
            symbols.type_name(&TypeId::ObjectArray(0x10), "?"),
            "java/lang/String[]"
        );
        assert_eq!(symbols.type_name(&TypeId::Class(0x11), "?"), "?");
        assert_eq!(
            symbols.type_name(&TypeId::PrimitiveArray(BasicType::Char), "?"),
            "char[]"
        );
    }
}
