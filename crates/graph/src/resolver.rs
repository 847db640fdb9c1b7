use crate::config::{DecoderConfig, FieldCountPolicy};
use crate::error::{HeapGraphError, Result};
use crate::record::Value;
use crate::symbols::SymbolTable;
use crate::types::{ClassId, ObjectId, ResolvedField, TypeChain, TypeId, VertexIssue};

/// Outcome of resolving an instance's flat value array
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedFields {
    /// Declared class fields first, then each ancestor's
    pub fields: Vec<ResolvedField>,

    /// Every class id visited, declared class first
    pub type_chain: TypeChain,

    /// Non-fatal problems met on the way
    pub issues: Vec<VertexIssue>,
}

impl ResolvedFields {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Names instance field values by walking the class hierarchy captured so far
pub struct FieldResolver<'a> {
    symbols: &'a SymbolTable,
    config: &'a DecoderConfig,
}

impl<'a> FieldResolver<'a> {
    pub fn new(symbols: &'a SymbolTable, config: &'a DecoderConfig) -> Self {
        Self { symbols, config }
    }

    /// Consume `values` left to right: the declared class's own fields, then
    /// its superclass's, up to the root of the hierarchy.
    ///
    /// A missing ancestor stops the walk and yields the resolved prefix with an
    /// `UnresolvedClass` issue. A complete walk whose declared field count
    /// differs from `values.len()` fails with `FieldCountMismatch` under the
    /// fatal policy.
    pub fn resolve_fields(
        &self,
        object_id: ObjectId,
        declared_class_id: ClassId,
        values: &[Value],
    ) -> Result<ResolvedFields> {
        let mut resolved = ResolvedFields::default();
        let mut expected = 0usize;
        let mut next = declared_class_id;

        while next != 0 {
            if resolved.type_chain.contains(&TypeId::Class(next)) {
                return Err(HeapGraphError::CyclicHierarchy(next));
            }
            resolved.type_chain.push(TypeId::Class(next));

            let info = match self.symbols.lookup_class(next) {
                Ok(info) => info,
                Err(_) => {
                    log::warn!(
                        "Object {object_id:#x}: class {next:#x} not loaded, keeping {} of {} values",
                        resolved.fields.len(),
                        values.len()
                    );
                    resolved
                        .issues
                        .push(VertexIssue::UnresolvedClass { class_id: next });
                    return Ok(resolved);
                }
            };

            for decl in &info.instance_fields {
                if let Some(value) = values.get(expected) {
                    let name = self.field_name(decl.name_string_id, &mut resolved.issues);
                    resolved.fields.push(ResolvedField::new(name, *value));
                }
                expected += 1;
            }

            next = info.super_class_id;
        }

        if expected != values.len() {
            match self.config.field_count_policy {
                FieldCountPolicy::Fatal => {
                    return Err(HeapGraphError::FieldCountMismatch {
                        object_id,
                        class_id: declared_class_id,
                        expected,
                        actual: values.len(),
                    });
                }
                FieldCountPolicy::BestEffort => {
                    log::warn!(
                        "Object {object_id:#x}: class chain declares {expected} fields, got {} values",
                        values.len()
                    );
                    resolved.issues.push(VertexIssue::FieldCountMismatch {
                        expected,
                        actual: values.len(),
                    });
                }
            }
        }

        Ok(resolved)
    }

    fn field_name(&self, string_id: u64, issues: &mut Vec<VertexIssue>) -> String {
        match self.symbols.lookup_string(string_id) {
            Ok(name) => name.to_string(),
            Err(_) => {
                issues.push(VertexIssue::UnresolvedReference { string_id });
                self.config.unknown_name.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BasicType, FieldDecl};
    use crate::symbols::ClassInfo;
    use pretty_assertions::assert_eq;

    fn int_fields(ids: &[u64]) -> Vec<FieldDecl> {
        ids.iter().map(|&id| FieldDecl::new(id, BasicType::Int)).collect()
    }

    /// Sub (fields s0, s1) extends Base (fields b0, b1, b2)
    fn two_level_symbols() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        for (id, name) in [(1, "s0"), (2, "s1"), (3, "b0"), (4, "b1"), (5, "b2")] {
            symbols.put_string(id, name).unwrap();
        }
        symbols
            .put_class(ClassInfo::new(0x100, 0, 12, int_fields(&[3, 4, 5])))
            .unwrap();
        symbols
            .put_class(ClassInfo::new(0x200, 0x100, 20, int_fields(&[1, 2])))
            .unwrap();
        symbols
    }

    fn names(resolved: &ResolvedFields) -> Vec<(&str, Value)> {
        resolved
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value))
            .collect()
    }

    #[test]
    fn test_subclass_fields_come_first() {
        let symbols = two_level_symbols();
        let config = DecoderConfig::default();
        let resolver = FieldResolver::new(&symbols, &config);

        let values: Vec<Value> = (1..=5).map(Value::Int).collect();
        let resolved = resolver.resolve_fields(0xa, 0x200, &values).unwrap();

        assert_eq!(
            names(&resolved),
            vec![
                ("s0", Value::Int(1)),
                ("s1", Value::Int(2)),
                ("b0", Value::Int(3)),
                ("b1", Value::Int(4)),
                ("b2", Value::Int(5)),
            ]
        );
        assert_eq!(
            resolved.type_chain,
            vec![TypeId::Class(0x200), TypeId::Class(0x100)]
        );
        assert!(!resolved.is_degraded());
    }

    #[test]
    fn test_count_mismatch_is_fatal_by_default() {
        let symbols = two_level_symbols();
        let config = DecoderConfig::default();
        let resolver = FieldResolver::new(&symbols, &config);

        let values: Vec<Value> = (1..=4).map(Value::Int).collect();
        let err = resolver.resolve_fields(0xa, 0x200, &values).unwrap_err();
        assert_eq!(
            err,
            HeapGraphError::FieldCountMismatch {
                object_id: 0xa,
                class_id: 0x200,
                expected: 5,
                actual: 4,
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_count_mismatch_best_effort() {
        let symbols = two_level_symbols();
        let config = DecoderConfig::lenient();
        let resolver = FieldResolver::new(&symbols, &config);

        let values: Vec<Value> = (1..=6).map(Value::Int).collect();
        let resolved = resolver.resolve_fields(0xa, 0x200, &values).unwrap();
        assert_eq!(resolved.fields.len(), 5);
        assert_eq!(
            resolved.issues,
            vec![VertexIssue::FieldCountMismatch {
                expected: 5,
                actual: 6
            }]
        );
    }

    #[test]
    fn test_missing_ancestor_keeps_prefix() {
        let mut symbols = SymbolTable::new();
        symbols.put_string(1, "s0").unwrap();
        symbols
            .put_class(ClassInfo::new(0x200, 0x100, 4, int_fields(&[1])))
            .unwrap();
        let config = DecoderConfig::default();
        let resolver = FieldResolver::new(&symbols, &config);

        let values = [Value::Int(7), Value::Int(8)];
        let resolved = resolver.resolve_fields(0xa, 0x200, &values).unwrap();

        assert_eq!(names(&resolved), vec![("s0", Value::Int(7))]);
        assert_eq!(
            resolved.type_chain,
            vec![TypeId::Class(0x200), TypeId::Class(0x100)]
        );
        assert_eq!(
            resolved.issues,
            vec![VertexIssue::UnresolvedClass { class_id: 0x100 }]
        );
    }

    #[test]
    fn test_missing_field_name_uses_placeholder() {
        let mut symbols = SymbolTable::new();
        symbols
            .put_class(ClassInfo::new(0x200, 0, 4, int_fields(&[42])))
            .unwrap();
        let config = DecoderConfig::default();
        let resolver = FieldResolver::new(&symbols, &config);

        let resolved = resolver
            .resolve_fields(0xa, 0x200, &[Value::Int(1)])
            .unwrap();
        assert_eq!(names(&resolved), vec![("unknown", Value::Int(1))]);
        assert_eq!(
            resolved.issues,
            vec![VertexIssue::UnresolvedReference { string_id: 42 }]
        );
    }

    #[test]
    fn test_cyclic_hierarchy_is_rejected() {
        let mut symbols = SymbolTable::new();
        symbols.put_class(ClassInfo::new(1, 2, 0, Vec::new())).unwrap();
        symbols.put_class(ClassInfo::new(2, 1, 0, Vec::new())).unwrap();
        let config = DecoderConfig::default();
        let resolver = FieldResolver::new(&symbols, &config);

        assert_eq!(
            resolver.resolve_fields(0xa, 1, &[]),
            Err(HeapGraphError::CyclicHierarchy(1))
        );
    }
}
