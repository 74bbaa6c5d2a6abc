//! Type interning, path interning and source locations.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::ir::Symbol;
use crate::refs::{AttrRef, PathRef, TypeRef};

// ============================================================================
// Location
// ============================================================================

/// Source location attached to operations and blocks.
///
/// A file/line/column triple, optionally fused with a debug-info scope
/// attribute (subprogram, lexical block, ...). Line `0` means unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: PathRef,
    pub line: u32,
    pub column: u32,
    pub scope: Option<AttrRef>,
}

impl Location {
    pub const fn new(path: PathRef, line: u32, column: u32) -> Self {
        Self {
            path,
            line,
            column,
            scope: None,
        }
    }

    /// Location in `path` with no line information.
    pub const fn unknown(path: PathRef) -> Self {
        Self::new(path, 0, 0)
    }

    /// Fuse this location with a debug scope.
    pub fn with_scope(self, scope: impl Into<AttrRef>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..self
        }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

// ============================================================================
// TypeData
// ============================================================================

/// Data for a single interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
}

/// Builder for constructing `TypeData` with a fluent API.
pub struct TypeDataBuilder {
    dialect: Symbol,
    name: Symbol,
    params: SmallVec<[TypeRef; 4]>,
}

impl TypeDataBuilder {
    pub fn new(dialect: Symbol, name: Symbol) -> Self {
        Self {
            dialect,
            name,
            params: SmallVec::new(),
        }
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.params.extend(tys);
        self
    }

    pub fn build(self) -> TypeData {
        TypeData {
            dialect: self.dialect,
            name: self.name,
            params: self.params,
        }
    }
}

// ============================================================================
// TypeInterner
// ============================================================================

/// Deduplicating type interner. Same `TypeData` always yields the same `TypeRef`.
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Look up type data by reference.
    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    /// Check if this type matches the given dialect and name.
    pub fn is_dialect(&self, r: TypeRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.types[r];
        data.dialect == dialect && data.name == name
    }

    /// Whether `r` is an aggregate `adt.struct` type.
    pub fn is_struct(&self, r: TypeRef) -> bool {
        self.is_dialect(r, Symbol::new("adt"), Symbol::new("struct"))
    }

    /// Number of fields of an `adt.struct` type.
    ///
    /// # Panics
    ///
    /// Panics if `r` is not a struct type.
    #[track_caller]
    pub fn struct_field_count(&self, r: TypeRef) -> usize {
        assert!(self.is_struct(r), "expected adt.struct type, found {r}");
        self.types[r].params.len()
    }

    /// Type of the field at `index` in an `adt.struct` type.
    ///
    /// Callers validate `index` beforehand; this is a plain lookup into the
    /// field list fixed at construction.
    ///
    /// # Panics
    ///
    /// Panics if `r` is not a struct type or `index` is out of range.
    #[track_caller]
    pub fn struct_field_type_at(&self, r: TypeRef, index: usize) -> TypeRef {
        assert!(self.is_struct(r), "expected adt.struct type, found {r}");
        let fields = &self.types[r].params;
        assert!(
            index < fields.len(),
            "field index {index} out of range for struct with {} field(s)",
            fields.len()
        );
        fields[index]
    }

    /// Number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PathInterner
// ============================================================================

/// Deduplicating path string interner used by locations.
pub struct PathInterner {
    paths: PrimaryMap<PathRef, String>,
    dedup: HashMap<String, PathRef>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self {
            paths: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a path string, returning an existing ref if the string matches.
    pub fn intern(&mut self, path: impl Into<String>) -> PathRef {
        let path = path.into();
        if let Some(&existing) = self.dedup.get(&path) {
            return existing;
        }
        let r = self.paths.push(path.clone());
        self.dedup.insert(path, r);
        r
    }

    /// Look up path string by reference.
    pub fn get(&self, r: PathRef) -> &str {
        &self.paths[r]
    }
}

impl Default for PathInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(interner: &mut TypeInterner, name: &'static str) -> TypeRef {
        interner.intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new(name)).build())
    }

    fn struct_of(interner: &mut TypeInterner, fields: &[TypeRef]) -> TypeRef {
        interner.intern(
            TypeDataBuilder::new(Symbol::new("adt"), Symbol::new("struct"))
                .params(fields.iter().copied())
                .build(),
        )
    }

    #[test]
    fn type_interner_dedup() {
        let mut interner = TypeInterner::new();
        let r1 = int(&mut interner, "i32");
        let r2 = int(&mut interner, "i32");
        assert_eq!(r1, r2, "same TypeData must yield same TypeRef");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn type_interner_distinct() {
        let mut interner = TypeInterner::new();
        let r1 = int(&mut interner, "i32");
        let r2 = int(&mut interner, "i64");
        assert_ne!(r1, r2, "different TypeData must yield different TypeRef");
    }

    #[test]
    fn struct_field_lookup_in_order() {
        let mut interner = TypeInterner::new();
        let i8 = int(&mut interner, "i8");
        let i32 = int(&mut interner, "i32");
        let i64 = int(&mut interner, "i64");
        let s = struct_of(&mut interner, &[i64, i8, i32, i8]);

        assert!(interner.is_struct(s));
        assert_eq!(interner.struct_field_count(s), 4);
        let fields: Vec<_> = (0..4).map(|i| interner.struct_field_type_at(s, i)).collect();
        assert_eq!(fields, vec![i64, i8, i32, i8]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn struct_field_lookup_past_end() {
        let mut interner = TypeInterner::new();
        let i32 = int(&mut interner, "i32");
        let s = struct_of(&mut interner, &[i32, i32]);
        interner.struct_field_type_at(s, 2);
    }

    #[test]
    #[should_panic(expected = "expected adt.struct")]
    fn struct_field_lookup_on_scalar() {
        let mut interner = TypeInterner::new();
        let i32 = int(&mut interner, "i32");
        interner.struct_field_type_at(i32, 0);
    }

    #[test]
    fn empty_struct_has_no_fields() {
        let mut interner = TypeInterner::new();
        let s = struct_of(&mut interner, &[]);
        assert_eq!(interner.struct_field_count(s), 0);
    }

    #[test]
    fn path_interner_dedup() {
        let mut interner = PathInterner::new();
        let r1 = interner.intern("/src/a.cairo");
        let r2 = interner.intern("/src/a.cairo".to_owned());
        let r3 = interner.intern("/src/b.cairo");
        assert_eq!(r1, r2);
        assert_ne!(r1, r3);
        assert_eq!(interner.get(r3), "/src/b.cairo");
    }
}
