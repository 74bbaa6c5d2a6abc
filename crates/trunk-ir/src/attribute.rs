//! Attribute storage with two identity disciplines.
//!
//! Structural attributes are hash-consed through [`AttrInterner::intern`]:
//! equal data always yields the same [`AttrRef`]. Distinct attributes are
//! minted through [`AttrInterner::mint_distinct`], which allocates a fresh
//! identity on every call regardless of what it wraps.
//!
//! Typed handles (`DiFileAttr`, `DiScopeAttr`, ...) are thin wrappers over
//! `AttrRef` whose existence proves the attribute's kind. They are obtained
//! through [`AttrKind::from_attr`] or the panicking [`AttrKind::cast`].

use std::collections::HashMap;
use std::fmt;

use cranelift_entity::PrimaryMap;

use crate::debug_info::{
    DiBasicTypeData, DiCompileUnitData, DiFileData, DiFlags, DiLexicalBlockData, DiModuleData,
    DiSubprogramData, DiSubroutineTypeData,
};
use crate::ir::Symbol;
use crate::refs::{AttrRef, TypeRef};

// ============================================================================
// AttrData
// ============================================================================

/// Payload of a distinct attribute.
///
/// Fields are private so the only way to obtain one is
/// [`AttrInterner::mint_distinct`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DistinctData {
    seq: u32,
    referenced: AttrRef,
}

impl DistinctData {
    /// Per-context sequence number, unique among distinct attributes.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn referenced(&self) -> AttrRef {
        self.referenced
    }
}

/// Data for a single attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrData {
    Unit,
    Bool(bool),
    IntBits(u64),
    FloatBits(u64),
    String(String),
    Symbol(Symbol),
    Type(TypeRef),
    Array(Vec<AttrRef>),
    Distinct(DistinctData),
    DiNullType,
    DiFile(DiFileData),
    DiBasicType(DiBasicTypeData),
    DiFlags(DiFlags),
    DiLexicalBlock(DiLexicalBlockData),
    DiSubroutineType(DiSubroutineTypeData),
    DiCompileUnit(DiCompileUnitData),
    DiSubprogram(DiSubprogramData),
    DiModule(DiModuleData),
}

impl AttrData {
    /// Short kind name used in diagnostics and printed output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttrData::Unit => "unit",
            AttrData::Bool(_) => "bool",
            AttrData::IntBits(_) => "int",
            AttrData::FloatBits(_) => "float",
            AttrData::String(_) => "string",
            AttrData::Symbol(_) => "symbol",
            AttrData::Type(_) => "type",
            AttrData::Array(_) => "array",
            AttrData::Distinct(_) => "distinct",
            AttrData::DiNullType => "di_null_type",
            AttrData::DiFile(_) => "di_file",
            AttrData::DiBasicType(_) => "di_basic_type",
            AttrData::DiFlags(_) => "di_flags",
            AttrData::DiLexicalBlock(_) => "di_lexical_block",
            AttrData::DiSubroutineType(_) => "di_subroutine_type",
            AttrData::DiCompileUnit(_) => "di_compile_unit",
            AttrData::DiSubprogram(_) => "di_subprogram",
            AttrData::DiModule(_) => "di_module",
        }
    }

    /// Attributes this one refers to, in field order.
    pub fn referenced_attrs(&self) -> Vec<AttrRef> {
        match self {
            AttrData::Unit
            | AttrData::Bool(_)
            | AttrData::IntBits(_)
            | AttrData::FloatBits(_)
            | AttrData::String(_)
            | AttrData::Symbol(_)
            | AttrData::Type(_)
            | AttrData::DiNullType
            | AttrData::DiFlags(_) => Vec::new(),
            AttrData::Array(elems) => elems.clone(),
            AttrData::Distinct(d) => vec![d.referenced],
            AttrData::DiFile(f) => vec![f.name.attr(), f.directory.attr()],
            AttrData::DiBasicType(b) => vec![b.name.attr()],
            AttrData::DiLexicalBlock(lb) => vec![lb.scope.attr(), lb.file.attr()],
            AttrData::DiSubroutineType(st) => st.types.iter().map(|t| t.attr()).collect(),
            AttrData::DiCompileUnit(cu) => {
                vec![cu.id.attr(), cu.file.attr(), cu.producer.attr()]
            }
            AttrData::DiSubprogram(sp) => vec![
                sp.id.attr(),
                sp.compile_unit.attr(),
                sp.scope.attr(),
                sp.name.attr(),
                sp.linkage_name.attr(),
                sp.file.attr(),
                sp.ty.attr(),
            ],
            AttrData::DiModule(m) => vec![
                m.file.attr(),
                m.scope.attr(),
                m.name.attr(),
                m.config_macros.attr(),
                m.include_path.attr(),
                m.apinotes.attr(),
            ],
        }
    }

    /// Whether this is one of the debug-info kinds.
    pub fn is_debug_info(&self) -> bool {
        matches!(
            self,
            AttrData::DiNullType
                | AttrData::DiFile(_)
                | AttrData::DiBasicType(_)
                | AttrData::DiFlags(_)
                | AttrData::DiLexicalBlock(_)
                | AttrData::DiSubroutineType(_)
                | AttrData::DiCompileUnit(_)
                | AttrData::DiSubprogram(_)
                | AttrData::DiModule(_)
        )
    }
}

// ============================================================================
// AttrInterner
// ============================================================================

/// Owns every attribute of an `IrContext`.
pub struct AttrInterner {
    attrs: PrimaryMap<AttrRef, AttrData>,
    dedup: HashMap<AttrData, AttrRef>,
    next_distinct: u32,
}

impl AttrInterner {
    pub fn new() -> Self {
        Self {
            attrs: PrimaryMap::new(),
            dedup: HashMap::default(),
            next_distinct: 0,
        }
    }

    /// Intern a structural attribute, returning an existing ref if the data
    /// matches.
    ///
    /// # Panics
    ///
    /// Panics if `data` is a distinct payload; those only come from
    /// [`Self::mint_distinct`].
    #[track_caller]
    pub fn intern(&mut self, data: AttrData) -> AttrRef {
        assert!(
            !matches!(data, AttrData::Distinct(_)),
            "intern: distinct attributes must be created with mint_distinct",
        );
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.attrs.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Mint a fresh distinct attribute wrapping `referenced`.
    ///
    /// Never returns an existing ref, even for a repeated `referenced`.
    pub fn mint_distinct(&mut self, referenced: impl Into<AttrRef>) -> DistinctAttr {
        let seq = self.next_distinct;
        self.next_distinct += 1;
        let r = self.attrs.push(AttrData::Distinct(DistinctData {
            seq,
            referenced: referenced.into(),
        }));
        tracing::trace!(attr = %r, seq, "minted distinct attribute");
        DistinctAttr(r)
    }

    /// Look up attribute data by reference.
    pub fn get(&self, r: AttrRef) -> &AttrData {
        &self.attrs[r]
    }

    /// Number of attributes, interned and distinct.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Number of distinct identities minted so far.
    pub fn distinct_count(&self) -> u32 {
        self.next_distinct
    }

    // ========================================================================
    // Convenience interning
    // ========================================================================

    pub fn unit(&mut self) -> AttrRef {
        self.intern(AttrData::Unit)
    }

    pub fn bool(&mut self, value: bool) -> AttrRef {
        self.intern(AttrData::Bool(value))
    }

    pub fn int(&mut self, bits: u64) -> AttrRef {
        self.intern(AttrData::IntBits(bits))
    }

    pub fn float(&mut self, value: f64) -> AttrRef {
        self.intern(AttrData::FloatBits(value.to_bits()))
    }

    pub fn string(&mut self, text: impl Into<String>) -> StringAttr {
        StringAttr(self.intern(AttrData::String(text.into())))
    }

    pub fn symbol(&mut self, sym: Symbol) -> AttrRef {
        self.intern(AttrData::Symbol(sym))
    }

    pub fn ty(&mut self, ty: TypeRef) -> AttrRef {
        self.intern(AttrData::Type(ty))
    }

    pub fn array(&mut self, elems: impl IntoIterator<Item = AttrRef>) -> AttrRef {
        self.intern(AttrData::Array(elems.into_iter().collect()))
    }

    // ========================================================================
    // Typed reads
    // ========================================================================

    pub fn as_int(&self, r: AttrRef) -> Option<u64> {
        match self.get(r) {
            AttrData::IntBits(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self, r: AttrRef) -> Option<f64> {
        match self.get(r) {
            AttrData::FloatBits(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn as_bool(&self, r: AttrRef) -> Option<bool> {
        match self.get(r) {
            AttrData::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_symbol(&self, r: AttrRef) -> Option<Symbol> {
        match self.get(r) {
            AttrData::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_type(&self, r: AttrRef) -> Option<TypeRef> {
        match self.get(r) {
            AttrData::Type(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_str(&self, r: AttrRef) -> Option<&str> {
        match self.get(r) {
            AttrData::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for AttrInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Typed handles
// ============================================================================

/// A typed view of an [`AttrRef`] whose kind has been checked.
pub trait AttrKind: Copy + Into<AttrRef> {
    /// Kind name reported when a cast fails.
    const EXPECTED: &'static str;

    /// Checked downcast: `None` if `attr` is not of this kind.
    fn from_attr(attrs: &AttrInterner, attr: AttrRef) -> Option<Self>;

    /// Downcast that treats a kind mismatch as a caller bug.
    ///
    /// # Panics
    ///
    /// Panics if `attr` is not of this kind.
    #[track_caller]
    fn cast(attrs: &AttrInterner, attr: AttrRef) -> Self {
        match Self::from_attr(attrs, attr) {
            Some(typed) => typed,
            None => panic!(
                "expected {} attribute, found {attr} ({})",
                Self::EXPECTED,
                attrs.get(attr).kind_name(),
            ),
        }
    }
}

macro_rules! attr_handle {
    ($(#[$meta:meta])* $name:ident, $expected:literal, $pat:pat) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(AttrRef);

        impl $name {
            pub fn attr(self) -> AttrRef {
                self.0
            }
        }

        impl From<$name> for AttrRef {
            fn from(typed: $name) -> AttrRef {
                typed.0
            }
        }

        impl AttrKind for $name {
            const EXPECTED: &'static str = $expected;

            fn from_attr(attrs: &AttrInterner, attr: AttrRef) -> Option<Self> {
                matches!(attrs.get(attr), $pat).then_some($name(attr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

attr_handle!(StringAttr, "string", AttrData::String(_));
attr_handle!(DistinctAttr, "distinct", AttrData::Distinct(_));
attr_handle!(DiNullTypeAttr, "di_null_type", AttrData::DiNullType);
attr_handle!(DiFileAttr, "di_file", AttrData::DiFile(_));
attr_handle!(DiBasicTypeAttr, "di_basic_type", AttrData::DiBasicType(_));
attr_handle!(DiFlagsAttr, "di_flags", AttrData::DiFlags(_));
attr_handle!(
    DiLexicalBlockAttr,
    "di_lexical_block",
    AttrData::DiLexicalBlock(_)
);
attr_handle!(
    DiSubroutineTypeAttr,
    "di_subroutine_type",
    AttrData::DiSubroutineType(_)
);
attr_handle!(
    DiCompileUnitAttr,
    "di_compile_unit",
    AttrData::DiCompileUnit(_)
);
attr_handle!(DiSubprogramAttr, "di_subprogram", AttrData::DiSubprogram(_));
attr_handle!(DiModuleAttr, "di_module", AttrData::DiModule(_));
attr_handle!(
    /// Any debug-info node that can contain nested declarations.
    DiScopeAttr,
    "di_scope",
    AttrData::DiFile(_)
        | AttrData::DiCompileUnit(_)
        | AttrData::DiSubprogram(_)
        | AttrData::DiLexicalBlock(_)
        | AttrData::DiModule(_)
);
attr_handle!(
    /// Any debug-info node describing a type.
    DiTypeAttr,
    "di_type",
    AttrData::DiNullType | AttrData::DiBasicType(_) | AttrData::DiSubroutineType(_)
);

macro_rules! widen {
    ($to:ident: $($from:ident),*) => {
        $(
            impl From<$from> for $to {
                fn from(typed: $from) -> $to {
                    $to(typed.0)
                }
            }
        )*
    };
}

widen!(DiScopeAttr: DiFileAttr, DiCompileUnitAttr, DiSubprogramAttr, DiLexicalBlockAttr, DiModuleAttr);
widen!(DiTypeAttr: DiNullTypeAttr, DiBasicTypeAttr, DiSubroutineTypeAttr);

impl StringAttr {
    pub fn text(self, attrs: &AttrInterner) -> &str {
        match attrs.get(self.0) {
            AttrData::String(s) => s,
            other => unreachable!("StringAttr over {}", other.kind_name()),
        }
    }
}

impl DistinctAttr {
    pub fn data(self, attrs: &AttrInterner) -> &DistinctData {
        match attrs.get(self.0) {
            AttrData::Distinct(d) => d,
            other => unreachable!("DistinctAttr over {}", other.kind_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedups_structural_data() {
        let mut attrs = AttrInterner::new();
        let a = attrs.string("a.cairo");
        let b = attrs.string(String::from("a.cairo"));
        let c = attrs.string("b.cairo");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(attrs.int(42), attrs.int(42));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn mint_distinct_is_always_fresh() {
        let mut attrs = AttrInterner::new();
        let target = attrs.unit();
        let d1 = attrs.mint_distinct(target);
        let d2 = attrs.mint_distinct(target);
        assert_ne!(d1, d2);
        assert_eq!(d1.data(&attrs).referenced(), target);
        assert_eq!(d2.data(&attrs).referenced(), target);
        assert_ne!(d1.data(&attrs).seq(), d2.data(&attrs).seq());
        assert_eq!(attrs.distinct_count(), 2);
    }

    #[test]
    #[should_panic(expected = "mint_distinct")]
    fn intern_rejects_copied_distinct_payload() {
        let mut attrs = AttrInterner::new();
        let target = attrs.unit();
        let d = attrs.mint_distinct(target);
        let copied = attrs.get(d.attr()).clone();
        attrs.intern(copied);
    }

    #[test]
    fn from_attr_checks_kind() {
        let mut attrs = AttrInterner::new();
        let s = attrs.string("x");
        let i = attrs.int(1);
        assert_eq!(StringAttr::from_attr(&attrs, s.attr()), Some(s));
        assert_eq!(StringAttr::from_attr(&attrs, i), None);
        assert_eq!(DiScopeAttr::from_attr(&attrs, i), None);
        assert_eq!(s.text(&attrs), "x");
    }

    #[test]
    #[should_panic(expected = "expected distinct attribute")]
    fn cast_panics_on_mismatch() {
        let mut attrs = AttrInterner::new();
        let s = attrs.string("not distinct");
        DistinctAttr::cast(&attrs, s.attr());
    }

    #[test]
    fn scalar_reads() {
        let mut attrs = AttrInterner::new();
        let f = attrs.float(1.5);
        let b = attrs.bool(true);
        assert_eq!(attrs.as_float(f), Some(1.5));
        assert_eq!(attrs.as_bool(b), Some(true));
        assert_eq!(attrs.as_int(b), None);
    }
}
