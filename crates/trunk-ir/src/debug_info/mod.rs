//! Debug-info attributes.
//!
//! One builder per node kind. Builders accept untyped attribute operands,
//! cast each one to the kind the node requires, and intern the result in the
//! context, so equal arguments give back the same attribute. A kind mismatch
//! is a caller bug and panics.
//!
//! Identity that must survive structural equality (compile units,
//! subprograms) comes from a [`DistinctAttr`] id minted by [`distinct`].

mod encoding;

pub use encoding::*;

use crate::attribute::{
    AttrData, AttrInterner, AttrKind, DiBasicTypeAttr, DiCompileUnitAttr, DiFileAttr,
    DiFlagsAttr, DiLexicalBlockAttr, DiModuleAttr, DiNullTypeAttr, DiScopeAttr,
    DiSubprogramAttr, DiSubroutineTypeAttr, DiTypeAttr, DistinctAttr, StringAttr,
};
use crate::context::IrContext;
use crate::refs::AttrRef;

// ============================================================================
// Node payloads
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiFileData {
    pub name: StringAttr,
    pub directory: StringAttr,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiBasicTypeData {
    pub tag: DwTag,
    pub name: StringAttr,
    pub size_in_bits: u64,
    pub encoding: TypeEncoding,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiLexicalBlockData {
    pub scope: DiScopeAttr,
    pub file: DiFileAttr,
    pub line: u32,
    pub column: u32,
}

/// Signature description. By convention `types[0]` is the return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiSubroutineTypeData {
    pub calling_convention: CallingConvention,
    pub types: Vec<DiTypeAttr>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiCompileUnitData {
    pub id: DistinctAttr,
    pub source_language: SourceLanguage,
    pub file: DiFileAttr,
    pub producer: StringAttr,
    pub is_optimized: bool,
    pub emission_kind: EmissionKind,
    pub name_table_kind: NameTableKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiSubprogramData {
    pub id: DistinctAttr,
    pub compile_unit: DiCompileUnitAttr,
    pub scope: DiScopeAttr,
    pub name: StringAttr,
    pub linkage_name: StringAttr,
    pub file: DiFileAttr,
    pub line: u32,
    pub scope_line: u32,
    pub flags: SubprogramFlags,
    pub ty: DiSubroutineTypeAttr,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiModuleData {
    pub file: DiFileAttr,
    pub scope: DiScopeAttr,
    pub name: StringAttr,
    pub config_macros: StringAttr,
    pub include_path: StringAttr,
    pub apinotes: StringAttr,
    pub line: u32,
    pub is_decl: bool,
}

// ============================================================================
// Builders
// ============================================================================

/// Source file identified by `(name, directory)`.
#[track_caller]
pub fn file(
    ctx: &mut IrContext,
    name: impl Into<AttrRef>,
    directory: impl Into<AttrRef>,
) -> DiFileAttr {
    let data = DiFileData {
        name: StringAttr::cast(&ctx.attrs, name.into()),
        directory: StringAttr::cast(&ctx.attrs, directory.into()),
    };
    let r = ctx.attrs.intern(AttrData::DiFile(data));
    DiFileAttr::cast(&ctx.attrs, r)
}

/// The "no type" node, used for `void` returns.
pub fn null_type(ctx: &mut IrContext) -> DiNullTypeAttr {
    let r = ctx.attrs.intern(AttrData::DiNullType);
    DiNullTypeAttr::cast(&ctx.attrs, r)
}

#[track_caller]
pub fn basic_type(
    ctx: &mut IrContext,
    tag: DwTag,
    name: impl Into<AttrRef>,
    size_in_bits: u64,
    encoding: TypeEncoding,
) -> DiBasicTypeAttr {
    let data = DiBasicTypeData {
        tag,
        name: StringAttr::cast(&ctx.attrs, name.into()),
        size_in_bits,
        encoding,
    };
    let r = ctx.attrs.intern(AttrData::DiBasicType(data));
    DiBasicTypeAttr::cast(&ctx.attrs, r)
}

/// Flag set stored exactly as given; aliased names are not canonicalized.
pub fn flags(ctx: &mut IrContext, value: DiFlags) -> DiFlagsAttr {
    let r = ctx.attrs.intern(AttrData::DiFlags(value));
    DiFlagsAttr::cast(&ctx.attrs, r)
}

#[track_caller]
pub fn lexical_block(
    ctx: &mut IrContext,
    scope: impl Into<AttrRef>,
    file: impl Into<AttrRef>,
    line: u32,
    column: u32,
) -> DiLexicalBlockAttr {
    let data = DiLexicalBlockData {
        scope: DiScopeAttr::cast(&ctx.attrs, scope.into()),
        file: DiFileAttr::cast(&ctx.attrs, file.into()),
        line,
        column,
    };
    let r = ctx.attrs.intern(AttrData::DiLexicalBlock(data));
    DiLexicalBlockAttr::cast(&ctx.attrs, r)
}

/// Signature node. `types` may be empty for an unknown signature.
#[track_caller]
pub fn subroutine_type<T: Into<AttrRef>>(
    ctx: &mut IrContext,
    calling_convention: CallingConvention,
    types: impl IntoIterator<Item = T>,
) -> DiSubroutineTypeAttr {
    let types = types
        .into_iter()
        .map(|t| DiTypeAttr::cast(&ctx.attrs, t.into()))
        .collect();
    let data = DiSubroutineTypeData {
        calling_convention,
        types,
    };
    let r = ctx.attrs.intern(AttrData::DiSubroutineType(data));
    DiSubroutineTypeAttr::cast(&ctx.attrs, r)
}

/// Compile unit with the default name table.
#[track_caller]
pub fn compile_unit(
    ctx: &mut IrContext,
    id: impl Into<AttrRef>,
    source_language: SourceLanguage,
    file: impl Into<AttrRef>,
    producer: impl Into<AttrRef>,
    is_optimized: bool,
    emission_kind: EmissionKind,
) -> DiCompileUnitAttr {
    compile_unit_with_name_table(
        ctx,
        id,
        source_language,
        file,
        producer,
        is_optimized,
        emission_kind,
        NameTableKind::Default,
    )
}

/// Compile unit with an explicit accelerator name table kind.
///
/// # Panics
///
/// Panics if `id` is not a distinct attribute.
#[allow(clippy::too_many_arguments)]
#[track_caller]
pub fn compile_unit_with_name_table(
    ctx: &mut IrContext,
    id: impl Into<AttrRef>,
    source_language: SourceLanguage,
    file: impl Into<AttrRef>,
    producer: impl Into<AttrRef>,
    is_optimized: bool,
    emission_kind: EmissionKind,
    name_table_kind: NameTableKind,
) -> DiCompileUnitAttr {
    let data = DiCompileUnitData {
        id: DistinctAttr::cast(&ctx.attrs, id.into()),
        source_language,
        file: DiFileAttr::cast(&ctx.attrs, file.into()),
        producer: StringAttr::cast(&ctx.attrs, producer.into()),
        is_optimized,
        emission_kind,
        name_table_kind,
    };
    let r = ctx.attrs.intern(AttrData::DiCompileUnit(data));
    DiCompileUnitAttr::cast(&ctx.attrs, r)
}

/// # Panics
///
/// Panics if `id` is not distinct or `ty` is not a subroutine type.
#[allow(clippy::too_many_arguments)]
#[track_caller]
pub fn subprogram(
    ctx: &mut IrContext,
    id: impl Into<AttrRef>,
    compile_unit: impl Into<AttrRef>,
    scope: impl Into<AttrRef>,
    name: impl Into<AttrRef>,
    linkage_name: impl Into<AttrRef>,
    file: impl Into<AttrRef>,
    line: u32,
    scope_line: u32,
    flags: SubprogramFlags,
    ty: impl Into<AttrRef>,
) -> DiSubprogramAttr {
    let attrs = &ctx.attrs;
    let data = DiSubprogramData {
        id: DistinctAttr::cast(attrs, id.into()),
        compile_unit: DiCompileUnitAttr::cast(attrs, compile_unit.into()),
        scope: DiScopeAttr::cast(attrs, scope.into()),
        name: StringAttr::cast(attrs, name.into()),
        linkage_name: StringAttr::cast(attrs, linkage_name.into()),
        file: DiFileAttr::cast(attrs, file.into()),
        line,
        scope_line,
        flags,
        ty: DiSubroutineTypeAttr::cast(attrs, ty.into()),
    };
    let r = ctx.attrs.intern(AttrData::DiSubprogram(data));
    DiSubprogramAttr::cast(&ctx.attrs, r)
}

#[allow(clippy::too_many_arguments)]
#[track_caller]
pub fn module(
    ctx: &mut IrContext,
    file: impl Into<AttrRef>,
    scope: impl Into<AttrRef>,
    name: impl Into<AttrRef>,
    config_macros: impl Into<AttrRef>,
    include_path: impl Into<AttrRef>,
    apinotes: impl Into<AttrRef>,
    line: u32,
    is_decl: bool,
) -> DiModuleAttr {
    let attrs = &ctx.attrs;
    let data = DiModuleData {
        file: DiFileAttr::cast(attrs, file.into()),
        scope: DiScopeAttr::cast(attrs, scope.into()),
        name: StringAttr::cast(attrs, name.into()),
        config_macros: StringAttr::cast(attrs, config_macros.into()),
        include_path: StringAttr::cast(attrs, include_path.into()),
        apinotes: StringAttr::cast(attrs, apinotes.into()),
        line,
        is_decl,
    };
    let r = ctx.attrs.intern(AttrData::DiModule(data));
    DiModuleAttr::cast(&ctx.attrs, r)
}

/// Fresh identity wrapping `referenced`. Two calls never compare equal.
pub fn distinct(ctx: &mut IrContext, referenced: impl Into<AttrRef>) -> DistinctAttr {
    ctx.attrs.mint_distinct(referenced)
}

// ============================================================================
// Scope accessors
// ============================================================================

/// File a compile unit was built with.
#[track_caller]
pub fn compile_unit_scope(ctx: &IrContext, cu: impl Into<AttrRef>) -> DiFileAttr {
    DiCompileUnitAttr::cast(&ctx.attrs, cu.into()).file(&ctx.attrs)
}

/// Enclosing scope of a subprogram.
#[track_caller]
pub fn subprogram_scope(ctx: &IrContext, sp: impl Into<AttrRef>) -> DiScopeAttr {
    DiSubprogramAttr::cast(&ctx.attrs, sp.into()).scope(&ctx.attrs)
}

/// Enclosing scope of a module.
#[track_caller]
pub fn module_scope(ctx: &IrContext, module: impl Into<AttrRef>) -> DiScopeAttr {
    DiModuleAttr::cast(&ctx.attrs, module.into()).scope(&ctx.attrs)
}

// ============================================================================
// Typed reads
// ============================================================================

macro_rules! node_data {
    ($handle:ident => $variant:ident($data:ty)) => {
        impl $handle {
            pub fn data(self, attrs: &AttrInterner) -> &$data {
                match attrs.get(self.attr()) {
                    AttrData::$variant(d) => d,
                    other => unreachable!(
                        concat!(stringify!($handle), " over {}"),
                        other.kind_name()
                    ),
                }
            }
        }
    };
}

node_data!(DiFileAttr => DiFile(DiFileData));
node_data!(DiBasicTypeAttr => DiBasicType(DiBasicTypeData));
node_data!(DiLexicalBlockAttr => DiLexicalBlock(DiLexicalBlockData));
node_data!(DiSubroutineTypeAttr => DiSubroutineType(DiSubroutineTypeData));
node_data!(DiCompileUnitAttr => DiCompileUnit(DiCompileUnitData));
node_data!(DiSubprogramAttr => DiSubprogram(DiSubprogramData));
node_data!(DiModuleAttr => DiModule(DiModuleData));

impl DiFlagsAttr {
    pub fn value(self, attrs: &AttrInterner) -> DiFlags {
        match attrs.get(self.attr()) {
            AttrData::DiFlags(f) => *f,
            other => unreachable!("DiFlagsAttr over {}", other.kind_name()),
        }
    }
}

impl DiCompileUnitAttr {
    pub fn file(self, attrs: &AttrInterner) -> DiFileAttr {
        self.data(attrs).file
    }
}

impl DiSubprogramAttr {
    pub fn scope(self, attrs: &AttrInterner) -> DiScopeAttr {
        self.data(attrs).scope
    }
}

impl DiModuleAttr {
    pub fn scope(self, attrs: &AttrInterner) -> DiScopeAttr {
        self.data(attrs).scope
    }
}

impl DiScopeAttr {
    /// File this scope belongs to. A file is its own file.
    pub fn file(self, attrs: &AttrInterner) -> DiFileAttr {
        match attrs.get(self.attr()) {
            AttrData::DiFile(_) => DiFileAttr::cast(attrs, self.attr()),
            AttrData::DiCompileUnit(cu) => cu.file,
            AttrData::DiSubprogram(sp) => sp.file,
            AttrData::DiLexicalBlock(lb) => lb.file,
            AttrData::DiModule(m) => m.file,
            other => unreachable!("DiScopeAttr over {}", other.kind_name()),
        }
    }
}
