//! Core dialect: builtin scalar types, function types and `core.module`.

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::ir::Symbol;
use crate::ops::{dialect_op, required_attr};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::types::{Location, TypeDataBuilder};

// ============================================================================
// Types
// ============================================================================

fn core_type(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new(name)).build())
}

pub fn i1(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "i1")
}

pub fn i8(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "i8")
}

pub fn i16(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "i16")
}

pub fn i32(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "i32")
}

pub fn i64(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "i64")
}

pub fn f32(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "f32")
}

pub fn f64(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "f64")
}

pub fn ptr(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "ptr")
}

/// Unit type. As a function result it means "returns nothing".
pub fn nil(ctx: &mut IrContext) -> TypeRef {
    core_type(ctx, "nil")
}

/// Function type. Stored as `core.func(result, params...)`.
pub fn func_type(
    ctx: &mut IrContext,
    result: TypeRef,
    params: impl IntoIterator<Item = TypeRef>,
) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("core"), Symbol::new("func"))
            .param(result)
            .params(params)
            .build(),
    )
}

/// Split a `core.func` type into `(result, params)`.
pub fn func_type_parts(ctx: &IrContext, ty: TypeRef) -> Option<(TypeRef, &[TypeRef])> {
    if !ctx.types.is_dialect(ty, Symbol::new("core"), Symbol::new("func")) {
        return None;
    }
    let (result, params) = ctx.types.get(ty).params.split_first()?;
    Some((*result, params))
}

pub fn is_nil(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, Symbol::new("core"), Symbol::new("nil"))
}

/// Bit width of `core.i*`, `None` for anything else.
pub fn int_width(ctx: &IrContext, ty: TypeRef) -> Option<u32> {
    let data = ctx.types.get(ty);
    if data.dialect != "core" {
        return None;
    }
    data.name.with_str(|name| match name {
        "i1" => Some(1),
        "i8" => Some(8),
        "i16" => Some(16),
        "i32" => Some(32),
        "i64" => Some(64),
        _ => None,
    })
}

/// Bit width of `core.f32`/`core.f64`, `None` for anything else.
pub fn float_width(ctx: &IrContext, ty: TypeRef) -> Option<u32> {
    let data = ctx.types.get(ty);
    if data.dialect != "core" {
        return None;
    }
    data.name.with_str(|name| match name {
        "f32" => Some(32),
        "f64" => Some(64),
        _ => None,
    })
}

// ============================================================================
// core.module
// ============================================================================

dialect_op! {
    /// Top-level container. Its body region holds a single block of
    /// `func.func` operations.
    "core"."module" => Module, attrs: ["sym_name"]
}

/// Create an empty module with a single body block.
pub fn module(ctx: &mut IrContext, location: Location, name: Symbol) -> Module {
    let block = ctx.create_block(BlockData::new(location, []));
    let body = ctx.create_region(RegionData::new(location, [block]));
    let sym = ctx.attrs.symbol(name);
    let data = OperationDataBuilder::new(location, Symbol::new("core"), Symbol::new("module"))
        .attr("sym_name", sym)
        .region(body)
        .build(ctx);
    Module(ctx.create_op(data))
}

impl Module {
    pub fn name(&self, ctx: &IrContext) -> Symbol {
        let attr = required_attr(ctx, self.0, "sym_name");
        ctx.attrs.as_symbol(attr).unwrap_or_else(|| {
            panic!("core.module sym_name is a {}", ctx.attrs.get(attr).kind_name())
        })
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    /// First block of the body, where top-level ops live.
    pub fn block(&self, ctx: &IrContext) -> BlockRef {
        ctx.region(self.body(ctx)).blocks[0]
    }

    /// Top-level operations in order.
    pub fn ops<'a>(&self, ctx: &'a IrContext) -> &'a [OpRef] {
        &ctx.block(self.block(ctx)).ops
    }

    /// Append a top-level operation.
    pub fn push(&self, ctx: &mut IrContext, op: OpRef) {
        let block = self.block(ctx);
        ctx.push_op(block, op);
    }

    pub fn location(&self, ctx: &IrContext) -> Location {
        ctx.op(self.0).location
    }
}
