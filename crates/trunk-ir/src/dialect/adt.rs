//! Adt dialect: aggregate struct values.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ir::Symbol;
use crate::ops::{dialect_op, required_attr};
use crate::refs::{TypeRef, ValueRef};
use crate::types::{Location, TypeDataBuilder};

/// Struct type with `fields` in order.
pub fn struct_type(ctx: &mut IrContext, fields: impl IntoIterator<Item = TypeRef>) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new("adt"), Symbol::new("struct"))
            .params(fields)
            .build(),
    )
}

dialect_op!("adt"."struct_new" => StructNew, results: 1);

dialect_op!("adt"."struct_get" => StructGet, attrs: ["index"], operands: 1, results: 1);

/// Build a struct value of type `ty` from `fields`.
///
/// # Panics
///
/// Panics if `ty` is not a struct type or the field count differs.
#[track_caller]
pub fn struct_new(
    ctx: &mut IrContext,
    location: Location,
    ty: TypeRef,
    fields: &[ValueRef],
) -> StructNew {
    let expected = ctx.types.struct_field_count(ty);
    assert_eq!(
        expected,
        fields.len(),
        "struct_new: {ty} has {expected} field(s), got {}",
        fields.len()
    );
    let data = OperationDataBuilder::new(location, Symbol::new("adt"), Symbol::new("struct_new"))
        .operands(fields.iter().copied())
        .result(ty)
        .build(ctx);
    StructNew(ctx.create_op(data))
}

impl StructNew {
    pub fn fields<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

/// Read field `index` of a struct value. The result type comes from the
/// struct's field list.
///
/// # Panics
///
/// Panics if `value` is not a struct or `index` is out of range.
#[track_caller]
pub fn struct_get(
    ctx: &mut IrContext,
    location: Location,
    value: ValueRef,
    index: u32,
) -> StructGet {
    let struct_ty = ctx.value_ty(value);
    let field_ty = ctx.types.struct_field_type_at(struct_ty, index as usize);
    let index = ctx.attrs.int(u64::from(index));
    let data = OperationDataBuilder::new(location, Symbol::new("adt"), Symbol::new("struct_get"))
        .attr("index", index)
        .operand(value)
        .result(field_ty)
        .build(ctx);
    StructGet(ctx.create_op(data))
}

impl StructGet {
    pub fn value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    /// Field index, or `None` if the attribute is not an integer that fits
    /// in `u32`.
    pub fn index(&self, ctx: &IrContext) -> Option<u32> {
        let attr = required_attr(ctx, self.0, "index");
        ctx.attrs
            .as_int(attr)
            .and_then(|index| u32::try_from(index).ok())
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BlockData;
    use crate::dialect::core;

    #[test]
    fn struct_get_uses_field_type() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("/src/a.cairo");
        let loc = Location::new(path, 1, 1);
        let i8_ty = core::i8(&mut ctx);
        let i64_ty = core::i64(&mut ctx);
        let pair = struct_type(&mut ctx, [i8_ty, i64_ty]);

        let block = ctx.create_block(BlockData::new(loc, [pair]));
        let arg = ctx.block_arg(block, 0);
        let get = struct_get(&mut ctx, loc, arg, 1);
        assert_eq!(ctx.value_ty(get.result(&ctx)), i64_ty);
        assert_eq!(get.index(&ctx), Some(1));
        assert_eq!(get.value(&ctx), arg);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn struct_get_past_last_field() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("/src/a.cairo");
        let loc = Location::new(path, 1, 1);
        let i8_ty = core::i8(&mut ctx);
        let single = struct_type(&mut ctx, [i8_ty]);
        let block = ctx.create_block(BlockData::new(loc, [single]));
        let arg = ctx.block_arg(block, 0);
        struct_get(&mut ctx, loc, arg, 1);
    }
}
