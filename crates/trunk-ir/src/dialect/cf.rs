//! Cf dialect: unstructured branches between blocks.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ir::Symbol;
use crate::ops::dialect_op;
use crate::refs::{BlockRef, ValueRef};
use crate::types::Location;

dialect_op! {
    /// Unconditional branch passing `args` to the destination's block
    /// arguments.
    "cf"."br" => Br
}

dialect_op! {
    /// Two-way branch on an `i1`. Neither destination receives arguments.
    "cf"."cond_br" => CondBr, operands: 1
}

pub fn br(
    ctx: &mut IrContext,
    location: Location,
    dest: BlockRef,
    args: impl IntoIterator<Item = ValueRef>,
) -> Br {
    let data = OperationDataBuilder::new(location, Symbol::new("cf"), Symbol::new("br"))
        .operands(args)
        .successor(dest)
        .build(ctx);
    Br(ctx.create_op(data))
}

impl Br {
    pub fn dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

pub fn cond_br(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    then_dest: BlockRef,
    else_dest: BlockRef,
) -> CondBr {
    let data = OperationDataBuilder::new(location, Symbol::new("cf"), Symbol::new("cond_br"))
        .operand(cond)
        .successor(then_dest)
        .successor(else_dest)
        .build(ctx);
    CondBr(ctx.create_op(data))
}

impl CondBr {
    pub fn cond(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn then_dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }

    pub fn else_dest(&self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[1]
    }
}
