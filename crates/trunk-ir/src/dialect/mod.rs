//! Dialects understood by the verifier and the native backend.

pub mod adt;
pub mod arith;
pub mod cf;
pub mod core;
pub mod func;

use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::OpRef;

/// Whether `op` ends a block.
pub fn is_terminator(ctx: &IrContext, op: OpRef) -> bool {
    func::Return::matches(ctx, op)
        || func::Unreachable::matches(ctx, op)
        || cf::Br::matches(ctx, op)
        || cf::CondBr::matches(ctx, op)
}
