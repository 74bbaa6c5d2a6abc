//! Supported-subset validation.
//!
//! Runs before translation so that an unsupported construct fails the whole
//! call before any backend state is built.

use std::ops::ControlFlow;

use trunk_ir::dialect::{adt, arith, cf, core, func};
use trunk_ir::ops::full_name;
use trunk_ir::walk::{self, WalkAction};
use trunk_ir::{DialectOp, IrContext, OpRef};

use crate::{TranslationError, TranslationResult};

/// Whether the translator understands `op`.
pub fn is_supported_op(ctx: &IrContext, op: OpRef) -> bool {
    func::Func::matches(ctx, op)
        || func::Return::matches(ctx, op)
        || func::Call::matches(ctx, op)
        || func::Unreachable::matches(ctx, op)
        || arith::is_arith(ctx, op)
        || cf::Br::matches(ctx, op)
        || cf::CondBr::matches(ctx, op)
        || adt::StructNew::matches(ctx, op)
        || adt::StructGet::matches(ctx, op)
}

/// Names of every unsupported op in `module`, in walk order.
pub fn unsupported_ops(ctx: &IrContext, module: core::Module) -> Vec<String> {
    let mut found = Vec::new();
    let _ = walk::walk_region::<()>(ctx, module.body(ctx), &mut |op| {
        if !is_supported_op(ctx, op) {
            found.push(full_name(ctx, op));
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    found
}

/// Fail with the first unsupported op, if any.
pub fn validate_supported(ctx: &IrContext, module: core::Module) -> TranslationResult<()> {
    match unsupported_ops(ctx, module).into_iter().next() {
        Some(name) => {
            tracing::debug!(op = %name, "unsupported operation");
            Err(TranslationError::unsupported(name))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trunk_ir::{Location, OperationDataBuilder, Symbol};

    #[test]
    fn reports_unknown_ops_by_name() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("/src/a.cairo");
        let loc = Location::new(path, 1, 1);
        let nil = core::nil(&mut ctx);
        let m = core::module(&mut ctx, loc, Symbol::new("m"));
        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], nil);
        let entry = f.entry_block(&ctx).unwrap();
        let data = OperationDataBuilder::new(loc, Symbol::new("scf"), Symbol::new("yield"))
            .build(&mut ctx);
        let odd = ctx.create_op(data);
        ctx.push_op(entry, odd);
        let ret = func::r#return(&mut ctx, loc, []);
        ctx.push_op(entry, ret.op_ref());
        m.push(&mut ctx, f.op_ref());

        assert_eq!(unsupported_ops(&ctx, m), vec!["scf.yield".to_owned()]);
        let err = validate_supported(&ctx, m).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported operation: scf.yield");
    }
}
