//! Structural verification of a module before translation.
//!
//! Checks, per function:
//!
//! 1. **Terminators**: every body block ends in a terminator and contains
//!    none before its end.
//! 2. **Scope**: every operand references a value defined within the
//!    function's region tree (block args + op results).
//! 3. **Successors**: `cf.br` has one successor, `cf.cond_br` two.
//! 4. **Signature**: the `type` attribute is a `core.func` type.
//!
//! Use-chain consistency is checked module-wide: the chain stored in
//! `IrContext` must exactly match the operands of all operations.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use derive_more::{Display, Error};

use crate::context::IrContext;
use crate::dialect::{cf, core, func, is_terminator};
use crate::ir::Symbol;
use crate::ops::{DialectOp, full_name};
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};
use crate::walk;

// ============================================================================
// Error types
// ============================================================================

/// A single verification failure.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum VerificationError {
    #[display("expected core.module at the root, found {found}")]
    NotAModule { found: String },

    #[display("malformed {op}: {message}")]
    Malformed { op: String, message: String },

    #[display("block {block} in @{function} does not end in a terminator")]
    MissingTerminator { function: String, block: BlockRef },

    #[display("{op} in @{function} terminates block {block} before its end")]
    EarlyTerminator {
        function: String,
        op: String,
        block: BlockRef,
    },

    #[display("stale value in @{function}: operand #{operand_index} of {consumer} references {value}")]
    UndefinedOperand {
        function: String,
        consumer: String,
        operand_index: usize,
        value: String,
    },

    #[display("{op} in @{function} has {found} successor(s), expected {expected}")]
    SuccessorCount {
        function: String,
        op: String,
        expected: usize,
        found: usize,
    },

    #[display("@{function} has non-function type {ty}")]
    NotAFunctionType { function: String, ty: String },

    #[display("use-chain: {_0}")]
    UseChain(String),
}

impl std::error::Error for VerificationError {}

/// All failures found in one verification run, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub struct VerificationErrors {
    pub errors: Vec<VerificationError>,
}

impl VerificationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerificationError> {
        self.errors.iter()
    }
}

impl fmt::Display for VerificationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} verification error(s):", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Verify the module rooted at `module`.
pub fn verify_module(ctx: &IrContext, module: OpRef) -> Result<(), VerificationErrors> {
    let mut errors = Vec::new();

    match core::Module::from_op(ctx, module) {
        Ok(m) => {
            let body = m.body(ctx);
            verify_functions_in_region(ctx, body, &mut errors);
            verify_use_chains(ctx, body, &mut errors);
        }
        Err(_) => errors.push(VerificationError::NotAModule {
            found: full_name(ctx, module),
        }),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = errors.len(), "module verification failed");
        Err(VerificationErrors { errors })
    }
}

fn verify_functions_in_region(
    ctx: &IrContext,
    region: RegionRef,
    errors: &mut Vec<VerificationError>,
) {
    for &block in &ctx.region(region).blocks {
        for &op in &ctx.block(block).ops {
            if func::Func::matches(ctx, op) {
                match func::Func::from_op(ctx, op) {
                    Ok(f) => verify_function(ctx, f, errors),
                    Err(e) => errors.push(VerificationError::Malformed {
                        op: full_name(ctx, op),
                        message: e.to_string(),
                    }),
                }
            }
            for &nested in &ctx.op(op).regions {
                verify_functions_in_region(ctx, nested, errors);
            }
        }
    }
}

fn verify_function(ctx: &IrContext, f: func::Func, errors: &mut Vec<VerificationError>) {
    let name = function_name(ctx, f.op_ref());

    match ctx
        .op_attr(f.op_ref(), Symbol::new("type"))
        .and_then(|a| ctx.attrs.as_type(a))
    {
        Some(ty) if core::func_type_parts(ctx, ty).is_some() => {}
        Some(ty) => errors.push(VerificationError::NotAFunctionType {
            function: name.clone(),
            ty: crate::printer::print_type(ctx, ty),
        }),
        None => errors.push(VerificationError::Malformed {
            op: full_name(ctx, f.op_ref()),
            message: "attribute `type` is not a type".to_owned(),
        }),
    }

    let body = f.body(ctx);
    verify_terminators(ctx, body, &name, errors);

    let mut defined = HashSet::new();
    collect_defined_in_region(ctx, body, &mut defined);
    check_operands_in_region(ctx, body, &defined, &name, errors);
}

fn function_name(ctx: &IrContext, op: OpRef) -> String {
    ctx.op_attr(op, Symbol::new("sym_name"))
        .and_then(|a| ctx.attrs.as_symbol(a))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<unnamed>".to_owned())
}

// ============================================================================
// Terminators and successors
// ============================================================================

fn verify_terminators(
    ctx: &IrContext,
    region: RegionRef,
    function: &str,
    errors: &mut Vec<VerificationError>,
) {
    for &block in &ctx.region(region).blocks {
        let ops = &ctx.block(block).ops;
        match ops.last() {
            Some(&last) if is_terminator(ctx, last) => {}
            _ => errors.push(VerificationError::MissingTerminator {
                function: function.to_owned(),
                block,
            }),
        }

        for (i, &op) in ops.iter().enumerate() {
            if i + 1 < ops.len() && is_terminator(ctx, op) {
                errors.push(VerificationError::EarlyTerminator {
                    function: function.to_owned(),
                    op: full_name(ctx, op),
                    block,
                });
            }

            let expected = if cf::Br::matches(ctx, op) {
                Some(1)
            } else if cf::CondBr::matches(ctx, op) {
                Some(2)
            } else {
                None
            };
            let found = ctx.op(op).successors.len();
            if let Some(expected) = expected
                && expected != found
            {
                errors.push(VerificationError::SuccessorCount {
                    function: function.to_owned(),
                    op: full_name(ctx, op),
                    expected,
                    found,
                });
            }

            for &nested in &ctx.op(op).regions {
                verify_terminators(ctx, nested, function, errors);
            }
        }
    }
}

// ============================================================================
// Scope validation (value integrity)
// ============================================================================

fn collect_defined_in_region(ctx: &IrContext, region: RegionRef, defined: &mut HashSet<ValueRef>) {
    for &block in &ctx.region(region).blocks {
        collect_defined_in_block(ctx, block, defined);
    }
}

fn collect_defined_in_block(ctx: &IrContext, block: BlockRef, defined: &mut HashSet<ValueRef>) {
    defined.extend(ctx.block_args(block).iter().copied());
    for &op in &ctx.block(block).ops {
        defined.extend(ctx.op_results(op).iter().copied());
        for &nested in &ctx.op(op).regions {
            collect_defined_in_region(ctx, nested, defined);
        }
    }
}

/// Describe a value for diagnostic purposes.
fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => {
            let name = full_name(ctx, op);
            match ctx
                .op_attr(op, Symbol::new("sym_name"))
                .and_then(|a| ctx.attrs.as_symbol(a))
            {
                Some(s) => format!("result #{idx} of {name} (@{s})"),
                None => format!("result #{idx} of {name}"),
            }
        }
        ValueDef::BlockArg(block, idx) => format!("block arg #{idx} of {block}"),
    }
}

fn check_operands_in_region(
    ctx: &IrContext,
    region: RegionRef,
    defined: &HashSet<ValueRef>,
    function: &str,
    errors: &mut Vec<VerificationError>,
) {
    for &block in &ctx.region(region).blocks {
        for &op in &ctx.block(block).ops {
            for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
                if !defined.contains(&operand) {
                    errors.push(VerificationError::UndefinedOperand {
                        function: function.to_owned(),
                        consumer: full_name(ctx, op),
                        operand_index: i,
                        value: describe_value(ctx, operand),
                    });
                }
            }
            for &nested in &ctx.op(op).regions {
                check_operands_in_region(ctx, nested, defined, function, errors);
            }
        }
    }
}

// ============================================================================
// Use-chain consistency
// ============================================================================

/// Check both directions: every operand has a use-chain entry, and every
/// use-chain entry of a value defined in `body` points at a real operand.
fn verify_use_chains(ctx: &IrContext, body: RegionRef, errors: &mut Vec<VerificationError>) {
    let mut actual_uses: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let mut defined = HashSet::new();
    collect_defined_in_region(ctx, body, &mut defined);

    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
            actual_uses.insert((operand, op, idx as u32));
        }
        ControlFlow::Continue(walk::WalkAction::Advance)
    });

    let mut sorted: Vec<_> = actual_uses.iter().copied().collect();
    sorted.sort();
    for (val, op, idx) in sorted {
        let found = ctx
            .uses(val)
            .iter()
            .any(|u| u.user == op && u.operand_index == idx);
        if !found {
            errors.push(VerificationError::UseChain(format!(
                "operand #{idx} of {} ({op}) uses {val} but no use-chain entry exists",
                full_name(ctx, op),
            )));
        }
    }

    let mut values: Vec<_> = defined.into_iter().collect();
    values.sort();
    for val in values {
        for u in ctx.uses(val) {
            if !actual_uses.contains(&(val, u.user, u.operand_index)) {
                errors.push(VerificationError::UseChain(format!(
                    "entry for {val} claims use by {} operand #{}, but no such operand exists",
                    u.user, u.operand_index,
                )));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockData, OperationDataBuilder};
    use crate::dialect::arith;
    use crate::types::Location;

    fn test_location(ctx: &mut IrContext) -> Location {
        let path = ctx.paths.intern("/src/test.cairo");
        Location::new(path, 1, 1)
    }

    fn module_with(ctx: &mut IrContext, f: func::Func) -> core::Module {
        let loc = f.location(ctx);
        let m = core::module(ctx, loc, Symbol::new("test"));
        m.push(ctx, f.op_ref());
        m
    }

    #[test]
    fn well_formed_module_passes() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let f = func::func(&mut ctx, loc, Symbol::new("add"), &[i32_ty, i32_ty], i32_ty);
        let entry = f.entry_block(&ctx).unwrap();
        let (a, b) = (ctx.block_arg(entry, 0), ctx.block_arg(entry, 1));
        let sum = arith::add(&mut ctx, loc, a, b);
        ctx.push_op(entry, sum.op_ref());
        let value = sum.result(&ctx);
        let ret = func::r#return(&mut ctx, loc, [value]);
        ctx.push_op(entry, ret.op_ref());
        let m = module_with(&mut ctx, f);

        assert_eq!(verify_module(&ctx, m.op_ref()), Ok(()));
    }

    #[test]
    fn declarations_pass() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i64_ty = core::i64(&mut ctx);
        let f = func::declaration(&mut ctx, loc, Symbol::new("puts"), &[i64_ty], i64_ty);
        let m = module_with(&mut ctx, f);
        assert!(verify_module(&ctx, m.op_ref()).is_ok());
    }

    #[test]
    fn block_without_terminator() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], i32_ty);
        let entry = f.entry_block(&ctx).unwrap();
        let c = arith::const_int(&mut ctx, loc, i32_ty, 7);
        ctx.push_op(entry, c.op_ref());
        let m = module_with(&mut ctx, f);

        let errors = verify_module(&ctx, m.op_ref()).unwrap_err();
        assert_eq!(
            errors.errors,
            vec![VerificationError::MissingTerminator {
                function: "f".to_owned(),
                block: entry,
            }]
        );
    }

    #[test]
    fn terminator_in_the_middle() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let nil = core::nil(&mut ctx);
        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], nil);
        let entry = f.entry_block(&ctx).unwrap();
        let first = func::r#return(&mut ctx, loc, []);
        ctx.push_op(entry, first.op_ref());
        let second = func::r#return(&mut ctx, loc, []);
        ctx.push_op(entry, second.op_ref());
        let m = module_with(&mut ctx, f);

        let errors = verify_module(&ctx, m.op_ref()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors.errors[0],
            VerificationError::EarlyTerminator { op, .. } if op == "func.return"
        ));
    }

    #[test]
    fn operand_from_another_function() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);

        let other = func::func(&mut ctx, loc, Symbol::new("other"), &[i32_ty], i32_ty);
        let foreign = ctx.block_arg(other.entry_block(&ctx).unwrap(), 0);

        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], i32_ty);
        let entry = f.entry_block(&ctx).unwrap();
        let ret = func::r#return(&mut ctx, loc, [foreign]);
        ctx.push_op(entry, ret.op_ref());
        let m = module_with(&mut ctx, f);

        let errors = verify_module(&ctx, m.op_ref()).unwrap_err();
        let message = errors.to_string();
        assert!(message.contains("stale value in @f"), "{message}");
        assert!(message.contains("operand #0 of func.return"), "{message}");
    }

    #[test]
    fn branch_with_missing_successor() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let nil = core::nil(&mut ctx);
        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], nil);
        let entry = f.entry_block(&ctx).unwrap();
        let data = OperationDataBuilder::new(loc, Symbol::new("cf"), Symbol::new("br"))
            .build(&mut ctx);
        let br = ctx.create_op(data);
        ctx.push_op(entry, br);
        let m = module_with(&mut ctx, f);

        let errors = verify_module(&ctx, m.op_ref()).unwrap_err();
        assert_eq!(
            errors.errors,
            vec![VerificationError::SuccessorCount {
                function: "f".to_owned(),
                op: "cf.br".to_owned(),
                expected: 1,
                found: 0,
            }]
        );
    }

    #[test]
    fn function_type_must_be_core_func() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let sym = ctx.attrs.symbol(Symbol::new("f"));
        let ty = ctx.attrs.ty(i32_ty);
        let entry = ctx.create_block(BlockData::new(loc, []));
        let body = ctx.create_region(crate::context::RegionData::new(loc, [entry]));
        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .attr("sym_name", sym)
            .attr("type", ty)
            .region(body)
            .build(&mut ctx);
        let op = ctx.create_op(data);
        let ret = func::r#return(&mut ctx, loc, []);
        ctx.push_op(entry, ret.op_ref());
        let f = func::Func::from_op(&ctx, op).unwrap();
        let m = module_with(&mut ctx, f);

        let errors = verify_module(&ctx, m.op_ref()).unwrap_err();
        assert_eq!(
            errors.errors,
            vec![VerificationError::NotAFunctionType {
                function: "f".to_owned(),
                ty: "core.i32".to_owned(),
            }]
        );
    }

    #[test]
    fn root_must_be_a_module() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let trap = func::unreachable(&mut ctx, loc);
        let errors = verify_module(&ctx, trap.op_ref()).unwrap_err();
        assert_eq!(
            errors.errors,
            vec![VerificationError::NotAModule {
                found: "func.unreachable".to_owned(),
            }]
        );
    }
}
