//! Arith dialect: constants, binary arithmetic and comparisons.

use std::fmt;

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::ir::Symbol;
use crate::ops::{ConversionError, DialectOp, check_arity, dialect_op, full_name, required_attr};
use crate::refs::{AttrRef, OpRef, TypeRef, ValueRef};
use crate::types::Location;

// ============================================================================
// arith.const
// ============================================================================

dialect_op!("arith"."const" => Const, attrs: ["value"], operands: 0, results: 1);

/// Constant with an explicit value attribute (int or float bits).
pub fn r#const(ctx: &mut IrContext, location: Location, ty: TypeRef, value: AttrRef) -> Const {
    let data = OperationDataBuilder::new(location, Symbol::new("arith"), Symbol::new("const"))
        .attr("value", value)
        .result(ty)
        .build(ctx);
    Const(ctx.create_op(data))
}

/// Integer constant. The value is stored as its two's complement bits.
pub fn const_int(ctx: &mut IrContext, location: Location, ty: TypeRef, value: i64) -> Const {
    let value = ctx.attrs.int(value as u64);
    r#const(ctx, location, ty, value)
}

pub fn const_float(ctx: &mut IrContext, location: Location, ty: TypeRef, value: f64) -> Const {
    let value = ctx.attrs.float(value);
    r#const(ctx, location, ty, value)
}

impl Const {
    pub fn value(&self, ctx: &IrContext) -> AttrRef {
        required_attr(ctx, self.0, "value")
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

// ============================================================================
// Binary operations
// ============================================================================

/// Two-operand arithmetic and bitwise operations. Result type is the
/// operand type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 8] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    fn from_name(name: Symbol) -> Option<Self> {
        Self::ALL.into_iter().find(|op| name == op.name())
    }
}

/// Wrapper for any of the `arith` binary ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Binary(OpRef);

impl Binary {
    pub fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError> {
        let data = ctx.op(op);
        if data.dialect == "arith" && BinaryOp::from_name(data.name).is_some() {
            check_arity(ctx, op, Some(2), Some(1))?;
            Ok(Self(op))
        } else {
            Err(ConversionError::WrongOperation {
                expected: "arith binary op",
                actual: full_name(ctx, op),
            })
        }
    }

    pub fn op_ref(&self) -> OpRef {
        self.0
    }

    pub fn kind(&self, ctx: &IrContext) -> BinaryOp {
        match BinaryOp::from_name(ctx.op(self.0).name) {
            Some(kind) => kind,
            None => unreachable!("Binary wraps {}", full_name(ctx, self.0)),
        }
    }

    pub fn lhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn rhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

pub fn binary(
    ctx: &mut IrContext,
    location: Location,
    kind: BinaryOp,
    lhs: ValueRef,
    rhs: ValueRef,
) -> Binary {
    let ty = ctx.value_ty(lhs);
    let data = OperationDataBuilder::new(location, Symbol::new("arith"), Symbol::new(kind.name()))
        .operand(lhs)
        .operand(rhs)
        .result(ty)
        .build(ctx);
    Binary(ctx.create_op(data))
}

macro_rules! binary_ctor {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $fn_name(
                ctx: &mut IrContext,
                location: Location,
                lhs: ValueRef,
                rhs: ValueRef,
            ) -> Binary {
                binary(ctx, location, BinaryOp::$kind, lhs, rhs)
            }
        )*
    };
}

binary_ctor! {
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    rem => Rem,
    and => And,
    or => Or,
    xor => Xor,
}

// ============================================================================
// arith.cmp
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl CmpPredicate {
    pub const ALL: [CmpPredicate; 10] = [
        CmpPredicate::Eq,
        CmpPredicate::Ne,
        CmpPredicate::Slt,
        CmpPredicate::Sle,
        CmpPredicate::Sgt,
        CmpPredicate::Sge,
        CmpPredicate::Ult,
        CmpPredicate::Ule,
        CmpPredicate::Ugt,
        CmpPredicate::Uge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CmpPredicate::Eq => "eq",
            CmpPredicate::Ne => "ne",
            CmpPredicate::Slt => "slt",
            CmpPredicate::Sle => "sle",
            CmpPredicate::Sgt => "sgt",
            CmpPredicate::Sge => "sge",
            CmpPredicate::Ult => "ult",
            CmpPredicate::Ule => "ule",
            CmpPredicate::Ugt => "ugt",
            CmpPredicate::Uge => "uge",
        }
    }

    pub fn from_symbol(sym: Symbol) -> Option<Self> {
        Self::ALL.into_iter().find(|p| sym == p.as_str())
    }
}

impl fmt::Display for CmpPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

dialect_op!("arith"."cmp" => Cmp, attrs: ["predicate"], operands: 2, results: 1);

/// Comparison producing `core.i1`.
pub fn cmp(
    ctx: &mut IrContext,
    location: Location,
    predicate: CmpPredicate,
    lhs: ValueRef,
    rhs: ValueRef,
) -> Cmp {
    let i1 = core::i1(ctx);
    let pred = ctx.attrs.symbol(Symbol::new(predicate.as_str()));
    let data = OperationDataBuilder::new(location, Symbol::new("arith"), Symbol::new("cmp"))
        .attr("predicate", pred)
        .operand(lhs)
        .operand(rhs)
        .result(i1)
        .build(ctx);
    Cmp(ctx.create_op(data))
}

impl Cmp {
    /// `None` if the stored predicate is not one of the known names.
    pub fn predicate(&self, ctx: &IrContext) -> Option<CmpPredicate> {
        let attr = required_attr(ctx, self.0, "predicate");
        ctx.attrs.as_symbol(attr).and_then(CmpPredicate::from_symbol)
    }

    pub fn lhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn rhs(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

/// Whether `op` is one of the ops defined here.
pub fn is_arith(ctx: &IrContext, op: OpRef) -> bool {
    Const::matches(ctx, op) || Cmp::matches(ctx, op) || Binary::from_op(ctx, op).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_location(ctx: &mut IrContext) -> Location {
        let path = ctx.paths.intern("/src/a.cairo");
        Location::new(path, 1, 1)
    }

    #[test]
    fn const_int_stores_bits() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i64_ty = core::i64(&mut ctx);
        let c = const_int(&mut ctx, loc, i64_ty, -1);
        assert_eq!(ctx.attrs.as_int(c.value(&ctx)), Some(u64::MAX));
        assert_eq!(c.result_ty(&ctx), i64_ty);
    }

    #[test]
    fn views_check_operand_and_result_counts() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let a = const_int(&mut ctx, loc, i32_ty, 1).result(&ctx);

        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("add"))
            .operand(a)
            .result(i32_ty)
            .build(&mut ctx);
        let lone_add = ctx.create_op(data);
        assert_eq!(
            Binary::from_op(&ctx, lone_add).unwrap_err(),
            ConversionError::OperandCount {
                expected: 2,
                found: 1
            }
        );

        let pred = ctx.attrs.symbol(Symbol::new("eq"));
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("cmp"))
            .attr("predicate", pred)
            .operands([a, a])
            .build(&mut ctx);
        let no_result = ctx.create_op(data);
        assert_eq!(
            Cmp::from_op(&ctx, no_result).unwrap_err(),
            ConversionError::ResultCount {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn binary_ops_share_one_wrapper() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let a = const_int(&mut ctx, loc, i32_ty, 1).result(&ctx);
        let b = const_int(&mut ctx, loc, i32_ty, 2).result(&ctx);

        for kind in BinaryOp::ALL {
            let op = binary(&mut ctx, loc, kind, a, b);
            let viewed = Binary::from_op(&ctx, op.op_ref()).unwrap();
            assert_eq!(viewed.kind(&ctx), kind);
            assert_eq!(ctx.value_ty(viewed.result(&ctx)), i32_ty);
        }

        let x = xor(&mut ctx, loc, a, b);
        assert_eq!(x.kind(&ctx), BinaryOp::Xor);
        assert_eq!((x.lhs(&ctx), x.rhs(&ctx)), (a, b));
    }

    #[test]
    fn cmp_yields_i1_and_predicate() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let a = const_int(&mut ctx, loc, i32_ty, 1).result(&ctx);
        let c = cmp(&mut ctx, loc, CmpPredicate::Sge, a, a);
        let i1 = core::i1(&mut ctx);
        assert_eq!(ctx.value_ty(c.result(&ctx)), i1);
        assert_eq!(c.predicate(&ctx), Some(CmpPredicate::Sge));
    }

    #[test]
    fn binary_from_op_rejects_const() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);
        let c = const_int(&mut ctx, loc, i32_ty, 1);
        assert!(Binary::from_op(&ctx, c.op_ref()).is_err());
        assert!(is_arith(&ctx, c.op_ref()));
    }
}
