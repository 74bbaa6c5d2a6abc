//! Dialect operation wrappers.
//!
//! A wrapper is a `Copy` newtype over [`OpRef`] that has been checked to be a
//! particular `dialect.op`. Wrappers are created by the dialect constructors
//! or recovered from an arbitrary op with [`DialectOp::from_op`].

use derive_more::{Display, Error};

use crate::context::IrContext;
use crate::ir::Symbol;
use crate::refs::{AttrRef, OpRef};

/// Error when viewing an operation as a dialect-specific wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConversionError {
    /// Operation name doesn't match expected dialect.operation.
    #[display("expected `{expected}`, found `{actual}`")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    /// Missing required attribute.
    #[display("missing attribute `{_0}`")]
    MissingAttribute(#[error(not(source))] &'static str),
    /// Attribute has wrong kind.
    #[display("attribute `{_0}` has the wrong kind")]
    WrongAttributeType(#[error(not(source))] &'static str),
    /// Operand count differs from the op's fixed arity.
    #[display("expected {expected} operand(s), found {found}")]
    OperandCount { expected: usize, found: usize },
    /// Result count differs from the op's fixed arity.
    #[display("expected {expected} result(s), found {found}")]
    ResultCount { expected: usize, found: usize },
}

/// Trait for dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Symbol::new(Self::DIALECT_NAME) && data.name == Symbol::new(Self::OP_NAME)
    }
}

/// `dialect.op` name of an operation, for diagnostics.
pub fn full_name(ctx: &IrContext, op: OpRef) -> String {
    let data = ctx.op(op);
    format!("{}.{}", data.dialect, data.name)
}

/// Declare a wrapper type for `dialect.op`.
///
/// `from_op` checks the op name, the presence of the listed attribute keys,
/// and the operand/result counts when they are fixed. Constructors and
/// accessors are written by hand next to the declaration.
macro_rules! dialect_op {
    (
        $(#[$meta:meta])*
        $dialect:literal . $op:literal => $name:ident
        $(, attrs: [$($key:literal),* $(,)?])?
        $(, operands: $operands:literal)?
        $(, results: $results:literal)?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name($crate::refs::OpRef);

        impl $crate::ops::DialectOp for $name {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::context::IrContext,
                op: $crate::refs::OpRef,
            ) -> Result<Self, $crate::ops::ConversionError> {
                if !<Self as $crate::ops::DialectOp>::matches(ctx, op) {
                    return Err($crate::ops::ConversionError::WrongOperation {
                        expected: concat!($dialect, ".", $op),
                        actual: $crate::ops::full_name(ctx, op),
                    });
                }
                $($(
                    if ctx.op_attr(op, $crate::Symbol::new($key)).is_none() {
                        return Err($crate::ops::ConversionError::MissingAttribute($key));
                    }
                )*)?
                $(
                    $crate::ops::check_arity(ctx, op, Some($operands), None)?;
                )?
                $(
                    $crate::ops::check_arity(ctx, op, None, Some($results))?;
                )?
                Ok(Self(op))
            }

            fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }

        impl $name {
            /// Get the underlying OpRef.
            pub fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }
    };
}

pub(crate) use dialect_op;

/// Check fixed operand and result counts of `op`.
pub(crate) fn check_arity(
    ctx: &IrContext,
    op: OpRef,
    operands: Option<usize>,
    results: Option<usize>,
) -> Result<(), ConversionError> {
    if let Some(expected) = operands {
        let found = ctx.op_operands(op).len();
        if found != expected {
            return Err(ConversionError::OperandCount { expected, found });
        }
    }
    if let Some(expected) = results {
        let found = ctx.op_result_types(op).len();
        if found != expected {
            return Err(ConversionError::ResultCount { expected, found });
        }
    }
    Ok(())
}

/// Fetch an attribute a constructor always sets.
///
/// # Panics
///
/// Panics if the attribute is absent, which means the wrapper was built
/// around an op that bypassed `from_op`.
#[track_caller]
pub(crate) fn required_attr(ctx: &IrContext, op: OpRef, key: &'static str) -> AttrRef {
    match ctx.op_attr(op, Symbol::new(key)) {
        Some(attr) => attr,
        None => panic!("{} is missing attribute `{key}`", full_name(ctx, op)),
    }
}
