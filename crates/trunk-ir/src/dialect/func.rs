//! Func dialect: function definitions, calls and returns.

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::dialect::core;
use crate::ir::Symbol;
use crate::ops::{dialect_op, required_attr};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::types::Location;

dialect_op! {
    /// Function definition. An empty body region makes it a declaration.
    "func"."func" => Func, attrs: ["sym_name", "type"]
}

dialect_op!("func"."return" => Return);

dialect_op!("func"."call" => Call, attrs: ["callee"]);

dialect_op!("func"."unreachable" => Unreachable);

fn build_func(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    fn_ty: TypeRef,
    body: RegionRef,
) -> Func {
    let sym = ctx.attrs.symbol(name);
    let ty = ctx.attrs.ty(fn_ty);
    let data = OperationDataBuilder::new(location, Symbol::new("func"), Symbol::new("func"))
        .attr("sym_name", sym)
        .attr("type", ty)
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

/// Define a function whose entry block takes `params` as arguments.
pub fn func(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    params: &[TypeRef],
    result: TypeRef,
) -> Func {
    let fn_ty = core::func_type(ctx, result, params.iter().copied());
    let entry = ctx.create_block(BlockData::new(location, params.iter().copied()));
    let body = ctx.create_region(RegionData::new(location, [entry]));
    build_func(ctx, location, name, fn_ty, body)
}

/// Declare an external function.
pub fn declaration(
    ctx: &mut IrContext,
    location: Location,
    name: Symbol,
    params: &[TypeRef],
    result: TypeRef,
) -> Func {
    let fn_ty = core::func_type(ctx, result, params.iter().copied());
    let body = ctx.create_region(RegionData::new(location, []));
    build_func(ctx, location, name, fn_ty, body)
}

impl Func {
    pub fn name(&self, ctx: &IrContext) -> Symbol {
        let attr = required_attr(ctx, self.0, "sym_name");
        ctx.attrs.as_symbol(attr).unwrap_or_else(|| {
            panic!("func.func sym_name is a {}", ctx.attrs.get(attr).kind_name())
        })
    }

    /// The `core.func` type of this function.
    pub fn ty(&self, ctx: &IrContext) -> TypeRef {
        let attr = required_attr(ctx, self.0, "type");
        ctx.attrs.as_type(attr).unwrap_or_else(|| {
            panic!("func.func type is a {}", ctx.attrs.get(attr).kind_name())
        })
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn is_declaration(&self, ctx: &IrContext) -> bool {
        ctx.region(self.body(ctx)).blocks.is_empty()
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    pub fn blocks<'a>(&self, ctx: &'a IrContext) -> &'a [BlockRef] {
        &ctx.region(self.body(ctx)).blocks
    }

    pub fn location(&self, ctx: &IrContext) -> Location {
        ctx.op(self.0).location
    }
}

pub fn r#return(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let data = OperationDataBuilder::new(location, Symbol::new("func"), Symbol::new("return"))
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

/// Direct call. `result` is `None` for calls that produce no value.
pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    result: Option<TypeRef>,
) -> Call {
    let callee = ctx.attrs.symbol(callee);
    let data = OperationDataBuilder::new(location, Symbol::new("func"), Symbol::new("call"))
        .attr("callee", callee)
        .operands(args)
        .results(result)
        .build(ctx);
    Call(ctx.create_op(data))
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Symbol {
        let attr = required_attr(ctx, self.0, "callee");
        ctx.attrs.as_symbol(attr).unwrap_or_else(|| {
            panic!("func.call callee is a {}", ctx.attrs.get(attr).kind_name())
        })
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn result(&self, ctx: &IrContext) -> Option<ValueRef> {
        ctx.op_results(self.0).first().copied()
    }
}

pub fn unreachable(ctx: &mut IrContext, location: Location) -> Unreachable {
    let data =
        OperationDataBuilder::new(location, Symbol::new("func"), Symbol::new("unreachable"))
            .build(ctx);
    Unreachable(ctx.create_op(data))
}

/// Functions defined or declared at the top level of a module.
pub fn functions(ctx: &IrContext, module: core::Module) -> Vec<Func> {
    use crate::ops::DialectOp;

    module
        .ops(ctx)
        .iter()
        .filter_map(|&op: &OpRef| Func::from_op(ctx, op).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{ConversionError, DialectOp};

    fn test_location(ctx: &mut IrContext) -> Location {
        let path = ctx.paths.intern("/src/a.cairo");
        Location::new(path, 1, 1)
    }

    #[test]
    fn func_with_entry_block() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let i32_ty = core::i32(&mut ctx);

        let f = func(&mut ctx, loc, Symbol::new("add"), &[i32_ty, i32_ty], i32_ty);
        assert_eq!(f.name(&ctx), "add");
        assert!(!f.is_declaration(&ctx));

        let entry = f.entry_block(&ctx).unwrap();
        assert_eq!(ctx.block_args(entry).len(), 2);

        let (result, params) = core::func_type_parts(&ctx, f.ty(&ctx)).unwrap();
        assert_eq!(result, i32_ty);
        assert_eq!(params, &[i32_ty, i32_ty]);
    }

    #[test]
    fn declaration_has_no_blocks() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let nil = core::nil(&mut ctx);
        let f = declaration(&mut ctx, loc, Symbol::new("abort"), &[], nil);
        assert!(f.is_declaration(&ctx));
        assert_eq!(f.entry_block(&ctx), None);
    }

    #[test]
    fn call_without_result() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let c = call(&mut ctx, loc, Symbol::new("abort"), [], None);
        assert_eq!(c.callee(&ctx), "abort");
        assert_eq!(c.result(&ctx), None);
        assert!(c.args(&ctx).is_empty());
    }

    #[test]
    fn from_op_rejects_other_ops() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let u = unreachable(&mut ctx, loc);
        let err = Return::from_op(&ctx, u.op_ref()).unwrap_err();
        assert_eq!(
            err,
            ConversionError::WrongOperation {
                expected: "func.return",
                actual: "func.unreachable".to_owned(),
            }
        );
    }

    #[test]
    fn from_op_requires_attributes() {
        let mut ctx = IrContext::new();
        let loc = test_location(&mut ctx);
        let data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("call"))
            .build(&mut ctx);
        let op = ctx.create_op(data);
        assert_eq!(
            Call::from_op(&ctx, op),
            Err(ConversionError::MissingAttribute("callee"))
        );
    }
}
