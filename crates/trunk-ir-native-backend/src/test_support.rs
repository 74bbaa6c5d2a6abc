//! Shared IR fixtures for unit tests.

use trunk_ir::attribute::{DiCompileUnitAttr, DiFileAttr, DiSubprogramAttr};
use trunk_ir::debug_info::{self, CallingConvention, EmissionKind, SourceLanguage, SubprogramFlags};
use trunk_ir::dialect::{arith, core, func};
use trunk_ir::{DialectOp, IrContext, Location, Symbol};

pub(crate) fn location(ctx: &mut IrContext, line: u32, column: u32) -> Location {
    let path = ctx.paths.intern("/src/a.cairo");
    Location::new(path, line, column)
}

pub(crate) fn file(ctx: &mut IrContext) -> DiFileAttr {
    let name = ctx.attrs.string("a.cairo");
    let dir = ctx.attrs.string("/src");
    debug_info::file(ctx, name, dir)
}

/// A compile unit with a fresh distinct id.
pub(crate) fn compile_unit(ctx: &mut IrContext, file: DiFileAttr) -> DiCompileUnitAttr {
    let unit = ctx.attrs.unit();
    let id = debug_info::distinct(ctx, unit);
    let producer = ctx.attrs.string("compiler-v1");
    debug_info::compile_unit(
        ctx,
        id,
        SourceLanguage::C,
        file,
        producer,
        false,
        EmissionKind::Full,
    )
}

pub(crate) fn subprogram(
    ctx: &mut IrContext,
    cu: DiCompileUnitAttr,
    file: DiFileAttr,
    name: &str,
    line: u32,
) -> DiSubprogramAttr {
    let unit = ctx.attrs.unit();
    let id = debug_info::distinct(ctx, unit);
    let void = debug_info::null_type(ctx);
    let ty = debug_info::subroutine_type(ctx, CallingConvention::NORMAL, [void]);
    let name = ctx.attrs.string(name);
    debug_info::subprogram(
        ctx,
        id,
        cu,
        file,
        name,
        name,
        file,
        line,
        line,
        SubprogramFlags::DEFINITION,
        ty,
    )
}

/// `add(a: i32, b: i32) -> i32 { a + b }`, optionally under a subprogram.
pub(crate) fn add_module(ctx: &mut IrContext, sp: Option<DiSubprogramAttr>) -> core::Module {
    let mut loc = location(ctx, 1, 1);
    if let Some(sp) = sp {
        loc = loc.with_scope(sp);
    }
    let i32_ty = core::i32(ctx);
    let m = core::module(ctx, loc, Symbol::new("m"));
    let f = func::func(ctx, loc, Symbol::new("add"), &[i32_ty, i32_ty], i32_ty);
    let entry = f.entry_block(ctx).unwrap();
    let a = ctx.block_arg(entry, 0);
    let b = ctx.block_arg(entry, 1);
    let body_loc = location(ctx, 2, 5);
    let sum = arith::add(ctx, body_loc, a, b);
    ctx.push_op(entry, sum.op_ref());
    let result = sum.result(ctx);
    let ret = func::r#return(ctx, body_loc, [result]);
    ctx.push_op(entry, ret.op_ref());
    m.push(ctx, f.op_ref());
    m
}
