//! Common IR builders for pipeline tests.

use tribute_native::trunk_ir::attribute::{DiCompileUnitAttr, DiFileAttr, DiSubprogramAttr};
use tribute_native::trunk_ir::debug_info::{
    self, CallingConvention, EmissionKind, SourceLanguage, SubprogramFlags,
};
use tribute_native::trunk_ir::dialect::{arith, core, func};
use tribute_native::trunk_ir::{DialectOp, IrContext, Location, Symbol};

/// Route `tracing` output to the test harness. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn location(ctx: &mut IrContext, line: u32, column: u32) -> Location {
    let path = ctx.paths.intern("/work/main.cairo");
    Location::new(path, line, column)
}

#[allow(dead_code)]
pub struct DebugScopes {
    pub file: DiFileAttr,
    pub cu: DiCompileUnitAttr,
    pub sp: DiSubprogramAttr,
}

/// File, compile unit, and an `add` subprogram.
pub fn debug_scopes(ctx: &mut IrContext) -> DebugScopes {
    let name = ctx.attrs.string("main.cairo");
    let dir = ctx.attrs.string("/work");
    let file = debug_info::file(ctx, name, dir);

    let unit = ctx.attrs.unit();
    let cu_id = debug_info::distinct(ctx, unit);
    let producer = ctx.attrs.string("tribute-native");
    let cu = debug_info::compile_unit(
        ctx,
        cu_id,
        SourceLanguage::C,
        file,
        producer,
        false,
        EmissionKind::Full,
    );

    let sp_id = debug_info::distinct(ctx, unit);
    let int_name = ctx.attrs.string("i32");
    let i32_di = debug_info::basic_type(
        ctx,
        debug_info::DwTag::BASE_TYPE,
        int_name,
        32,
        debug_info::TypeEncoding::SIGNED,
    );
    let sig = debug_info::subroutine_type(ctx, CallingConvention::NORMAL, [i32_di, i32_di, i32_di]);
    let fn_name = ctx.attrs.string("add");
    let sp = debug_info::subprogram(
        ctx,
        sp_id,
        cu,
        file,
        fn_name,
        fn_name,
        file,
        1,
        1,
        SubprogramFlags::DEFINITION,
        sig,
    );
    DebugScopes { file, cu, sp }
}

/// `add(a: i32, b: i32) -> i32 { a + b }` plus `main() -> i32 { add(2, 3) }`.
pub fn add_program(ctx: &mut IrContext, sp: Option<DiSubprogramAttr>) -> core::Module {
    let i32_ty = core::i32(ctx);
    let module_loc = location(ctx, 1, 1);
    let m = core::module(ctx, module_loc, Symbol::new("main"));

    let fn_loc = match sp {
        Some(sp) => module_loc.with_scope(sp),
        None => module_loc,
    };
    let add = func::func(ctx, fn_loc, Symbol::new("add"), &[i32_ty, i32_ty], i32_ty);
    let entry = add.entry_block(ctx).unwrap();
    let a = ctx.block_arg(entry, 0);
    let b = ctx.block_arg(entry, 1);
    let body_loc = location(ctx, 2, 5);
    let sum = arith::add(ctx, body_loc, a, b);
    ctx.push_op(entry, sum.op_ref());
    let result = sum.result(ctx);
    let ret = func::r#return(ctx, body_loc, [result]);
    ctx.push_op(entry, ret.op_ref());
    m.push(ctx, add.op_ref());

    let main_loc = location(ctx, 5, 1);
    let main = func::func(ctx, main_loc, Symbol::new("main"), &[], i32_ty);
    let entry = main.entry_block(ctx).unwrap();
    let two = arith::const_int(ctx, main_loc, i32_ty, 2);
    ctx.push_op(entry, two.op_ref());
    let three = arith::const_int(ctx, main_loc, i32_ty, 3);
    ctx.push_op(entry, three.op_ref());
    let args = [two.result(ctx), three.result(ctx)];
    let call = func::call(ctx, main_loc, Symbol::new("add"), args, Some(i32_ty));
    ctx.push_op(entry, call.op_ref());
    let value = call.result(ctx).unwrap();
    let ret = func::r#return(ctx, main_loc, [value]);
    ctx.push_op(entry, ret.op_ref());
    m.push(ctx, main.op_ref());

    m
}
