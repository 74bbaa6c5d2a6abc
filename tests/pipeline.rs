//! End-to-end tests for the verify → translate → emit pipeline.

mod common;

use object::{Object, ObjectSymbol};
use tribute_native::trunk_ir::dialect::{core, func};
use tribute_native::trunk_ir::{DialectOp, IrContext, Symbol};
use tribute_native::trunk_ir_native_backend::{
    BackendContext, EmitErrorKind, OptLevel, TranslationErrorKind, print_module,
};
use tribute_native::{CompileOptions, PipelineErrorKind, compile};

use common::{add_program, debug_scopes, init_tracing, location};

fn defined_symbols(bytes: &[u8]) -> Vec<String> {
    let file = object::File::parse(bytes).unwrap();
    file.symbols()
        .filter(|sym| !sym.is_undefined())
        .filter_map(|sym| sym.name().ok().map(|n| n.trim_start_matches('_').to_owned()))
        .collect()
}

#[test]
fn test_compile_program_to_object() {
    init_tracing();
    let mut ctx = IrContext::new();
    let m = add_program(&mut ctx, None);
    let options = CompileOptions::default();
    let backend = options.backend_context();

    let output = compile(&ctx, m, &options, &backend).unwrap();
    let bytes = output.object.as_deref().unwrap();
    assert!(!bytes.is_empty());
    let symbols = defined_symbols(bytes);
    assert!(symbols.iter().any(|s| s == "add"), "symbols: {symbols:?}");
    assert!(symbols.iter().any(|s| s == "main"), "symbols: {symbols:?}");
}

#[test]
fn test_write_object_file() {
    init_tracing();
    let mut ctx = IrContext::new();
    let m = add_program(&mut ctx, None);
    let options = CompileOptions {
        opt_level: OptLevel::from(0usize),
        ..CompileOptions::default()
    };
    let backend = options.backend_context();
    let output = compile(&ctx, m, &options, &backend).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.o");
    output.write_object(&path).unwrap();
    let written = std::fs::read(&path).unwrap();
    assert_eq!(Some(written.as_slice()), output.object.as_deref());
}

#[test]
fn test_debug_info_survives_pipeline() {
    init_tracing();
    let mut ctx = IrContext::new();
    let scopes = debug_scopes(&mut ctx);
    let m = add_program(&mut ctx, Some(scopes.sp));
    let options = CompileOptions {
        target: Some("x86_64-unknown-linux-gnu".to_owned()),
        emit_object: false,
        ..CompileOptions::default()
    };
    let backend = options.backend_context();

    let output = compile(&ctx, m, &options, &backend).unwrap();
    assert!(output.object.is_none());
    let module = &output.module;
    assert_eq!(module.compile_units().len(), 1);
    assert_eq!(module.metadata.count_kind("DISubprogram"), 1);
    assert_eq!(module.metadata.count_kind("DIBasicType"), 1);
    assert_eq!(module.module_flag("Dwarf Version"), Some(5));

    insta::assert_snapshot!(print_module(module), @r#"
    ; ModuleID = 'main'
    target triple = "x86_64-unknown-linux-gnu"

    define i32 @add(i32, i32) !dbg !4 {
    bb0(%0: i32, %1: i32):
      %2 = add i32 %0, %1, !dbg !5
      ret i32 %2, !dbg !5
    }

    define i32 @main() {
    bb0:
      %0 = iconst i32 2
      %1 = iconst i32 3
      %2 = call i32 @add(i32 %0, i32 %1)
      ret i32 %2
    }

    !llvm.dbg.cu = !{!1}
    !llvm.module.flags = !{!6, !7}

    !0 = !DIFile(filename: "main.cairo", directory: "/work")
    !1 = distinct !DICompileUnit(language: DW_LANG_C, file: !0, producer: "tribute-native", isOptimized: false, emissionKind: FullDebug, nameTableKind: Default)
    !2 = !DIBasicType(tag: DW_TAG_base_type, name: "i32", size: 32, encoding: DW_ATE_signed)
    !3 = !DISubroutineType(cc: DW_CC_normal, types: !{!2, !2, !2})
    !4 = distinct !DISubprogram(name: "add", linkageName: "add", scope: !0, file: !0, line: 1, type: !3, scopeLine: 1, spFlags: 0x8, unit: !1)
    !5 = !DILocation(line: 2, column: 5, scope: !4)
    !6 = !{i32 2, !"Debug Info Version", i32 3}
    !7 = !{i32 7, !"Dwarf Version", i32 5}
    "#);
}

#[test]
fn test_verification_rejects_missing_terminator() {
    init_tracing();
    let mut ctx = IrContext::new();
    let loc = location(&mut ctx, 1, 1);
    let nil = core::nil(&mut ctx);
    let m = core::module(&mut ctx, loc, Symbol::new("broken"));
    let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], nil);
    m.push(&mut ctx, f.op_ref());

    let options = CompileOptions::default();
    let backend = options.backend_context();
    let err = compile(&ctx, m, &options, &backend).err().unwrap();
    match err.kind() {
        PipelineErrorKind::Verification(errors) => assert_eq!(errors.len(), 1),
        other => panic!("expected a verification error, got {other}"),
    }
}

#[test]
fn test_translation_error_names_the_op() {
    init_tracing();
    let mut ctx = IrContext::new();
    let loc = location(&mut ctx, 1, 1);
    let nil = core::nil(&mut ctx);
    let m = core::module(&mut ctx, loc, Symbol::new("odd"));
    let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], nil);
    let entry = f.entry_block(&ctx).unwrap();
    let data = tribute_native::trunk_ir::OperationDataBuilder::new(
        loc,
        Symbol::new("mem"),
        Symbol::new("fence"),
    )
    .build(&mut ctx);
    let fence = ctx.create_op(data);
    ctx.push_op(entry, fence);
    let ret = func::r#return(&mut ctx, loc, []);
    ctx.push_op(entry, ret.op_ref());
    m.push(&mut ctx, f.op_ref());

    let options = CompileOptions::default();
    let backend = options.backend_context();
    let err = compile(&ctx, m, &options, &backend).err().unwrap();
    match err.kind() {
        PipelineErrorKind::Translation(e) => {
            assert_eq!(
                e.kind(),
                &TranslationErrorKind::Unsupported("mem.fence".to_owned())
            );
        }
        other => panic!("expected a translation error, got {other}"),
    }
}

#[test]
fn test_target_mismatch_is_rejected() {
    let mut ctx = IrContext::new();
    let m = add_program(&mut ctx, None);
    let options = CompileOptions {
        target: Some("aarch64-unknown-linux-gnu".to_owned()),
        ..CompileOptions::default()
    };
    let backend = BackendContext::new("x86_64-unknown-linux-gnu");
    let err = compile(&ctx, m, &options, &backend).err().unwrap();
    assert!(matches!(err.kind(), PipelineErrorKind::Config(_)));
}

#[test]
fn test_invalid_target_fails_at_emission() {
    let mut ctx = IrContext::new();
    let m = add_program(&mut ctx, None);
    let options = CompileOptions {
        target: Some("bogus-target".to_owned()),
        ..CompileOptions::default()
    };
    let backend = options.backend_context();
    let err = compile(&ctx, m, &options, &backend).err().unwrap();
    match err.kind() {
        PipelineErrorKind::Emit(e) => assert!(matches!(e.kind(), EmitErrorKind::InvalidTarget(_))),
        other => panic!("expected an emit error, got {other}"),
    }
}
