//! LLVM-flavoured text dump of a backend module.
//!
//! Output depends only on the module contents, so two translations of the
//! same IR print identically.

use std::fmt::Write;

use crate::context::BackendContext;
use crate::metadata::{MetadataId, MetadataNode};
use crate::module::{BackendModule, Function, Inst, InstKind, Value};

pub fn print_module(module: &BackendModule<'_>) -> String {
    let ctx = module.context();
    let mut out = String::new();
    let _ = writeln!(out, "; ModuleID = '{}'", module.name);
    let _ = writeln!(out, "target triple = \"{}\"", ctx.triple());

    for function in module.functions.values() {
        out.push('\n');
        print_function(module, function, &mut out);
    }

    if module.metadata.is_empty() && module.module_flags.is_empty() {
        return out;
    }

    out.push('\n');
    for (name, nodes) in &module.named_metadata {
        let _ = writeln!(out, "!{name} = !{{{}}}", join(nodes.iter().map(|n| n.to_string())));
    }
    let flag_base = module.metadata.len();
    if !module.module_flags.is_empty() {
        let ids = (0..module.module_flags.len()).map(|i| format!("!{}", flag_base + i));
        let _ = writeln!(out, "!llvm.module.flags = !{{{}}}", join(ids));
    }

    out.push('\n');
    for (id, node) in module.metadata.iter() {
        let distinct = if module.metadata.is_distinct(id) {
            "distinct "
        } else {
            ""
        };
        let _ = writeln!(out, "{id} = {distinct}{}", node_body(node));
    }
    for (i, flag) in module.module_flags.iter().enumerate() {
        let _ = writeln!(
            out,
            "!{} = !{{i32 {}, !\"{}\", i32 {}}}",
            flag_base + i,
            flag.behavior as u32,
            flag.key,
            flag.value
        );
    }
    out
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

fn print_function(module: &BackendModule<'_>, function: &Function, out: &mut String) {
    let ctx = module.context();
    let (ret, params) = function.signature(ctx);
    let params = join(params.into_iter().map(|p| ctx.display_type(p).to_string()));
    let keyword = if function.is_declaration() {
        "declare"
    } else {
        "define"
    };
    let _ = write!(
        out,
        "{keyword} {} @{}({params})",
        ctx.display_type(ret),
        function.name
    );
    if let Some(sp) = function.subprogram {
        let _ = write!(out, " !dbg {sp}");
    }
    if function.is_declaration() {
        out.push('\n');
        return;
    }
    out.push_str(" {\n");
    for (block, data) in function.blocks.iter() {
        let _ = write!(out, "{block}");
        if !data.params.is_empty() {
            let params = data
                .params
                .iter()
                .map(|&p| format!("{p}: {}", ctx.display_type(function.value_type(p))));
            let _ = write!(out, "({})", join(params));
        }
        out.push_str(":\n");
        for inst in &data.insts {
            out.push_str("  ");
            print_inst(module, function, inst, out);
            out.push('\n');
        }
    }
    out.push_str("}\n");
}

fn typed(ctx: &BackendContext, function: &Function, v: Value) -> String {
    format!("{} {v}", ctx.display_type(function.value_type(v)))
}

fn print_inst(module: &BackendModule<'_>, function: &Function, inst: &Inst, out: &mut String) {
    let ctx = module.context();
    if let Some(result) = inst.result {
        let _ = write!(out, "{result} = ");
    }
    let ty_of = |v: Value| ctx.display_type(function.value_type(v));
    let _ = match &inst.kind {
        InstKind::Iconst { bits } => {
            let ty = inst.result.map(ty_of);
            match ty {
                Some(ty) => write!(out, "iconst {ty} {}", *bits as i64),
                None => write!(out, "iconst {}", *bits as i64),
            }
        }
        InstKind::Fconst { bits } => match inst.result.map(ty_of) {
            Some(ty) => write!(out, "fconst {ty} {:?}", f64::from_bits(*bits)),
            None => write!(out, "fconst {:?}", f64::from_bits(*bits)),
        },
        InstKind::Binary { op, lhs, rhs } => {
            write!(out, "{} {}, {rhs}", op.mnemonic(), typed(ctx, function, *lhs))
        }
        InstKind::Icmp { pred, lhs, rhs } => {
            write!(out, "icmp {pred} {}, {rhs}", typed(ctx, function, *lhs))
        }
        InstKind::Fcmp { pred, lhs, rhs } => write!(
            out,
            "fcmp {} {}, {rhs}",
            pred.as_str(),
            typed(ctx, function, *lhs)
        ),
        InstKind::Call { callee, args } => {
            let ret = match inst.result {
                Some(r) => ty_of(r).to_string(),
                None => "void".to_owned(),
            };
            let args = join(args.iter().map(|&a| typed(ctx, function, a)));
            write!(out, "call {ret} @{}({args})", module.function(*callee).name)
        }
        InstKind::Ret { value: Some(v) } => write!(out, "ret {}", typed(ctx, function, *v)),
        InstKind::Ret { value: None } => write!(out, "ret void"),
        InstKind::Br { dest, args } if args.is_empty() => write!(out, "br {dest}"),
        InstKind::Br { dest, args } => {
            let args = join(args.iter().map(|a| a.to_string()));
            write!(out, "br {dest}({args})")
        }
        InstKind::CondBr {
            cond,
            then_dest,
            else_dest,
        } => write!(out, "br {}, {then_dest}, {else_dest}", typed(ctx, function, *cond)),
        InstKind::Unreachable => write!(out, "unreachable"),
        InstKind::Undef => match inst.result.map(ty_of) {
            Some(ty) => write!(out, "undef {ty}"),
            None => write!(out, "undef"),
        },
        InstKind::InsertValue {
            aggregate,
            value,
            index,
        } => write!(
            out,
            "insertvalue {}, {}, {index}",
            typed(ctx, function, *aggregate),
            typed(ctx, function, *value)
        ),
        InstKind::ExtractValue { aggregate, index } => write!(
            out,
            "extractvalue {}, {index}",
            typed(ctx, function, *aggregate)
        ),
    };
    if let Some(dbg) = inst.dbg {
        let _ = write!(out, ", !dbg {dbg}");
    }
}

/// `DW_TAG_base_type` style: lowercase suffix.
fn dw(prefix: &str, name: Option<&'static str>, raw: u32) -> String {
    match name {
        Some(name) => format!("{prefix}{}", name.to_ascii_lowercase()),
        None => format!("{raw:#x}"),
    }
}

/// Language names keep their case, e.g. `DW_LANG_C_plus_plus_11`.
fn dw_lang(name: Option<&'static str>, raw: u32) -> String {
    match name {
        Some(name) => {
            let (head, tail) = name.split_at(1);
            format!("DW_LANG_{head}{}", tail.to_ascii_lowercase())
        }
        None => format!("{raw:#x}"),
    }
}

fn node_ref(id: Option<MetadataId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "null".to_owned(),
    }
}

fn node_body(node: &MetadataNode) -> String {
    match node {
        MetadataNode::File {
            filename,
            directory,
        } => format!("!DIFile(filename: {filename:?}, directory: {directory:?})"),
        MetadataNode::BasicType {
            tag,
            name,
            size_in_bits,
            encoding,
        } => format!(
            "!DIBasicType(tag: {}, name: {name:?}, size: {size_in_bits}, encoding: {})",
            dw("DW_TAG_", tag.name(), tag.raw()),
            dw("DW_ATE_", encoding.name(), encoding.raw())
        ),
        MetadataNode::SubroutineType {
            calling_convention,
            types,
        } => format!(
            "!DISubroutineType(cc: {}, types: !{{{}}})",
            dw("DW_CC_", calling_convention.name(), calling_convention.raw()),
            join(types.iter().map(|t| node_ref(*t)))
        ),
        MetadataNode::CompileUnit {
            language,
            file,
            producer,
            is_optimized,
            emission_kind,
            name_table_kind,
        } => format!(
            "!DICompileUnit(language: {}, file: {file}, producer: {producer:?}, \
             isOptimized: {is_optimized}, emissionKind: {emission_kind}, \
             nameTableKind: {name_table_kind})",
            dw_lang(language.name(), language.raw())
        ),
        MetadataNode::Subprogram {
            scope,
            name,
            linkage_name,
            file,
            line,
            scope_line,
            sp_flags,
            ty,
            unit,
        } => format!(
            "!DISubprogram(name: {name:?}, linkageName: {linkage_name:?}, scope: {scope}, \
             file: {file}, line: {line}, type: {ty}, scopeLine: {scope_line}, \
             spFlags: {:#x}, unit: {unit})",
            sp_flags.bits()
        ),
        MetadataNode::LexicalBlock {
            scope,
            file,
            line,
            column,
        } => format!(
            "!DILexicalBlock(scope: {scope}, file: {file}, line: {line}, column: {column})"
        ),
        MetadataNode::Module {
            scope,
            name,
            config_macros,
            include_path,
            apinotes,
            file,
            line,
            is_decl,
        } => format!(
            "!DIModule(scope: {scope}, name: {name:?}, configMacros: {config_macros:?}, \
             includePath: {include_path:?}, apinotes: {apinotes:?}, file: {file}, \
             line: {line}, isDecl: {is_decl})"
        ),
        MetadataNode::Location {
            line,
            column,
            scope,
        } => format!("!DILocation(line: {line}, column: {column}, scope: {scope})"),
    }
}
