//! Text format printer.
//!
//! Debug-info attributes are hoisted into aliases printed ahead of the
//! module, in dependency order:
//!
//! ```text
//! #di0 = #di.file<"a.cairo" in "/src">
//! #di1 = #di.compile_unit<id = distinct[0]<unit>, language = C, file = #di0, ...>
//!
//! core.module @name {
//!   func.func @main(%0: core.i32) -> core.func(core.i32, core.i32) {
//!     %1 = arith.const {value = 42} : core.i32 loc("/src/a.cairo":3:5 in #di2)
//!     func.return %1
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::attribute::AttrData;
use crate::context::IrContext;
use crate::dialect::core;
use crate::ir::Symbol;
use crate::refs::*;
use crate::types::Location;

/// Print state for value numbering, block labeling and attribute aliases.
struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, String>,
    block_labels: HashMap<BlockRef, String>,
    next_value_num: usize,
    next_block_num: usize,
    aliases: HashMap<AttrRef, usize>,
    alias_order: Vec<AttrRef>,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value_num: 0,
            next_block_num: 0,
            aliases: HashMap::new(),
            alias_order: Vec::new(),
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) -> String {
        let name = format!("%{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(v, name.clone());
        name
    }

    fn get_value_name(&self, v: ValueRef) -> &str {
        self.value_names.get(&v).map(|s| s.as_str()).unwrap_or("%?")
    }

    fn assign_block_label(&mut self, b: BlockRef) -> String {
        let label = format!("^bb{}", self.next_block_num);
        self.next_block_num += 1;
        self.block_labels.insert(b, label.clone());
        label
    }

    fn get_block_label(&self, b: BlockRef) -> &str {
        self.block_labels
            .get(&b)
            .map(|s| s.as_str())
            .unwrap_or("^bb?")
    }

    fn reset_numbering(&mut self) {
        self.next_value_num = 0;
        self.next_block_num = 0;
        self.value_names.clear();
        self.block_labels.clear();
    }

    /// Register `attr` and everything it references, children first.
    fn collect_aliases(&mut self, attr: AttrRef) {
        if self.aliases.contains_key(&attr) {
            return;
        }
        let data = self.ctx.attrs.get(attr);
        for child in data.referenced_attrs() {
            self.collect_aliases(child);
        }
        if data.is_debug_info() && !self.aliases.contains_key(&attr) {
            self.aliases.insert(attr, self.alias_order.len());
            self.alias_order.push(attr);
        }
    }

    fn collect_region_aliases(&mut self, region: RegionRef) {
        let ctx = self.ctx;
        for &block in &ctx.region(region).blocks {
            if let Some(scope) = ctx.block(block).location.scope {
                self.collect_aliases(scope);
            }
            for &op in &ctx.block(block).ops {
                let data = ctx.op(op);
                for &attr in data.attributes.values() {
                    self.collect_aliases(attr);
                }
                if let Some(scope) = data.location.scope {
                    self.collect_aliases(scope);
                }
                for &nested in &data.regions {
                    self.collect_region_aliases(nested);
                }
            }
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print a module with its debug-info aliases as IR text.
pub fn print_module(ctx: &IrContext, module: core::Module) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_module_op(&mut state, &mut out, module).expect("fmt::Write to String never fails");
    out
}

/// Print a type as IR text.
pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

/// Print a single attribute with nested debug-info nodes expanded inline.
pub fn print_attr(ctx: &IrContext, attr: AttrRef) -> String {
    let state = PrintState::new(ctx);
    let mut out = String::new();
    write_attr_body(&state, &mut out, attr).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Type printing
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    }
    Ok(())
}

// ============================================================================
// Attribute printing
// ============================================================================

/// Reference to an attribute: alias name if hoisted, otherwise inline.
fn write_attr(state: &PrintState<'_>, f: &mut impl Write, attr: AttrRef) -> fmt::Result {
    match state.aliases.get(&attr) {
        Some(idx) => write!(f, "#di{idx}"),
        None => write_attr_body(state, f, attr),
    }
}

fn write_attr_list(
    state: &PrintState<'_>,
    f: &mut impl Write,
    attrs: impl IntoIterator<Item = AttrRef>,
) -> fmt::Result {
    f.write_char('[')?;
    for (i, attr) in attrs.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_attr(state, f, attr)?;
    }
    f.write_char(']')
}

fn write_attr_body(state: &PrintState<'_>, f: &mut impl Write, attr: AttrRef) -> fmt::Result {
    let ctx = state.ctx;
    match ctx.attrs.get(attr) {
        AttrData::Unit => f.write_str("unit"),
        AttrData::Bool(b) => write!(f, "{b}"),
        AttrData::IntBits(v) => write!(f, "{v}"),
        AttrData::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            if v.is_finite() && !s.contains('.') && !s.contains('e') && !s.contains('E') {
                f.write_str(".0")?;
            }
            Ok(())
        }
        AttrData::String(s) => write_quoted(f, s),
        AttrData::Symbol(sym) => write_symbol(f, *sym),
        AttrData::Type(ty) => write_type(ctx, f, *ty),
        AttrData::Array(elems) => write_attr_list(state, f, elems.iter().copied()),
        AttrData::Distinct(d) => {
            write!(f, "distinct[{}]<", d.seq())?;
            write_attr(state, f, d.referenced())?;
            f.write_char('>')
        }
        AttrData::DiNullType => f.write_str("#di.null_type"),
        AttrData::DiFile(file) => {
            f.write_str("#di.file<")?;
            write_attr(state, f, file.name.attr())?;
            f.write_str(" in ")?;
            write_attr(state, f, file.directory.attr())?;
            f.write_char('>')
        }
        AttrData::DiBasicType(b) => {
            write!(f, "#di.basic_type<tag = {}, name = ", b.tag)?;
            write_attr(state, f, b.name.attr())?;
            write!(
                f,
                ", size = {}, encoding = {}>",
                b.size_in_bits, b.encoding
            )
        }
        AttrData::DiFlags(flags) => write!(f, "#di.flags<{:#x}>", flags.bits()),
        AttrData::DiLexicalBlock(lb) => {
            f.write_str("#di.lexical_block<scope = ")?;
            write_attr(state, f, lb.scope.attr())?;
            f.write_str(", file = ")?;
            write_attr(state, f, lb.file.attr())?;
            write!(f, ", line = {}, column = {}>", lb.line, lb.column)
        }
        AttrData::DiSubroutineType(st) => {
            write!(f, "#di.subroutine_type<cc = {}, types = ", st.calling_convention)?;
            write_attr_list(state, f, st.types.iter().map(|t| t.attr()))?;
            f.write_char('>')
        }
        AttrData::DiCompileUnit(cu) => {
            f.write_str("#di.compile_unit<id = ")?;
            write_attr(state, f, cu.id.attr())?;
            write!(f, ", language = {}, file = ", cu.source_language)?;
            write_attr(state, f, cu.file.attr())?;
            f.write_str(", producer = ")?;
            write_attr(state, f, cu.producer.attr())?;
            write!(
                f,
                ", optimized = {}, emission = {}, name_table = {}>",
                cu.is_optimized, cu.emission_kind, cu.name_table_kind
            )
        }
        AttrData::DiSubprogram(sp) => {
            f.write_str("#di.subprogram<id = ")?;
            write_attr(state, f, sp.id.attr())?;
            f.write_str(", compile_unit = ")?;
            write_attr(state, f, sp.compile_unit.attr())?;
            f.write_str(", scope = ")?;
            write_attr(state, f, sp.scope.attr())?;
            f.write_str(", name = ")?;
            write_attr(state, f, sp.name.attr())?;
            f.write_str(", linkage_name = ")?;
            write_attr(state, f, sp.linkage_name.attr())?;
            f.write_str(", file = ")?;
            write_attr(state, f, sp.file.attr())?;
            write!(
                f,
                ", line = {}, scope_line = {}, flags = {:#x}, type = ",
                sp.line,
                sp.scope_line,
                sp.flags.bits()
            )?;
            write_attr(state, f, sp.ty.attr())?;
            f.write_char('>')
        }
        AttrData::DiModule(m) => {
            f.write_str("#di.module<file = ")?;
            write_attr(state, f, m.file.attr())?;
            f.write_str(", scope = ")?;
            write_attr(state, f, m.scope.attr())?;
            f.write_str(", name = ")?;
            write_attr(state, f, m.name.attr())?;
            f.write_str(", config_macros = ")?;
            write_attr(state, f, m.config_macros.attr())?;
            f.write_str(", include_path = ")?;
            write_attr(state, f, m.include_path.attr())?;
            f.write_str(", apinotes = ")?;
            write_attr(state, f, m.apinotes.attr())?;
            write!(f, ", line = {}, decl = {}>", m.line, m.is_decl)
        }
    }
}

fn write_quoted(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    write_escaped_string(f, s)?;
    f.write_char('"')
}

fn write_escaped_string(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let needs_quoting = s.is_empty() || !s.chars().all(|c| c.is_alphanumeric() || c == '_');
        if needs_quoting {
            f.write_char('@')?;
            write_quoted(f, s)
        } else {
            write!(f, "@{s}")
        }
    })
}

fn write_location(state: &PrintState<'_>, f: &mut impl Write, loc: Location) -> fmt::Result {
    if !loc.is_known() && loc.scope.is_none() {
        return Ok(());
    }
    f.write_str(" loc(")?;
    write_quoted(f, state.ctx.paths.get(loc.path))?;
    write!(f, ":{}:{}", loc.line, loc.column)?;
    if let Some(scope) = loc.scope {
        f.write_str(" in ")?;
        write_attr(state, f, scope)?;
    }
    f.write_char(')')
}

// ============================================================================
// Operation printing
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let data = state.ctx.op(op);
    if data.dialect == "func" && data.name == "func" {
        return print_func_op(state, f, op, indent);
    }
    print_generic_op(state, f, op, indent)
}

fn print_generic_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let indent_str = " ".repeat(indent);
    write!(f, "{indent_str}")?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(v);
            f.write_str(&name)?;
        }
        f.write_str(" = ")?;
    }

    let data = ctx.op(op);
    write!(f, "{}.{}", data.dialect, data.name)?;

    let operands = ctx.op_operands(op);
    if !operands.is_empty() {
        f.write_char(' ')?;
        for (i, &v) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.get_value_name(v))?;
        }
    }

    if !data.successors.is_empty() {
        f.write_str(" [")?;
        for (i, &b) in data.successors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.get_block_label(b))?;
        }
        f.write_char(']')?;
    }

    if !data.attributes.is_empty() {
        f.write_str(" {")?;
        for (i, (key, &val)) in data.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attr(state, f, val)?;
        }
        f.write_char('}')?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    write_location(state, f, data.location)?;
    f.write_char('\n')
}

fn print_module_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    module: core::Module,
) -> fmt::Result {
    let ctx = state.ctx;
    state.collect_region_aliases(module.body(ctx));
    if let Some(scope) = module.location(ctx).scope {
        state.collect_aliases(scope);
    }

    for (idx, &attr) in state.alias_order.iter().enumerate() {
        write!(f, "#di{idx} = ")?;
        write_attr_body(state, f, attr)?;
        f.write_char('\n')?;
    }
    if !state.alias_order.is_empty() {
        f.write_char('\n')?;
    }

    f.write_str("core.module ")?;
    write_symbol(f, module.name(ctx))?;
    f.write_str(" {\n")?;
    for &child_op in module.ops(ctx) {
        state.reset_numbering();
        print_operation(state, f, child_op, 2)?;
    }
    f.write_str("}\n")
}

fn print_func_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let indent_str = " ".repeat(indent);
    let data = ctx.op(op);

    write!(f, "{indent_str}func.func")?;
    if let Some(name) = ctx.op_attr(op, Symbol::new("sym_name")).and_then(|a| ctx.attrs.as_symbol(a)) {
        f.write_char(' ')?;
        write_symbol(f, name)?;
    }

    state.reset_numbering();

    let blocks: Vec<BlockRef> = data
        .regions
        .first()
        .map(|&r| ctx.region(r).blocks.to_vec())
        .unwrap_or_default();

    f.write_char('(')?;
    if let Some(&entry) = blocks.first() {
        for (i, &arg) in ctx.block_args(entry).iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(arg);
            write!(f, "{name}: ")?;
            write_type(ctx, f, ctx.value_ty(arg))?;
        }
    }
    f.write_char(')')?;

    if let Some(fn_ty) = ctx.op_attr(op, Symbol::new("type")).and_then(|a| ctx.attrs.as_type(a)) {
        f.write_str(" -> ")?;
        write_type(ctx, f, fn_ty)?;
    }
    write_location(state, f, data.location)?;

    if blocks.is_empty() {
        return f.write_char('\n');
    }

    f.write_str(" {\n")?;
    for &block in &blocks {
        state.assign_block_label(block);
    }

    for (i, &block) in blocks.iter().enumerate() {
        if i > 0 {
            let label = state.get_block_label(block).to_owned();
            write!(f, "{indent_str}  {label}")?;
            let args = ctx.block_args(block);
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    let name = state.assign_value_name(arg);
                    write!(f, "{name}: ")?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }

        for &child_op in &ctx.block(block).ops {
            print_operation(state, f, child_op, indent + 4)?;
        }
    }

    writeln!(f, "{indent_str}}}")
}
