//! Module translation: TrunkIR module → backend module.
//!
//! Translation is one-shot and all-or-nothing. The supported subset is
//! checked up front, functions are declared before any body is translated,
//! and debug-info attributes are translated on demand as scopes are reached.
//!
//! Debug locations follow these rules:
//! - a `func.func` whose location scope is a subprogram gets it as `!dbg`;
//! - an op whose location has a scope gets a `DILocation` in that scope;
//! - otherwise an op inside a function with a subprogram gets a
//!   `DILocation` in the subprogram, and no location without one.

use std::collections::HashMap;

use trunk_ir::attribute::{AttrData, DiScopeAttr, DiTypeAttr};
use trunk_ir::dialect::{adt, arith, cf, core, func};
use trunk_ir::{
    AttrKind, AttrRef, BlockRef, ConversionError, DialectOp, IrContext, OpRef, TypeRef, ValueRef,
};

use crate::context::{BackendContext, TypeId, TypeKind};
use crate::metadata::{MetadataId, MetadataNode};
use crate::module::{
    BackendModule, BinOp, Block, DBG_CU, FloatPredicate, FuncId, Function, Inst, InstKind, Value,
};
use crate::validation::validate_supported;
use crate::{TranslationError, TranslationResult};

/// Translate `module` into a backend module bound to `backend`.
pub fn translate_module<'b>(
    ctx: &IrContext,
    module: core::Module,
    backend: &'b BackendContext,
) -> TranslationResult<BackendModule<'b>> {
    let name = module.name(ctx).to_string();
    let _span = tracing::debug_span!("translate_module", module = %name).entered();

    validate_supported(ctx, module)?;

    let mut translator = ModuleTranslator {
        ctx,
        backend,
        out: BackendModule::new(backend, name),
        func_ids: HashMap::new(),
        scopes: HashMap::new(),
        types: HashMap::new(),
        compile_units: Vec::new(),
    };

    let funcs = module
        .ops(ctx)
        .iter()
        .map(|&op| func::Func::from_op(ctx, op).map_err(TranslationError::malformed))
        .collect::<TranslationResult<Vec<_>>>()?;

    for &f in &funcs {
        translator.declare_function(f)?;
    }
    for &f in &funcs {
        translator.define_function(f)?;
    }

    Ok(translator.finish())
}

struct ModuleTranslator<'a, 'b> {
    ctx: &'a IrContext,
    backend: &'b BackendContext,
    out: BackendModule<'b>,
    func_ids: HashMap<trunk_ir::Symbol, FuncId>,
    /// Scope and subroutine-type attributes already translated.
    scopes: HashMap<AttrRef, MetadataId>,
    types: HashMap<AttrRef, Option<MetadataId>>,
    compile_units: Vec<MetadataId>,
}

impl<'a, 'b> ModuleTranslator<'a, 'b> {
    fn finish(mut self) -> BackendModule<'b> {
        if !self.compile_units.is_empty() {
            self.out
                .named_metadata
                .insert(DBG_CU.to_owned(), self.compile_units);
        }
        if self.out.has_debug_info() {
            self.out.add_debug_flags();
        }
        tracing::debug!(
            functions = self.out.functions.len(),
            metadata_nodes = self.out.metadata.len(),
            "module translated"
        );
        self.out
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn translate_type(&self, ty: TypeRef) -> TranslationResult<TypeId> {
        let ctx = self.ctx;
        if core::is_nil(ctx, ty) {
            return Ok(self.backend.void_type());
        }
        if let Some(bits) = core::int_width(ctx, ty) {
            return Ok(self.backend.int_type(bits));
        }
        match core::float_width(ctx, ty) {
            Some(32) => return Ok(self.backend.float_type()),
            Some(64) => return Ok(self.backend.double_type()),
            _ => {}
        }
        if ctx.types.is_dialect(ty, trunk_ir::Symbol::new("core"), trunk_ir::Symbol::new("ptr")) {
            return Ok(self.backend.ptr_type());
        }
        if ctx.types.is_struct(ty) {
            let fields = ctx
                .types
                .get(ty)
                .params
                .iter()
                .map(|&field| self.translate_type(field))
                .collect::<TranslationResult<Vec<_>>>()?;
            return Ok(self.backend.struct_type(fields));
        }
        Err(TranslationError::unsupported_type(
            trunk_ir::printer::print_type(ctx, ty),
        ))
    }

    fn translate_fn_type(&self, ty: TypeRef) -> TranslationResult<TypeId> {
        let Some((result, params)) = core::func_type_parts(self.ctx, ty) else {
            return Err(TranslationError::malformed(format!(
                "expected a function type, found {}",
                trunk_ir::printer::print_type(self.ctx, ty)
            )));
        };
        let ret = self.translate_type(result)?;
        let params = params
            .iter()
            .map(|&p| self.translate_type(p))
            .collect::<TranslationResult<Vec<_>>>()?;
        Ok(self.backend.function_type(ret, params))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn declare_function(&mut self, f: func::Func) -> TranslationResult<()> {
        let name = f.name(self.ctx);
        if self.func_ids.contains_key(&name) {
            return Err(TranslationError::duplicate_function(name));
        }
        let ty = self.translate_fn_type(f.ty(self.ctx))?;
        let id = self.out.add_function(Function::new(name.to_string(), ty));
        self.func_ids.insert(name, id);
        Ok(())
    }

    fn define_function(&mut self, f: func::Func) -> TranslationResult<()> {
        let ctx = self.ctx;
        let name = f.name(ctx);
        let id = self.func_ids[&name];
        tracing::trace!(function = %name, blocks = f.blocks(ctx).len(), "translating function");

        let subprogram = match f.location(ctx).scope {
            Some(scope) => self.function_subprogram(scope)?,
            None => None,
        };
        self.out.functions[id].subprogram = subprogram;

        if f.is_declaration(ctx) {
            return Ok(());
        }

        let mut fx = FunctionTranslator {
            function: Function::new(String::new(), self.out.functions[id].ty),
            blocks: HashMap::new(),
            values: HashMap::new(),
            subprogram,
        };

        for &block in f.blocks(ctx) {
            let b = fx.function.create_block();
            fx.blocks.insert(block, b);
            for &arg in ctx.block_args(block) {
                let ty = self.translate_type(ctx.value_ty(arg))?;
                let v = fx.function.append_block_param(b, ty);
                fx.values.insert(arg, v);
            }
        }

        for &block in f.blocks(ctx) {
            let b = fx.blocks[&block];
            for &op in &ctx.block(block).ops {
                self.translate_op(&mut fx, b, op)?;
            }
        }

        let target = &mut self.out.functions[id];
        target.blocks = fx.function.blocks;
        target.values = fx.function.values;
        Ok(())
    }

    /// The subprogram a function location scope names, if it is one.
    fn function_subprogram(&mut self, scope: AttrRef) -> TranslationResult<Option<MetadataId>> {
        if matches!(self.ctx.attrs.get(scope), AttrData::DiSubprogram(_)) {
            self.translate_scope_attr(scope).map(Some)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn translate_op(
        &mut self,
        fx: &mut FunctionTranslator,
        block: Block,
        op: OpRef,
    ) -> TranslationResult<()> {
        let ctx = self.ctx;
        let dbg = self.debug_location(fx, op)?;

        if let Some(c) = view(ctx, op, arith::Const::from_op(ctx, op))? {
            let ty = self.translate_type(c.result_ty(ctx))?;
            let kind = match (self.backend.type_kind(ty), ctx.attrs.get(c.value(ctx))) {
                (TypeKind::Int(_), AttrData::IntBits(bits)) => InstKind::Iconst { bits: *bits },
                (TypeKind::Int(_), AttrData::Bool(b)) => InstKind::Iconst { bits: u64::from(*b) },
                (TypeKind::Float | TypeKind::Double, AttrData::FloatBits(bits)) => {
                    InstKind::Fconst { bits: *bits }
                }
                (_, data) => {
                    return Err(TranslationError::malformed(format!(
                        "arith.const of type {} with a {} value",
                        self.backend.display_type(ty),
                        data.kind_name()
                    )));
                }
            };
            let result = fx.result(c.result(ctx), ty);
            fx.push(block, Some(result), kind, dbg);
            return Ok(());
        }

        if let Some(bin) = view(ctx, op, arith::Binary::from_op(ctx, op))? {
            let ty = self.translate_type(ctx.value_ty(bin.result(ctx)))?;
            let op_kind = self.bin_op(bin.kind(ctx), ty)?;
            let lhs = self.operand(fx, bin.lhs(ctx))?;
            let rhs = self.operand(fx, bin.rhs(ctx))?;
            let result = fx.result(bin.result(ctx), ty);
            let kind = InstKind::Binary {
                op: op_kind,
                lhs,
                rhs,
            };
            fx.push(block, Some(result), kind, dbg);
            return Ok(());
        }

        if let Some(cmp) = view(ctx, op, arith::Cmp::from_op(ctx, op))? {
            let Some(pred) = cmp.predicate(ctx) else {
                return Err(TranslationError::malformed("arith.cmp with unknown predicate"));
            };
            let operand_ty = self.translate_type(ctx.value_ty(cmp.lhs(ctx)))?;
            let lhs = self.operand(fx, cmp.lhs(ctx))?;
            let rhs = self.operand(fx, cmp.rhs(ctx))?;
            let kind = match self.backend.type_kind(operand_ty) {
                TypeKind::Float | TypeKind::Double => InstKind::Fcmp {
                    pred: float_predicate(pred)?,
                    lhs,
                    rhs,
                },
                _ => InstKind::Icmp { pred, lhs, rhs },
            };
            let result = fx.result(cmp.result(ctx), self.backend.int_type(1));
            fx.push(block, Some(result), kind, dbg);
            return Ok(());
        }

        if let Some(call) = view(ctx, op, func::Call::from_op(ctx, op))? {
            let callee_name = call.callee(ctx);
            let callee = *self
                .func_ids
                .get(&callee_name)
                .ok_or_else(|| TranslationError::function_not_found(callee_name))?;
            let args = call
                .args(ctx)
                .iter()
                .map(|&a| self.operand(fx, a))
                .collect::<TranslationResult<Vec<_>>>()?;
            let result = match call.result(ctx) {
                Some(r) => {
                    let ty = self.translate_type(ctx.value_ty(r))?;
                    if self.backend.is_void(ty) {
                        fx.result(r, ty);
                        None
                    } else {
                        Some(fx.result(r, ty))
                    }
                }
                None => None,
            };
            fx.push(block, result, InstKind::Call { callee, args }, dbg);
            return Ok(());
        }

        if let Some(ret) = view(ctx, op, func::Return::from_op(ctx, op))? {
            let mut values = Vec::new();
            for &v in ret.values(ctx) {
                let ty = self.translate_type(ctx.value_ty(v))?;
                if !self.backend.is_void(ty) {
                    values.push(self.operand(fx, v)?);
                }
            }
            if values.len() > 1 {
                return Err(TranslationError::malformed(format!(
                    "func.return with {} values",
                    values.len()
                )));
            }
            let kind = InstKind::Ret {
                value: values.pop(),
            };
            fx.push(block, None, kind, dbg);
            return Ok(());
        }

        if func::Unreachable::matches(ctx, op) {
            fx.push(block, None, InstKind::Unreachable, dbg);
            return Ok(());
        }

        if let Some(br) = view(ctx, op, cf::Br::from_op(ctx, op))? {
            let dest = fx.block(br.dest(ctx))?;
            let args = br
                .args(ctx)
                .iter()
                .map(|&a| self.operand(fx, a))
                .collect::<TranslationResult<Vec<_>>>()?;
            let expected = fx.function.blocks[dest].params.len();
            if args.len() != expected {
                return Err(TranslationError::malformed(format!(
                    "cf.br passes {} argument(s) to a block with {expected} parameter(s)",
                    args.len()
                )));
            }
            fx.push(block, None, InstKind::Br { dest, args }, dbg);
            return Ok(());
        }

        if let Some(br) = view(ctx, op, cf::CondBr::from_op(ctx, op))? {
            let cond = self.operand(fx, br.cond(ctx))?;
            let then_dest = fx.block(br.then_dest(ctx))?;
            let else_dest = fx.block(br.else_dest(ctx))?;
            let kind = InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            };
            fx.push(block, None, kind, dbg);
            return Ok(());
        }

        if let Some(new) = view(ctx, op, adt::StructNew::from_op(ctx, op))? {
            let struct_ty = ctx.value_ty(new.result(ctx));
            let field_count = new.fields(ctx).len();
            if !ctx.types.is_struct(struct_ty) || ctx.types.struct_field_count(struct_ty) != field_count
            {
                return Err(TranslationError::malformed(format!(
                    "adt.struct_new with {field_count} field(s) does not build {struct_ty}"
                )));
            }
            let ty = self.translate_type(struct_ty)?;
            let fields = new
                .fields(ctx)
                .iter()
                .map(|&v| self.operand(fx, v))
                .collect::<TranslationResult<Vec<_>>>()?;
            if fields.is_empty() {
                let result = fx.result(new.result(ctx), ty);
                fx.push(block, Some(result), InstKind::Undef, dbg);
                return Ok(());
            }
            let mut aggregate = fx.function.new_value(ty);
            fx.push(block, Some(aggregate), InstKind::Undef, dbg);
            let last = fields.len() - 1;
            for (index, value) in fields.into_iter().enumerate() {
                let next = if index == last {
                    fx.result(new.result(ctx), ty)
                } else {
                    fx.function.new_value(ty)
                };
                let kind = InstKind::InsertValue {
                    aggregate,
                    value,
                    index: index as u32,
                };
                fx.push(block, Some(next), kind, dbg);
                aggregate = next;
            }
            return Ok(());
        }

        if let Some(get) = view(ctx, op, adt::StructGet::from_op(ctx, op))? {
            let struct_ty = ctx.value_ty(get.value(ctx));
            if !ctx.types.is_struct(struct_ty) {
                return Err(TranslationError::malformed(format!(
                    "adt.struct_get on non-struct value of type {struct_ty}"
                )));
            }
            let field_count = ctx.types.struct_field_count(struct_ty);
            let index = match get.index(ctx) {
                Some(index) if (index as usize) < field_count => index,
                _ => {
                    return Err(TranslationError::malformed(format!(
                        "adt.struct_get index out of range for struct with {field_count} field(s)"
                    )));
                }
            };
            let field_ty = ctx.types.struct_field_type_at(struct_ty, index as usize);
            if field_ty != ctx.value_ty(get.result(ctx)) {
                return Err(TranslationError::malformed(format!(
                    "adt.struct_get result type differs from field {index} type {field_ty}"
                )));
            }
            let ty = self.translate_type(field_ty)?;
            let aggregate = self.operand(fx, get.value(ctx))?;
            let result = fx.result(get.result(ctx), ty);
            let kind = InstKind::ExtractValue { aggregate, index };
            fx.push(block, Some(result), kind, dbg);
            return Ok(());
        }

        Err(TranslationError::unsupported(trunk_ir::ops::full_name(ctx, op)))
    }

    fn bin_op(&self, kind: arith::BinaryOp, ty: TypeId) -> TranslationResult<BinOp> {
        use arith::BinaryOp as B;
        let is_float = matches!(self.backend.type_kind(ty), TypeKind::Float | TypeKind::Double);
        Ok(match (kind, is_float) {
            (B::Add, false) => BinOp::Add,
            (B::Sub, false) => BinOp::Sub,
            (B::Mul, false) => BinOp::Mul,
            (B::Div, false) => BinOp::SDiv,
            (B::Rem, false) => BinOp::SRem,
            (B::And, false) => BinOp::And,
            (B::Or, false) => BinOp::Or,
            (B::Xor, false) => BinOp::Xor,
            (B::Add, true) => BinOp::FAdd,
            (B::Sub, true) => BinOp::FSub,
            (B::Mul, true) => BinOp::FMul,
            (B::Div, true) => BinOp::FDiv,
            (B::Rem, true) => BinOp::FRem,
            (B::And | B::Or | B::Xor, true) => {
                return Err(TranslationError::malformed(format!(
                    "arith.{} on {}",
                    kind.name(),
                    self.backend.display_type(ty)
                )));
            }
        })
    }

    /// Backend value for an IR operand. A value whose defining block comes
    /// later in layout gets its backend value allocated on first use.
    fn operand(&self, fx: &mut FunctionTranslator, v: ValueRef) -> TranslationResult<Value> {
        if let Some(&existing) = fx.values.get(&v) {
            return Ok(existing);
        }
        let ty = self.translate_type(self.ctx.value_ty(v))?;
        Ok(fx.result(v, ty))
    }

    // ========================================================================
    // Debug info
    // ========================================================================

    fn debug_location(
        &mut self,
        fx: &FunctionTranslator,
        op: OpRef,
    ) -> TranslationResult<Option<MetadataId>> {
        let loc = self.ctx.op(op).location;
        let scope = match loc.scope {
            Some(scope) => self.translate_scope_attr(scope)?,
            None => match fx.subprogram {
                Some(sp) => sp,
                None => return Ok(None),
            },
        };
        Ok(Some(self.out.metadata.unique(MetadataNode::Location {
            line: loc.line,
            column: loc.column,
            scope,
        })))
    }

    fn translate_scope_attr(&mut self, attr: AttrRef) -> TranslationResult<MetadataId> {
        match DiScopeAttr::from_attr(&self.ctx.attrs, attr) {
            Some(scope) => Ok(self.translate_scope(scope)),
            None => Err(TranslationError::malformed(format!(
                "location scope {attr} is a {}, not a debug scope",
                self.ctx.attrs.get(attr).kind_name()
            ))),
        }
    }

    fn string(&self, attr: trunk_ir::StringAttr) -> String {
        attr.text(&self.ctx.attrs).to_owned()
    }

    fn translate_scope(&mut self, scope: DiScopeAttr) -> MetadataId {
        if let Some(&id) = self.scopes.get(&scope.attr()) {
            return id;
        }
        let ctx = self.ctx;
        let id = match ctx.attrs.get(scope.attr()) {
            AttrData::DiFile(file) => {
                let node = MetadataNode::File {
                    filename: self.string(file.name),
                    directory: self.string(file.directory),
                };
                self.out.metadata.unique(node)
            }
            AttrData::DiCompileUnit(cu) => {
                let file = self.translate_scope(cu.file.into());
                let node = MetadataNode::CompileUnit {
                    language: cu.source_language,
                    file,
                    producer: self.string(cu.producer),
                    is_optimized: cu.is_optimized,
                    emission_kind: cu.emission_kind,
                    name_table_kind: cu.name_table_kind,
                };
                let id = self.out.metadata.distinct(node);
                self.compile_units.push(id);
                id
            }
            AttrData::DiSubprogram(sp) => {
                let unit = self.translate_scope(sp.compile_unit.into());
                let parent = self.translate_scope(sp.scope);
                let file = self.translate_scope(sp.file.into());
                let Some(ty) = self.translate_subroutine(sp.ty.into()) else {
                    unreachable!("subroutine types always translate to a node")
                };
                let node = MetadataNode::Subprogram {
                    scope: parent,
                    name: self.string(sp.name),
                    linkage_name: self.string(sp.linkage_name),
                    file,
                    line: sp.line,
                    scope_line: sp.scope_line,
                    sp_flags: sp.flags,
                    ty,
                    unit,
                };
                self.out.metadata.distinct(node)
            }
            AttrData::DiLexicalBlock(lb) => {
                let parent = self.translate_scope(lb.scope);
                let file = self.translate_scope(lb.file.into());
                self.out.metadata.unique(MetadataNode::LexicalBlock {
                    scope: parent,
                    file,
                    line: lb.line,
                    column: lb.column,
                })
            }
            AttrData::DiModule(m) => {
                let parent = self.translate_scope(m.scope);
                let file = self.translate_scope(m.file.into());
                let node = MetadataNode::Module {
                    scope: parent,
                    name: self.string(m.name),
                    config_macros: self.string(m.config_macros),
                    include_path: self.string(m.include_path),
                    apinotes: self.string(m.apinotes),
                    file,
                    line: m.line,
                    is_decl: m.is_decl,
                };
                self.out.metadata.unique(node)
            }
            other => unreachable!("DiScopeAttr wraps a {}", other.kind_name()),
        };
        let node = self.out.metadata.get(id);
        tracing::trace!(id = %id, kind = node.kind_name(), "metadata node");
        self.scopes.insert(scope.attr(), id);
        id
    }

    /// `None` for the null type.
    fn translate_subroutine(&mut self, ty: DiTypeAttr) -> Option<MetadataId> {
        if let Some(&id) = self.types.get(&ty.attr()) {
            return id;
        }
        let ctx = self.ctx;
        let id = match ctx.attrs.get(ty.attr()) {
            AttrData::DiNullType => None,
            AttrData::DiBasicType(b) => Some(self.out.metadata.unique(MetadataNode::BasicType {
                tag: b.tag,
                name: self.string(b.name),
                size_in_bits: b.size_in_bits,
                encoding: b.encoding,
            })),
            AttrData::DiSubroutineType(st) => {
                let types = st
                    .types
                    .iter()
                    .map(|&t| self.translate_subroutine(t))
                    .collect();
                Some(self.out.metadata.unique(MetadataNode::SubroutineType {
                    calling_convention: st.calling_convention,
                    types,
                }))
            }
            other => unreachable!("DiTypeAttr wraps a {}", other.kind_name()),
        };
        self.types.insert(ty.attr(), id);
        id
    }
}

fn float_predicate(pred: arith::CmpPredicate) -> TranslationResult<FloatPredicate> {
    use arith::CmpPredicate as P;
    Ok(match pred {
        P::Eq => FloatPredicate::Oeq,
        P::Ne => FloatPredicate::One,
        P::Slt => FloatPredicate::Olt,
        P::Sle => FloatPredicate::Ole,
        P::Sgt => FloatPredicate::Ogt,
        P::Sge => FloatPredicate::Oge,
        P::Ult | P::Ule | P::Ugt | P::Uge => {
            return Err(TranslationError::malformed(format!(
                "unsigned predicate {pred} on floating-point operands"
            )));
        }
    })
}

/// Per-function translation state.
struct FunctionTranslator {
    function: Function,
    blocks: HashMap<BlockRef, Block>,
    values: HashMap<ValueRef, Value>,
    subprogram: Option<MetadataId>,
}

impl FunctionTranslator {
    /// Backend value for an IR result, reusing one allocated by a forward use.
    fn result(&mut self, v: ValueRef, ty: TypeId) -> Value {
        *self
            .values
            .entry(v)
            .or_insert_with(|| self.function.values.push(ty))
    }

    fn block(&self, b: BlockRef) -> TranslationResult<Block> {
        self.blocks.get(&b).copied().ok_or_else(|| {
            TranslationError::malformed(format!("branch to {b} outside the function"))
        })
    }

    fn push(&mut self, block: Block, result: Option<Value>, kind: InstKind, dbg: Option<MetadataId>) {
        self.function.push_inst(block, Inst { result, kind, dbg });
    }
}

/// `Some` when `op` is the viewed op, `None` when it is some other op, and
/// an error when it has the right name but the wrong shape.
fn view<T>(
    ctx: &IrContext,
    op: OpRef,
    viewed: Result<T, ConversionError>,
) -> TranslationResult<Option<T>> {
    match viewed {
        Ok(view) => Ok(Some(view)),
        Err(ConversionError::WrongOperation { .. }) => Ok(None),
        Err(err) => Err(TranslationError::malformed(format!(
            "{}: {err}",
            trunk_ir::ops::full_name(ctx, op)
        ))),
    }
}
