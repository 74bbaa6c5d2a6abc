//! Native object emission via Cranelift.
//!
//! Lowers a translated [`BackendModule`] to a relocatable object file. Debug
//! metadata stays in the backend module; only code is lowered here.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{self as cl_ir, AbiParam, InstBuilder, types as cl_types};
use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{Linkage, Module as _};
use cranelift_object::{ObjectBuilder, ObjectModule};
use serde::{Deserialize, Serialize};
use target_lexicon::Triple;
use trunk_ir::dialect::arith::CmpPredicate;

use crate::context::{BackendContext, TypeId, TypeKind};
use crate::module::{BackendModule, BinOp, Block, FloatPredicate, FuncId, Function, Inst, InstKind, Value};
use crate::{EmitError, EmitErrorKind, EmitResult};

/// Optimization level requested for code generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptLevel {
    None,
    Less,
    #[default]
    Default,
    Aggressive,
}

impl From<usize> for OptLevel {
    fn from(value: usize) -> Self {
        match value {
            0 => OptLevel::None,
            1 => OptLevel::Less,
            2 => OptLevel::Default,
            _ => OptLevel::Aggressive,
        }
    }
}

impl From<u8> for OptLevel {
    fn from(value: u8) -> Self {
        OptLevel::from(usize::from(value))
    }
}

impl From<OptLevel> for usize {
    fn from(value: OptLevel) -> Self {
        match value {
            OptLevel::None => 0,
            OptLevel::Less => 1,
            OptLevel::Default => 2,
            OptLevel::Aggressive => 3,
        }
    }
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting.
    pub fn cranelift_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Less | OptLevel::Default => "speed",
            OptLevel::Aggressive => "speed_and_size",
        }
    }
}

/// Target triple of the machine running the compiler.
pub fn host_triple() -> String {
    Triple::host().to_string()
}

/// Emit `module` as an object file for the backend context's target.
pub fn emit_object(module: &BackendModule<'_>, opt_level: OptLevel) -> EmitResult<Vec<u8>> {
    let ctx = module.context();
    let _span = tracing::debug_span!("emit_object", module = %module.name, ?opt_level).entered();

    check_emittable(module)?;

    let start = Instant::now();
    let isa = build_isa(ctx.triple(), opt_level)?;
    let pointer_type = isa.pointer_type();
    let builder = ObjectBuilder::new(
        isa,
        module.name.as_str(),
        cranelift_module::default_libcall_names(),
    )
    .map_err(EmitError::module)?;
    let mut object = ObjectModule::new(builder);
    tracing::trace!(elapsed = ?start.elapsed(), "target ISA ready");

    let start = Instant::now();
    let mut ids = HashMap::new();
    for (id, function) in module.functions.iter() {
        let sig = signature(&object, ctx, function, pointer_type)?;
        let linkage = if function.is_declaration() {
            Linkage::Import
        } else {
            Linkage::Export
        };
        let cl_id = object
            .declare_function(&function.name, linkage, &sig)
            .map_err(EmitError::module)?;
        ids.insert(id, cl_id);
    }

    let mut fn_ctx = FunctionBuilderContext::new();
    let mut cl_ctx = object.make_context();
    for (id, function) in module.functions.iter() {
        if function.is_declaration() {
            continue;
        }
        cl_ctx.func.signature = signature(&object, ctx, function, pointer_type)?;
        let builder = FunctionBuilder::new(&mut cl_ctx.func, &mut fn_ctx);
        FunctionEmitter {
            ctx,
            pointer_type,
            builder,
            object: &mut object,
            ids: &ids,
            func_refs: HashMap::new(),
            blocks: HashMap::new(),
            values: HashMap::new(),
        }
        .emit(function)?;

        object
            .define_function(ids[&id], &mut cl_ctx)
            .map_err(|e| EmitError::module(format!("{}: {e}", function.name)))?;
        object.clear_context(&mut cl_ctx);
        tracing::trace!(function = %function.name, "function defined");
    }
    tracing::trace!(elapsed = ?start.elapsed(), "code generation finished");

    let start = Instant::now();
    let bytes = object.finish().emit()?;
    tracing::trace!(elapsed = ?start.elapsed(), size = bytes.len(), "object written");
    Ok(bytes)
}

fn build_isa(triple: &str, opt_level: OptLevel) -> EmitResult<OwnedTargetIsa> {
    let target = Triple::from_str(triple)
        .map_err(|e| EmitError::from(EmitErrorKind::InvalidTarget(format!("{triple}: {e}"))))?;

    let mut flag_builder = settings::builder();
    flag_builder.set("use_colocated_libcalls", "false")?;
    flag_builder.set("is_pic", "false")?;
    flag_builder.set("opt_level", opt_level.cranelift_setting())?;

    let isa = cranelift_codegen::isa::lookup(target)?.finish(settings::Flags::new(flag_builder))?;
    Ok(isa)
}

/// Reject constructs the object path cannot lower, before any codegen.
fn check_emittable(module: &BackendModule<'_>) -> EmitResult<()> {
    let ctx = module.context();
    for function in module.functions.values() {
        if ctx.is_aggregate(function.ty) {
            return Err(EmitError::unsupported(format!(
                "aggregate in signature of {}: {}",
                function.name,
                ctx.display_type(function.ty)
            )));
        }
        for inst in function.blocks.values().flat_map(|b| &b.insts) {
            match inst.kind {
                InstKind::Undef | InstKind::InsertValue { .. } | InstKind::ExtractValue { .. } => {
                    return Err(EmitError::unsupported(format!(
                        "aggregate value in {}",
                        function.name
                    )));
                }
                InstKind::Binary { op: BinOp::FRem, .. } => {
                    return Err(EmitError::unsupported(format!("frem in {}", function.name)));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn clif_type(
    ctx: &BackendContext,
    ty: TypeId,
    pointer_type: cl_types::Type,
) -> EmitResult<cl_types::Type> {
    match ctx.type_kind(ty) {
        TypeKind::Int(1 | 8) => Ok(cl_types::I8),
        TypeKind::Int(16) => Ok(cl_types::I16),
        TypeKind::Int(32) => Ok(cl_types::I32),
        TypeKind::Int(64) => Ok(cl_types::I64),
        TypeKind::Float => Ok(cl_types::F32),
        TypeKind::Double => Ok(cl_types::F64),
        TypeKind::Ptr => Ok(pointer_type),
        _ => Err(EmitError::unsupported(format!(
            "type {}",
            ctx.display_type(ty)
        ))),
    }
}

fn signature(
    object: &ObjectModule,
    ctx: &BackendContext,
    function: &Function,
    pointer_type: cl_types::Type,
) -> EmitResult<cl_ir::Signature> {
    let (ret, params) = function.signature(ctx);
    let mut sig = object.make_signature();
    for param in params {
        sig.params.push(AbiParam::new(clif_type(ctx, param, pointer_type)?));
    }
    if !ctx.is_void(ret) {
        sig.returns.push(AbiParam::new(clif_type(ctx, ret, pointer_type)?));
    }
    Ok(sig)
}

struct FunctionEmitter<'a> {
    ctx: &'a BackendContext,
    pointer_type: cl_types::Type,
    builder: FunctionBuilder<'a>,
    object: &'a mut ObjectModule,
    ids: &'a HashMap<FuncId, cranelift_module::FuncId>,
    func_refs: HashMap<FuncId, cl_ir::FuncRef>,
    blocks: HashMap<Block, cl_ir::Block>,
    values: HashMap<Value, cl_ir::Value>,
}

impl FunctionEmitter<'_> {
    fn emit(mut self, function: &Function) -> EmitResult<()> {
        for (block, data) in function.blocks.iter() {
            let cl_block = self.builder.create_block();
            for &param in &data.params {
                let ty = clif_type(self.ctx, function.value_type(param), self.pointer_type)?;
                let value = self.builder.append_block_param(cl_block, ty);
                self.values.insert(param, value);
            }
            self.blocks.insert(block, cl_block);
        }

        for block in function.reverse_post_order() {
            self.builder.switch_to_block(self.blocks[&block]);
            for inst in &function.blocks[block].insts {
                self.emit_inst(function, inst)?;
            }
        }

        self.builder.seal_all_blocks();
        self.builder.finalize();
        Ok(())
    }

    fn lookup(&self, v: Value) -> EmitResult<cl_ir::Value> {
        self.values
            .get(&v)
            .copied()
            .ok_or_else(|| EmitError::codegen(format!("value {v} used before its definition")))
    }

    fn define(&mut self, inst: &Inst, value: cl_ir::Value) -> EmitResult<()> {
        let result = inst
            .result
            .ok_or_else(|| EmitError::codegen("instruction result missing"))?;
        self.values.insert(result, value);
        Ok(())
    }

    fn result_type(&self, function: &Function, inst: &Inst) -> EmitResult<cl_types::Type> {
        let result = inst
            .result
            .ok_or_else(|| EmitError::codegen("instruction result missing"))?;
        clif_type(self.ctx, function.value_type(result), self.pointer_type)
    }

    fn func_ref(&mut self, callee: FuncId) -> cl_ir::FuncRef {
        if let Some(&existing) = self.func_refs.get(&callee) {
            return existing;
        }
        let func_ref = self
            .object
            .declare_func_in_func(self.ids[&callee], self.builder.func);
        self.func_refs.insert(callee, func_ref);
        func_ref
    }

    fn emit_inst(&mut self, function: &Function, inst: &Inst) -> EmitResult<()> {
        match &inst.kind {
            InstKind::Iconst { bits } => {
                let ty = self.result_type(function, inst)?;
                let width = ty.bits();
                let masked = if width < 64 {
                    bits & ((1u64 << width) - 1)
                } else {
                    *bits
                };
                let value = self.builder.ins().iconst(ty, masked as i64);
                self.define(inst, value)
            }
            InstKind::Fconst { bits } => {
                let ty = self.result_type(function, inst)?;
                let float = f64::from_bits(*bits);
                let value = if ty == cl_types::F32 {
                    self.builder.ins().f32const(float as f32)
                } else {
                    self.builder.ins().f64const(float)
                };
                self.define(inst, value)
            }
            InstKind::Binary { op, lhs, rhs } => {
                let a = self.lookup(*lhs)?;
                let b = self.lookup(*rhs)?;
                let ins = self.builder.ins();
                let value = match op {
                    BinOp::Add => ins.iadd(a, b),
                    BinOp::Sub => ins.isub(a, b),
                    BinOp::Mul => ins.imul(a, b),
                    BinOp::SDiv => ins.sdiv(a, b),
                    BinOp::SRem => ins.srem(a, b),
                    BinOp::And => ins.band(a, b),
                    BinOp::Or => ins.bor(a, b),
                    BinOp::Xor => ins.bxor(a, b),
                    BinOp::FAdd => ins.fadd(a, b),
                    BinOp::FSub => ins.fsub(a, b),
                    BinOp::FMul => ins.fmul(a, b),
                    BinOp::FDiv => ins.fdiv(a, b),
                    BinOp::FRem => return Err(EmitError::unsupported("frem")),
                };
                self.define(inst, value)
            }
            InstKind::Icmp { pred, lhs, rhs } => {
                let a = self.lookup(*lhs)?;
                let b = self.lookup(*rhs)?;
                let value = self.builder.ins().icmp(int_cc(*pred), a, b);
                self.define(inst, value)
            }
            InstKind::Fcmp { pred, lhs, rhs } => {
                let a = self.lookup(*lhs)?;
                let b = self.lookup(*rhs)?;
                let value = self.builder.ins().fcmp(float_cc(*pred), a, b);
                self.define(inst, value)
            }
            InstKind::Call { callee, args } => {
                let func_ref = self.func_ref(*callee);
                let args = args
                    .iter()
                    .map(|&a| self.lookup(a))
                    .collect::<EmitResult<Vec<_>>>()?;
                let call = self.builder.ins().call(func_ref, &args);
                if inst.result.is_some() {
                    let value = self.builder.inst_results(call).first().copied().ok_or_else(|| {
                        EmitError::codegen(format!("call to {callee} produced no result"))
                    })?;
                    self.define(inst, value)?;
                }
                Ok(())
            }
            InstKind::Ret { value } => {
                let values = value.iter().map(|&v| self.lookup(v)).collect::<EmitResult<Vec<_>>>()?;
                self.builder.ins().return_(&values);
                Ok(())
            }
            InstKind::Br { dest, args } => {
                let args = args
                    .iter()
                    .map(|&a| self.lookup(a).map(cl_ir::BlockArg::from))
                    .collect::<EmitResult<Vec<_>>>()?;
                self.builder.ins().jump(self.blocks[dest], &args);
                Ok(())
            }
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => {
                let cond = self.lookup(*cond)?;
                let then_block = self.blocks[then_dest];
                let else_block = self.blocks[else_dest];
                self.builder.ins().brif(cond, then_block, &[], else_block, &[]);
                Ok(())
            }
            InstKind::Unreachable => {
                self.builder.ins().trap(cl_ir::TrapCode::unwrap_user(1));
                Ok(())
            }
            InstKind::Undef | InstKind::InsertValue { .. } | InstKind::ExtractValue { .. } => {
                Err(EmitError::unsupported("aggregate value"))
            }
        }
    }
}

fn int_cc(pred: CmpPredicate) -> IntCC {
    match pred {
        CmpPredicate::Eq => IntCC::Equal,
        CmpPredicate::Ne => IntCC::NotEqual,
        CmpPredicate::Slt => IntCC::SignedLessThan,
        CmpPredicate::Sle => IntCC::SignedLessThanOrEqual,
        CmpPredicate::Sgt => IntCC::SignedGreaterThan,
        CmpPredicate::Sge => IntCC::SignedGreaterThanOrEqual,
        CmpPredicate::Ult => IntCC::UnsignedLessThan,
        CmpPredicate::Ule => IntCC::UnsignedLessThanOrEqual,
        CmpPredicate::Ugt => IntCC::UnsignedGreaterThan,
        CmpPredicate::Uge => IntCC::UnsignedGreaterThanOrEqual,
    }
}

fn float_cc(pred: FloatPredicate) -> FloatCC {
    match pred {
        FloatPredicate::Oeq => FloatCC::Equal,
        FloatPredicate::One => FloatCC::OrderedNotEqual,
        FloatPredicate::Olt => FloatCC::LessThan,
        FloatPredicate::Ole => FloatCC::LessThanOrEqual,
        FloatPredicate::Ogt => FloatCC::GreaterThan,
        FloatPredicate::Oge => FloatCC::GreaterThanOrEqual,
    }
}
