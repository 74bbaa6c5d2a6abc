//! Backend module model.
//!
//! Functions hold their blocks in layout order. Blocks take parameters
//! instead of phi nodes. Every instruction may carry a `DILocation`.

use std::collections::BTreeMap;

use cranelift_entity::{PrimaryMap, SecondaryMap, entity_impl};
use trunk_ir::dialect::arith::CmpPredicate;

use crate::context::{BackendContext, TypeId, TypeKind};
use crate::metadata::{MetadataArena, MetadataId};

/// Reference to a function in a backend module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u32);
entity_impl!(FuncId, "fn");

/// Reference to a block within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "bb");

/// Reference to an SSA value within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "%");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
        }
    }
}

/// Ordered float comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl FloatPredicate {
    pub fn as_str(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstKind {
    Iconst { bits: u64 },
    Fconst { bits: u64 },
    Binary { op: BinOp, lhs: Value, rhs: Value },
    Icmp { pred: CmpPredicate, lhs: Value, rhs: Value },
    Fcmp { pred: FloatPredicate, lhs: Value, rhs: Value },
    Call { callee: FuncId, args: Vec<Value> },
    Ret { value: Option<Value> },
    Br { dest: Block, args: Vec<Value> },
    CondBr { cond: Value, then_dest: Block, else_dest: Block },
    Unreachable,
    Undef,
    InsertValue { aggregate: Value, value: Value, index: u32 },
    ExtractValue { aggregate: Value, index: u32 },
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Ret { .. } | InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Unreachable
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Inst {
    pub result: Option<Value>,
    pub kind: InstKind,
    pub dbg: Option<MetadataId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockData {
    pub params: Vec<Value>,
    pub insts: Vec<Inst>,
}

/// A defined or declared function.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    /// Function type, a `TypeKind::Function`.
    pub ty: TypeId,
    pub blocks: PrimaryMap<Block, BlockData>,
    pub values: PrimaryMap<Value, TypeId>,
    pub subprogram: Option<MetadataId>,
}

impl Function {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            blocks: PrimaryMap::new(),
            values: PrimaryMap::new(),
            subprogram: None,
        }
    }

    /// A function without blocks is a declaration.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn new_value(&mut self, ty: TypeId) -> Value {
        self.values.push(ty)
    }

    pub fn value_type(&self, v: Value) -> TypeId {
        self.values[v]
    }

    pub fn create_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    pub fn append_block_param(&mut self, block: Block, ty: TypeId) -> Value {
        let v = self.new_value(ty);
        self.blocks[block].params.push(v);
        v
    }

    pub fn push_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block].insts.push(inst);
    }

    pub fn inst_count(&self) -> usize {
        self.blocks.values().map(|b| b.insts.len()).sum()
    }

    /// Blocks the terminator of `block` can transfer control to.
    pub fn successors(&self, block: Block) -> Vec<Block> {
        match self.blocks[block].insts.last().map(|inst| &inst.kind) {
            Some(InstKind::Br { dest, .. }) => vec![*dest],
            Some(InstKind::CondBr {
                then_dest,
                else_dest,
                ..
            }) => vec![*then_dest, *else_dest],
            _ => Vec::new(),
        }
    }

    /// Blocks in reverse post-order from the entry block, followed by the
    /// unreachable blocks in layout order.
    ///
    /// Every block comes after all of its dominators, so a value is always
    /// lowered before any use it dominates.
    pub fn reverse_post_order(&self) -> Vec<Block> {
        let Some(entry) = self.blocks.keys().next() else {
            return Vec::new();
        };
        let mut visited: SecondaryMap<Block, bool> = SecondaryMap::new();
        let mut postorder = Vec::with_capacity(self.blocks.len());

        // (block, successors pushed)
        let mut stack = vec![(entry, false)];
        while let Some(&mut (block, ref mut expanded)) = stack.last_mut() {
            if *expanded {
                postorder.push(block);
                stack.pop();
                continue;
            }
            if visited[block] {
                stack.pop();
                continue;
            }
            *expanded = true;
            visited[block] = true;
            for succ in self.successors(block).into_iter().rev() {
                if !visited[succ] {
                    stack.push((succ, false));
                }
            }
        }

        postorder.reverse();
        postorder.extend(self.blocks.keys().filter(|&b| !visited[b]));
        postorder
    }

    /// `(ret, params)` of the function type.
    pub fn signature(&self, ctx: &BackendContext) -> (TypeId, Vec<TypeId>) {
        match ctx.type_kind(self.ty) {
            TypeKind::Function { ret, params } => (ret, params),
            other => unreachable!("function {} has non-function type {other:?}", self.name),
        }
    }
}

/// Module flag entry of `!llvm.module.flags`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleFlag {
    pub behavior: ModFlagBehavior,
    pub key: &'static str,
    pub value: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModFlagBehavior {
    Warning = 2,
    Max = 7,
}

pub const DEBUG_INFO_VERSION: u32 = 3;
pub const DWARF_VERSION: u32 = 5;

/// Named metadata listing the compile units.
pub const DBG_CU: &str = "llvm.dbg.cu";

/// Translation output. Borrows the backend context; owns everything else.
#[derive(Debug)]
pub struct BackendModule<'b> {
    ctx: &'b BackendContext,
    pub name: String,
    pub functions: PrimaryMap<FuncId, Function>,
    pub metadata: MetadataArena,
    pub named_metadata: BTreeMap<String, Vec<MetadataId>>,
    pub module_flags: Vec<ModuleFlag>,
}

impl<'b> BackendModule<'b> {
    pub fn new(ctx: &'b BackendContext, name: impl Into<String>) -> Self {
        Self {
            ctx,
            name: name.into(),
            functions: PrimaryMap::new(),
            metadata: MetadataArena::new(),
            named_metadata: BTreeMap::new(),
            module_flags: Vec::new(),
        }
    }

    pub fn context(&self) -> &'b BackendContext {
        self.ctx
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        self.functions.push(function)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id]
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Compile units listed under `llvm.dbg.cu`.
    pub fn compile_units(&self) -> &[MetadataId] {
        self.named_metadata
            .get(DBG_CU)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_debug_info(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Add the debug-info version flags.
    pub(crate) fn add_debug_flags(&mut self) {
        self.module_flags.push(ModuleFlag {
            behavior: ModFlagBehavior::Warning,
            key: "Debug Info Version",
            value: DEBUG_INFO_VERSION,
        });
        self.module_flags.push(ModuleFlag {
            behavior: ModFlagBehavior::Max,
            key: "Dwarf Version",
            value: DWARF_VERSION,
        });
    }

    pub fn module_flag(&self, key: &str) -> Option<u32> {
        self.module_flags
            .iter()
            .find(|flag| flag.key == key)
            .map(|flag| flag.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_have_no_blocks() {
        let ctx = BackendContext::new("x86_64-unknown-linux-gnu");
        let i64_ty = ctx.int_type(64);
        let fn_ty = ctx.function_type(i64_ty, [i64_ty]);
        let mut module = BackendModule::new(&ctx, "m");

        let decl = module.add_function(Function::new("puts", fn_ty));
        let mut def = Function::new("main", fn_ty);
        let entry = def.create_block();
        let arg = def.append_block_param(entry, i64_ty);
        def.push_inst(
            entry,
            Inst {
                result: None,
                kind: InstKind::Ret { value: Some(arg) },
                dbg: None,
            },
        );
        let def = module.add_function(def);

        assert!(module.function(decl).is_declaration());
        assert!(!module.function(def).is_declaration());
        assert_eq!(module.function_by_name("main"), Some(def));
        assert_eq!(module.function(def).signature(&ctx), (i64_ty, vec![i64_ty]));
        assert!(module.compile_units().is_empty());
    }

    fn terminate(function: &mut Function, block: Block, kind: InstKind) {
        function.push_inst(
            block,
            Inst {
                result: None,
                kind,
                dbg: None,
            },
        );
    }

    #[test]
    fn reverse_post_order_puts_dominators_first() {
        let ctx = BackendContext::new("x86_64-unknown-linux-gnu");
        let fn_ty = ctx.function_type(ctx.void_type(), []);
        let mut f = Function::new("f", fn_ty);
        let entry = f.create_block();
        let exit = f.create_block();
        let body = f.create_block();
        let dead = f.create_block();
        let br = |dest| InstKind::Br { dest, args: vec![] };
        terminate(&mut f, entry, br(body));
        terminate(&mut f, exit, InstKind::Ret { value: None });
        terminate(&mut f, body, br(exit));
        terminate(&mut f, dead, br(exit));

        assert_eq!(f.successors(entry), vec![body]);
        assert_eq!(f.reverse_post_order(), vec![entry, body, exit, dead]);
    }

    #[test]
    fn reverse_post_order_with_diamond_and_loop() {
        let ctx = BackendContext::new("x86_64-unknown-linux-gnu");
        let i1 = ctx.int_type(1);
        let fn_ty = ctx.function_type(ctx.void_type(), [i1]);
        let mut f = Function::new("f", fn_ty);
        let entry = f.create_block();
        let cond = f.append_block_param(entry, i1);
        let join = f.create_block();
        let then_b = f.create_block();
        let else_b = f.create_block();
        terminate(
            &mut f,
            entry,
            InstKind::CondBr {
                cond,
                then_dest: then_b,
                else_dest: else_b,
            },
        );
        terminate(&mut f, join, InstKind::Br { dest: entry, args: vec![cond] });
        terminate(&mut f, then_b, InstKind::Br { dest: join, args: vec![] });
        terminate(&mut f, else_b, InstKind::Br { dest: join, args: vec![] });

        let order = f.reverse_post_order();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], entry);
        assert_eq!(order[3], join);
    }

    #[test]
    fn debug_flags() {
        let ctx = BackendContext::new("x86_64-unknown-linux-gnu");
        let mut module = BackendModule::new(&ctx, "m");
        module.add_debug_flags();
        assert_eq!(module.module_flag("Debug Info Version"), Some(3));
        assert_eq!(module.module_flag("Dwarf Version"), Some(5));
        assert_eq!(module.module_flag("PIC Level"), None);
    }
}
