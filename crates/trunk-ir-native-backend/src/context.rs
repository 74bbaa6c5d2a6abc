//! Backend context: interned backend types and the target triple.
//!
//! A `BackendContext` outlives every `BackendModule` built against it. It is
//! single-threaded; types are interned through a `RefCell` so modules can
//! hold a shared borrow while translation keeps adding types.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use cranelift_entity::{PrimaryMap, entity_impl};

/// Reference to an interned backend type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);
entity_impl!(TypeId, "type");

/// Shape of a backend type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Int(u32),
    Float,
    Double,
    Ptr,
    Struct(Vec<TypeId>),
    Function { ret: TypeId, params: Vec<TypeId> },
}

#[derive(Debug, Default)]
struct TypeStore {
    kinds: PrimaryMap<TypeId, TypeKind>,
    dedup: HashMap<TypeKind, TypeId>,
}

#[derive(Debug)]
pub struct BackendContext {
    triple: String,
    types: RefCell<TypeStore>,
}

impl BackendContext {
    pub fn new(triple: impl Into<String>) -> Self {
        Self {
            triple: triple.into(),
            types: RefCell::new(TypeStore::default()),
        }
    }

    /// Context targeting the host.
    pub fn host() -> Self {
        Self::new(crate::emit::host_triple())
    }

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn intern_type(&self, kind: TypeKind) -> TypeId {
        let mut store = self.types.borrow_mut();
        if let Some(&existing) = store.dedup.get(&kind) {
            return existing;
        }
        let id = store.kinds.push(kind.clone());
        store.dedup.insert(kind, id);
        id
    }

    pub fn type_kind(&self, id: TypeId) -> TypeKind {
        self.types.borrow().kinds[id].clone()
    }

    pub fn type_count(&self) -> usize {
        self.types.borrow().kinds.len()
    }

    pub fn void_type(&self) -> TypeId {
        self.intern_type(TypeKind::Void)
    }

    pub fn int_type(&self, bits: u32) -> TypeId {
        self.intern_type(TypeKind::Int(bits))
    }

    pub fn float_type(&self) -> TypeId {
        self.intern_type(TypeKind::Float)
    }

    pub fn double_type(&self) -> TypeId {
        self.intern_type(TypeKind::Double)
    }

    pub fn ptr_type(&self) -> TypeId {
        self.intern_type(TypeKind::Ptr)
    }

    pub fn struct_type(&self, fields: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.intern_type(TypeKind::Struct(fields.into_iter().collect()))
    }

    pub fn function_type(&self, ret: TypeId, params: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.intern_type(TypeKind::Function {
            ret,
            params: params.into_iter().collect(),
        })
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.types.borrow().kinds[id], TypeKind::Void)
    }

    /// Whether `id` is a struct or contains one.
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        match self.type_kind(id) {
            TypeKind::Struct(_) => true,
            TypeKind::Function { ret, params } => {
                self.is_aggregate(ret) || params.into_iter().any(|p| self.is_aggregate(p))
            }
            _ => false,
        }
    }

    /// Displayable form of a type, e.g. `{ i8, i64 }`.
    pub fn display_type(&self, id: TypeId) -> DisplayType<'_> {
        DisplayType { ctx: self, id }
    }
}

pub struct DisplayType<'a> {
    ctx: &'a BackendContext,
    id: TypeId,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.type_kind(self.id) {
            TypeKind::Void => f.write_str("void"),
            TypeKind::Int(bits) => write!(f, "i{bits}"),
            TypeKind::Float => f.write_str("float"),
            TypeKind::Double => f.write_str("double"),
            TypeKind::Ptr => f.write_str("ptr"),
            TypeKind::Struct(fields) => {
                if fields.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, field) in fields.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.ctx.display_type(field))?;
                }
                f.write_str(" }")
            }
            TypeKind::Function { ret, params } => {
                write!(f, "{} (", self.ctx.display_type(ret))?;
                for (i, param) in params.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.ctx.display_type(param))?;
                }
                f.write_char(')')
            }
        }
    }
}
