//! TrunkIR crate.
//!
//! An arena-based multi-level dialect IR with MLIR-style debug-info
//! attributes. Everything lives in an [`IrContext`]: operations, blocks and
//! regions, the type interner, and the attribute interner with its two
//! identity disciplines (structural interning and distinct minting).

// === IR infrastructure ===
pub mod attribute;
pub mod context;
pub mod ir;
pub mod ops;
pub mod refs;
pub mod types;

// === Debug-info metadata ===
pub mod debug_info;

// === Dialect modules ===
pub mod dialect;

// === Analyses and output ===
pub mod printer;
pub mod validation;
pub mod walk;

// Re-export smallvec for use in external crates
pub use smallvec;

pub use attribute::{AttrData, AttrInterner, AttrKind, DistinctAttr, StringAttr};
pub use context::{BlockData, IrContext, OperationDataBuilder, RegionData};
pub use ir::Symbol;
pub use ops::{ConversionError, DialectOp};
pub use refs::{AttrRef, BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use types::{Location, TypeData, TypeDataBuilder, TypeInterner};
pub use validation::{VerificationError, VerificationErrors, verify_module};
pub use walk::WalkAction;
