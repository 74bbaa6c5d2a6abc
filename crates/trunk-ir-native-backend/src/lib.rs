//! Native backend for TrunkIR.
//!
//! Translates a verified TrunkIR module into a backend module that owns its
//! own functions and debug metadata, then optionally lowers that module to a
//! relocatable object file via Cranelift.
//!
//! ## Translation
//!
//! - `validation`: supported-subset check run before any backend state exists
//! - `translate`: IR module -> [`BackendModule`], debug attributes -> metadata nodes
//! - `printer`: deterministic LLVM-flavoured text form of a backend module
//!
//! ## Emission
//!
//! - `emit`: [`BackendModule`] -> object bytes through Cranelift

pub mod context;
pub mod emit;
mod errors;
pub mod metadata;
pub mod module;
pub mod printer;
mod translate;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use context::{BackendContext, TypeId, TypeKind};
pub use emit::{OptLevel, emit_object, host_triple};
pub use errors::{
    EmitError, EmitErrorKind, EmitResult, TranslationError, TranslationErrorKind,
    TranslationResult,
};
pub use metadata::{MetadataArena, MetadataId, MetadataNode};
pub use module::{BackendModule, Function};
pub use printer::print_module;
pub use translate::translate_module;
