//! Compilation pipeline: verify, translate, emit.
//!
//! ```text
//! core.module
//!     │
//!     ▼
//! verify_module (skipped when `verify = false`)
//!     │
//!     ▼
//! translate_module ─► BackendModule (functions + debug metadata)
//!     │
//!     └─► [emit_object = true] ─► emit_object ─► object bytes
//! ```
//!
//! Each stage either succeeds completely or fails the whole call.

use std::path::Path;

use trunk_ir::dialect::core;
use trunk_ir::{DialectOp, IrContext, verify_module};
use trunk_ir_native_backend::{BackendContext, BackendModule, emit_object, translate_module};

use crate::config::CompileOptions;
use crate::errors::{PipelineError, PipelineResult};

/// Result of a successful [`compile`].
pub struct CompileOutput<'b> {
    pub module: BackendModule<'b>,
    /// Object bytes, when emission was requested.
    pub object: Option<Vec<u8>>,
}

impl CompileOutput<'_> {
    /// Write the emitted object to `path`.
    pub fn write_object(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let Some(bytes) = &self.object else {
            return Err(PipelineError::config("no object was emitted"));
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Compile `module` into a backend module owned by `backend`.
///
/// `backend` must target the triple the options name, if they name one.
pub fn compile<'b>(
    ctx: &IrContext,
    module: core::Module,
    options: &CompileOptions,
    backend: &'b BackendContext,
) -> PipelineResult<CompileOutput<'b>> {
    let name = module.name(ctx);
    let _span = tracing::debug_span!("compile", module = %name).entered();

    if let Some(target) = &options.target
        && target != backend.triple()
    {
        return Err(PipelineError::config(format!(
            "options target {target} but the backend context targets {}",
            backend.triple()
        )));
    }

    if options.verify {
        verify_module(ctx, module.op_ref())?;
        tracing::debug!("module verified");
    } else {
        tracing::warn!("verification skipped");
    }

    let translated = translate_module(ctx, module, backend)?;

    let object = if options.emit_object {
        let bytes = emit_object(&translated, options.opt_level)?;
        tracing::debug!(size = bytes.len(), "object emitted");
        Some(bytes)
    } else {
        None
    };

    Ok(CompileOutput {
        module: translated,
        object,
    })
}
