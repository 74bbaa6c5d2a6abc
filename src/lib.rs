//! Debug-info aware TrunkIR to native object pipeline.
//!
//! The IR and its debug-info attributes live in [`trunk_ir`]; translation and
//! Cranelift emission live in [`trunk_ir_native_backend`]. This crate wires
//! them together behind [`compile`] and [`CompileOptions`].

pub mod config;
pub mod errors;
pub mod pipeline;

pub use config::CompileOptions;
pub use errors::{PipelineError, PipelineErrorKind, PipelineResult};
pub use pipeline::{CompileOutput, compile};

pub use trunk_ir;
pub use trunk_ir_native_backend;
