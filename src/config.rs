//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use trunk_ir_native_backend::{BackendContext, OptLevel, host_triple};

/// Options for one [`compile`](crate::compile) call.
///
/// Every field has a default, so a partial configuration deserializes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub opt_level: OptLevel,
    /// Target triple. The host when absent.
    pub target: Option<String>,
    /// Lower the translated module to an object file.
    pub emit_object: bool,
    /// Run the verifier before translation.
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::default(),
            target: None,
            emit_object: true,
            verify: true,
        }
    }
}

impl CompileOptions {
    pub fn target_triple(&self) -> String {
        self.target.clone().unwrap_or_else(host_triple)
    }

    /// A fresh backend context for the configured target.
    pub fn backend_context(&self) -> BackendContext {
        BackendContext::new(self.target_triple())
    }
}
