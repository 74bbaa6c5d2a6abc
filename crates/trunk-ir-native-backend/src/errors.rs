//! Error types for translation and native emission.

use derive_more::{Display, From};

pub type TranslationResult<T> = Result<T, TranslationError>;

/// Failure of a whole-module translation. No partial backend module exists
/// once one of these is returned.
#[derive(Clone, Display, Debug, From, PartialEq)]
#[display("{kind}")]
pub struct TranslationError {
    #[from]
    kind: Box<TranslationErrorKind>,
}

impl<E> From<E> for TranslationError
where
    TranslationErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        TranslationError {
            kind: Box::new(TranslationErrorKind::from(error)),
        }
    }
}

impl TranslationError {
    pub fn kind(&self) -> &TranslationErrorKind {
        &self.kind
    }

    pub(crate) fn unsupported(op: impl std::fmt::Display) -> Self {
        TranslationErrorKind::Unsupported(op.to_string()).into()
    }

    pub(crate) fn unsupported_type(ty: impl std::fmt::Display) -> Self {
        TranslationErrorKind::UnsupportedType(ty.to_string()).into()
    }

    pub(crate) fn malformed(msg: impl std::fmt::Display) -> Self {
        TranslationErrorKind::Malformed(msg.to_string()).into()
    }

    pub(crate) fn function_not_found(name: impl std::fmt::Display) -> Self {
        TranslationErrorKind::FunctionNotFound(name.to_string()).into()
    }

    pub(crate) fn duplicate_function(name: impl std::fmt::Display) -> Self {
        TranslationErrorKind::DuplicateFunction(name.to_string()).into()
    }
}

#[derive(Clone, Display, Debug, PartialEq)]
pub enum TranslationErrorKind {
    #[display("Unsupported operation: {_0}")]
    Unsupported(String),

    #[display("Unsupported type: {_0}")]
    UnsupportedType(String),

    #[display("Malformed module: {_0}")]
    Malformed(String),

    #[display("Function not found: {_0}")]
    FunctionNotFound(String),

    #[display("Duplicate function: {_0}")]
    DuplicateFunction(String),
}

impl std::error::Error for TranslationError {}

pub type EmitResult<T> = Result<T, EmitError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct EmitError {
    #[from]
    kind: Box<EmitErrorKind>,
}

impl<E> From<E> for EmitError
where
    EmitErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        EmitError {
            kind: Box::new(EmitErrorKind::from(error)),
        }
    }
}

impl EmitError {
    pub fn kind(&self) -> &EmitErrorKind {
        &self.kind
    }

    pub(crate) fn unsupported(msg: impl std::fmt::Display) -> Self {
        EmitErrorKind::Unsupported(msg.to_string()).into()
    }

    pub(crate) fn codegen(msg: impl std::fmt::Display) -> Self {
        EmitErrorKind::CodegenError(msg.to_string()).into()
    }

    pub(crate) fn module(msg: impl std::fmt::Display) -> Self {
        EmitErrorKind::ModuleError(msg.to_string()).into()
    }
}

#[derive(Display, Debug)]
pub enum EmitErrorKind {
    #[display("Code generation error: {_0}")]
    CodegenError(String),

    #[display("Module error: {_0}")]
    ModuleError(String),

    #[display("Cranelift error: {_0}")]
    CraneliftError(String),

    #[display("Unsupported for native emission: {_0}")]
    Unsupported(String),

    #[display("Invalid target: {_0}")]
    InvalidTarget(String),

    #[display("Object generation failed: {_0}")]
    ObjectError(object::write::Error),
}

impl From<object::write::Error> for EmitErrorKind {
    fn from(error: object::write::Error) -> Self {
        EmitErrorKind::ObjectError(error)
    }
}

impl From<cranelift_codegen::settings::SetError> for EmitErrorKind {
    fn from(error: cranelift_codegen::settings::SetError) -> Self {
        EmitErrorKind::CraneliftError(error.to_string())
    }
}

impl From<cranelift_codegen::isa::LookupError> for EmitErrorKind {
    fn from(error: cranelift_codegen::isa::LookupError) -> Self {
        EmitErrorKind::InvalidTarget(error.to_string())
    }
}

impl From<cranelift_codegen::CodegenError> for EmitErrorKind {
    fn from(error: cranelift_codegen::CodegenError) -> Self {
        EmitErrorKind::CodegenError(error.to_string())
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            EmitErrorKind::ObjectError(e) => Some(e),
            _ => None,
        }
    }
}
