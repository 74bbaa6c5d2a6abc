//! Error types for the compilation pipeline.

use derive_more::{Display, From};
use trunk_ir::VerificationErrors;
use trunk_ir_native_backend::{EmitError, TranslationError};

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct PipelineError {
    #[from]
    kind: Box<PipelineErrorKind>,
}

impl<E> From<E> for PipelineError
where
    PipelineErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        PipelineError {
            kind: Box::new(PipelineErrorKind::from(error)),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> &PipelineErrorKind {
        &self.kind
    }

    pub(crate) fn config(msg: impl std::fmt::Display) -> Self {
        PipelineErrorKind::Config(msg.to_string()).into()
    }
}

#[derive(Display, Debug)]
pub enum PipelineErrorKind {
    #[display("Verification failed: {_0}")]
    Verification(VerificationErrors),

    #[display("{_0}")]
    Translation(TranslationError),

    #[display("{_0}")]
    Emit(EmitError),

    #[display("Invalid configuration: {_0}")]
    Config(String),

    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

impl From<VerificationErrors> for PipelineErrorKind {
    fn from(errors: VerificationErrors) -> Self {
        PipelineErrorKind::Verification(errors)
    }
}

impl From<TranslationError> for PipelineErrorKind {
    fn from(error: TranslationError) -> Self {
        PipelineErrorKind::Translation(error)
    }
}

impl From<EmitError> for PipelineErrorKind {
    fn from(error: EmitError) -> Self {
        PipelineErrorKind::Emit(error)
    }
}

impl From<std::io::Error> for PipelineErrorKind {
    fn from(error: std::io::Error) -> Self {
        PipelineErrorKind::Io(error)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            PipelineErrorKind::Verification(e) => Some(e),
            PipelineErrorKind::Translation(e) => Some(e),
            PipelineErrorKind::Emit(e) => Some(e),
            PipelineErrorKind::Io(e) => Some(e),
            PipelineErrorKind::Config(_) => None,
        }
    }
}
