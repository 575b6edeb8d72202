//! Contract violations raised by the belief store and the resolver.
//!
//! Expected negative outcomes (a goal with no matching rule, a fact that is
//! not present) are not errors: they are reported through `Resolution`,
//! `bool` and `Option` values instead.

use crate::mask::MaskId;
use crate::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("mask name must not be empty")]
    EmptyMaskName,

    #[error("literal functor must not be empty")]
    EmptyFunctor,

    #[error("variable '{0}' is not defined in the execution context")]
    UnknownVariable(Path),

    #[error("mask {0:?} does not exist in this belief base")]
    UnknownMask(MaskId),

    #[error("mask '{0}' has no parent")]
    NoParent(Path),

    #[error("path element '{segment}' of '{path}' not found")]
    PathNotFound { path: Path, segment: String },

    #[error("element '{0}' already exists")]
    AlreadyExists(Path),

    #[error("mask '{0}' would share child masks between belief bases")]
    SharedChildren(Path),

    #[error("attaching mask '{mask}' would create a storage cycle")]
    StorageCycle { mask: Path },

    #[error("functor '{0}' is not defined")]
    UndefinedFunctor(Path),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
