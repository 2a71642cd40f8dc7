use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("JIT dylib '{0}' already exists in this session")]
    DuplicateDylib(String),

    #[error("JIT dylib '{0}' is not owned by this session")]
    UnknownDylib(String),

    #[error("global '{0}' is already defined in this module")]
    DuplicateGlobal(String),

    #[error("aliasee of '{0}' must be a global value")]
    InvalidAliasee(String),
}
