use thiserror::Error;

/// Everything that can go wrong in the macro subsystem.
///
/// Parse errors never leave a partially built program behind; runtime errors
/// unwind the whole call stack of the macro that raised them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MacroError {
    /// Compile-time failure. `offset` is the byte offset reached in the
    /// source text, suitable for pointing at the offending character.
    #[error("parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Execution failure: bad index, wrong arity, arithmetic fault,
    /// built-in failure, unknown subroutine.
    #[error("macro error: {0}")]
    Runtime(String),

    /// Deliberate termination requested by the host; not a failure.
    #[error("macro cancelled")]
    Cancelled,

    /// A macro is already executing on this document; the new request is
    /// rejected, not queued.
    #[error("a macro is already running in this document")]
    AlreadyRunning,
}

impl MacroError {
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        MacroError::Runtime(message.into())
    }

    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        MacroError::Parse {
            offset,
            message: message.into(),
        }
    }
}
