use std::fmt::Display;

use thiserror::Error;

use crate::{context::Uid, os::OsError};

pub type VelaResult<T = ()> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no {domain} context is current on this thread")]
    ContextExistence { domain: &'static str },

    #[error("{domain} {resource} {name} is owned by {owner}, which current context {current} cannot use")]
    InvalidOwnership {
        domain: &'static str,
        resource: &'static str,
        name: u32,
        owner: Uid,
        current: Uid,
    },

    #[error("{domain} {resource} handle is empty")]
    EmptyHandle {
        domain: &'static str,
        resource: &'static str,
    },

    #[error("{domain} api returned no name for a new {resource}")]
    Allocation {
        domain: &'static str,
        resource: &'static str,
    },

    #[error("{domain} error {code:#06x}: {kind}")]
    Native {
        domain: &'static str,
        kind: NativeErrorKind,
        code: u32,
    },

    #[error("shader compilation failed:\n{log}")]
    ShaderCompile { log: String },

    #[error("program link failed:\n{log}")]
    ProgramLink { log: String },

    #[error("unsupported sample layout: {channels} channels of {bits} bits")]
    SampleLayout { channels: u16, bits: u16 },

    #[error(transparent)]
    Os(#[from] OsError),

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("an image processing error occurred")]
    Image(#[from] image::ImageError),

    #[error("failed to load font: {0}")]
    Font(&'static str),

    #[error("graphics device unavailable: {0}")]
    Gpu(String),

    #[error("audio output unavailable: {0}")]
    AudioOutput(String),

    #[error("failed to create event loop")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to perform os action")]
    Window(#[from] winit::error::OsError),
}

impl Error {
    pub(crate) fn native(domain: &'static str, kind: NativeErrorKind, code: u32) -> Self {
        Self::Native { domain, kind, code }
    }

    /// The translated native error kind, if this error came from a native error flag.
    pub fn native_kind(&self) -> Option<NativeErrorKind> {
        match self {
            Self::Native { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Native error codes shared by the audio and graphics apis, after translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeErrorKind {
    InvalidName,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    Unknown,
}

impl NativeErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidName => "invalid name: an object name was not recognised",
            Self::InvalidEnum => "invalid enum: an unacceptable value was specified for an enumerated argument",
            Self::InvalidValue => "invalid value: a numeric argument is out of range",
            Self::InvalidOperation => "invalid operation: the operation is not allowed in the current state",
            Self::InvalidFramebufferOperation => "invalid framebuffer operation: the framebuffer object is not complete",
            Self::StackOverflow => "stack overflow: the operation would cause an internal stack to overflow",
            Self::StackUnderflow => "stack underflow: the operation would cause an internal stack to underflow",
            Self::OutOfMemory => "out of memory: there is not enough memory left to execute the operation",
            Self::Unknown => "unknown error",
        }
    }
}

impl Display for NativeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn native_error_message_embeds_code_and_template() {
        let err = Error::native("graphics", NativeErrorKind::InvalidOperation, 0x0502);

        assert_eq!(
            "graphics error 0x0502: invalid operation: the operation is not allowed in the current state",
            err.to_string()
        );
        assert_eq!(Some(NativeErrorKind::InvalidOperation), err.native_kind());
    }

    #[test]
    fn shader_errors_keep_log_verbatim() {
        let log = "error: unclosed '{' opened at line 3";
        let err = Error::ShaderCompile {
            log: log.to_string(),
        };

        assert!(err.to_string().ends_with(log));
        assert_eq!(None, err.native_kind());
    }
}
