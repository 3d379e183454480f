use std::path::Path;

use crate::{Error, VelaResult};

/// A native OS error code together with the message the OS reports for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("os error {code}: {message}")]
pub struct OsError {
    code: i32,
    message: String,
}

impl OsError {
    pub fn from_code(code: i32) -> Self {
        let message = std::io::Error::from_raw_os_error(code).to_string();
        // The io error appends the code itself, which we already carry.
        let suffix = format!(" (os error {code})");
        let message = match message.strip_suffix(&suffix) {
            Some(message) => message.to_string(),
            None => message,
        };

        Self { code, message }
    }

    /// The calling thread's last OS error, if one is set.
    pub fn last() -> Option<Self> {
        std::io::Error::last_os_error()
            .raw_os_error()
            .filter(|code| *code != 0)
            .map(Self::from_code)
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TryFrom<std::io::Error> for OsError {
    type Error = std::io::Error;

    fn try_from(err: std::io::Error) -> Result<Self, Self::Error> {
        match err.raw_os_error() {
            Some(code) => Ok(Self::from_code(code)),
            None => Err(err),
        }
    }
}

/// Reads a whole file. Failures the OS reports are returned as [`OsError`]s.
pub(crate) fn read_file(path: &Path) -> VelaResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| match OsError::try_from(err) {
        Ok(err) => Error::Os(err),
        Err(source) => Error::Io {
            path: path.display().to_string(),
            source,
        },
    })
}
