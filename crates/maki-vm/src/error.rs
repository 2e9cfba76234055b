use std::fmt;

/// Which stage of the pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Scan,
    Compile,
    Runtime,
}

/// The single error type shared by the scanner, the compiler and the VM.
///
/// Carries the failing stage, a message and the source line the error was
/// detected on (taken from the current token during compilation, or from the
/// chunk's line table at the current instruction during execution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
}

impl Error {
    pub fn scan(message: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::Scan,
            message: message.into(),
            line,
        }
    }

    pub fn compile(message: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::Compile,
            message: message.into(),
            line,
        }
    }

    pub fn runtime(message: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.kind {
            ErrorKind::Scan => "scanner error",
            ErrorKind::Compile => "compile error",
            ErrorKind::Runtime => "runtime error",
        };
        write!(f, "{}, {} [line {}]", stage, self.message, self.line)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage_and_line() {
        let err = Error::compile("expected identifier", 3);
        assert_eq!(err.to_string(), "compile error, expected identifier [line 3]");

        let err = Error::runtime("assertion failed", 12);
        assert_eq!(err.to_string(), "runtime error, assertion failed [line 12]");
    }
}
