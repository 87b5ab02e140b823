//! The one boundary where this crate returns `Result` instead of
//! asserting: reading and writing the binary forest file. Everywhere
//! else, a violated invariant is a programmer error and panics via
//! `assert!`/`debug_assert!`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForestIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic number: expected {expected:#x}, found {found:#x}")]
    BadMagic { expected: u64, found: u64 },

    #[error("unsupported file format version {found}, this build reads version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("file was written for MAXLEVEL={file_maxlevel}, this build uses MAXLEVEL={build_maxlevel}")]
    MaxlevelMismatch { file_maxlevel: u8, build_maxlevel: u8 },

    #[error("connectivity tree count mismatch: header says {header}, body has {body}")]
    TreeCountMismatch { header: i32, body: i32 },

    #[error("truncated file: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("caller requested payload data but the file was saved without it")]
    NoPayloadInFile,
}
