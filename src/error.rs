//! # World Error Types
//!
//! Every fallible operation of the world core reports one of these. Per-block
//! edits do not use them: `add_block` and `remove_block` return a plain `bool`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine_state::voxels::block::BlockKind;
use crate::engine_state::voxels::chunk::chunk_grid::ChunkId;

/// Errors raised while reading or writing cache and level files.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying file could not be read or written.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    /// A section marker did not match.
    #[error("bad marker: expected {expected:?}, found {found:?}")]
    BadMarker {
        /// Marker the format requires at this point.
        expected: String,
        /// Bytes actually read, lossily decoded.
        found: String,
    },

    /// The file ended in the middle of a header or block record.
    #[error("file truncated while reading {0}")]
    Truncated(&'static str),

    /// More blocks than a two byte count can describe.
    #[error("{0} blocks do not fit a 16-bit count")]
    CountOverflow(usize),

    /// A block record holds a non-finite position or one past the
    /// coordinate limit.
    #[error("block position {0:?} is outside the world")]
    BadPosition([f32; 3]),

    /// A cache file holds a different chunk than its name says.
    #[error("cache file for chunk {expected} holds chunk {found}")]
    ChunkIdMismatch {
        /// Chunk the file was opened for.
        expected: ChunkId,
        /// Chunk id stored in the file header.
        found: ChunkId,
    },
}

/// Errors of the bulk level operations: save, load, generate and reset.
#[derive(Error, Debug)]
pub enum LevelError {
    /// Another bulk operation holds the working flag.
    #[error("another level operation is in progress")]
    Busy,

    /// The shutdown token was raised while the operation ran.
    #[error("operation cancelled")]
    Cancelled,

    /// The world holds as many blocks of this category as it may.
    #[error("capacity of {max} {kind} blocks reached")]
    Capacity {
        /// Category that is full.
        kind: BlockKind,
        /// Configured maximum.
        max: usize,
    },

    /// Level files must use the `.dat` extension.
    #[error("level file {0:?} does not have the .dat extension")]
    InvalidExtension(PathBuf),

    /// Reading or writing a file failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid configuration JSON.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for cache and level codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for bulk level operations.
pub type LevelResult<T> = Result<T, LevelError>;
