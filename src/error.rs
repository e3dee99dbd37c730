use std::io;

use fmt_extra::AsciiStr;
use thiserror::Error;

/// Errors raised while parsing or validating the on-disk superblock (block 0).
///
/// Kept as a distinct type, mirroring the teacher crate's split between
/// `BootSectorInitError` (format is wrong) and an outer I/O error, so that
/// `Error::IoError` and `Error::BadSignature`/`Error::GeometryMismatch` stay
/// cleanly separated at the call site.
#[derive(Error, Debug)]
pub enum SuperblockError {
    #[error("I/O error reading superblock: {0}")]
    Io(#[from] io::Error),
    #[error("bad signature: expected \"ECS150FS\", found {0}")]
    BadSignature(AsciiStr<[u8; 8]>),
    #[error("superblock reports total_blocks={total_blocks} but num_fat_blocks={num_fat_blocks}, total_data_blocks={total_data_blocks} do not sum to it")]
    GeometryMismatch {
        total_blocks: u16,
        num_fat_blocks: u8,
        total_data_blocks: u16,
    },
    #[error("num_fat_blocks must be at least 1")]
    NoFatBlocks,
    #[error("root_index ({root_index}) must equal num_fat_blocks+1 ({expected})")]
    BadRootIndex { root_index: u16, expected: u16 },
    #[error("data_start_index ({data_start_index}) must equal root_index+1 ({expected})")]
    BadDataStartIndex { data_start_index: u16, expected: u16 },
    #[error("device reports {actual} blocks but superblock claims {claimed}")]
    BlockCountMismatch { claimed: u16, actual: u32 },
}

/// The library-wide error type.
///
/// All public operations on [`crate::Ecs150Fs`] and [`crate::fs::Filesystem`]
/// return `Result<T, Error>`. This replaces the source's 0/-1 return-value
/// convention (still documented, and still reproduced literally by the
/// `ecs150fs-util` demonstration binary) with the idiomatic `Result` the rest
/// of the Rust filesystem ecosystem uses.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad superblock: {0}")]
    Superblock(#[from] SuperblockError),

    #[error("a filesystem is already mounted")]
    AlreadyMounted,
    #[error("no filesystem is mounted")]
    NotMounted,
    #[error("filesystem is mounted read-only")]
    ReadOnly,

    #[error("resource is busy: {0}")]
    Busy(&'static str),

    #[error("invalid filename")]
    InvalidName,
    #[error("file already exists")]
    Exists,
    #[error("no such file")]
    NotFound,
    #[error("root directory is full")]
    Full,

    #[error("no free file descriptors")]
    NoSlots,
    #[error("invalid file descriptor")]
    BadFd,
    #[error("seek offset is past end of file")]
    OutOfRange,

    #[error("no free blocks available")]
    NoSpace,

    #[error("filesystem metadata is corrupt: {0}")]
    Corrupt(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
