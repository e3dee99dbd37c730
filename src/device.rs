//! The block device abstraction (§6.1).
//!
//! The contract is intentionally narrow: whole-block reads and writes,
//! addressed by block index, against a medium of a fixed, known block count.
//! Everything above this trait (superblock, FAT, root directory, I/O engine)
//! is written against `BlockDevice` alone, so an in-memory fake can stand in
//! for `FileBlockDevice` in unit tests without touching the filesystem.

use std::fs::{File, OpenOptions};
use std::path::Path;

use io_at::{ReadAt, WriteAt};

use crate::BLOCK_SIZE;

/// Whole-block read/write over a fixed-size image.
///
/// Implementations are expected to fail loudly (return `Err`) rather than
/// silently truncate a short read or write; `FileBlockDevice` relies on
/// `io_at`'s positional primitives to make a single block transfer atomic
/// with respect to the file's cursor.
pub trait BlockDevice {
    /// Number of `BLOCK_SIZE`-byte blocks in the image.
    fn count(&self) -> u32;

    /// Read block `index` into `dst`, which must be exactly `BLOCK_SIZE` bytes.
    fn read_block(&self, index: u32, dst: &mut [u8; BLOCK_SIZE]) -> std::io::Result<()>;

    /// Write `src` (exactly `BLOCK_SIZE` bytes) to block `index`.
    fn write_block(&mut self, index: u32, src: &[u8; BLOCK_SIZE]) -> std::io::Result<()>;
}

/// A `BlockDevice` backed by a regular file, opened exclusively for the
/// lifetime of the mount.
///
/// Block `i` lives at byte offset `i * BLOCK_SIZE`; reads and writes go
/// through `io_at`'s `ReadAt`/`WriteAt` rather than `Seek` + `Read`/`Write` so
/// that a single block transfer never depends on (or perturbs) the file's
/// shared cursor.
pub struct FileBlockDevice {
    file: File,
    block_count: u32,
}

impl FileBlockDevice {
    /// Open `path` for read/write access and derive the block count from its
    /// length. The file's length must be an exact multiple of `BLOCK_SIZE`.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len % (BLOCK_SIZE as u64) != 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "image length is not a multiple of BLOCK_SIZE",
            ));
        }
        let block_count = (len / BLOCK_SIZE as u64) as u32;
        Ok(FileBlockDevice { file, block_count })
    }

    /// Create a new image at `path` of exactly `block_count` blocks, filled
    /// with zeroes. Used by `format` to lay down a fresh filesystem.
    pub fn create<P: AsRef<Path>>(path: P, block_count: u32) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;
        Ok(FileBlockDevice { file, block_count })
    }

    fn offset_of(&self, index: u32) -> std::io::Result<u64> {
        if index >= self.block_count {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "block index out of range",
            ));
        }
        Ok(index as u64 * BLOCK_SIZE as u64)
    }
}

impl BlockDevice for FileBlockDevice {
    fn count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&self, index: u32, dst: &mut [u8; BLOCK_SIZE]) -> std::io::Result<()> {
        let offs = self.offset_of(index)?;
        read_at_exact(&self.file, dst, offs)
    }

    fn write_block(&mut self, index: u32, src: &[u8; BLOCK_SIZE]) -> std::io::Result<()> {
        let offs = self.offset_of(index)?;
        write_at_all(&self.file, src, offs)
    }
}

/// `ReadAt::read_at` does not promise it fills the whole buffer in one call
/// (same caveat the teacher crate notes on `BootSector::read_at_from`), so
/// loop until the block is fully read or an error/EOF occurs.
fn read_at_exact(f: &File, mut dst: &mut [u8], mut offs: u64) -> std::io::Result<()> {
    while !dst.is_empty() {
        let n = f.read_at(dst, offs)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read from block device",
            ));
        }
        dst = &mut dst[n..];
        offs += n as u64;
    }
    Ok(())
}

fn write_at_all(f: &File, mut src: &[u8], mut offs: u64) -> std::io::Result<()> {
    while !src.is_empty() {
        let n = f.write_at(src, offs)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short write to block device",
            ));
        }
        src = &src[n..];
        offs += n as u64;
    }
    Ok(())
}
