//! ECS150FS: a simple FAT-style filesystem over a block device.
//!
//! This crate implements the on-disk layout, FAT chain allocator, and
//! read/write path described in the module docs below. A single mounted
//! filesystem exposes POSIX-like file operations (create, delete, open,
//! close, read, write, seek, stat, list, info) against a flat root
//! directory of up to `FILE_MAX_COUNT` files.
//!
//! The hard part — and the only part of this crate with real engineering
//! risk — is [`fs::Filesystem::read`] and [`fs::Filesystem::write`]: turning
//! a `(file, byte offset, length)` request into a bounded sequence of
//! whole-block device transfers while keeping the FAT chain and the root
//! directory's cached size consistent across partial, sub-block, and
//! chain-extending operations.
//!
//! Concurrency model: single-threaded cooperative, matching the library's
//! single-mount assumption (§5 of the design notes). Nothing here is
//! `Sync`; callers that need concurrent access must serialize externally.

pub mod codec;
pub mod device;
pub mod error;
pub mod fat;
pub mod fd;
pub mod fs;
pub mod options;
pub mod root;
pub mod superblock;

pub use device::{BlockDevice, FileBlockDevice};
pub use error::{Error, Result, SuperblockError};
pub use fs::Filesystem;
pub use options::{FormatOptions, MountOptions};

use std::path::Path;

/// Fixed size of every block on disk and in memory (§3).
pub const BLOCK_SIZE: usize = 4096;
/// Maximum filename length, including the terminating NUL (§3).
pub const FILENAME_MAX_LEN: usize = 16;
/// Root directory capacity (§3).
pub const FILE_MAX_COUNT: usize = 128;
/// Maximum number of simultaneously open file descriptors (§3).
pub const OPEN_MAX_COUNT: usize = 32;
/// End-of-chain sentinel (§3).
pub const FAT_EOC: u16 = 0xFFFF;

/// The public mount-manager API (§4.5).
///
/// The source implementation keeps its superblock, FAT, root directory, and
/// fd table as global mutable singletons, reflecting its one-mount-at-a-time
/// assumption. Rather than reproduce that with statics, `Ecs150Fs` holds an
/// `Option<Filesystem<FileBlockDevice>>`: still only one mount at a time
/// (attempting a second returns `Error::AlreadyMounted`), but owned by a
/// value the caller controls instead of living at process scope.
#[derive(Default)]
pub struct Ecs150Fs {
    mounted: Option<Filesystem<FileBlockDevice>>,
}

impl Ecs150Fs {
    pub fn new() -> Self {
        Ecs150Fs { mounted: None }
    }

    /// Create a fresh image at `path` and mount it (§4.7 `format`, combined
    /// with the mount that naturally follows it for a brand new disk).
    pub fn format<P: AsRef<Path>>(&mut self, path: P, options: FormatOptions) -> Result<()> {
        if self.mounted.is_some() {
            return Err(Error::AlreadyMounted);
        }
        let num_fat_blocks = fs::num_fat_blocks_for(options.total_data_blocks);
        let total_blocks = num_fat_blocks as u32 + 2 + options.total_data_blocks as u32;
        let device = FileBlockDevice::create(path, total_blocks)?;
        self.mounted = Some(Filesystem::format(device, options)?);
        Ok(())
    }

    pub fn mount<P: AsRef<Path>>(&mut self, path: P, options: MountOptions) -> Result<()> {
        if self.mounted.is_some() {
            return Err(Error::AlreadyMounted);
        }
        let device = FileBlockDevice::open(path)?;
        self.mounted = Some(Filesystem::mount(device, options)?);
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<()> {
        let fs = self.mounted.take().ok_or(Error::NotMounted)?;
        match fs.unmount() {
            Ok(_device) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn active(&self) -> Result<&Filesystem<FileBlockDevice>> {
        self.mounted.as_ref().ok_or(Error::NotMounted)
    }

    fn active_mut(&mut self) -> Result<&mut Filesystem<FileBlockDevice>> {
        self.mounted.as_mut().ok_or(Error::NotMounted)
    }

    /// §6.3. Rejected when not mounted (§9, resolved open question 4).
    pub fn info(&self) -> Result<String> {
        Ok(self.active()?.info())
    }

    /// §6.4. Rejected when not mounted (§9, resolved open question 4).
    pub fn ls(&self) -> Result<String> {
        Ok(self.active()?.ls())
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        self.active_mut()?.create(name)
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.active_mut()?.delete(name)
    }

    pub fn open(&mut self, name: &str) -> Result<usize> {
        self.active_mut()?.open(name)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.active_mut()?.close(fd)
    }

    pub fn stat(&self, fd: usize) -> Result<u32> {
        self.active()?.stat(fd)
    }

    pub fn seek(&mut self, fd: usize, offset: u32) -> Result<()> {
        self.active_mut()?.seek(fd, offset)
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        self.active_mut()?.read(fd, buf)
    }

    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        self.active_mut()?.write(fd, buf)
    }
}
