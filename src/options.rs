//! Mount- and format-time configuration (§1.1, §4.5).
//!
//! Neither the original on-disk format nor the teacher crate carries a
//! runtime config surface; this mirrors the builder-with-defaults idiom the
//! rest of the Rust filesystem-crate corpus uses for mount/format knobs.

/// Options accepted by `Ecs150Fs::mount`.
#[derive(Debug, Clone, Copy)]
pub struct MountOptions {
    /// Reject create/delete/write with `Error::ReadOnly` instead of
    /// mutating in-memory state that `unmount` would otherwise flush.
    pub read_only: bool,
    /// Walk every non-empty root entry's FAT chain at mount time, verifying
    /// each terminates at `FAT_EOC` within `total_data_blocks` hops (§3
    /// invariant 2), instead of only discovering a corrupt chain lazily the
    /// first time a read or write touches it.
    pub strict_geometry: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            read_only: false,
            strict_geometry: true,
        }
    }
}

impl MountOptions {
    pub fn read_only() -> Self {
        MountOptions {
            read_only: true,
            ..Default::default()
        }
    }
}

/// Geometry for `Ecs150Fs::format` (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Total size of the image, expressed in data blocks. The final image
    /// will be larger by `num_fat_blocks(total_data_blocks) + 2` blocks to
    /// account for the superblock, FAT, and root directory.
    pub total_data_blocks: u16,
}

impl FormatOptions {
    pub fn new(total_data_blocks: u16) -> Self {
        FormatOptions { total_data_blocks }
    }
}
