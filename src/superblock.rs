//! The superblock codec (§4.1): block 0 of the image, parsed once at mount
//! and rewritten once at unmount.

use fmt_extra::AsciiStr;
use index_fixed::index_fixed;

use crate::codec::{read_u16, write_u16};
use crate::device::BlockDevice;
use crate::error::SuperblockError;
use crate::BLOCK_SIZE;

/// 8 raw bytes, no NUL terminator (§3).
pub const SIGNATURE: &[u8; 8] = b"ECS150FS";

const OFF_SIGNATURE: usize = 0;
const OFF_TOTAL_BLOCKS: usize = 8;
const OFF_ROOT_INDEX: usize = 10;
const OFF_DATA_START_INDEX: usize = 12;
const OFF_TOTAL_DATA_BLOCKS: usize = 14;
const OFF_NUM_FAT_BLOCKS: usize = 16;

/// In-memory mirror of block 0.
///
/// Every field here is validated at `load` time; once constructed, a
/// `Superblock`'s geometry fields (§3 invariant 1) can be trusted by the
/// rest of the crate without re-checking on every access.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub total_blocks: u16,
    pub root_index: u16,
    pub data_start_index: u16,
    pub total_data_blocks: u16,
    pub num_fat_blocks: u8,
}

impl Superblock {
    /// Derive the geometry for a fresh image of `total_blocks` blocks and
    /// `num_fat_blocks` FAT blocks (used by `format`, §4.7).
    pub fn new(total_blocks: u16, num_fat_blocks: u8) -> Self {
        let root_index = num_fat_blocks as u16 + 1;
        let data_start_index = root_index + 1;
        let total_data_blocks = total_blocks - data_start_index;
        Superblock {
            total_blocks,
            root_index,
            data_start_index,
            total_data_blocks,
            num_fat_blocks,
        }
    }

    /// Read and validate block 0 of `device` (§4.1).
    pub fn load<D: BlockDevice>(device: &D) -> Result<Self, SuperblockError> {
        let mut raw = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut raw)?;

        let signature: &[u8; 8] = index_fixed!(&raw; OFF_SIGNATURE, .. (OFF_SIGNATURE + 8));
        if signature != SIGNATURE {
            return Err(SuperblockError::BadSignature(AsciiStr(*signature)));
        }

        let total_blocks = read_u16(&raw, OFF_TOTAL_BLOCKS);
        let root_index = read_u16(&raw, OFF_ROOT_INDEX);
        let data_start_index = read_u16(&raw, OFF_DATA_START_INDEX);
        let total_data_blocks = read_u16(&raw, OFF_TOTAL_DATA_BLOCKS);
        let num_fat_blocks = raw[OFF_NUM_FAT_BLOCKS];

        if num_fat_blocks < 1 {
            return Err(SuperblockError::NoFatBlocks);
        }

        let expected_root_index = num_fat_blocks as u16 + 1;
        if root_index != expected_root_index {
            return Err(SuperblockError::BadRootIndex {
                root_index,
                expected: expected_root_index,
            });
        }

        let expected_data_start_index = root_index + 1;
        if data_start_index != expected_data_start_index {
            return Err(SuperblockError::BadDataStartIndex {
                data_start_index,
                expected: expected_data_start_index,
            });
        }

        let expected_total_blocks = num_fat_blocks as u16 + 2 + total_data_blocks;
        if total_blocks != expected_total_blocks {
            return Err(SuperblockError::GeometryMismatch {
                total_blocks,
                num_fat_blocks,
                total_data_blocks,
            });
        }

        if device.count() as u32 != total_blocks as u32 {
            return Err(SuperblockError::BlockCountMismatch {
                claimed: total_blocks,
                actual: device.count(),
            });
        }

        Ok(Superblock {
            total_blocks,
            root_index,
            data_start_index,
            total_data_blocks,
            num_fat_blocks,
        })
    }

    /// Serialize and write this superblock back to block 0 (§4.1 `store`).
    pub fn store<D: BlockDevice>(&self, device: &mut D) -> std::io::Result<()> {
        let mut raw = [0u8; BLOCK_SIZE];
        raw[OFF_SIGNATURE..OFF_SIGNATURE + 8].copy_from_slice(SIGNATURE);
        write_u16(&mut raw, OFF_TOTAL_BLOCKS, self.total_blocks);
        write_u16(&mut raw, OFF_ROOT_INDEX, self.root_index);
        write_u16(&mut raw, OFF_DATA_START_INDEX, self.data_start_index);
        write_u16(&mut raw, OFF_TOTAL_DATA_BLOCKS, self.total_data_blocks);
        raw[OFF_NUM_FAT_BLOCKS] = self.num_fat_blocks;
        device.write_block(0, &raw)
    }
}
