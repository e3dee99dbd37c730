//! The root directory (§4.3): a fixed array of 128 32-byte entries, stored
//! in exactly one block (`128 * 32 == BLOCK_SIZE`).

use crate::codec::{read_u16, read_u32, write_u16, write_u32};
use crate::device::BlockDevice;
use crate::error::Error;
use crate::{BLOCK_SIZE, FAT_EOC, FILENAME_MAX_LEN, FILE_MAX_COUNT};

const ENTRY_SIZE: usize = 32;
const OFF_NAME: usize = 0;
const OFF_SIZE: usize = 16;
const OFF_FIRST_INDEX: usize = 20;

const _: () = assert!(ENTRY_SIZE * FILE_MAX_COUNT == BLOCK_SIZE);

/// One root directory slot. `None` when the slot is empty (§3: "an empty
/// entry starts with a zero byte").
#[derive(Debug, Clone)]
pub struct RootEntry {
    pub name: String,
    pub size: u32,
    pub first_index: u16,
}

pub struct RootDirectory {
    entries: Vec<Option<RootEntry>>,
}

fn encode_name(name: &str) -> Result<[u8; FILENAME_MAX_LEN], Error> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > FILENAME_MAX_LEN - 1 || bytes.contains(&0) {
        return Err(Error::InvalidName);
    }
    let mut raw = [0u8; FILENAME_MAX_LEN];
    raw[..bytes.len()].copy_from_slice(bytes);
    Ok(raw)
}

fn decode_name(raw: &[u8; FILENAME_MAX_LEN]) -> String {
    let nul = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..nul]).into_owned()
}

impl RootDirectory {
    /// An empty root directory, as laid down fresh by `format` (§4.7).
    pub fn new_formatted() -> Self {
        RootDirectory {
            entries: vec![None; FILE_MAX_COUNT],
        }
    }

    /// Load the root directory block (§4.3).
    pub fn load<D: BlockDevice>(device: &D, root_index: u16) -> Result<Self, Error> {
        let mut raw = [0u8; BLOCK_SIZE];
        device.read_block(root_index as u32, &mut raw)?;

        let mut entries = Vec::with_capacity(FILE_MAX_COUNT);
        for i in 0..FILE_MAX_COUNT {
            let off = i * ENTRY_SIZE;
            if raw[off + OFF_NAME] == 0 {
                entries.push(None);
                continue;
            }
            let name_raw: [u8; FILENAME_MAX_LEN] =
                raw[off + OFF_NAME..off + OFF_NAME + FILENAME_MAX_LEN]
                    .try_into()
                    .expect("slice has exactly FILENAME_MAX_LEN bytes");
            let size = read_u32(&raw, off + OFF_SIZE);
            let first_index = read_u16(&raw, off + OFF_FIRST_INDEX);
            entries.push(Some(RootEntry {
                name: decode_name(&name_raw),
                size,
                first_index,
            }));
        }
        Ok(RootDirectory { entries })
    }

    /// Serialize and write the root directory block back to disk.
    pub fn store<D: BlockDevice>(&self, device: &mut D, root_index: u16) -> Result<(), Error> {
        let mut raw = [0u8; BLOCK_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            let off = i * ENTRY_SIZE;
            if let Some(e) = entry {
                let name_raw = encode_name(&e.name)?;
                raw[off + OFF_NAME..off + OFF_NAME + FILENAME_MAX_LEN].copy_from_slice(&name_raw);
                write_u32(&mut raw, off + OFF_SIZE, e.size);
                write_u16(&mut raw, off + OFF_FIRST_INDEX, e.first_index);
            }
        }
        device.write_block(root_index as u32, &raw)?;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&RootEntry> {
        self.entries[index].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RootEntry> {
        self.entries[index].as_mut()
    }

    /// Linear scan for `name`, returning the first matching index (§4.3).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, Some(e) if e.name == name))
    }

    /// Create a new, empty (size 0, `first_index = FAT_EOC`) entry named
    /// `name`. Filenames are unique within the root (§3 invariant 7).
    pub fn create(&mut self, name: &str) -> Result<usize, Error> {
        encode_name(name)?;
        if self.find(name).is_some() {
            return Err(Error::Exists);
        }
        let slot = self
            .entries
            .iter()
            .position(|e| e.is_none())
            .ok_or(Error::Full)?;
        self.entries[slot] = Some(RootEntry {
            name: name.to_string(),
            size: 0,
            first_index: FAT_EOC,
        });
        Ok(slot)
    }

    /// Clear a slot that the caller has already confirmed is not busy and
    /// whose FAT chain the caller has already freed.
    pub fn clear(&mut self, index: usize) {
        self.entries[index] = None;
    }

    /// Non-empty entries in index order, paired with their root index
    /// (§4.3 `list`, and §6.4 `ls`).
    pub fn list(&self) -> impl Iterator<Item = (usize, &RootEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    pub fn empty_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_none()).count()
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}
