//! The mount context (§4.5, §4.6): ties the superblock, FAT, root directory,
//! and file descriptor table to one open `BlockDevice`, and implements the
//! read/write I/O engine that is the hard part of this crate.

use crate::device::BlockDevice;
use crate::error::Error;
use crate::fat::Fat;
use crate::fd::FileDescriptorTable;
use crate::options::{FormatOptions, MountOptions};
use crate::root::RootDirectory;
use crate::superblock::Superblock;
use crate::BLOCK_SIZE;

const ENTRIES_PER_FAT_BLOCK: u32 = (BLOCK_SIZE / 2) as u32;

pub(crate) fn num_fat_blocks_for(total_data_blocks: u16) -> u8 {
    let total_data_blocks = total_data_blocks as u32;
    let blocks = (total_data_blocks + ENTRIES_PER_FAT_BLOCK - 1) / ENTRIES_PER_FAT_BLOCK;
    blocks.max(1) as u8
}

/// One mounted (or freshly formatted) filesystem, generic over the block
/// device backing it so unit tests can swap in an in-memory fake.
pub struct Filesystem<D: BlockDevice> {
    device: D,
    superblock: Superblock,
    fat: Fat,
    root: RootDirectory,
    fdt: FileDescriptorTable,
    options: MountOptions,
}

impl<D: BlockDevice> Filesystem<D> {
    /// Lay down a fresh image on `device` per `options` (§4.7). `device`
    /// must already report the total block count the caller wants; this
    /// crate does not resize block devices.
    pub fn format(mut device: D, options: FormatOptions) -> Result<Self, Error> {
        let num_fat_blocks = num_fat_blocks_for(options.total_data_blocks);
        let total_blocks = num_fat_blocks as u32 + 2 + options.total_data_blocks as u32;
        if device.count() != total_blocks {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "device has {} blocks, format geometry needs {total_blocks}",
                    device.count()
                ),
            )));
        }

        let superblock = Superblock::new(total_blocks as u16, num_fat_blocks);
        let fat = Fat::new_formatted(options.total_data_blocks, num_fat_blocks);
        let root = RootDirectory::new_formatted();

        superblock.store(&mut device)?;
        fat.store(&mut device)?;
        root.store(&mut device, superblock.root_index)?;

        log::debug!(
            "format: total_blocks={total_blocks} num_fat_blocks={num_fat_blocks} total_data_blocks={}",
            options.total_data_blocks
        );

        Ok(Filesystem {
            device,
            superblock,
            fat,
            root,
            fdt: FileDescriptorTable::new(),
            options: MountOptions::default(),
        })
    }

    /// Mount an already-formatted image (§4.5).
    pub fn mount(device: D, options: MountOptions) -> Result<Self, Error> {
        let superblock = Superblock::load(&device)?;
        let fat = Fat::load(&device, superblock.num_fat_blocks, superblock.total_data_blocks)?;
        let root = RootDirectory::load(&device, superblock.root_index)?;

        if options.strict_geometry {
            for (_, entry) in root.list() {
                if fat.chain_len(entry.first_index).is_err() {
                    log::error!("mount: corrupt chain for file {:?}", entry.name);
                    return Err(Error::Corrupt(
                        "a file's FAT chain does not terminate within total_data_blocks hops",
                    ));
                }
            }
        }

        log::debug!(
            "mount: total_blocks={} num_fat_blocks={} read_only={}",
            superblock.total_blocks,
            superblock.num_fat_blocks,
            options.read_only
        );

        Ok(Filesystem {
            device,
            superblock,
            fat,
            root,
            fdt: FileDescriptorTable::new(),
            options,
        })
    }

    /// Flush superblock, FAT, and root directory back to disk and hand the
    /// device back to the caller (§4.5 `unmount`). `Busy` if any fd remains
    /// open (unmount never implicitly closes handles).
    pub fn unmount(mut self) -> Result<D, Error> {
        if self.fdt.any_open() {
            return Err(Error::Busy("cannot unmount with open file descriptors"));
        }
        self.superblock.store(&mut self.device)?;
        self.fat.store(&mut self.device)?;
        self.root.store(&mut self.device, self.superblock.root_index)?;
        log::debug!("unmount: flushed superblock, fat, and root directory");
        Ok(self.device)
    }

    /// §6.3: bit-stable `info` text.
    pub fn info(&self) -> String {
        format!(
            "FS Info:\n\
             total_blk_count={}\n\
             fat_blk_count={}\n\
             rdir_blk={}\n\
             data_blk={}\n\
             data_blk_count={}\n\
             fat_free_ratio={}/{}\n\
             rdir_free_ratio={}/{}\n",
            self.superblock.total_blocks,
            self.superblock.num_fat_blocks,
            self.superblock.root_index,
            self.superblock.data_start_index,
            self.superblock.total_data_blocks,
            self.fat.free_count(),
            self.superblock.total_data_blocks,
            self.root.empty_count(),
            self.root.capacity(),
        )
    }

    /// §6.4: bit-stable `ls` text.
    pub fn ls(&self) -> String {
        let mut out = String::from("FS Ls:\n");
        for (_, entry) in self.root.list() {
            out.push_str(&format!(
                "file: {}, size: {}, data_blk: {}\n",
                entry.name, entry.size, entry.first_index
            ));
        }
        out
    }

    pub fn create(&mut self, name: &str) -> Result<(), Error> {
        self.require_writable()?;
        self.root.create(name)?;
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), Error> {
        self.require_writable()?;
        let idx = self.root.find(name).ok_or(Error::NotFound)?;
        if self.fdt.references(idx) {
            return Err(Error::Busy("file is open"));
        }
        let first_index = self
            .root
            .get(idx)
            .expect("find() returned a valid index")
            .first_index;
        self.fat.free_chain(first_index)?;
        self.root.clear(idx);
        Ok(())
    }

    pub fn open(&mut self, name: &str) -> Result<usize, Error> {
        let idx = self.root.find(name).ok_or(Error::NotFound)?;
        self.fdt.open(idx)
    }

    pub fn close(&mut self, fd: usize) -> Result<(), Error> {
        self.fdt.close(fd)
    }

    pub fn stat(&self, fd: usize) -> Result<u32, Error> {
        let ref_idx = self.fdt.get(fd)?.root_index;
        Ok(self
            .root
            .get(ref_idx)
            .expect("open fd always references a live root entry")
            .size)
    }

    pub fn seek(&mut self, fd: usize, offset: u32) -> Result<(), Error> {
        let ref_idx = self.fdt.get(fd)?.root_index;
        let size = self
            .root
            .get(ref_idx)
            .expect("open fd always references a live root entry")
            .size;
        if offset > size {
            return Err(Error::OutOfRange);
        }
        self.fdt.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// §4.6.1.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize, Error> {
        let (ref_idx, off) = {
            let f = self.fdt.get(fd)?;
            (f.root_index, f.offset)
        };
        let entry = self
            .root
            .get(ref_idx)
            .expect("open fd always references a live root entry");
        let size = entry.size;
        let start = entry.first_index;

        if off >= size {
            return Ok(0);
        }
        let mut remaining = buf.len().min((size - off) as usize);

        let n_hops = off / BLOCK_SIZE as u32;
        let mut cur = self
            .fat
            .walk(start, n_hops)?
            .ok_or(Error::Corrupt("chain ended before requested read offset"))?;
        let mut intra = (off % BLOCK_SIZE as u32) as usize;
        let mut bounce = [0u8; BLOCK_SIZE];
        let mut produced = 0usize;

        while remaining > 0 {
            let take = remaining.min(BLOCK_SIZE - intra);
            let physical = self.superblock.data_start_index as u32 + cur as u32;
            self.device.read_block(physical, &mut bounce)?;
            buf[produced..produced + take].copy_from_slice(&bounce[intra..intra + take]);
            produced += take;
            remaining -= take;
            intra = 0;

            if remaining > 0 {
                let next = self.fat.get(cur);
                if next == crate::FAT_EOC {
                    return Err(Error::Corrupt("chain ended before requested bytes were read"));
                }
                cur = next;
            }
        }

        self.fdt.get_mut(fd)?.offset += produced as u32;
        log::debug!("read: fd={fd} off={off} produced={produced}");
        Ok(produced)
    }

    /// §4.6.2.
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize, Error> {
        self.require_writable()?;
        let (ref_idx, off) = {
            let f = self.fdt.get(fd)?;
            (f.root_index, f.offset)
        };

        // Must not allocate a head block for a write that copies nothing:
        // a size-0 file stays at first_index == FAT_EOC (§3 invariant 5).
        if buf.is_empty() {
            return Ok(0);
        }

        let n_hops = off / BLOCK_SIZE as u32;
        let mut cur = match self.walk_for_write(ref_idx, n_hops) {
            Ok(b) => b,
            Err(Error::NoSpace) => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut intra = (off % BLOCK_SIZE as u32) as usize;
        let mut remaining = buf.len();
        let mut written = 0usize;
        let mut bounce = [0u8; BLOCK_SIZE];

        while remaining > 0 {
            let take = remaining.min(BLOCK_SIZE - intra);
            let physical = self.superblock.data_start_index as u32 + cur as u32;
            if intra != 0 || take != BLOCK_SIZE {
                self.device.read_block(physical, &mut bounce)?;
                bounce[intra..intra + take].copy_from_slice(&buf[written..written + take]);
                self.device.write_block(physical, &bounce)?;
            } else {
                let exact: &[u8; BLOCK_SIZE] = (&buf[written..written + take])
                    .try_into()
                    .expect("take == BLOCK_SIZE");
                self.device.write_block(physical, exact)?;
            }
            written += take;
            remaining -= take;
            intra = 0;

            if remaining > 0 {
                let next = self.fat.get(cur);
                cur = if next == crate::FAT_EOC {
                    match self.fat.allocate_free() {
                        Ok(nb) => {
                            self.fat.set(cur, nb);
                            nb
                        }
                        Err(Error::NoSpace) => break,
                        Err(e) => return Err(e),
                    }
                } else {
                    next
                };
            }
        }

        let entry = self
            .root
            .get_mut(ref_idx)
            .expect("open fd always references a live root entry");
        entry.size = entry.size.max(off + written as u32);
        self.fdt.get_mut(fd)?.offset = off + written as u32;
        log::debug!("write: fd={fd} off={off} requested={} written={written}", buf.len());
        Ok(written)
    }

    fn require_writable(&self) -> Result<(), Error> {
        if self.options.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    /// Walk `n_hops` from the file's head, allocating the head and/or
    /// extending the tail as needed (§4.6.2 steps 2-3).
    fn walk_for_write(&mut self, ref_idx: usize, n_hops: u32) -> Result<u16, Error> {
        let mut first = self
            .root
            .get(ref_idx)
            .expect("open fd always references a live root entry")
            .first_index;
        if first == crate::FAT_EOC {
            let head = self.fat.allocate_free()?;
            self.root
                .get_mut(ref_idx)
                .expect("open fd always references a live root entry")
                .first_index = head;
            first = head;
        }

        let mut cur = first;
        for _ in 0..n_hops {
            let next = self.fat.get(cur);
            cur = if next == crate::FAT_EOC {
                let nb = self.fat.allocate_free()?;
                self.fat.set(cur, nb);
                nb
            } else {
                next
            };
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mem::MemBlockDevice;

    fn fresh(total_data_blocks: u16) -> Filesystem<MemBlockDevice> {
        let num_fat_blocks = num_fat_blocks_for(total_data_blocks);
        let total_blocks = num_fat_blocks as u32 + 2 + total_data_blocks as u32;
        let device = MemBlockDevice::zeroed(total_blocks);
        Filesystem::format(device, FormatOptions::new(total_data_blocks)).unwrap()
    }

    #[test]
    fn info_matches_the_pinned_scenario() {
        let fs = fresh(8192);
        assert_eq!(
            fs.info(),
            "FS Info:\n\
             total_blk_count=8198\n\
             fat_blk_count=4\n\
             rdir_blk=5\n\
             data_blk=6\n\
             data_blk_count=8192\n\
             fat_free_ratio=8191/8192\n\
             rdir_free_ratio=128/128\n"
        );
    }

    #[test]
    fn ls_prints_a_fresh_zero_size_entry() {
        let mut fs = fresh(16);
        fs.create("hello.txt").unwrap();
        assert_eq!(fs.ls(), "FS Ls:\nfile: hello.txt, size: 0, data_blk: 65535\n");
    }

    #[test]
    fn small_write_then_seek_then_read_round_trips() {
        let mut fs = fresh(16);
        fs.create("hello.txt").unwrap();
        let fd = fs.open("hello.txt").unwrap();
        assert_eq!(fs.write(fd, b"ABCDE").unwrap(), 5);
        fs.seek(fd, 0).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"ABCDE");
    }

    #[test]
    fn spanning_write_crosses_a_block_boundary() {
        let mut fs = fresh(16);
        fs.create("big.bin").unwrap();
        let fd = fs.open("big.bin").unwrap();

        let pattern: Vec<u8> = (0..6000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(fs.write(fd, &pattern).unwrap(), 6000);
        assert_eq!(fs.stat(fd).unwrap(), 6000);

        fs.seek(fd, 4090).unwrap();
        let mut buf = [0u8; 20];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 20);
        assert_eq!(&buf[..], &pattern[4090..4110]);
    }

    #[test]
    fn read_past_eof_returns_zero() {
        let mut fs = fresh(16);
        fs.create("big.bin").unwrap();
        let fd = fs.open("big.bin").unwrap();
        fs.write(fd, &vec![0u8; 6000]).unwrap();
        fs.seek(fd, 6000).unwrap();
        let mut buf = [0u8; 100];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    }

    #[test]
    fn delete_while_open_is_busy_then_succeeds_after_close() {
        let mut fs = fresh(16);
        fs.create("hello.txt").unwrap();
        let fd = fs.open("hello.txt").unwrap();
        assert!(matches!(fs.delete("hello.txt"), Err(Error::Busy(_))));
        fs.close(fd).unwrap();
        fs.delete("hello.txt").unwrap();
        assert_eq!(fs.ls(), "FS Ls:\n");
    }

    #[test]
    fn delete_frees_exactly_the_chain_length() {
        let mut fs = fresh(16);
        fs.create("big.bin").unwrap();
        let fd = fs.open("big.bin").unwrap();
        fs.write(fd, &vec![0u8; 6000]).unwrap();
        fs.close(fd).unwrap();

        let free_before = fs.fat.free_count();
        fs.delete("big.bin").unwrap();
        let free_after = fs.fat.free_count();
        assert_eq!(free_after - free_before, 2);
    }

    #[test]
    fn write_size_update_is_max_not_unconditional() {
        let mut fs = fresh(16);
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        fs.write(fd, b"0123456789").unwrap();
        fs.seek(fd, 2).unwrap();
        fs.write(fd, b"XX").unwrap();
        assert_eq!(fs.stat(fd).unwrap(), 10);
    }

    #[test]
    fn offset_monotonicity_after_write() {
        let mut fs = fresh(16);
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        let n = fs.write(fd, b"hello world").unwrap();
        assert_eq!(n, 11);
        assert_eq!(fs.fdt.get(fd).unwrap().offset, 11);
    }

    #[test]
    fn read_only_mount_rejects_mutation() {
        let num_fat_blocks = num_fat_blocks_for(16);
        let total_blocks = num_fat_blocks as u32 + 2 + 16;
        let device = MemBlockDevice::zeroed(total_blocks);
        let mut fs = Filesystem::format(device, FormatOptions::new(16)).unwrap();
        fs.create("f").unwrap();
        let device = fs.unmount().unwrap();

        let mut ro = Filesystem::mount(device, MountOptions::read_only()).unwrap();
        assert!(matches!(ro.create("g"), Err(Error::ReadOnly)));
        let fd = ro.open("f").unwrap();
        assert!(matches!(ro.write(fd, b"x"), Err(Error::ReadOnly)));
    }

    #[test]
    fn unmount_refuses_while_a_descriptor_is_open() {
        let mut fs = fresh(16);
        fs.create("f").unwrap();
        fs.open("f").unwrap();
        assert!(matches!(fs.unmount(), Err(Error::Busy(_))));
    }

    #[test]
    fn zero_length_write_does_not_allocate_a_head_block() {
        let mut fs = fresh(16);
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        assert_eq!(fs.write(fd, b"").unwrap(), 0);
        assert_eq!(fs.stat(fd).unwrap(), 0);
        assert_eq!(fs.ls(), "FS Ls:\nfile: f, size: 0, data_blk: 65535\n");
    }
}
