//! Little-endian byte-level codec helpers shared by the superblock, FAT, and
//! root directory parsers (§6.2: "little-endian for all multi-byte
//! integers, packed without padding except the explicit padding fields").
//!
//! This plays the role the teacher crate's `read_num_bytes!` macro plays,
//! expressed with the safe `from_le_bytes`/`to_le_bytes` conversions stable
//! Rust has grown since that macro was written, rather than the raw
//! `ptr::copy_nonoverlapping` the teacher resorts to.

use index_fixed::index_fixed;

pub fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(*index_fixed!(buf; at, .. (at + 2)))
}

pub fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(*index_fixed!(buf; at, .. (at + 4)))
}

pub fn write_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn write_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}
