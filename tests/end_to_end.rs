//! Integration tests driving a `tempfile`-backed image through the public
//! `Ecs150Fs` API, covering the literal scenarios in the design notes'
//! testable-properties section.

use ecs150fs::{Ecs150Fs, Error, FormatOptions, MountOptions};
use tempfile::NamedTempFile;

fn temp_image_path() -> std::path::PathBuf {
    NamedTempFile::new()
        .expect("create temp file")
        .into_temp_path()
        .to_path_buf()
}

#[test]
fn fresh_image_info_matches_the_pinned_scenario() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(8192)).unwrap();

    assert_eq!(
        fs.info().unwrap(),
        "FS Info:\n\
         total_blk_count=8198\n\
         fat_blk_count=4\n\
         rdir_blk=5\n\
         data_blk=6\n\
         data_blk_count=8192\n\
         fat_free_ratio=8191/8192\n\
         rdir_free_ratio=128/128\n"
    );
    fs.unmount().unwrap();
}

#[test]
fn create_then_ls_shows_an_empty_file() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();

    fs.create("hello.txt").unwrap();
    assert_eq!(fs.ls().unwrap(), "FS Ls:\nfile: hello.txt, size: 0, data_blk: 65535\n");
    fs.unmount().unwrap();
}

#[test]
fn write_seek_read_round_trip() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();
    fs.create("hello.txt").unwrap();

    let fd = fs.open("hello.txt").unwrap();
    assert_eq!(fd, 0);
    assert_eq!(fs.write(fd, b"ABCDE").unwrap(), 5);
    fs.seek(fd, 0).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"ABCDE");
    fs.close(fd).unwrap();
    fs.unmount().unwrap();
}

#[test]
fn spanning_write_and_offset_read() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();
    fs.create("big.bin").unwrap();

    let fd = fs.open("big.bin").unwrap();
    let pattern: Vec<u8> = (0..6000u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(fs.write(fd, &pattern).unwrap(), 6000);
    assert_eq!(fs.stat(fd).unwrap(), 6000);

    fs.seek(fd, 4090).unwrap();
    let mut buf = [0u8; 20];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 20);
    assert_eq!(&buf[..], &pattern[4090..4110]);

    fs.seek(fd, 6000).unwrap();
    let mut tail = [0u8; 100];
    assert_eq!(fs.read(fd, &mut tail).unwrap(), 0);

    fs.close(fd).unwrap();
    fs.unmount().unwrap();
}

#[test]
fn delete_while_open_is_busy_then_succeeds_after_close() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();
    fs.create("hello.txt").unwrap();

    let fd = fs.open("hello.txt").unwrap();
    assert!(matches!(fs.delete("hello.txt"), Err(Error::Busy(_))));
    fs.close(fd).unwrap();
    fs.delete("hello.txt").unwrap();
    assert_eq!(fs.ls().unwrap(), "FS Ls:\n");
    fs.unmount().unwrap();
}

#[test]
fn format_mount_unmount_remount_round_trip() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(32)).unwrap();
    fs.create("a.txt").unwrap();
    let fd = fs.open("a.txt").unwrap();
    fs.write(fd, b"persisted across unmount").unwrap();
    fs.close(fd).unwrap();

    let ls_before = fs.ls().unwrap();
    fs.unmount().unwrap();

    fs.mount(&path, MountOptions::default()).unwrap();
    assert_eq!(fs.ls().unwrap(), ls_before);
    let fd = fs.open("a.txt").unwrap();
    let mut buf = vec![0u8; "persisted across unmount".len()];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(buf, b"persisted across unmount");
    fs.close(fd).unwrap();
    fs.unmount().unwrap();
}

#[test]
fn unmount_is_busy_while_a_descriptor_is_open() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();
    fs.create("a.txt").unwrap();
    fs.open("a.txt").unwrap();
    assert!(matches!(fs.unmount(), Err(Error::Busy(_))));
}

#[test]
fn rejects_a_second_mount_while_one_is_active() {
    let path = temp_image_path();
    let mut fs = Ecs150Fs::new();
    fs.format(&path, FormatOptions::new(16)).unwrap();
    assert!(matches!(
        fs.mount(&path, MountOptions::default()),
        Err(Error::AlreadyMounted)
    ));
}
