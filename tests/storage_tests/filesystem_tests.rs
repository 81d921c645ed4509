//! Tests for the filesystem backend
//!
//! These tests verify:
//! - Create/read round trip through streams
//! - Open modes (truncate, keep, append, start at end)
//! - Folder creation, object types, rename and delete
//! - Read-only pools and base-directory escapes

use std::fs;
use std::path::PathBuf;

use melon::storage::{filesystem, ObjectType, SeekBase, StreamFlags};
use melon::{MelonError, Storage};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_fs_storage() -> (TempDir, PathBuf, Storage) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();

    let mut storage = Storage::new();
    storage.add_pool(filesystem::create_pool("fs", &path)).unwrap();

    (temp_dir, path, storage)
}

fn write_file(storage: &Storage, path: &str, contents: &[u8]) {
    let mut stream = storage.open(path, StreamFlags::WRITE).unwrap();
    stream.write(contents).unwrap();
    stream.close().unwrap();
}

fn read_file(storage: &Storage, path: &str) -> Vec<u8> {
    let mut stream = storage.open(path, StreamFlags::READ).unwrap();
    let contents = stream.read_to_end().unwrap();
    stream.close().unwrap();
    contents
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_create_write_read_round_trip() {
    let (_temp, _path, storage) = setup_fs_storage();

    storage.create_file("fs://x.txt").unwrap();

    let mut stream = storage.open("fs://x.txt", StreamFlags::WRITE).unwrap();
    stream.write(b"hi").unwrap();
    stream.close().unwrap();

    let mut stream = storage.open("fs://x.txt", StreamFlags::READ).unwrap();
    let mut buffer = [0u8; 2];
    stream.read(&mut buffer).unwrap();
    stream.close().unwrap();

    assert_eq!(&buffer, b"hi");
}

#[test]
fn test_files_land_under_base_dir() {
    let (_temp, path, storage) = setup_fs_storage();

    write_file(&storage, "fs://save/slot1.bin", b"data");

    assert_eq!(fs::read(path.join("save/slot1.bin")).unwrap(), b"data");
}

#[test]
fn test_read_past_end_fails() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://short.bin", b"ab");

    let mut stream = storage.open("fs://short.bin", StreamFlags::READ).unwrap();
    let mut buffer = [0u8; 3];

    assert!(matches!(stream.read(&mut buffer), Err(MelonError::Io(_))));
}

#[test]
fn test_open_missing_for_read() {
    let (_temp, _path, storage) = setup_fs_storage();

    let result = storage.open("fs://missing.txt", StreamFlags::READ);
    assert!(matches!(result, Err(MelonError::NotFound(_))));
}

// =============================================================================
// Open Mode Tests
// =============================================================================

#[test]
fn test_write_truncates() {
    let (_temp, _path, storage) = setup_fs_storage();

    write_file(&storage, "fs://t.txt", b"long contents");
    write_file(&storage, "fs://t.txt", b"short");

    assert_eq!(read_file(&storage, "fs://t.txt"), b"short");
}

#[test]
fn test_read_write_keeps_contents() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://rw.txt", b"hello");

    let mut stream = storage
        .open("fs://rw.txt", StreamFlags::READ | StreamFlags::WRITE)
        .unwrap();
    stream.write(b"J").unwrap();
    stream.set_position(0).unwrap();
    let contents = stream.read_to_end().unwrap();
    stream.close().unwrap();

    assert_eq!(contents, b"Jello");
}

#[test]
fn test_append() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://log.txt", b"one\n");

    let mut stream = storage.open("fs://log.txt", StreamFlags::APPEND).unwrap();
    stream.write_str("two\n").unwrap();
    stream.close().unwrap();

    assert_eq!(read_file(&storage, "fs://log.txt"), b"one\ntwo\n");
}

#[test]
fn test_start_at_end() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://end.txt", b"12345");

    let mut stream = storage
        .open("fs://end.txt", StreamFlags::READ | StreamFlags::START_AT_END)
        .unwrap();

    assert_eq!(stream.position().unwrap(), 5);
}

#[test]
fn test_open_without_mode_not_supported() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://x", b"");

    let result = storage.open("fs://x", StreamFlags::START_AT_END);
    assert!(matches!(result, Err(MelonError::NotSupported(_))));
}

#[test]
fn test_seek_and_length() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://seek.bin", b"0123456789");

    let mut stream = storage.open("fs://seek.bin", StreamFlags::READ).unwrap();

    stream.seek(SeekBase::Start, 4).unwrap();
    assert_eq!(stream.read_u8().unwrap(), b'4');

    stream.seek(SeekBase::Relative, 2).unwrap();
    assert_eq!(stream.read_u8().unwrap(), b'7');

    stream.seek(SeekBase::End, -1).unwrap();
    assert_eq!(stream.read_u8().unwrap(), b'9');

    stream.set_position(3).unwrap();
    assert_eq!(stream.length().unwrap(), 10);
    assert_eq!(stream.position().unwrap(), 3);

    assert!(matches!(
        stream.seek(SeekBase::Start, -1),
        Err(MelonError::OutOfRange(_))
    ));
}

// =============================================================================
// Filesystem Operation Tests
// =============================================================================

#[test]
fn test_create_file_makes_parents() {
    let (_temp, path, storage) = setup_fs_storage();

    storage.create_file("fs://a/b/c.txt").unwrap();

    assert!(path.join("a/b").is_dir());
    assert_eq!(
        storage.object_type("fs://a/b/c.txt").unwrap(),
        ObjectType::File
    );
    assert_eq!(storage.object_type("fs://a").unwrap(), ObjectType::Folder);
}

#[test]
fn test_create_folder() {
    let (_temp, _path, storage) = setup_fs_storage();

    storage.create_folder("fs://levels/world1").unwrap();
    // Existing folders are fine
    storage.create_folder("fs://levels").unwrap();

    assert_eq!(
        storage.object_type("fs://levels/world1").unwrap(),
        ObjectType::Folder
    );
}

#[test]
fn test_create_folder_over_file() {
    let (_temp, _path, storage) = setup_fs_storage();
    storage.create_file("fs://taken").unwrap();

    let result = storage.create_folder("fs://taken");
    assert!(matches!(result, Err(MelonError::AlreadyExists(_))));
}

#[test]
fn test_object_type_missing() {
    let (_temp, _path, storage) = setup_fs_storage();

    assert_eq!(
        storage.object_type("fs://nothing").unwrap(),
        ObjectType::None
    );
}

#[test]
fn test_rename_file() {
    let (_temp, _path, storage) = setup_fs_storage();
    write_file(&storage, "fs://before.txt", b"moved");

    storage.rename("fs://before.txt", "fs://sub/after.txt").unwrap();

    assert_eq!(
        storage.object_type("fs://before.txt").unwrap(),
        ObjectType::None
    );
    assert_eq!(read_file(&storage, "fs://sub/after.txt"), b"moved");
}

#[test]
fn test_delete_file_and_folder() {
    let (_temp, _path, storage) = setup_fs_storage();
    storage.create_file("fs://dir/file.txt").unwrap();

    storage.delete("fs://dir/file.txt").unwrap();
    storage.delete("fs://dir").unwrap();

    assert_eq!(storage.object_type("fs://dir").unwrap(), ObjectType::None);
    assert!(matches!(
        storage.delete("fs://dir"),
        Err(MelonError::NotFound(_))
    ));
}

// =============================================================================
// Safety Tests
// =============================================================================

#[test]
fn test_parent_components_rejected() {
    let (_temp, _path, storage) = setup_fs_storage();

    assert!(matches!(
        storage.create_file("fs://../escape.txt"),
        Err(MelonError::InvalidPath(_))
    ));
    assert!(matches!(
        storage.open("fs://a/../../escape.txt", StreamFlags::WRITE),
        Err(MelonError::InvalidPath(_))
    ));
    assert!(matches!(
        storage.object_type("fs:///etc/passwd"),
        Err(MelonError::InvalidPath(_))
    ));
}

#[test]
fn test_base_directory_cannot_be_mutated() {
    let (_temp, path, storage) = setup_fs_storage();

    for target in ["fs://", "fs://.", "fs://./"] {
        assert!(matches!(
            storage.delete(target),
            Err(MelonError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.create_file(target),
            Err(MelonError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.open(target, StreamFlags::WRITE),
            Err(MelonError::InvalidPath(_))
        ));
    }
    assert!(matches!(
        storage.rename("fs://", "fs://moved"),
        Err(MelonError::InvalidPath(_))
    ));

    assert!(path.is_dir());
    assert_eq!(storage.object_type("fs://").unwrap(), ObjectType::Folder);
}

#[test]
fn test_read_only_pool() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("existing.txt"), b"keep").unwrap();

    let mut storage = Storage::new();
    storage
        .add_pool(filesystem::create_read_only_pool("ro", temp_dir.path()))
        .unwrap();

    assert_eq!(read_file(&storage, "ro://existing.txt"), b"keep");

    assert!(matches!(
        storage.open("ro://existing.txt", StreamFlags::WRITE),
        Err(MelonError::ReadOnly(_))
    ));
    assert!(matches!(
        storage.create_file("ro://new.txt"),
        Err(MelonError::ReadOnly(_))
    ));
    assert!(matches!(
        storage.delete("ro://existing.txt"),
        Err(MelonError::ReadOnly(_))
    ));
    assert!(matches!(
        storage.rename("ro://existing.txt", "ro://other.txt"),
        Err(MelonError::ReadOnly(_))
    ));

    assert_eq!(fs::read(temp_dir.path().join("existing.txt")).unwrap(), b"keep");
}
