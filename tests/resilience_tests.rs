//! Resilience tests - corrupted containers, partial batch failures and
//! leftover state after errors.

use filecrypt::{Engine, EngineConfig, Error, ErrorKind, KeySource};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEST_ITERATIONS: u32 = 1_000;

fn test_engine() -> Engine {
    Engine::new(EngineConfig::default().with_iterations(TEST_ITERATIONS))
        .expect("Failed to create engine")
}

/// Create `names` in `dir`, each holding its own name as content.
fn write_files(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).expect("Failed to write file");
    }
}

/// Flip every bit of one byte at `offset`.
fn corrupt_byte(path: &Path, offset: usize) {
    let mut bytes = fs::read(path).expect("Failed to read file");
    bytes[offset] ^= 0xFF;
    fs::write(path, bytes).expect("Failed to write file");
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_batch_partial_failure_continues() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let engine = test_engine();
    let key = KeySource::password("batch password");

    write_files(root, &["a.txt", "b.txt", "c.txt", "d.txt"]);
    engine.encrypt_directory(root, &key).unwrap();

    // 40 bytes is shorter than any password container.
    fs::write(root.join("b.txt"), [0x5Au8; 40]).unwrap();

    let report = engine.decrypt_directory(root, &key).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failure_count(), 1);
    assert!(report.failed[0].path.ends_with("b.txt"));
    assert_eq!(report.failed[0].error.kind(), ErrorKind::Crypto);

    for name in ["a.txt", "c.txt", "d.txt"] {
        assert_eq!(fs::read(root.join(name)).unwrap(), name.as_bytes());
    }
    assert_eq!(fs::read(root.join("b.txt")).unwrap(), vec![0x5Au8; 40]);
}

#[test]
fn test_batch_corrupted_padding_reported() {
    let temp_dir = TempDir::new().unwrap();
    let keys = TempDir::new().unwrap();
    let root = temp_dir.path();
    let key_path = keys.path().join("batch.key");
    let engine = test_engine();
    engine.generate_key(&key_path).unwrap();
    let key = KeySource::key_file(&key_path);

    write_files(root, &["one.txt", "two.txt", "three.txt", "four.txt"]);
    engine.encrypt_directory(root, &key).unwrap();

    // Flipping the last IV byte flips the last plaintext byte of a
    // single-block container, which is always a pad byte.
    corrupt_byte(&root.join("three.txt"), 15);
    let corrupted = fs::read(root.join("three.txt")).unwrap();

    let report = engine.decrypt_directory(root, &key).unwrap();

    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(report.failed[0].error, Error::InvalidPadding));
    assert_eq!(fs::read(root.join("three.txt")).unwrap(), corrupted);
}

#[test]
fn test_no_temp_files_left_after_failures() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let engine = test_engine();
    let key = KeySource::password("pw");

    write_files(root, &["x.bin", "y.bin"]);
    fs::write(root.join("garbage.bin"), b"not a container at all").unwrap();

    let report = engine.decrypt_directory(root, &key).unwrap();
    assert_eq!(report.failure_count(), 3);
    assert_eq!(names_in(root), vec!["garbage.bin", "x.bin", "y.bin"]);
}

#[test]
fn test_truncated_container_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("report.pdf");
    let engine = test_engine();
    let key = KeySource::password("pw");

    let data: Vec<u8> = (0..500).map(|i| (i % 256) as u8).collect();
    fs::write(&file, &data).unwrap();
    engine.encrypt_file(&file, &key).unwrap();

    let mut bytes = fs::read(&file).unwrap();
    bytes.truncate(bytes.len() - 7);
    fs::write(&file, &bytes).unwrap();

    let result = engine.decrypt_file(&file, &key);
    assert!(matches!(result, Err(Error::MalformedCiphertext { .. })));
    assert_eq!(fs::read(&file).unwrap(), bytes);
}

#[test]
fn test_mode_mismatch_fails_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let keys = TempDir::new().unwrap();
    let file = temp_dir.path().join("doc.txt");
    let key_path = keys.path().join("k.key");
    let engine = test_engine();
    engine.generate_key(&key_path).unwrap();

    fs::write(&file, b"short").unwrap();
    engine
        .encrypt_file(&file, &KeySource::key_file(&key_path))
        .unwrap();
    let encrypted = fs::read(&file).unwrap();
    assert_eq!(encrypted.len(), 32);

    // A 32-byte file-key container is too short to be a password container.
    let result = engine.decrypt_file(&file, &KeySource::password("pw"));
    assert!(matches!(result, Err(Error::MalformedContainer { len: 32, min: 48 })));
    assert_eq!(fs::read(&file).unwrap(), encrypted);
}

#[test]
fn test_empty_password_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &["a.txt"]);

    let result = test_engine().encrypt_directory(temp_dir.path(), &KeySource::password(""));
    let err = result.unwrap_err();
    assert!(matches!(err, Error::EmptyPassword));
    assert!(err.is_fatal());
    assert_eq!(fs::read(temp_dir.path().join("a.txt")).unwrap(), b"a.txt");
}

#[cfg(unix)]
#[test]
fn test_symlinks_left_alone_in_batch() {
    let temp_dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_files(root, &["inside.txt"]);
    write_files(outside.path(), &["outside.txt"]);
    std::os::unix::fs::symlink(outside.path().join("outside.txt"), root.join("link.txt"))
        .unwrap();

    let report = test_engine()
        .encrypt_directory(root, &KeySource::password("pw"))
        .unwrap();

    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        fs::read(outside.path().join("outside.txt")).unwrap(),
        b"outside.txt"
    );
    assert!(fs::symlink_metadata(root.join("link.txt"))
        .unwrap()
        .file_type()
        .is_symlink());
}
