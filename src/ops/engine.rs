//! The engine: composes key handling, cipher, container and storage per
//! file and across a directory walk.

use crate::config::EngineConfig;
use crate::container::{self, KeyMode};
use crate::crypto::{random_salt, Cipher, KeyMaterial};
use crate::error::{Error, Result};
use crate::ops::types::{
    BatchReport, FileFailure, FileOp, FileState, FileTask, KeySource, Operation, Outcome, Target,
};
use crate::storage::{self, PathGuard};
use std::path::{Path, PathBuf};

/// Key material resolved once per invocation.
///
/// A key file is loaded up front. A password is kept as-is, since each file
/// gets its own salt and therefore its own derived key.
enum Keyring<'a> {
    Fixed(KeyMaterial),
    Password(&'a str),
}

impl<'a> Keyring<'a> {
    fn resolve(source: &'a KeySource) -> Result<Self> {
        match source {
            KeySource::KeyFile(path) => {
                let key = KeyMaterial::load_from_file(path)?;
                tracing::debug!(path = %path.display(), origin = ?key.origin(), "key loaded");
                Ok(Keyring::Fixed(key))
            }
            KeySource::Password(password) if password.is_empty() => Err(Error::EmptyPassword),
            KeySource::Password(password) => Ok(Keyring::Password(password.as_str())),
        }
    }

    fn mode(&self) -> KeyMode {
        match self {
            Keyring::Fixed(_) => KeyMode::FileKey,
            Keyring::Password(_) => KeyMode::Password,
        }
    }
}

/// File encryption engine.
///
/// Single-threaded and synchronous. Every file is read fully into memory,
/// transformed, and written back through a temp file and rename.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    guard: PathGuard,
}

impl Engine {
    /// Create an engine, validating the configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let guard = PathGuard::new(&config);
        Ok(Self { config, guard })
    }

    /// Dispatch an operation.
    pub fn run(&self, operation: Operation) -> Result<Outcome> {
        match operation {
            Operation::GenerateKey { path } => {
                self.generate_key(&path)?;
                Ok(Outcome::KeyGenerated(path))
            }
            Operation::Encrypt { target, key } => self.run_target(target, FileOp::Encrypt, &key),
            Operation::Decrypt { target, key } => self.run_target(target, FileOp::Decrypt, &key),
        }
    }

    fn run_target(&self, target: Target, op: FileOp, key: &KeySource) -> Result<Outcome> {
        match target {
            Target::File(path) => self.single_file(&path, op, key).map(Outcome::File),
            Target::Directory(path) => self.directory(&path, op, key).map(Outcome::Directory),
        }
    }

    /// Generate a random key and write it to `path`. Fails if `path` exists.
    pub fn generate_key(&self, path: &Path) -> Result<()> {
        KeyMaterial::generate().save_to_file(path)?;
        tracing::info!(path = %path.display(), "generated key");
        Ok(())
    }

    /// Encrypt one file in place. Returns its canonical path.
    pub fn encrypt_file(&self, path: &Path, key: &KeySource) -> Result<PathBuf> {
        self.single_file(path, FileOp::Encrypt, key)
    }

    /// Decrypt one file in place. Returns its canonical path.
    pub fn decrypt_file(&self, path: &Path, key: &KeySource) -> Result<PathBuf> {
        self.single_file(path, FileOp::Decrypt, key)
    }

    /// Encrypt every regular file under `path`.
    pub fn encrypt_directory(&self, path: &Path, key: &KeySource) -> Result<BatchReport> {
        self.directory(path, FileOp::Encrypt, key)
    }

    /// Decrypt every regular file under `path`.
    pub fn decrypt_directory(&self, path: &Path, key: &KeySource) -> Result<BatchReport> {
        self.directory(path, FileOp::Decrypt, key)
    }

    fn single_file(&self, path: &Path, op: FileOp, key: &KeySource) -> Result<PathBuf> {
        let path = self.guard.check(path)?;
        if key_file_path(key).as_deref() == Some(path.as_path()) {
            tracing::warn!(path = %path.display(), "refusing to transform the key file itself");
            return Err(Error::ProtectedPath(path));
        }
        let keyring = Keyring::resolve(key)?;
        self.process_file(path, op, &keyring)
    }

    fn directory(&self, path: &Path, op: FileOp, key: &KeySource) -> Result<BatchReport> {
        let root = self.guard.check(path)?;
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a directory: {}", root.display()),
            )));
        }

        let keyring = Keyring::resolve(key)?;
        let key_file = key_file_path(key);

        let scan = storage::scan(&root, self.config.skip_hidden);
        let mut report = BatchReport::new(root, op);
        report.skipped = scan.skipped;

        for error in scan.errors {
            let path = match &error {
                Error::Walk { path, .. } => path.clone(),
                _ => report.root.clone(),
            };
            tracing::warn!(path = %path.display(), error = %error, "cannot read entry");
            report.failed.push(FileFailure { path, error });
        }

        for path in scan.files {
            if key_file.as_deref() == Some(path.as_path()) {
                tracing::warn!(path = %path.display(), "skipping the key file itself");
                report.skipped.push(path);
                continue;
            }

            match self.process_file(path.clone(), op, &keyring) {
                Ok(done) => report.succeeded.push(done),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %op, error = %error, "file failed");
                    report.failed.push(FileFailure { path, error });
                }
            }
        }

        tracing::info!(
            root = %report.root.display(),
            %op,
            attempted = report.attempted(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "directory finished"
        );
        Ok(report)
    }

    fn process_file(&self, path: PathBuf, op: FileOp, keyring: &Keyring<'_>) -> Result<PathBuf> {
        let mut task = FileTask::new(path, op);
        match self.transform_and_write(&mut task, keyring) {
            Ok(()) => {
                tracing::info!(path = %task.path().display(), %op, "done");
                Ok(task.into_path())
            }
            Err(e) => {
                task.advance(FileState::Failed);
                Err(e)
            }
        }
    }

    fn transform_and_write(&self, task: &mut FileTask, keyring: &Keyring<'_>) -> Result<()> {
        let input = std::fs::read(task.path())?;

        let output = match task.op() {
            FileOp::Encrypt => self.encrypt_bytes(task, &input, keyring)?,
            FileOp::Decrypt => self.decrypt_bytes(task, &input, keyring)?,
        };
        task.advance(FileState::Transformed);

        storage::replace_file(task.path(), &output)?;
        task.advance(FileState::Written);
        Ok(())
    }

    fn encrypt_bytes(
        &self,
        task: &mut FileTask,
        plaintext: &[u8],
        keyring: &Keyring<'_>,
    ) -> Result<Vec<u8>> {
        match keyring {
            Keyring::Fixed(key) => {
                task.advance(FileState::KeyResolved);
                let (iv, ciphertext) = Cipher::new(key).encrypt(plaintext);
                Ok(container::encode(KeyMode::FileKey, None, &iv, &ciphertext))
            }
            Keyring::Password(password) => {
                let salt = random_salt();
                let key = KeyMaterial::derive_from_password(
                    password,
                    &salt,
                    self.config.pbkdf2_iterations,
                )?;
                task.advance(FileState::KeyResolved);
                let (iv, ciphertext) = Cipher::new(&key).encrypt(plaintext);
                Ok(container::encode(
                    KeyMode::Password,
                    Some(&salt),
                    &iv,
                    &ciphertext,
                ))
            }
        }
    }

    fn decrypt_bytes(
        &self,
        task: &mut FileTask,
        bytes: &[u8],
        keyring: &Keyring<'_>,
    ) -> Result<Vec<u8>> {
        let parsed = container::decode(keyring.mode(), bytes)?;

        match (keyring, parsed.salt) {
            (Keyring::Fixed(key), _) => {
                task.advance(FileState::KeyResolved);
                Cipher::new(key).decrypt(&parsed.iv, parsed.ciphertext)
            }
            (Keyring::Password(password), Some(salt)) => {
                let key = KeyMaterial::derive_from_password(
                    password,
                    &salt,
                    self.config.pbkdf2_iterations,
                )?;
                task.advance(FileState::KeyResolved);
                Cipher::new(&key).decrypt(&parsed.iv, parsed.ciphertext)
            }
            (Keyring::Password(_), None) => Err(Error::MalformedContainer {
                len: bytes.len(),
                min: KeyMode::Password.min_len(),
            }),
        }
    }
}

/// Canonical path of the key file, if the source is one and it exists.
fn key_file_path(key: &KeySource) -> Option<PathBuf> {
    match key {
        KeySource::KeyFile(path) => path.canonicalize().ok(),
        KeySource::Password(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default().with_iterations(1_000)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Engine::new(EngineConfig::default().with_iterations(0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_file_key_roundtrip_in_place() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("test_key.key");
        let file = dir.path().join("test_file.txt");
        std::fs::write(&file, b"This is a test file.").unwrap();

        let engine = engine();
        engine.generate_key(&key_path).unwrap();
        let key = KeySource::key_file(&key_path);

        engine.encrypt_file(&file, &key).unwrap();
        let encrypted = std::fs::read(&file).unwrap();
        assert_eq!(encrypted.len(), 16 + 32);
        assert!(!encrypted
            .windows(b"This is a test file.".len())
            .any(|w| w == b"This is a test file."));

        engine.decrypt_file(&file, &key).unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"This is a test file.");
    }

    #[test]
    fn test_password_container_layout() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.txt");
        std::fs::write(&file, b"hello world").unwrap();

        let engine = engine();
        let key = KeySource::password("strongpassword");
        engine.encrypt_file(&file, &key).unwrap();
        assert_eq!(std::fs::read(&file).unwrap().len(), 16 + 16 + 16);

        engine.decrypt_file(&file, &key).unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"hello world");
    }

    #[test]
    fn test_bad_container_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("short.bin");
        std::fs::write(&file, b"too short").unwrap();

        let result = engine().decrypt_file(&file, &KeySource::password("pw"));
        assert!(matches!(result, Err(Error::MalformedContainer { .. })));
        assert_eq!(std::fs::read(&file).unwrap(), b"too short");
    }

    #[test]
    fn test_missing_key_file_is_fatal_before_touching() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();

        let key = KeySource::key_file(dir.path().join("nope.key"));
        let result = engine().encrypt_directory(dir.path(), &key);

        assert!(matches!(result, Err(Error::KeyFileNotFound(_))));
        assert_eq!(std::fs::read(&file).unwrap(), b"a");
    }

    #[test]
    fn test_key_file_inside_tree_is_skipped() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("tree.key");
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let engine = engine();
        engine.generate_key(&key_path).unwrap();
        let original_key = std::fs::read(&key_path).unwrap();

        let report = engine
            .encrypt_directory(dir.path(), &KeySource::key_file(&key_path))
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(std::fs::read(&key_path).unwrap(), original_key);
    }

    #[test]
    fn test_key_file_as_single_target_refused() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("k.key");

        let engine = engine();
        engine.generate_key(&key_path).unwrap();
        let original_key = std::fs::read(&key_path).unwrap();
        let key = KeySource::key_file(&key_path);

        let result = engine.encrypt_file(&key_path, &key);
        let err = result.unwrap_err();
        assert!(matches!(err, Error::ProtectedPath(_)));
        assert!(err.is_fatal());

        // A relative spelling of the same path is caught too.
        let dotted = dir.path().join(".").join("k.key");
        assert!(matches!(
            engine.decrypt_file(&dotted, &key),
            Err(Error::ProtectedPath(_))
        ));
        assert_eq!(std::fs::read(&key_path).unwrap(), original_key);
    }

    #[test]
    fn test_generate_key_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("keys").join("new.key");

        engine().generate_key(&key_path).unwrap();
        assert_eq!(std::fs::metadata(&key_path).unwrap().len(), 32);
    }

    #[test]
    fn test_directory_target_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();

        let result = engine().encrypt_directory(&file, &KeySource::password("pw"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_run_dispatch() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("k.key");
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"dispatch").unwrap();

        let engine = engine();
        let outcome = engine
            .run(Operation::GenerateKey {
                path: key_path.clone(),
            })
            .unwrap();
        assert!(matches!(outcome, Outcome::KeyGenerated(ref p) if p == &key_path));

        let outcome = engine
            .run(Operation::Encrypt {
                target: Target::File(file.clone()),
                key: KeySource::key_file(&key_path),
            })
            .unwrap();
        assert!(outcome.is_success());

        engine
            .run(Operation::Decrypt {
                target: Target::File(file.clone()),
                key: KeySource::key_file(&key_path),
            })
            .unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"dispatch");
    }
}
