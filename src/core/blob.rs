//! Purpose: Key-value blob persistence behind the notification collections.
//! Exports: `BlobStore`, `FsBlobStore`, `MemBlobStore`, fixed storage keys.
//! Role: The only path to durable state; injected so tests run without a host.
//! Invariants: Shared blobs may carry a TTL; expired blobs read as absent.
//! Invariants: Concurrent writers race last-write-wins; each file stays internally consistent.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::error::{Error, ErrorKind};

pub const STICKY_KEY: &str = "sticky_messages";
pub const SUPPRESSED_KEY: &str = "suppressed_messages";

const MAGIC: [u8; 4] = *b"NTCB";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 24;

pub trait BlobStore {
    fn get_shared(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    fn set_shared(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> Result<(), Error>;
    fn delete_shared(&self, key: &str) -> Result<(), Error>;
    fn get_user(&self, user: &str, key: &str) -> Result<Option<Vec<u8>>, Error>;
    fn set_user(&self, user: &str, key: &str, bytes: &[u8]) -> Result<(), Error>;
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn expiry_from_ttl(ttl: Option<Duration>) -> i64 {
    match ttl {
        Some(ttl) => unix_now().saturating_add(ttl.as_secs() as i64),
        None => 0,
    }
}

fn encode_envelope(expires_at: i64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&expires_at.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn decode_envelope(buf: &[u8]) -> Result<(i64, &[u8]), Error> {
    if buf.len() < HEADER_SIZE {
        return Err(Error::new(ErrorKind::Corrupt).with_message("envelope too small"));
    }
    if buf[0..4] != MAGIC {
        return Err(Error::new(ErrorKind::Corrupt).with_message("bad magic"));
    }
    let version = u32::from_le_bytes(read_4(buf, 4));
    if version != VERSION {
        return Err(Error::new(ErrorKind::Corrupt).with_message("unsupported version"));
    }
    let expires_at = i64::from_le_bytes(read_8(buf, 8));
    let payload_len = u64::from_le_bytes(read_8(buf, 16)) as usize;
    let payload = buf
        .get(HEADER_SIZE..HEADER_SIZE + payload_len)
        .ok_or_else(|| Error::new(ErrorKind::Corrupt).with_message("payload truncated"))?;
    Ok((expires_at, payload))
}

fn read_4(buf: &[u8], offset: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[offset..offset + 4]);
    out
}

fn read_8(buf: &[u8], offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&buf[offset..offset + 8]);
    out
}

fn is_expired(expires_at: i64) -> bool {
    expires_at != 0 && expires_at <= unix_now()
}

fn validate_component(value: &str, what: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{what} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{what} must not contain path separators"))
            .with_key(value));
    }
    Ok(())
}

/// Blob store keeping one envelope file per key beneath a root directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shared_path(&self, key: &str) -> Result<PathBuf, Error> {
        validate_component(key, "key")?;
        Ok(self.root.join("shared").join(format!("{key}.ntcb")))
    }

    fn user_path(&self, user: &str, key: &str) -> Result<PathBuf, Error> {
        validate_component(user, "user")?;
        validate_component(key, "key")?;
        Ok(self
            .root
            .join("users")
            .join(user)
            .join(format!("{key}.ntcb")))
    }

    fn read_envelope(&self, path: &Path) -> Result<Option<Vec<u8>>, Error> {
        let buf = match fs::read(path) {
            Ok(buf) => buf,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::new(ErrorKind::Unavailable)
                    .with_message("failed to read blob")
                    .with_path(path)
                    .with_source(err));
            }
        };
        let (expires_at, payload) = decode_envelope(&buf).map_err(|err| err.with_path(path))?;
        if is_expired(expires_at) {
            // Expired blobs read as absent; removal is opportunistic.
            let _ = fs::remove_file(path);
            return Ok(None);
        }
        Ok(Some(payload.to_vec()))
    }

    fn write_envelope(&self, path: &Path, expires_at: i64, payload: &[u8]) -> Result<(), Error> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::new(ErrorKind::Internal).with_message("blob path has no parent"))?;
        fs::create_dir_all(dir).map_err(|err| {
            Error::new(ErrorKind::Unavailable)
                .with_message("failed to create blob directory")
                .with_path(dir)
                .with_source(err)
        })?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::new(ErrorKind::Internal).with_message("invalid blob path"))?;
        let tmp = dir.join(format!(".{file_name}.tmp-{}", std::process::id()));

        let buf = encode_envelope(expires_at, payload);
        fs::write(&tmp, &buf).map_err(|err| {
            Error::new(ErrorKind::Unavailable)
                .with_message("failed to write blob")
                .with_path(&tmp)
                .with_source(err)
        })?;
        fs::rename(&tmp, path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            Error::new(ErrorKind::Unavailable)
                .with_message("failed to replace blob")
                .with_path(path)
                .with_source(err)
        })
    }
}

impl BlobStore for FsBlobStore {
    fn get_shared(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let path = self.shared_path(key)?;
        self.read_envelope(&path)
    }

    fn set_shared(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> Result<(), Error> {
        let path = self.shared_path(key)?;
        self.write_envelope(&path, expiry_from_ttl(ttl), bytes)
    }

    fn delete_shared(&self, key: &str) -> Result<(), Error> {
        let path = self.shared_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::new(ErrorKind::Unavailable)
                .with_message("failed to delete blob")
                .with_path(&path)
                .with_source(err)),
        }
    }

    fn get_user(&self, user: &str, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let path = self.user_path(user, key)?;
        self.read_envelope(&path)
    }

    fn set_user(&self, user: &str, key: &str, bytes: &[u8]) -> Result<(), Error> {
        let path = self.user_path(user, key)?;
        self.write_envelope(&path, 0, bytes)
    }
}

#[derive(Debug, Default)]
struct MemInner {
    shared: BTreeMap<String, (i64, Vec<u8>)>,
    users: BTreeMap<(String, String), Vec<u8>>,
    fail_writes: bool,
}

/// In-memory store; clones share state so a test can observe service writes.
#[derive(Clone, Debug, Default)]
pub struct MemBlobStore {
    inner: Arc<Mutex<MemInner>>,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().expect("mem store lock").fail_writes = fail;
    }

    fn check_writable(inner: &MemInner) -> Result<(), Error> {
        if inner.fail_writes {
            return Err(Error::new(ErrorKind::Unavailable).with_message("writes disabled"));
        }
        Ok(())
    }
}

impl BlobStore for MemBlobStore {
    fn get_shared(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        validate_component(key, "key")?;
        let mut inner = self.inner.lock().expect("mem store lock");
        match inner.shared.get(key) {
            Some((expires_at, _)) if is_expired(*expires_at) => {
                inner.shared.remove(key);
                Ok(None)
            }
            Some((_, bytes)) => Ok(Some(bytes.clone())),
            None => Ok(None),
        }
    }

    fn set_shared(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> Result<(), Error> {
        validate_component(key, "key")?;
        let mut inner = self.inner.lock().expect("mem store lock");
        Self::check_writable(&inner)?;
        inner
            .shared
            .insert(key.to_string(), (expiry_from_ttl(ttl), bytes.to_vec()));
        Ok(())
    }

    fn delete_shared(&self, key: &str) -> Result<(), Error> {
        validate_component(key, "key")?;
        let mut inner = self.inner.lock().expect("mem store lock");
        Self::check_writable(&inner)?;
        inner.shared.remove(key);
        Ok(())
    }

    fn get_user(&self, user: &str, key: &str) -> Result<Option<Vec<u8>>, Error> {
        validate_component(user, "user")?;
        validate_component(key, "key")?;
        let inner = self.inner.lock().expect("mem store lock");
        Ok(inner
            .users
            .get(&(user.to_string(), key.to_string()))
            .cloned())
    }

    fn set_user(&self, user: &str, key: &str, bytes: &[u8]) -> Result<(), Error> {
        validate_component(user, "user")?;
        validate_component(key, "key")?;
        let mut inner = self.inner.lock().expect("mem store lock");
        Self::check_writable(&inner)?;
        inner
            .users
            .insert((user.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BlobStore, FsBlobStore, MemBlobStore, decode_envelope, encode_envelope};
    use crate::core::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn envelope_round_trip() {
        let buf = encode_envelope(0, b"{\"slots\":[]}");
        let (expires_at, payload) = decode_envelope(&buf).expect("decode");
        assert_eq!(expires_at, 0);
        assert_eq!(payload, b"{\"slots\":[]}");
    }

    #[test]
    fn envelope_rejects_bad_magic() {
        let mut buf = encode_envelope(0, b"x");
        buf[0] = b'X';
        let err = decode_envelope(&buf).expect_err("bad magic");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn envelope_rejects_truncation() {
        let buf = encode_envelope(0, b"payload");
        let err = decode_envelope(&buf[..buf.len() - 2]).expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn fs_store_round_trips_shared_and_user_blobs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());

        assert_eq!(store.get_shared("sticky").expect("get"), None);
        store
            .set_shared("sticky", b"abc", Some(Duration::from_secs(3600)))
            .expect("set");
        assert_eq!(store.get_shared("sticky").expect("get"), Some(b"abc".to_vec()));

        store.set_user("ops", "suppressed", b"{}").expect("set user");
        assert_eq!(
            store.get_user("ops", "suppressed").expect("get user"),
            Some(b"{}".to_vec())
        );
        assert_eq!(store.get_user("someone-else", "suppressed").expect("get"), None);

        store.delete_shared("sticky").expect("delete");
        assert_eq!(store.get_shared("sticky").expect("get"), None);
        // Deleting an absent key is not an error.
        store.delete_shared("sticky").expect("delete absent");
    }

    #[test]
    fn fs_store_expired_blob_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        store
            .set_shared("sticky", b"old", Some(Duration::from_secs(0)))
            .expect("set");
        assert_eq!(store.get_shared("sticky").expect("get"), None);
    }

    #[test]
    fn fs_store_rejects_path_separators() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let err = store.get_shared("../escape").expect_err("bad key");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = store.get_user("a/b", "key").expect_err("bad user");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn mem_store_honors_ttl_and_write_failures() {
        let store = MemBlobStore::new();
        store
            .set_shared("sticky", b"live", Some(Duration::from_secs(3600)))
            .expect("set");
        assert_eq!(store.get_shared("sticky").expect("get"), Some(b"live".to_vec()));

        store.set_fail_writes(true);
        let err = store.set_shared("sticky", b"next", None).expect_err("fail");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        store.set_fail_writes(false);

        // Clones share state.
        let other = store.clone();
        other.set_user("ops", "suppressed", b"x").expect("set user");
        assert_eq!(
            store.get_user("ops", "suppressed").expect("get"),
            Some(b"x".to_vec())
        );
    }
}
