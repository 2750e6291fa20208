use crate::StoreError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cinepack_schema::Digest;
use sha1::{Digest as _, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

const READ_CHUNK: usize = 64 * 1024;

/// Base64-encoded SHA-1 of the bytes of `path`, read in chunks.
///
/// `progress` receives values from 0.5 to 1.0: digesting is the second half
/// of a write, the first half being the essence itself.
pub fn make_digest(
    path: &Path,
    mut progress: Option<&mut dyn FnMut(f32)>,
) -> Result<Digest, StoreError> {
    let mut file = File::open(path).map_err(StoreError::io(path))?;
    let total = file.metadata().map_err(StoreError::io(path))?.len();

    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut done: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(StoreError::io(path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        done += n as u64;
        if let Some(cb) = progress.as_mut() {
            let fraction = if total == 0 {
                1.0
            } else {
                done as f32 / total as f32
            };
            cb(0.5 + fraction * 0.5);
        }
    }

    debug!("digested {} ({done} bytes)", path.display());
    Ok(Digest::new(STANDARD.encode(hasher.finalize())))
}

/// Lazily computed digest of one file.
///
/// The cached value is trusted until [`invalidate`](Self::invalidate) is
/// called; every code path that rewrites the file must call it.
#[derive(Debug, Default)]
pub struct DigestCache {
    cached: Mutex<Option<Digest>>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache seeded with a known digest, e.g. one read from a packing list.
    pub fn with_digest(digest: Digest) -> Self {
        Self {
            cached: Mutex::new(Some(digest)),
        }
    }

    pub fn get_or_compute(&self, path: &Path) -> Result<Digest, StoreError> {
        let mut slot = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(d) = slot.as_ref() {
            return Ok(d.clone());
        }
        let digest = make_digest(path, None)?;
        *slot = Some(digest.clone());
        Ok(digest)
    }

    pub fn cached(&self) -> Option<Digest> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, digest: Digest) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(digest);
    }

    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Clone for DigestCache {
    fn clone(&self) -> Self {
        Self {
            cached: Mutex::new(self.cached()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // SHA-1 of the empty string and of "abc", base64.
    const EMPTY_SHA1: &str = "2jmj7l5rSw0yVb/vlWAYkK/YBwk=";
    const ABC_SHA1: &str = "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=";

    #[test]
    fn digest_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let abc = dir.path().join("abc");
        fs::write(&empty, b"").unwrap();
        fs::write(&abc, b"abc").unwrap();
        assert_eq!(make_digest(&empty, None).unwrap().as_str(), EMPTY_SHA1);
        assert_eq!(make_digest(&abc, None).unwrap().as_str(), ABC_SHA1);
    }

    #[test]
    fn progress_covers_second_half() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big");
        fs::write(&path, vec![7u8; READ_CHUNK * 3 + 10]).unwrap();

        let mut seen = Vec::new();
        let mut cb = |p: f32| seen.push(p);
        make_digest(&path, Some(&mut cb)).unwrap();

        assert!(seen.len() >= 4);
        assert!(seen.iter().all(|p| (0.5..=1.0).contains(p)));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!((seen[seen.len() - 1] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_file_error_names_path() {
        let err = make_digest(Path::new("/nonexistent/file.mxf"), None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/file.mxf"));
    }

    #[test]
    fn cache_is_stale_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"").unwrap();

        let cache = DigestCache::new();
        assert!(cache.cached().is_none());
        assert_eq!(cache.get_or_compute(&path).unwrap().as_str(), EMPTY_SHA1);

        fs::write(&path, b"abc").unwrap();
        assert_eq!(cache.get_or_compute(&path).unwrap().as_str(), EMPTY_SHA1);

        cache.invalidate();
        assert_eq!(cache.get_or_compute(&path).unwrap().as_str(), ABC_SHA1);
    }

    #[test]
    fn seeded_cache_skips_io() {
        let cache = DigestCache::with_digest(Digest::new("seed="));
        let d = cache.get_or_compute(Path::new("/does/not/exist")).unwrap();
        assert_eq!(d.as_str(), "seed=");
    }
}
