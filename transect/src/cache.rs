//! Two-tier store for resampled curves: a byte-bounded in-memory LRU
//! in front of a directory of bincode artifacts.

use crate::{Config, TransectError, C};
use geo::Point;
use log::{debug, warn};
use lru::LruCache;
use sha1::{Digest, Sha1};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

/// A cached curve, one value per sample point.
pub type Curve = Arc<Vec<Option<f32>>>;

const ARTIFACT_EXT: &str = "bin";

/// Distinguishes temporary files of concurrent writes within a process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: u64,
}

struct MemoryCache {
    entries: LruCache<String, (Curve, u64)>,
    bytes: u64,
    evictions: u64,
}

pub struct CacheStore {
    dir: PathBuf,
    limit: u64,
    memory: Mutex<MemoryCache>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Creates a store persisting to `dir` whose memory tier holds at
    /// most `limit` serialized bytes.
    pub fn new<P: AsRef<Path>>(dir: P, limit: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            limit,
            memory: Mutex::new(MemoryCache {
                entries: LruCache::unbounded(),
                bytes: 0,
                evictions: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.cache_dir, u64::try_from(config.cache_bytes).unwrap_or(u64::MAX))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(key).with_extension(ARTIFACT_EXT)
    }

    /// Looks `key` up in memory, then on disk.
    ///
    /// A disk hit is promoted into memory. Unreadable artifacts count
    /// as misses.
    pub fn get(&self, key: &str) -> Option<Curve> {
        if let Some((curve, _)) = self.lock().entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("cache hit (memory) {key}");
            return Some(Arc::clone(curve));
        }
        match self.read_artifact(key) {
            Ok(Some(curve)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("cache hit (disk) {key}");
                self.insert(key, Arc::clone(&curve));
                Some(curve)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("cache miss {key}");
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!("discarding unreadable cache artifact {key}: {e}");
                None
            }
        }
    }

    /// Inserts into the memory tier, evicting least recently used
    /// entries until it fits. Curves larger than the whole limit are
    /// not kept.
    pub fn insert(&self, key: &str, curve: Curve) {
        let size = match bincode::serialized_size(curve.as_ref()) {
            Ok(size) => size,
            Err(e) => {
                warn!("cannot size cache entry {key}: {e}");
                return;
            }
        };
        if size > self.limit {
            debug!("{key} ({size} bytes) exceeds cache limit {}", self.limit);
            return;
        }
        let mut memory = self.lock();
        if let Some((_, old)) = memory.entries.pop(key) {
            memory.bytes -= old;
        }
        while memory.bytes + size > self.limit {
            let Some((evicted, (_, evicted_size))) = memory.entries.pop_lru() else {
                break;
            };
            memory.bytes -= evicted_size;
            memory.evictions += 1;
            debug!("evicted {evicted} ({evicted_size} bytes)");
        }
        memory.entries.put(key.to_owned(), (curve, size));
        memory.bytes += size;
    }

    /// Writes `curve` to disk on a background thread.
    ///
    /// Failures are logged and otherwise ignored; the returned handle
    /// can be joined to observe them.
    pub fn persist(&self, key: &str, curve: Curve) -> PersistHandle {
        let dir = self.dir.clone();
        let path = self.artifact_path(key);
        let key = key.to_owned();
        let handle = thread::spawn(move || {
            let res = write_artifact(&dir, &path, &curve);
            match &res {
                Ok(()) => debug!("persisted {key} to {}", path.display()),
                Err(e) => warn!("failed to persist {key}: {e}"),
            }
            res
        });
        PersistHandle(handle)
    }

    pub fn stats(&self) -> CacheStats {
        let memory = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: memory.evictions,
            entries: memory.entries.len(),
            bytes: memory.bytes,
        }
    }
}

/// Private API
impl CacheStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCache> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_artifact(&self, key: &str) -> Result<Option<Curve>, TransectError> {
        let file = match File::open(self.artifact_path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let curve: Vec<Option<f32>> = bincode::deserialize_from(BufReader::new(file))?;
        Ok(Some(Arc::new(curve)))
    }
}

fn write_artifact(dir: &Path, path: &Path, curve: &[Option<f32>]) -> Result<(), TransectError> {
    fs::create_dir_all(dir)?;
    let tmp = tmp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut writer, curve)?;
        io::Write::flush(&mut writer)?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("{ARTIFACT_EXT}.{}.{seq}.tmp", std::process::id()))
}

/// Background write of one cache artifact.
#[derive(Debug)]
pub struct PersistHandle(JoinHandle<Result<(), TransectError>>);

impl PersistHandle {
    /// Waits for the write to finish.
    pub fn join(self) -> Result<(), TransectError> {
        self.0
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("cache writer panicked").into()))
    }
}

/// Key for a curve resampled from `source` onto `points`.
///
/// Hashes the coordinates themselves, so paths with equal sample
/// counts get distinct keys.
pub fn cache_key(source: &str, points: &[Point<C>]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hasher.update((points.len() as u64).to_le_bytes());
    for point in points {
        hasher.update(point.y().to_le_bytes());
        hasher.update(point.x().to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
