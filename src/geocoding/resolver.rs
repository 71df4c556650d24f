//! Resolving location names into archive-ready areas, with an in-memory and
//! on-disk cache of geocoding results.

use crate::geocoding::error::GeocodeError;
use crate::geocoding::geocoder::{Geocoder, NominatimGeocoder};
use crate::types::bounding_box::{BoundingBox, ResolvedArea, DEFAULT_COORDINATE_PRECISION};
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{info, warn};
use std::collections::{hash_map::Entry, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

const BINCODE_CACHE_FILE_NAME: &str = "geocode_cache.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

type GeocodeMap = HashMap<String, BoundingBox>;

/// Maps location names to the rectangles the geocoder returned for them.
///
/// Entries are keyed on the trimmed, lower-cased name. When backed by a file,
/// every new entry rewrites the file.
#[derive(Debug)]
pub struct GeocodeCache {
    cache_file: Option<PathBuf>,
    entries: Mutex<GeocodeMap>,
}

impl GeocodeCache {
    /// A cache that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            cache_file: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Loads (or starts) the cache file inside `cache_dir`.
    pub async fn load(cache_dir: &Path) -> Result<Self, GeocodeError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);
        let entries = if cache_file.exists() {
            let path_clone = cache_file.clone();
            let entries =
                tokio::task::spawn_blocking(move || Self::read_cache_file(&path_clone)).await??;
            info!(
                "Loaded {} cached locations from {}",
                entries.len(),
                cache_file.display()
            );
            entries
        } else {
            HashMap::new()
        };
        Ok(Self {
            cache_file: Some(cache_file),
            entries: Mutex::new(entries),
        })
    }

    pub async fn get(&self, location: &str) -> Option<BoundingBox> {
        self.entries.lock().await.get(&cache_key(location)).copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Stores `bbox` unless another task stored this location first, and
    /// returns whichever value ended up in the cache.
    ///
    /// The lock is held until the file is written, so writes land in insert
    /// order and the file always holds the latest map.
    pub async fn insert(
        &self,
        location: &str,
        bbox: BoundingBox,
    ) -> Result<BoundingBox, GeocodeError> {
        let mut entries = self.entries.lock().await;
        match entries.entry(cache_key(location)) {
            Entry::Occupied(entry) => return Ok(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(bbox);
            }
        }
        if let Some(cache_file) = &self.cache_file {
            Self::write_cache_file(entries.clone(), cache_file).await?;
        }
        Ok(bbox)
    }

    fn read_cache_file(cache_path: &Path) -> Result<GeocodeMap, GeocodeError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| GeocodeError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded, _) = bincode::serde::decode_from_slice::<GeocodeMap, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| GeocodeError::CacheDecode(cache_path.to_path_buf(), Box::from(e)))?;
        Ok(decoded)
    }

    async fn write_cache_file(entries: GeocodeMap, cache_path: &Path) -> Result<(), GeocodeError> {
        let path_buf = cache_path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let bytes = bincode::serde::encode_to_vec(&entries, BINCODE_CONFIG)
                .map_err(|e| GeocodeError::CacheEncode(Box::new(e)))?;
            let dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
            // Write next to the target and rename, so readers never see a partial file.
            let mut temp_file = NamedTempFile::new_in(dir)
                .map_err(|e| GeocodeError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .write_all(&bytes)
                .map_err(|e| GeocodeError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .persist(&path_buf)
                .map_err(|e| GeocodeError::CacheWrite(path_buf.clone(), e.error))?;
            Ok::<(), GeocodeError>(())
        })
        .await??;
        Ok(())
    }
}

fn cache_key(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Resolves location names to a [`ResolvedArea`]: the geocoded rectangle and
/// its minimum-size, archive-ordered counterpart.
#[derive(Debug)]
pub struct BoundingBoxResolver<G = NominatimGeocoder> {
    geocoder: G,
    cache: GeocodeCache,
    precision: u32,
}

impl BoundingBoxResolver<NominatimGeocoder> {
    /// A Nominatim-backed resolver caching results in `cache_dir`.
    pub async fn nominatim(cache_dir: &Path) -> Result<Self, GeocodeError> {
        Ok(Self::new(
            NominatimGeocoder::new()?,
            GeocodeCache::load(cache_dir).await?,
        ))
    }
}

impl<G: Geocoder> BoundingBoxResolver<G> {
    pub fn new(geocoder: G, cache: GeocodeCache) -> Self {
        Self {
            geocoder,
            cache,
            precision: DEFAULT_COORDINATE_PRECISION,
        }
    }

    /// Number of decimals coordinates are rounded to.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Geocodes `location` (or reuses a cached result) and widens any axis
    /// narrower than `min_size` degrees.
    ///
    /// # Errors
    ///
    /// [`GeocodeError::LocationNotFound`] when the geocoder knows no such place;
    /// transport and cache failures are passed through.
    pub async fn resolve(
        &self,
        location: &str,
        min_size: f64,
    ) -> Result<ResolvedArea, GeocodeError> {
        let original = match self.cache.get(location).await {
            Some(bbox) => {
                info!("Geocode cache hit for '{}'", location);
                bbox
            }
            None => {
                warn!("Geocode cache miss for '{}'", location);
                let bbox = self
                    .geocoder
                    .geocode(location)
                    .await?
                    .ok_or_else(|| GeocodeError::LocationNotFound(location.to_string()))?;
                self.cache.insert(location, bbox).await?
            }
        };
        Ok(ResolvedArea::from_original(original, min_size, self.precision))
    }
}
