//! Surface classification cache.
//!
//! Memoizes external lookups keyed by coordinate so that repeated points
//! (dense tracks, re-uploaded routes) never hit the provider twice.

use super::lookup::{LookupError, SurfaceLookup};
use super::types::SurfaceType;
use crate::coord::TrackPoint;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Default number of decimal places kept when bucketing cache keys.
///
/// Five decimals of a degree is roughly 1.1 m at the equator, well below
/// GPS noise, so nearby re-submissions of the same road share entries.
pub const DEFAULT_KEY_PRECISION: u32 = 5;

/// Cache key derived from a coordinate.
///
/// With a precision, both axes are quantized to that many decimal places.
/// Without one, the key is the exact bit pattern of the floats, which
/// reproduces the legacy exact-match behavior (and its poor hit rate on
/// real-world float noise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lon: u64,
    lat: u64,
}

impl CacheKey {
    /// Builds a cache key for a point at the given precision.
    pub fn new(point: &TrackPoint, precision: Option<u32>) -> Self {
        match precision {
            Some(decimals) => {
                let scale = 10f64.powi(decimals as i32);
                Self {
                    lon: ((point.lon * scale).round() as i64) as u64,
                    lat: ((point.lat * scale).round() as i64) as u64,
                }
            }
            None => Self {
                lon: point.lon.to_bits(),
                lat: point.lat.to_bits(),
            },
        }
    }
}

/// Cache activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Classifications answered from the cache
    pub hits: u64,
    /// Classifications that required an external lookup
    pub misses: u64,
    /// Entries written into the cache
    pub inserts: u64,
    /// External lookup calls issued (batched misses count once)
    pub lookup_calls: u64,
}

impl CacheStats {
    fn record_hits(&mut self, count: u64) {
        self.hits += count;
    }

    fn record_misses(&mut self, count: u64) {
        self.misses += count;
    }

    fn record_lookup(&mut self, inserted: u64) {
        self.lookup_calls += 1;
        self.inserts += inserted;
    }
}

/// Shared, read-mostly cache in front of a [`SurfaceLookup`] provider.
///
/// Safe for any number of concurrent classification tasks. Racing misses
/// for the same coordinate may each issue a lookup; since the provider is
/// deterministic, last-writer-wins population is acceptable.
pub struct SurfaceCache {
    lookup: Arc<dyn SurfaceLookup>,
    entries: DashMap<CacheKey, SurfaceType>,
    precision: Option<u32>,
    stats: Mutex<CacheStats>,
}

impl SurfaceCache {
    /// Creates a cache over the given provider with the default key precision.
    pub fn new(lookup: Arc<dyn SurfaceLookup>) -> Self {
        Self::with_precision(lookup, Some(DEFAULT_KEY_PRECISION))
    }

    /// Creates a cache with an explicit key precision.
    ///
    /// `None` keys on exact float bits.
    pub fn with_precision(lookup: Arc<dyn SurfaceLookup>, precision: Option<u32>) -> Self {
        Self {
            lookup,
            entries: DashMap::new(),
            precision,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Classifies a single coordinate.
    ///
    /// A cache hit returns immediately with no external call. A miss
    /// issues one lookup, stores the result and returns it.
    pub async fn classify(&self, point: &TrackPoint) -> Result<SurfaceType, LookupError> {
        let key = CacheKey::new(point, self.precision);
        if let Some(entry) = self.entries.get(&key) {
            let surface = entry.clone();
            drop(entry);
            self.stats.lock().unwrap().record_hits(1);
            return Ok(surface);
        }
        self.stats.lock().unwrap().record_misses(1);

        let mut surfaces = self.lookup.lookup(std::slice::from_ref(point)).await?;
        if surfaces.len() != 1 {
            return Err(LookupError::MalformedResponse {
                expected: 1,
                actual: surfaces.len(),
            });
        }
        let surface = surfaces.remove(0);
        self.entries.insert(key, surface.clone());
        self.stats.lock().unwrap().record_lookup(1);
        Ok(surface)
    }

    /// Classifies a batch of coordinates, preserving input order.
    ///
    /// Cache hits are short-circuited; a single external call is issued
    /// for the residual misses (deduplicated by key). Every returned
    /// mapping is stored.
    pub async fn classify_batch(
        &self,
        points: &[TrackPoint],
    ) -> Result<Vec<SurfaceType>, LookupError> {
        let mut resolved: Vec<Option<SurfaceType>> = Vec::with_capacity(points.len());
        let mut miss_points: Vec<TrackPoint> = Vec::new();
        let mut miss_keys: Vec<CacheKey> = Vec::new();

        for point in points {
            let key = CacheKey::new(point, self.precision);
            match self.entries.get(&key) {
                Some(entry) => resolved.push(Some(entry.clone())),
                None => {
                    resolved.push(None);
                    if !miss_keys.contains(&key) {
                        miss_keys.push(key);
                        miss_points.push(*point);
                    }
                }
            }
        }

        let hit_count = resolved.iter().filter(|slot| slot.is_some()).count() as u64;
        let miss_count = points.len() as u64 - hit_count;
        {
            let mut stats = self.stats.lock().unwrap();
            stats.record_hits(hit_count);
            stats.record_misses(miss_count);
        }

        if miss_points.is_empty() {
            return Ok(resolved.into_iter().map(|slot| slot.unwrap()).collect());
        }

        let surfaces = self.lookup.lookup(&miss_points).await?;
        if surfaces.len() != miss_points.len() {
            return Err(LookupError::MalformedResponse {
                expected: miss_points.len(),
                actual: surfaces.len(),
            });
        }
        for (key, surface) in miss_keys.iter().zip(surfaces.iter()) {
            self.entries.insert(*key, surface.clone());
        }
        self.stats
            .lock()
            .unwrap()
            .record_lookup(miss_points.len() as u64);

        let output = points
            .iter()
            .zip(resolved)
            .map(|(point, slot)| match slot {
                Some(surface) => surface,
                None => {
                    let key = CacheKey::new(point, self.precision);
                    self.entries
                        .get(&key)
                        .map(|entry| entry.clone())
                        .unwrap_or(SurfaceType::Unknown)
                }
            })
            .collect();
        Ok(output)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }

    /// Drops all cached entries. Counters are preserved.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
