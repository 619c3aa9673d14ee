//! Per-request memory of recently returned starting points.
//!
//! Callers repeating the same starting-point request should not be offered
//! the same ride twice in a row. The cache remembers, per request signature,
//! the last few points handed out; the matcher excludes them from the next
//! draw. Signatures are evicted least recently used first.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use geo::Coord;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::CacheConfig;
use crate::wire::StartingPointRequest;

/// Canonical identity of a starting-point request.
///
/// Types are sorted and deduplicated, so requests listing the same types in
/// a different order share a dedupe window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature {
    length: u32,
    types: Vec<String>,
}

impl RequestSignature {
    /// Build the signature of a request for `length` metres and `types`.
    #[must_use]
    pub fn new(length: u32, types: &[String]) -> Self {
        let mut types = types.to_vec();
        types.sort_unstable();
        types.dedup();
        Self { length, types }
    }

    /// Requested length in metres.
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Requested types, sorted.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }
}

impl From<&StartingPointRequest> for RequestSignature {
    fn from(request: &StartingPointRequest) -> Self {
        Self::new(request.length, &request.types)
    }
}

/// Exported state of one signature's dedupe window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// The request the window belongs to.
    pub body: StartingPointRequest,
    /// Recently returned starting points, oldest first, as
    /// `[longitude, latitude]`.
    pub last_starting_points: Vec<[f64; 2]>,
}

/// Bounded, thread-safe dedupe windows keyed by [`RequestSignature`].
///
/// Every operation holds the lock for its whole read-modify-write, and
/// [`Self::draw`] keeps it from reading a window until recording the point
/// picked against it, so concurrent identical requests are never handed
/// the same recent point.
#[derive(Debug)]
pub struct StartingPointCache {
    window: usize,
    entries: Mutex<LruCache<RequestSignature, VecDeque<Coord<f64>>>>,
}

impl StartingPointCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_signatures).unwrap_or(NonZeroUsize::MIN);
        Self {
            window: config.window,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<RequestSignature, VecDeque<Coord<f64>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Points recently returned for `signature`, oldest first.
    #[must_use]
    pub fn recent(&self, signature: &RequestSignature) -> Vec<Coord<f64>> {
        self.lock()
            .get(signature)
            .map(|points| points.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remember that `point` was returned for `signature`, forgetting the
    /// oldest point once the window is full.
    pub fn record(&self, signature: RequestSignature, point: Coord<f64>) {
        let mut entries = self.lock();
        self.push(&mut entries, signature, point);
    }

    /// Pick a point for `signature` and remember it, as one step.
    ///
    /// `pick` receives the points recently returned for `signature`, oldest
    /// first. The lock is held until its choice is recorded, so concurrent
    /// draws for the same signature each see the other's answer.
    ///
    /// # Errors
    /// Returns whatever error `pick` returns; nothing is recorded then.
    pub fn draw<F, E>(
        &self,
        signature: RequestSignature,
        pick: F,
    ) -> Result<Option<Coord<f64>>, E>
    where
        F: FnOnce(&[Coord<f64>]) -> Result<Option<Coord<f64>>, E>,
    {
        let mut entries = self.lock();
        let recent: Vec<Coord<f64>> = entries
            .get(&signature)
            .map(|points| points.iter().copied().collect())
            .unwrap_or_default();
        let picked = pick(&recent)?;
        if let Some(point) = picked {
            self.push(&mut entries, signature, point);
        }
        Ok(picked)
    }

    fn push(
        &self,
        entries: &mut LruCache<RequestSignature, VecDeque<Coord<f64>>>,
        signature: RequestSignature,
        point: Coord<f64>,
    ) {
        if self.window == 0 {
            return;
        }
        let points = entries.get_or_insert_mut(signature, VecDeque::new);
        points.push_back(point);
        while points.len() > self.window {
            points.pop_front();
        }
    }

    /// Number of signatures currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no signature is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Export every window, least recently used first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CacheRecord> {
        let entries = self.lock();
        let mut records: Vec<CacheRecord> = entries
            .iter()
            .map(|(signature, points)| CacheRecord {
                body: StartingPointRequest {
                    length: signature.length,
                    types: signature.types.clone(),
                },
                last_starting_points: points.iter().map(|point| [point.x, point.y]).collect(),
            })
            .collect();
        records.reverse();
        records
    }

    /// Load windows from `records`, as produced by [`Self::snapshot`].
    ///
    /// Later records count as more recently used. Windows longer than the
    /// configured size keep their newest points.
    pub fn restore<I>(&self, records: I)
    where
        I: IntoIterator<Item = CacheRecord>,
    {
        let mut entries = self.lock();
        for record in records {
            let mut points: VecDeque<Coord<f64>> = record
                .last_starting_points
                .into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect();
            while points.len() > self.window {
                points.pop_front();
            }
            if !points.is_empty() {
                entries.put(RequestSignature::from(&record.body), points);
            }
        }
    }
}

impl Default for StartingPointCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn p(x: f64) -> Coord<f64> {
        Coord { x, y: 0.0 }
    }

    fn signature(types: &[&str]) -> RequestSignature {
        let types: Vec<String> = types.iter().map(|t| (*t).to_owned()).collect();
        RequestSignature::new(5_000, &types)
    }

    #[fixture]
    fn cache() -> StartingPointCache {
        StartingPointCache::default()
    }

    #[rstest]
    fn window_keeps_the_newest_points(cache: StartingPointCache) {
        for x in 1..=5 {
            cache.record(signature(&[]), p(f64::from(x)));
        }
        assert_eq!(cache.recent(&signature(&[])), vec![p(3.0), p(4.0), p(5.0)]);
    }

    #[rstest]
    fn type_order_does_not_split_windows(cache: StartingPointCache) {
        cache.record(signature(&["pizzeria", "bistro"]), p(1.0));
        assert_eq!(
            cache.recent(&signature(&["bistro", "pizzeria", "bistro"])),
            vec![p(1.0)]
        );
        assert!(cache.recent(&signature(&["bistro"])).is_empty());
    }

    #[rstest]
    fn least_recently_used_signature_is_evicted() {
        let cache = StartingPointCache::new(CacheConfig {
            window: 3,
            max_signatures: 2,
        });
        cache.record(signature(&["a"]), p(1.0));
        cache.record(signature(&["b"]), p(2.0));
        let _ = cache.recent(&signature(&["a"]));
        cache.record(signature(&["c"]), p(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.recent(&signature(&["b"])).is_empty());
        assert_eq!(cache.recent(&signature(&["a"])), vec![p(1.0)]);
    }

    #[rstest]
    fn zero_window_remembers_nothing() {
        let cache = StartingPointCache::new(CacheConfig {
            window: 0,
            max_signatures: 4,
        });
        cache.record(signature(&[]), p(1.0));
        assert!(cache.is_empty());
    }

    #[rstest]
    fn snapshot_restores_into_a_fresh_cache(cache: StartingPointCache) {
        cache.record(signature(&["bistro"]), p(1.0));
        cache.record(signature(&["bistro"]), p(2.0));
        cache.record(signature(&[]), p(9.0));

        let json = serde_json::to_string(&cache.snapshot()).expect("encode");
        let records: Vec<CacheRecord> = serde_json::from_str(&json).expect("decode");
        let restored = StartingPointCache::default();
        restored.restore(records);

        assert_eq!(restored.recent(&signature(&["bistro"])), vec![p(1.0), p(2.0)]);
        assert_eq!(restored.recent(&signature(&[])), vec![p(9.0)]);
        assert_eq!(restored.snapshot(), cache.snapshot());
    }

    #[rstest]
    fn restore_truncates_long_windows(cache: StartingPointCache) {
        cache.restore([CacheRecord {
            body: StartingPointRequest {
                length: 5_000,
                types: Vec::new(),
            },
            last_starting_points: vec![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]],
        }]);
        assert_eq!(cache.recent(&signature(&[])), vec![p(2.0), p(3.0), p(4.0)]);
    }

    #[rstest]
    fn failed_draws_record_nothing(cache: StartingPointCache) {
        let result: Result<_, &str> = cache.draw(signature(&[]), |_| Err("store down"));
        assert_eq!(result, Err("store down"));
        assert!(cache.is_empty());
    }

    #[rstest]
    fn concurrent_draws_see_each_other(cache: StartingPointCache) {
        let candidates = [p(1.0), p(2.0), p(3.0)];
        let drawn: Vec<Coord<f64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|_| {
                    scope.spawn(|| {
                        cache.draw(signature(&[]), |recent| {
                            // Widen the gap between reading and recording.
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok::<_, ()>(
                                candidates
                                    .iter()
                                    .copied()
                                    .find(|candidate| !recent.contains(candidate)),
                            )
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .expect("draw thread")
                        .expect("draw")
                        .expect("a free candidate")
                })
                .collect()
        });
        let mut xs: Vec<f64> = drawn.iter().map(|point| point.x).collect();
        xs.sort_by(f64::total_cmp);
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[rstest]
    fn cache_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StartingPointCache>();
    }
}
