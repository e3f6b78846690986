use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Add, Sub};
use std::sync::{Arc, Mutex};

/// Numeric domain of distances: non-negative, totally ordered for the
/// values a metric actually produces, closed under addition.
///
/// `sub_or_zero` and `abs_diff` exist so unsigned distance types can be
/// used in the bound arithmetic without underflowing.
pub trait DistanceValue:
    Copy + PartialOrd + Add<Output = Self> + Sub<Output = Self> + Debug
{
    const ZERO: Self;
    const INFINITY: Self;

    /// `max(0, self - rhs)`.
    fn sub_or_zero(self, rhs: Self) -> Self {
        if self > rhs {
            self - rhs
        } else {
            Self::ZERO
        }
    }

    /// `|self - rhs|`.
    fn abs_diff(self, rhs: Self) -> Self {
        if self > rhs {
            self - rhs
        } else {
            rhs - self
        }
    }

    fn max(self, rhs: Self) -> Self {
        if self > rhs {
            self
        } else {
            rhs
        }
    }
}

macro_rules! impl_distance_value_int {
    ($($t:ty),*) => {
        $(impl DistanceValue for $t {
            const ZERO: Self = 0;
            const INFINITY: Self = <$t>::MAX;
        })*
    };
}

macro_rules! impl_distance_value_float {
    ($($t:ty),*) => {
        $(impl DistanceValue for $t {
            const ZERO: Self = 0.0;
            const INFINITY: Self = <$t>::INFINITY;
        })*
    };
}

impl_distance_value_int!(u32, u64, usize, i32, i64);
impl_distance_value_float!(f32, f64);

/// A distance function over an opaque value domain. Implementations must
/// be symmetric and satisfy the triangle inequality for search pruning to
/// be exact; neither is verified at runtime.
pub trait DistanceMetric<V: ?Sized, D>: Debug + Sync + Send {
    fn distance(&self, a: &V, b: &V) -> D;
}

/// Absolute difference between scalar values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteDifference;

impl DistanceMetric<i64, i64> for AbsoluteDifference {
    fn distance(&self, a: &i64, b: &i64) -> i64 {
        (a - b).abs()
    }
}

impl DistanceMetric<u64, u64> for AbsoluteDifference {
    fn distance(&self, a: &u64, b: &u64) -> u64 {
        a.abs_diff(*b)
    }
}

impl DistanceMetric<f64, f64> for AbsoluteDifference {
    fn distance(&self, a: &f64, b: &f64) -> f64 {
        (a - b).abs()
    }
}

/// Levenshtein edit distance over strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistance;

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

impl DistanceMetric<String, usize> for EditDistance {
    fn distance(&self, a: &String, b: &String) -> usize {
        levenshtein(a, b)
    }
}

impl DistanceMetric<str, usize> for EditDistance {
    fn distance(&self, a: &str, b: &str) -> usize {
        levenshtein(a, b)
    }
}

/// Bitwise Hamming distance over equal-length byte strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingDistance;

impl DistanceMetric<Vec<u8>, usize> for HammingDistance {
    fn distance(&self, x: &Vec<u8>, y: &Vec<u8>) -> usize {
        x.iter()
            .zip(y.iter())
            .fold(0, |acc, (a, b)| acc + (a ^ b).count_ones() as usize)
    }
}

/// Euclidean (L2) distance over equal-length coordinate vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl DistanceMetric<Vec<f64>, f64> for EuclideanDistance {
    fn distance(&self, a: &Vec<f64>, b: &Vec<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let diff = x - y;
                diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }
}

struct CountingState<V, D> {
    cache: HashMap<(V, V), D>,
    calls: HashSet<(V, V)>,
}

/// Memoizing, call-counting decorator around any metric.
///
/// Arguments are canonicalized by `Ord` before the cache lookup so a
/// symmetric metric is only ever evaluated once per unordered pair. The
/// counter tracks distinct pairs asked for since the last reset and is
/// independent of the cache, which survives `reset_counter`. Purely an
/// instrumentation aid for comparing insertion/search policies; never
/// required for correctness.
pub struct CountingDistance<V, D> {
    inner: Arc<dyn DistanceMetric<V, D>>,
    state: Mutex<CountingState<V, D>>,
}

impl<V, D> Debug for CountingDistance<V, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingDistance")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<V, D> CountingDistance<V, D>
where
    V: Clone + Ord + Hash,
    D: Copy,
{
    pub fn new(inner: Arc<dyn DistanceMetric<V, D>>) -> Self {
        CountingDistance {
            inner,
            state: Mutex::new(CountingState {
                cache: HashMap::new(),
                calls: HashSet::new(),
            }),
        }
    }

    /// Distinct (unordered) pairs asked for since the last reset.
    pub fn call_count(&self) -> usize {
        self.state.lock().expect("counting state poisoned").calls.len()
    }

    pub fn reset_counter(&self) {
        self.state
            .lock()
            .expect("counting state poisoned")
            .calls
            .clear();
    }
}

impl<V, D> DistanceMetric<V, D> for CountingDistance<V, D>
where
    V: Clone + Ord + Hash + Send + Sync,
    D: Copy + Send + Sync,
{
    fn distance(&self, a: &V, b: &V) -> D {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        let mut state = self.state.lock().expect("counting state poisoned");
        state.calls.insert(key.clone());
        if let Some(&cached) = state.cache.get(&key) {
            return cached;
        }
        let computed = self.inner.distance(a, b);
        state.cache.insert(key, computed);
        computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_basics() {
        let m = EditDistance;
        assert_eq!(m.distance("", "abc"), 3);
        assert_eq!(m.distance("kitten", "sitting"), 3);
        assert_eq!(m.distance("abc", "abc"), 0);
        assert_eq!(m.distance("a", "b"), 1);
    }

    #[test]
    fn edit_distance_symmetric() {
        let m = EditDistance;
        assert_eq!(m.distance("flaw", "lawn"), m.distance("lawn", "flaw"));
    }

    #[test]
    fn hamming_distance_counts_bits() {
        let m = HammingDistance;
        assert_eq!(m.distance(&vec![0b1010u8], &vec![0b0101u8]), 4);
        assert_eq!(m.distance(&vec![0xffu8, 0x00], &vec![0xffu8, 0x00]), 0);
    }

    #[test]
    fn euclidean_distance() {
        let m = EuclideanDistance;
        let d = m.distance(&vec![0.0, 0.0], &vec![3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn sub_or_zero_never_underflows() {
        assert_eq!(3u64.sub_or_zero(5), 0);
        assert_eq!(5u64.sub_or_zero(3), 2);
        assert_eq!(2.0f64.abs_diff(5.0), 3.0);
    }

    #[test]
    fn counting_distance_caches_symmetric_pairs() {
        let counted = CountingDistance::<i64, i64>::new(Arc::new(AbsoluteDifference));
        assert_eq!(counted.distance(&3i64, &10i64), 7);
        assert_eq!(counted.distance(&10i64, &3i64), 7);
        assert_eq!(counted.call_count(), 1);

        assert_eq!(counted.distance(&0i64, &4i64), 4);
        assert_eq!(counted.call_count(), 2);

        counted.reset_counter();
        assert_eq!(counted.call_count(), 0);
        // cache survives the counter reset
        assert_eq!(counted.distance(&3i64, &10i64), 7);
        assert_eq!(counted.call_count(), 1);
    }
}
