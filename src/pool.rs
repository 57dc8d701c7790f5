//! Size-bucketed pool for large element buffers.
//!
//! Buffers are grouped into power-of-two buckets starting at
//! [`MIN_BUCKET_LEN`] elements. Each bucket has its own lock, so rents and
//! returns of unrelated sizes never contend. Requests above
//! [`PoolConfig::max_buffer_len`] are served with a fresh exact-size
//! allocation that is freed, not pooled, when the lease is dropped.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, trace};
use spin::Mutex;

use crate::Element;

/// Length in elements of the smallest bucket.
pub const MIN_BUCKET_LEN: usize = 16;

/// Tuning for a [`BufferPool`].
///
/// ```
/// use zenframe::PoolConfig;
///
/// let config = PoolConfig::default()
///     .with_max_buffer_len(1 << 20)
///     .with_max_buffers_per_bucket(8);
/// assert_eq!(config.max_buffers_per_bucket, 8);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Largest buffer, in elements, that is retained on return. Rounded up
    /// to a power of two.
    pub max_buffer_len: usize,
    /// Buffers retained per bucket; extra returns are freed.
    pub max_buffers_per_bucket: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_buffer_len: 8 * 1024 * 1024,
            max_buffers_per_bucket: 50,
        }
    }
}

impl PoolConfig {
    /// Set the largest pooled buffer length in elements.
    pub fn with_max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    /// Set how many buffers each bucket keeps.
    pub fn with_max_buffers_per_bucket(mut self, count: usize) -> Self {
        self.max_buffers_per_bucket = count;
        self
    }

    fn bucket_count(&self) -> usize {
        let largest = self
            .max_buffer_len
            .max(MIN_BUCKET_LEN)
            .checked_next_power_of_two()
            .unwrap_or(1 << (usize::BITS - 1));
        (largest.trailing_zeros() - MIN_BUCKET_LEN.trailing_zeros()) as usize + 1
    }
}

/// Counters describing pool activity since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolStats {
    /// Total rent calls.
    pub rents: usize,
    /// Rents served from a retained buffer.
    pub reused: usize,
    /// Rents that allocated a new buffer.
    pub allocated: usize,
    /// Returned buffers that were retained.
    pub returned: usize,
    /// Returned buffers that were freed (oversized or bucket full).
    pub discarded: usize,
}

/// Thread-safe pool of `Vec<T>` buffers.
///
/// Cloning the pool is cheap and yields a handle to the same buckets.
pub struct BufferPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for BufferPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Element> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> BufferPool<T> {
    /// Pool with the default [`PoolConfig`].
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Pool with explicit limits.
    pub fn with_config(config: PoolConfig) -> Self {
        let buckets = (0..config.bucket_count())
            .map(|_| Mutex::new(Vec::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            inner: Arc::new(PoolInner {
                config,
                buckets,
                metrics: PoolMetrics::default(),
            }),
        }
    }

    /// Rent a buffer of at least `min_len` elements.
    ///
    /// Contents are whatever the previous renter left behind; zero-fill
    /// the lease if that matters.
    pub fn rent(&self, min_len: usize) -> PoolLease<T> {
        let inner = &self.inner;
        inner.metrics.rents.fetch_add(1, Ordering::Relaxed);
        let buffer = match inner.bucket_index(min_len) {
            Some(index) => {
                let reused = inner.buckets[index].lock().pop();
                match reused {
                    Some(buffer) => {
                        inner.metrics.reused.fetch_add(1, Ordering::Relaxed);
                        trace!("rent {min_len}: reused {} element buffer", buffer.len());
                        buffer
                    }
                    None => {
                        inner.metrics.allocated.fetch_add(1, Ordering::Relaxed);
                        let len = bucket_len(index);
                        trace!("rent {min_len}: allocated {len} element buffer");
                        vec![T::default(); len]
                    }
                }
            }
            None => {
                inner.metrics.allocated.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "rent {min_len} exceeds pooled maximum {}, allocating unpooled",
                    inner.config.max_buffer_len
                );
                vec![T::default(); min_len]
            }
        };
        PoolLease {
            buffer,
            pool: Arc::clone(inner),
        }
    }

    /// Rent a small buffer of roughly one 4 KiB page worth of `T`.
    pub fn rent_default(&self) -> PoolLease<T> {
        self.rent(default_rent_len::<T>())
    }
}

impl<T> BufferPool<T> {
    /// Return a lease to the pool it was rented from.
    ///
    /// Equivalent to dropping it.
    pub fn give_back(&self, lease: PoolLease<T>) {
        debug_assert!(
            Arc::ptr_eq(&self.inner, &lease.pool),
            "lease returned to a different pool"
        );
        drop(lease);
    }

    /// The limits this pool was built with.
    pub fn config(&self) -> PoolConfig {
        self.inner.config
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> PoolStats {
        let metrics = &self.inner.metrics;
        PoolStats {
            rents: metrics.rents.load(Ordering::Relaxed),
            reused: metrics.reused.load(Ordering::Relaxed),
            allocated: metrics.allocated.load(Ordering::Relaxed),
            returned: metrics.returned.load(Ordering::Relaxed),
            discarded: metrics.discarded.load(Ordering::Relaxed),
        }
    }

    /// Number of buffers currently held for reuse.
    pub fn retained(&self) -> usize {
        self.inner.buckets.iter().map(|bucket| bucket.lock().len()).sum()
    }

    /// Free every retained buffer. Returns how many were dropped.
    pub fn trim(&self) -> usize {
        let mut freed = 0;
        for bucket in self.inner.buckets.iter() {
            let mut bucket = bucket.lock();
            freed += bucket.len();
            bucket.clear();
        }
        debug!("trimmed {freed} retained buffers");
        freed
    }
}

impl<T> fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

struct PoolInner<T> {
    config: PoolConfig,
    buckets: Box<[Mutex<Vec<Vec<T>>>]>,
    metrics: PoolMetrics,
}

impl<T> PoolInner<T> {
    /// Bucket serving a request of `len` elements, `None` when oversized.
    fn bucket_index(&self, len: usize) -> Option<usize> {
        let size = len.max(MIN_BUCKET_LEN).checked_next_power_of_two()?;
        let index = (size.trailing_zeros() - MIN_BUCKET_LEN.trailing_zeros()) as usize;
        (index < self.buckets.len()).then_some(index)
    }

    fn reclaim(&self, buffer: Vec<T>) {
        let len = buffer.len();
        if let Some(index) = self.bucket_index(len)
            && bucket_len(index) == len
        {
            let mut bucket = self.buckets[index].lock();
            if bucket.len() < self.config.max_buffers_per_bucket {
                bucket.push(buffer);
                self.metrics.returned.fetch_add(1, Ordering::Relaxed);
                trace!("returned {len} element buffer to bucket {index}");
                return;
            }
        }
        self.metrics.discarded.fetch_add(1, Ordering::Relaxed);
        debug!("discarded {len} element buffer on return");
    }
}

#[derive(Default)]
struct PoolMetrics {
    rents: AtomicUsize,
    reused: AtomicUsize,
    allocated: AtomicUsize,
    returned: AtomicUsize,
    discarded: AtomicUsize,
}

const fn bucket_len(index: usize) -> usize {
    MIN_BUCKET_LEN << index
}

/// Rent length used when the caller does not name one.
pub(crate) const fn default_rent_len<T>() -> usize {
    let size = core::mem::size_of::<T>();
    let size = if size == 0 { 1 } else { size };
    1 + 4095 / size
}

// ---------------------------------------------------------------------------
// PoolLease
// ---------------------------------------------------------------------------

/// A buffer rented from a [`BufferPool`].
///
/// The lease is the only handle to the buffer; dropping it (or calling
/// [`release`](Self::release)) hands the storage back to the pool.
pub struct PoolLease<T> {
    buffer: Vec<T>,
    pool: Arc<PoolInner<T>>,
}

impl<T> PoolLease<T> {
    /// Usable length; at least what was requested.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hand the buffer back to its pool.
    pub fn release(self) {}
}

impl<T> Deref for PoolLease<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.buffer
    }
}

impl<T> DerefMut for PoolLease<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.buffer
    }
}

impl<T> Drop for PoolLease<T> {
    fn drop(&mut self) {
        let buffer = core::mem::take(&mut self.buffer);
        self.pool.reclaim(buffer);
    }
}

impl<T> fmt::Debug for PoolLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolLease({} elements)", self.buffer.len())
    }
}
