//! Collection aliases optimized for mesh traversal workloads.
//!
//! The geodesic algorithms spend most of their time in small, hot maps and
//! buffers keyed by arena handles: edge canonicalisation during mesh build,
//! wedge enumeration during FlipOut, membership tests during flood fill.
//! These aliases pin down the implementations used for those roles.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Optimized `HashMap` for internal, trusted-key mappings.
///
/// Uses `rustc_hash::FxHasher`, which is substantially faster than the
/// default SipHash for the short integer-like keys (arena handles, packed
/// vertex pairs) this crate hashes.
///
/// Not DoS-resistant; use only with internal data.
///
/// # Examples
///
/// ```rust
/// use flipout::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// assert_eq!(map.get(&123), Some(&456));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` for internal membership tests.
///
/// Same hashing strategy and caveats as [`FastHashMap`].
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that keeps up to `N` elements on the stack.
///
/// # Size Guidelines
///
/// - **N=8**: typical vertex degrees (fan walks, wedge buffers)
/// - **N=16**: neighbour expansion and scratch buffers
///
/// # Examples
///
/// ```rust
/// use flipout::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i); // all stack allocated
/// }
/// assert_eq!(buffer.len(), 5);
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Re-export of the `Entry` API for [`FastHashMap`].
pub use std::collections::hash_map::Entry;
