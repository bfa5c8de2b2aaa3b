//! # Metadata Caches
//!
//! In-memory, session-scoped caches with request coalescing.
//!
//! - [`KeyedCache`]: one value per key, one concurrent load per key
//! - [`TimeQuantizedCache`]: keys on `(item, bucket start)` so nearby
//!   timestamps share an entry
//!
//! There is no eviction and no expiry. Entries live until `flush()`.

mod key;
mod keyed;
mod quantized;
mod stats;

pub use key::CacheKey;
pub use keyed::{CacheEntry, FlushOutcome, KeyedCache};
pub use quantized::{quantize, TimeQuantizedCache};
pub use stats::CacheStats;
