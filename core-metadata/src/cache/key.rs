use std::fmt;

use crate::models::ItemId;

/// Key of a per-item cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Item(ItemId),
    /// Item plus a position in milliseconds (or seconds, for timestamp links).
    Timestamped(ItemId, i64),
}

impl CacheKey {
    pub fn item_id(&self) -> &ItemId {
        match self {
            CacheKey::Item(id) | CacheKey::Timestamped(id, _) => id,
        }
    }
}

impl From<ItemId> for CacheKey {
    fn from(id: ItemId) -> Self {
        CacheKey::Item(id)
    }
}

impl From<&ItemId> for CacheKey {
    fn from(id: &ItemId) -> Self {
        CacheKey::Item(id.clone())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Item(id) => write!(f, "{}", id),
            CacheKey::Timestamped(id, at) => write!(f, "{}@{}", id, at),
        }
    }
}
