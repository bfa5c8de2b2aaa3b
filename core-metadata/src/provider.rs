//! Metadata Provider Contract
//!
//! The host implements [`MetadataProvider`] on top of whatever backend serves
//! item data (an HTTP extractor, a local index, a test fixture). Every
//! operation may fail independently; the caches in this crate decide what is
//! stored and what is shared.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Chapter, ItemId, MetaInfo, PreviewThumbnailsInfo, RepoInfo, Stream, Subtitle, Thumbnail,
};

/// Source of item metadata, streams and preview thumbnails.
///
/// Implementations convert their own failures into
/// [`MetadataError`](crate::MetadataError); bridge implementations can use the
/// `From<BridgeError>` conversion.
///
/// # Example
///
/// ```ignore
/// use core_metadata::{ItemId, MetadataProvider};
///
/// async fn title(provider: &dyn MetadataProvider) -> core_metadata::Result<String> {
///     let info = provider.get_meta_info(&ItemId::new("item-1")).await?;
///     Ok(info.title)
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo>;

    /// All streams the item can be played from.
    async fn get_streams(&self, item_id: &ItemId) -> Result<Vec<Stream>>;

    async fn get_subtitles(&self, item_id: &ItemId) -> Result<Vec<Subtitle>>;

    async fn get_chapters(&self, item_id: &ItemId) -> Result<Vec<Chapter>>;

    async fn get_preview_thumbnails_info(&self, item_id: &ItemId)
        -> Result<PreviewThumbnailsInfo>;

    /// Preview thumbnail covering `timestamp_ms`, if the item has one there.
    async fn get_preview_thumbnail(
        &self,
        item_id: &ItemId,
        timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>>;

    /// Shareable link that starts playback at `timestamp_secs`.
    async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> Result<String>;

    async fn get_repo_info(&self) -> Result<RepoInfo>;
}
