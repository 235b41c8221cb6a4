use crate::models::BaseItem;
use crate::playback::{PlaybackError, PlaybackItem};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async function resolving an item descriptor into a playable item
pub type ItemFactory =
    Arc<dyn Fn(BaseItem) -> BoxFuture<'static, Result<PlaybackItem, PlaybackError>> + Send + Sync>;

/// Box an async function into an [`ItemFactory`]
pub fn item_factory<F, Fut>(function: F) -> ItemFactory
where
    F: Fn(BaseItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PlaybackItem, PlaybackError>> + Send + 'static,
{
    Arc::new(
        move |item: BaseItem| -> BoxFuture<'static, Result<PlaybackItem, PlaybackError>> {
            Box::pin(function(item))
        },
    )
}

/// Deferred construction of a [`PlaybackItem`]
///
/// Pairs the item to play with the function that resolves it. Calling
/// [`resolve`](Self::resolve) runs the factory once; nothing is cached or
/// retried. Two providers never compare equal, even with identical contents:
/// each one is a distinct request to play something.
#[derive(Clone)]
pub struct MediaPlayerItemProvider {
    item: BaseItem,
    function: ItemFactory,
}

impl MediaPlayerItemProvider {
    pub fn new<F, Fut>(item: BaseItem, function: F) -> Self
    where
        F: Fn(BaseItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PlaybackItem, PlaybackError>> + Send + 'static,
    {
        Self {
            item,
            function: item_factory(function),
        }
    }

    pub fn from_factory(item: BaseItem, function: ItemFactory) -> Self {
        Self { item, function }
    }

    /// The item this provider will resolve
    pub fn item(&self) -> &BaseItem {
        &self.item
    }

    pub async fn resolve(&self) -> Result<PlaybackItem, PlaybackError> {
        (self.function)(self.item.clone()).await
    }
}

impl PartialEq for MediaPlayerItemProvider {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl fmt::Debug for MediaPlayerItemProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPlayerItemProvider")
            .field("item_id", &self.item.id)
            .finish_non_exhaustive()
    }
}
