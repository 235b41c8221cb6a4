use crate::models::BaseItem;
use crate::playback::{ItemFactory, MediaPlayerItemProvider};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// Strategy supplying the items around the one currently playing
///
/// `None` from [`next_item`](Self::next_item) means the end of the content,
/// not an error.
pub trait MediaPlayerQueue: Send + Sync + fmt::Debug {
    fn display_title(&self) -> String;

    fn next_item(&self, current: &BaseItem) -> Option<MediaPlayerItemProvider>;

    fn previous_item(&self, _current: &BaseItem) -> Option<MediaPlayerItemProvider> {
        None
    }
}

/// Queue over a fixed, ordered list of items: a season's episodes or a playlist
pub struct ListQueue {
    title: String,
    items: Vec<BaseItem>,
    factory: ItemFactory,
}

impl ListQueue {
    pub fn new(title: impl Into<String>, items: Vec<BaseItem>, factory: ItemFactory) -> Self {
        Self {
            title: title.into(),
            items,
            factory,
        }
    }

    /// Same items in a random order
    pub fn shuffled<R: Rng + ?Sized>(
        title: impl Into<String>,
        mut items: Vec<BaseItem>,
        factory: ItemFactory,
        rng: &mut R,
    ) -> Self {
        items.shuffle(rng);
        Self::new(title, items, factory)
    }

    pub fn items(&self) -> &[BaseItem] {
        &self.items
    }

    fn position_of(&self, current: &BaseItem) -> Option<usize> {
        self.items.iter().position(|item| item.id == current.id)
    }

    fn provider_at(&self, index: usize) -> Option<MediaPlayerItemProvider> {
        self.items.get(index).map(|item| {
            MediaPlayerItemProvider::from_factory(item.clone(), self.factory.clone())
        })
    }
}

impl MediaPlayerQueue for ListQueue {
    fn display_title(&self) -> String {
        self.title.clone()
    }

    fn next_item(&self, current: &BaseItem) -> Option<MediaPlayerItemProvider> {
        let index = self.position_of(current)?;
        self.provider_at(index + 1)
    }

    fn previous_item(&self, current: &BaseItem) -> Option<MediaPlayerItemProvider> {
        let index = self.position_of(current)?;
        self.provider_at(index.checked_sub(1)?)
    }
}

impl fmt::Debug for ListQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListQueue")
            .field("title", &self.title)
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}
