use crate::models::{BaseItem, ChapterInfo};
use crate::playback::MediaPlayerQueue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Side content shown next to the player for the current item
pub trait MediaPlayerSupplement: Send + Sync + fmt::Debug {
    fn id(&self) -> &'static str;
    fn display_title(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct MediaInfoSupplement {
    pub item: BaseItem,
}

impl MediaPlayerSupplement for MediaInfoSupplement {
    fn id(&self) -> &'static str {
        "media-info"
    }

    fn display_title(&self) -> String {
        self.item.display_title()
    }
}

/// Chapters of the current item, ordered by start
#[derive(Debug, Clone)]
pub struct ChapterSupplement {
    chapters: Vec<ChapterInfo>,
}

impl ChapterSupplement {
    pub fn new(mut chapters: Vec<ChapterInfo>) -> Self {
        chapters.sort_by_key(|chapter| chapter.start);
        Self { chapters }
    }

    pub fn chapters(&self) -> &[ChapterInfo] {
        &self.chapters
    }

    /// Chapter containing `position`, if the chapters start before it
    pub fn chapter_at(&self, position: Duration) -> Option<&ChapterInfo> {
        self.chapters
            .iter()
            .take_while(|chapter| chapter.start <= position)
            .last()
    }
}

impl MediaPlayerSupplement for ChapterSupplement {
    fn id(&self) -> &'static str {
        "chapters"
    }

    fn display_title(&self) -> String {
        "Chapters".to_string()
    }
}

#[derive(Debug, Clone)]
pub struct QueueSupplement {
    pub queue: Arc<dyn MediaPlayerQueue>,
}

impl MediaPlayerSupplement for QueueSupplement {
    fn id(&self) -> &'static str {
        "queue"
    }

    fn display_title(&self) -> String {
        self.queue.display_title()
    }
}

/// Supplements offered for `item`: info always, chapters and queue when present
pub fn supplements_for(
    item: &BaseItem,
    queue: Option<&Arc<dyn MediaPlayerQueue>>,
) -> Vec<Arc<dyn MediaPlayerSupplement>> {
    let mut supplements: Vec<Arc<dyn MediaPlayerSupplement>> =
        vec![Arc::new(MediaInfoSupplement { item: item.clone() })];

    if !item.chapters.is_empty() {
        supplements.push(Arc::new(ChapterSupplement::new(item.chapters.clone())));
    }

    if let Some(queue) = queue {
        supplements.push(Arc::new(QueueSupplement {
            queue: queue.clone(),
        }));
    }

    supplements
}
