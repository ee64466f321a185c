//! Drop items whose URL is already in the notification history.

use crate::history::HistoryStore;
use crate::ingest::types::NewsItem;

/// Keep items never notified before, in input order. Does not touch the store.
pub fn filter_new(items: Vec<NewsItem>, history: &HistoryStore) -> Vec<NewsItem> {
    items
        .into_iter()
        .filter(|it| !history.contains(&it.url))
        .collect()
}
