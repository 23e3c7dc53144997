//! Search box and category picker over club, event and news lists.

use crate::entity::{Club, Event, NewsArticle};

pub trait Searchable {
    /// Fields matched by the free-text query.
    fn search_text(&self) -> [Option<&str>; 2];
    fn category(&self) -> Option<&str>;
}

impl Searchable for Club {
    fn search_text(&self) -> [Option<&str>; 2] {
        [Some(self.name.as_str()), self.description.as_deref()]
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }
}

/// Events are grouped by their organizing club.
impl Searchable for Event {
    fn search_text(&self) -> [Option<&str>; 2] {
        [Some(self.title.as_str()), self.description.as_deref()]
    }

    fn category(&self) -> Option<&str> {
        self.organizer.as_ref().map(|o| o.name.as_str())
    }
}

impl Searchable for NewsArticle {
    fn search_text(&self) -> [Option<&str>; 2] {
        [Some(self.title.as_str()), Some(self.content.as_str())]
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }
}

/// Keeps items whose text contains `query` (case-insensitive) and whose
/// category equals `category`. Blank arguments match everything.
pub fn filter<T: Searchable>(list: Vec<T>, query: Option<&str>, category: Option<&str>) -> Vec<T> {
    let query = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    list.into_iter()
        .filter(|item| match &query {
            Some(q) => item
                .search_text()
                .iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(q.as_str())),
            None => true,
        })
        .filter(|item| category.map_or(true, |c| item.category() == Some(c)))
        .collect()
}
