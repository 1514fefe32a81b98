use serde::{Deserialize, Serialize};

use crate::domain::{Category, MediaItem};

pub const COLLECTIONS_ROUTE: &str = "/collections";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionQuery {
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub items: Vec<MediaItem>,
    pub count: usize,
    pub category: Category,
}

impl CollectionResponse {
    pub fn new(category: Category, items: Vec<MediaItem>) -> Self {
        Self {
            count: items.len(),
            items,
            category,
        }
    }
}
