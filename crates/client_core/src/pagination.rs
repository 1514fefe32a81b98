use std::ops::Range;

use shared::domain::MediaItem;

use crate::error::ViewError;

pub const WISHES_PAGE_SIZE: usize = 8;
pub const GRID_PAGE_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page_index: usize,
    len: usize,
}

/// Summary line data: "page `page` of `total_pages` (`item_count` items)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub item_count: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Result<Self, ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize);
        }
        Ok(Self {
            page_size,
            page_index: 0,
            len: 0,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn total_pages(&self) -> usize {
        self.len.div_ceil(self.page_size)
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        let last = self.total_pages().saturating_sub(1);
        if self.page_index > last {
            self.page_index = last;
        }
    }

    pub fn page_range(&self) -> Range<usize> {
        let start = (self.page_index * self.page_size).min(self.len);
        let end = (start + self.page_size).min(self.len);
        start..end
    }

    pub fn visible<'a>(&self, items: &'a [MediaItem]) -> &'a [MediaItem] {
        let range = self.page_range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page_index > 0
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page_index += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page_index -= 1;
        true
    }

    pub fn go_to(&mut self, page: usize) -> Result<(), ViewError> {
        let total_pages = self.total_pages();
        if page >= total_pages {
            return Err(ViewError::PageOutOfRange { page, total_pages });
        }
        self.page_index = page;
        Ok(())
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.page_index + 1,
            total_pages: self.total_pages(),
            item_count: self.len,
        }
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
