//! Page-number pagination over ordered listings.
//!
//! A listing is paged in two steps: [`Paginator::window`] turns the total
//! item count and the raw `page` query value into a [`PageWindow`], the
//! caller fetches exactly that slice, and [`Page::new`] wraps the slice
//! with its navigation metadata.

use serde::Serialize;

use crate::settings::POSTS_PER_PAGE;

/// Splits listings into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

impl Paginator {
    /// A zero page size is treated as one.
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Number of pages needed for `count` items. An empty listing still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.per_page as u64).max(1)
    }

    /// Resolve the requested page number against `count` items.
    ///
    /// Missing or non-numeric values select the first page; numbers outside
    /// `1..=num_pages` select the last one.
    pub fn window(&self, count: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 && (n as u64) <= num_pages => n as u64,
                Ok(_) => num_pages,
                Err(_) => 1,
            },
        };

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * self.per_page as u64,
            limit: self.per_page as u64,
        }
    }

    /// Page an in-memory listing that is already in display order.
    pub fn paginate<T>(&self, items: Vec<T>, requested: Option<&str>) -> Page<T> {
        let window = self.window(items.len() as u64, requested);
        let slice = items
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        Page::new(slice, window)
    }
}

/// The slice of a listing one page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub number: u64,
    pub num_pages: u64,
    /// Total items in the listing.
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

/// One page of a listing plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(object_list: Vec<T>, window: PageWindow) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then_some(window.number - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.object_list.iter()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}
