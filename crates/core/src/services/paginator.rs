//! Page-number pagination for post listings.
//!
//! Lookups are lenient: a missing or malformed page number shows the first
//! page and a number past either end shows the last one, so a stale link
//! never produces an error page.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Posts shown per page.
pub const POSTS_ON_PAGE: u64 = 10;

/// Splits a listing of known size into numbered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_ON_PAGE)
    }
}

impl Paginator {
    /// Create a paginator. A zero page size is treated as one.
    #[must_use]
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Items per page.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `total` items. Never less than one.
    #[must_use]
    pub fn num_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page).max(1)
    }

    /// Resolve the raw `page` query value against a listing of `total` items.
    #[must_use]
    pub fn get_page(&self, raw_page: Option<&str>, total: u64) -> PageWindow {
        let num_pages = self.num_pages(total);

        let number = match raw_page.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 && n.unsigned_abs() <= num_pages => n.unsigned_abs(),
                Ok(_) => num_pages,
                // Integers too large for i64 are still out of range.
                Err(_) if is_integer(raw) => num_pages,
                Err(_) => 1,
            },
        };

        PageWindow {
            number,
            num_pages,
            count: total,
            per_page: self.per_page,
        }
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Position of one page inside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages.
    pub num_pages: u64,
    /// Total number of items.
    pub count: u64,
    /// Items per page.
    pub per_page: u64,
}

impl PageWindow {
    /// Items to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    /// Maximum number of items on this page.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.per_page
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Number of the next page, if any.
    #[must_use]
    pub const fn next_page_number(&self) -> Option<u64> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Number of the previous page, if any.
    #[must_use]
    pub const fn previous_page_number(&self) -> Option<u64> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// Attach the fetched items.
    #[must_use]
    pub fn with_items<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            window: self,
        }
    }
}

/// One page of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Where the page sits in the listing.
    pub window: PageWindow,
}

impl<T> Page<T> {
    /// Transform every item, keeping the window.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 8)?;
        state.serialize_field("object_list", &self.items)?;
        state.serialize_field("number", &self.window.number)?;
        state.serialize_field("num_pages", &self.window.num_pages)?;
        state.serialize_field("count", &self.window.count)?;
        state.serialize_field("has_next", &self.window.has_next())?;
        state.serialize_field("has_previous", &self.window.has_previous())?;
        state.serialize_field("next_page_number", &self.window.next_page_number())?;
        state.serialize_field("previous_page_number", &self.window.previous_page_number())?;
        state.end()
    }
}
