use serde::Deserialize;

use forum_types::api::Page;

use crate::error::ApiError;

pub const PAGE_SIZE: usize = 15;
pub const MAX_PAGE_SIZE: usize = 200;

/// `?page=the_end` jumps to the last page.
const LAST_PAGE: &str = "the_end";

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub size: usize,
    pub num_pages: usize,
}

impl PageParams {
    /// Unparseable or zero sizes fall back to the default.
    pub fn size(&self) -> usize {
        self.page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(PAGE_SIZE)
    }

    /// Resolves the requested page against `count` rows. An empty result set
    /// still has one (empty) first page.
    pub fn window(&self, count: usize) -> Result<PageWindow, ApiError> {
        let size = self.size();
        let num_pages = count.div_ceil(size).max(1);

        let number = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(LAST_PAGE) => num_pages,
            Some(raw) => raw.parse::<usize>().map_err(|_| ApiError::InvalidPage)?,
        };
        if number == 0 || number > num_pages {
            return Err(ApiError::InvalidPage);
        }

        Ok(PageWindow {
            number,
            size,
            num_pages,
        })
    }
}

impl PageWindow {
    pub fn limit(&self) -> u32 {
        self.size as u32
    }

    pub fn offset(&self) -> u32 {
        ((self.number - 1) * self.size) as u32
    }

    pub fn into_page<T>(self, count: usize, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: (self.number < self.num_pages).then(|| (self.number + 1) as u32),
            previous: (self.number > 1).then(|| (self.number - 1) as u32),
            results,
        }
    }
}
