//! Listing query parameters and the pure sort/pagination stages.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Product;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Id,
    Title,
    Price,
    Rating,
    Stock,
    Category,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Id,
        SortField::Title,
        SortField::Price,
        SortField::Rating,
        SortField::Stock,
        SortField::Category,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Price => "price",
            SortField::Rating => "rating",
            SortField::Stock => "stock",
            SortField::Category => "category",
        }
    }

    /// Ascending comparison on this field.
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Rating => a.rating.total_cmp(&b.rating),
            SortField::Stock => a.stock.cmp(&b.stock),
            SortField::Category => a.category.cmp(&b.category),
        }
    }
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| QueryError::UnknownSortField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self { SortOrder::Asc => "asc", SortOrder::Desc => "desc" }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self { SortOrder::Asc => ord, SortOrder::Desc => ord.reverse() }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(QueryError::UnknownSortOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("page must be a positive integer, got {0:?}")]
    InvalidPage(String),
    #[error("limit must be a positive integer, got {0:?}")]
    InvalidPageSize(String),
    #[error("unsupported sortBy field {0:?}")]
    UnknownSortField(String),
    #[error("order must be \"asc\" or \"desc\", got {0:?}")]
    UnknownSortOrder(String),
}

/// One listing request, fully parsed. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::Id,
            order: SortOrder::Asc,
            category: None,
            search: None,
        }
    }
}

impl ListingQuery {
    /// Category equality filter; empty strings mean "no filter".
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    /// Trimmed search term; blank terms disable the search stage.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Raw listing parameters as they arrive on a query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    #[serde(alias = "sortOrder")]
    pub order: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListingParams {
    /// Parse into a query. Absent or empty values fall back to defaults;
    /// anything present but malformed is rejected.
    pub fn parse(&self, default_page_size: u32) -> Result<ListingQuery, QueryError> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        let page = match present(&self.page) {
            Some(raw) => positive(&raw).ok_or(QueryError::InvalidPage(raw))?,
            None => 1,
        };
        let page_size = match present(&self.limit) {
            Some(raw) => positive(&raw).ok_or(QueryError::InvalidPageSize(raw))?,
            None => default_page_size.max(1),
        };
        let sort_by = match present(&self.sort_by) { Some(raw) => raw.parse()?, None => SortField::default() };
        let order = match present(&self.order) { Some(raw) => raw.parse()?, None => SortOrder::default() };

        Ok(ListingQuery {
            page,
            page_size,
            sort_by,
            order,
            category: present(&self.category),
            search: present(&self.search),
        })
    }
}

fn positive(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Stable sort: ties keep the incoming (store iteration) order in both directions.
pub fn sort_products(items: &mut [Product], field: SortField, order: SortOrder) {
    items.sort_by(|a, b| order.apply(field.compare(a, b)));
}

/// Pagination arithmetic for one page over `total` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub len: usize,
    pub total_pages: u32,
    pub has_more: bool,
}

pub fn page_window(total: usize, page: u32, page_size: u32) -> PageWindow {
    let size = page_size.max(1) as usize;
    let page = page.max(1);
    let total_pages = total.div_ceil(size);
    let offset = (page as usize - 1).saturating_mul(size);
    let len = total.saturating_sub(offset).min(size);
    PageWindow {
        offset: offset.min(total),
        len,
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        has_more: (page as usize) < total_pages,
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_products: usize,
    pub has_more: bool,
}

impl ListingPage {
    /// Slice an already filtered, sorted and searched result set.
    pub fn from_results(results: Vec<Product>, page: u32, page_size: u32) -> Self {
        let total = results.len();
        let w = page_window(total, page, page_size);
        let products = results.into_iter().skip(w.offset).take(w.len).collect();
        Self {
            products,
            page: page.max(1),
            page_size: page_size.max(1),
            total_pages: w.total_pages,
            total_products: total,
            has_more: w.has_more,
        }
    }
}
