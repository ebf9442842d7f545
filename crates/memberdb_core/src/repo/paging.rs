//! Page requests, sorting and page/slice read models.
//!
//! # Invariants
//! - Page numbers are zero-based.
//! - Page size is always within `1..=PAGE_SIZE_MAX`.
//! - Sort properties map to a closed set of static column names.

use serde::Serialize;

pub const PAGE_SIZE_DEFAULT: u32 = 20;
pub const PAGE_SIZE_MAX: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Member attribute a page can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortProperty {
    Id,
    Username,
    Age,
    CreatedAt,
}

impl SortProperty {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Age => "age",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Order {
    pub property: SortProperty,
    pub direction: Direction,
}

/// Ordered list of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(property: SortProperty, direction: Direction) -> Self {
        Self::unsorted().and(property, direction)
    }

    pub fn and(mut self, property: SortProperty, direction: Direction) -> Self {
        self.orders.push(Order {
            property,
            direction,
        });
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Builds an `ORDER BY` clause. `id ASC` is always appended as the
    /// final tie-breaker so paging never skips or repeats rows.
    pub(crate) fn order_by_clause(&self, table_alias: &str) -> String {
        let mut keys: Vec<String> = self
            .orders
            .iter()
            .map(|order| {
                format!(
                    "{table_alias}.{} {}",
                    order.property.column(),
                    order.direction.sql()
                )
            })
            .collect();
        keys.push(format!("{table_alias}.id ASC"));
        format!(" ORDER BY {}", keys.join(", "))
    }
}

/// Zero-based page coordinates plus sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: Sort,
}

impl PageRequest {
    /// `size` 0 falls back to the default; oversized requests are clamped.
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size: normalize_page_size(size),
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
            sort: self.sort.clone(),
        }
    }
}

/// Normalizes requested page size.
pub fn normalize_page_size(size: u32) -> u32 {
    match size {
        0 => PAGE_SIZE_DEFAULT,
        value if value > PAGE_SIZE_MAX => PAGE_SIZE_MAX,
        value => value,
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page(),
            size: request.size(),
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(u64::from(self.size.max(1)))
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }

    /// Like `map`, but stops at the first failed conversion.
    pub fn try_map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(Page {
            content: self.content.into_iter().map(f).collect::<Result<_, _>>()?,
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        })
    }
}

/// One page of results without a total; only knows whether more follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Builds a slice from a look-ahead fetch of up to `size + 1` rows.
    pub(crate) fn from_lookahead(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let size = request.size() as usize;
        let has_next = rows.len() > size;
        rows.truncate(size);
        Self {
            content: rows,
            number: request.page(),
            size: request.size(),
            has_next,
        }
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    pub fn map<U, F>(self, f: F) -> Slice<U>
    where
        F: FnMut(T) -> U,
    {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            has_next: self.has_next,
        }
    }
}

/// Total row count implied by a fetched page, when no count query is needed.
///
/// Returns `None` when the page is full (or empty past the first page) and
/// only a count query can tell how many rows exist.
pub(crate) fn total_from_content(request: &PageRequest, fetched: usize) -> Option<u64> {
    let fetched = fetched as u64;
    let size = u64::from(request.size());
    let offset = request.offset();
    if fetched >= size {
        return None;
    }
    if offset == 0 || fetched > 0 {
        return Some(offset + fetched);
    }
    None
}
