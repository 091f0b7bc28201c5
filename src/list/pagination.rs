//! Page arithmetic and the merge of a loaded page into the full list.

use serde_json::Value;

/// Turns one raw server row into a list row.
pub trait RowConverter {
    type Row: Clone + Send + 'static;

    fn convert(&self, raw: &Value) -> Self::Row;
}

/// Page sizes of a paginated list. Page 0 may be larger than the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub first_page_size: usize,
    pub page_size: usize,
}

impl PaginationSettings {
    pub fn new(first_page_size: usize, page_size: usize) -> Self {
        Self {
            first_page_size,
            page_size,
        }
    }

    /// First row of `page`, or `None` when it does not fit in `usize`.
    pub fn first_row_for_page(&self, page: usize) -> Option<usize> {
        match page {
            0 => Some(0),
            _ => (page - 1)
                .checked_mul(self.page_size)?
                .checked_add(self.first_page_size),
        }
    }

    /// Exclusive end row of `page`.
    pub fn last_row_for_page(&self, page: usize) -> Option<usize> {
        let size = if page == 0 {
            self.first_page_size
        } else {
            self.page_size
        };
        self.first_row_for_page(page)?.checked_add(size)
    }

    pub fn page_for_row(&self, row: usize) -> usize {
        if row < self.first_page_size || self.page_size == 0 {
            0
        } else {
            ((row - self.first_page_size) / self.page_size).saturating_add(1)
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self::new(50, 25)
    }
}

/// Outcome of merging one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<R> {
    pub page: usize,
    pub row_count: usize,
    pub page_rows: Vec<R>,
    pub all_rows: Vec<Option<R>>,
}

/// Merge `server_rows` of `page` into `current`.
///
/// The total is `server_row_count` when present, else the length of
/// `current`. Rows of `current` are kept by index up to the total. The page
/// is written from `offset`, clamped to the last slot; rows that would land
/// past the end are dropped.
pub fn merge_page<C>(
    current: &[Option<C::Row>],
    server_rows: &[Value],
    server_row_count: Option<usize>,
    page: usize,
    offset: usize,
    converter: &C,
) -> PageResult<C::Row>
where
    C: RowConverter + ?Sized,
{
    let total = server_row_count.unwrap_or(current.len());

    let mut all_rows: Vec<Option<C::Row>> = vec![None; total];
    for (slot, row) in all_rows.iter_mut().zip(current) {
        if row.is_some() {
            slot.clone_from(row);
        }
    }

    let page_rows: Vec<C::Row> = server_rows.iter().map(|raw| converter.convert(raw)).collect();

    if total > 0 {
        let start = offset.min(total - 1);
        if start != offset {
            tracing::debug!(page, offset, total, "Page offset past row count, clamped");
        }
        for (slot, row) in all_rows[start..].iter_mut().zip(&page_rows) {
            *slot = Some(row.clone());
        }
    }

    PageResult {
        page,
        row_count: total,
        page_rows,
        all_rows,
    }
}
