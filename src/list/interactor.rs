use std::sync::Arc;

use serde_json::Value;

use crate::error::ScreenletError;
use crate::interactor::Interactor;
use crate::operation::{CacheStrategy, Command, OperationRequest};

use super::pagination::{merge_page, PageResult, PaginationSettings, RowConverter};

/// Server-side collection a list screenlet pages through.
pub trait ListSource: RowConverter + Send + Sync + 'static {
    /// Commands fetching rows `start..end`. With `compute_row_count` a
    /// second command returning the total count follows.
    fn page_commands(&self, start: usize, end: usize, compute_row_count: bool) -> Vec<Command>;
}

/// Load one page of a [`ListSource`].
pub struct PageLoadInteractor<S: ListSource> {
    source: Arc<S>,
    page: usize,
    pagination: PaginationSettings,
    compute_row_count: bool,
    strategy: CacheStrategy,
    raw_rows: Vec<Value>,
    server_row_count: Option<usize>,
    pub result_row_count: Option<usize>,
    pub result_page_content: Option<Vec<S::Row>>,
    pub result_all_pages_content: Option<Vec<Option<S::Row>>>,
}

impl<S: ListSource> PageLoadInteractor<S> {
    pub fn new(
        source: Arc<S>,
        page: usize,
        pagination: PaginationSettings,
        compute_row_count: bool,
        strategy: CacheStrategy,
    ) -> Self {
        Self {
            source,
            page,
            pagination,
            compute_row_count,
            strategy,
            raw_rows: Vec::new(),
            server_row_count: None,
            result_row_count: None,
            result_page_content: None,
            result_all_pages_content: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Merge the loaded page into `current` and fill the result fields.
    pub fn merge(&mut self, current: &[Option<S::Row>]) -> PageResult<S::Row> {
        // Out-of-range pages are rejected before any operation is sent.
        let offset = self.pagination.first_row_for_page(self.page).unwrap_or(usize::MAX);
        let result = merge_page(
            current,
            &self.raw_rows,
            self.server_row_count,
            self.page,
            offset,
            self.source.as_ref(),
        );
        self.result_row_count = Some(result.row_count);
        self.result_page_content = Some(result.page_rows.clone());
        self.result_all_pages_content = Some(result.all_rows.clone());
        result
    }
}

fn rows_of(value: Value) -> Result<Vec<Value>, ScreenletError> {
    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err(ScreenletError::shape("Page rows must be an array")),
    }
}

impl<S: ListSource> Interactor for PageLoadInteractor<S> {
    fn action_name(&self) -> &'static str {
        super::LOAD_PAGE_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        self.strategy
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        let (Some(start), Some(end)) = (
            self.pagination.first_row_for_page(self.page),
            self.pagination.last_row_for_page(self.page),
        ) else {
            return Err(ScreenletError::InvalidInput(format!(
                "Page {} is out of range",
                self.page
            )));
        };
        if start >= end {
            return Err(ScreenletError::InvalidInput("Page size cannot be 0".into()));
        }
        Ok(OperationRequest::read(
            self.source.page_commands(start, end, self.compute_row_count),
        ))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        let (rows, count) = if self.compute_row_count {
            let Value::Array(mut results) = payload else {
                return Err(ScreenletError::shape("Expected rows and count"));
            };
            if results.len() != 2 {
                return Err(ScreenletError::shape("Expected rows and count"));
            }
            let count = results.pop().and_then(|count| count.as_u64()).ok_or_else(|| {
                ScreenletError::shape("Row count must be a number")
            })?;
            let rows = rows_of(results.pop().unwrap_or(Value::Null))?;
            (rows, Some(count as usize))
        } else {
            (rows_of(payload)?, None)
        };

        self.raw_rows = rows;
        self.server_row_count = count;
        Ok(())
    }
}
