use crate::error::ScreenletError;

/// List events reported to the host.
pub trait ListScreenletDelegate<R>: Send {
    fn on_page_loaded(&mut self, _page: usize, _rows: &[R], _row_count: usize) {}

    fn on_page_error(&mut self, _page: usize, _error: &ScreenletError) {}
}
