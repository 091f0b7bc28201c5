//! Paginated list screenlet.

pub mod ddl;
mod delegate;
mod interactor;
mod pagination;
mod screenlet;

pub use ddl::{DdlEntry, DdlListSource};
pub use delegate::ListScreenletDelegate;
pub use interactor::{ListSource, PageLoadInteractor};
pub use pagination::{merge_page, PageResult, PaginationSettings, RowConverter};
pub use screenlet::{ListMessage, ListScreenlet, ListSettings};

pub const LOAD_PAGE_ACTION: &str = "load-page";
