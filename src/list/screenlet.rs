use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ScreenletError;
use crate::interactor::{Completion, InteractorRunner, Resolved};
use crate::operation::CacheStrategy;
use crate::screenlet::{ActionSender, Coordinated, HeadlessView, ScreenletCore, ScreenletView};

use super::delegate::ListScreenletDelegate;
use super::interactor::{ListSource, PageLoadInteractor};
use super::pagination::PaginationSettings;
use super::LOAD_PAGE_ACTION;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListSettings {
    pub pagination: PaginationSettings,
    pub cache_strategy: CacheStrategy,
    pub auto_load: bool,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ListSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pagination: PaginationSettings::new(config.list.first_page_size, config.list.page_size),
            cache_strategy: config.cache.strategy(),
            auto_load: true,
        }
    }
}

pub enum ListMessage<S: ListSource> {
    PageLoaded(Completion<PageLoadInteractor<S>>),
}

/// Headless paginated list over a [`ListSource`].
pub struct ListScreenlet<S: ListSource> {
    core: ScreenletCore<ListMessage<S>>,
    source: Arc<S>,
    settings: ListSettings,
    rows: Vec<Option<S::Row>>,
    loading: HashSet<usize>,
    delegate: Option<Box<dyn ListScreenletDelegate<S::Row>>>,
    view: Box<dyn ScreenletView>,
}

impl<S: ListSource> ListScreenlet<S> {
    pub fn new(runner: InteractorRunner, source: S, settings: ListSettings) -> Self {
        Self {
            core: ScreenletCore::new(runner, settings.cache_strategy),
            source: Arc::new(source),
            settings,
            rows: Vec::new(),
            loading: HashSet::new(),
            delegate: None,
            view: Box::new(HeadlessView),
        }
    }

    pub fn with_delegate(mut self, delegate: impl ListScreenletDelegate<S::Row> + 'static) -> Self {
        self.delegate = Some(Box::new(delegate));
        self
    }

    pub fn with_view(mut self, view: impl ScreenletView + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &ListSettings {
        &self.settings
    }

    /// Every known row slot; `None` for rows not loaded yet.
    pub fn rows(&self) -> &[Option<S::Row>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&S::Row> {
        self.rows.get(index)?.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_loading(&self, page: usize) -> bool {
        self.loading.contains(&page)
    }

    pub fn cancel_all(&self) -> usize {
        self.core.cancel_all()
    }

    pub fn on_show(&mut self) -> bool {
        self.settings.auto_load && self.load_page(0)
    }

    /// Load `page`. Returns false if it is already loading.
    pub fn load_page(&mut self, page: usize) -> bool {
        self.perform_action(LOAD_PAGE_ACTION, Some(ActionSender::Page(page)))
    }

    /// Load the page holding `row`.
    pub fn load_page_for_row(&mut self, row: usize) -> bool {
        let page = self.settings.pagination.page_for_row(row);
        self.load_page(page)
    }

    pub fn perform_action(&mut self, name: &str, sender: Option<ActionSender>) -> bool {
        let Some(interactor) = self.create_interactor(name, sender.as_ref()) else {
            tracing::debug!(action = name, "No interactor for action");
            return false;
        };

        let page = interactor.page();
        match self.core.start(interactor, ListMessage::PageLoaded) {
            Ok(_) => {
                self.loading.insert(page);
                true
            }
            Err(rejected) => {
                self.on_page_failure(page, rejected.error);
                false
            }
        }
    }

    pub fn create_interactor(
        &self,
        name: &str,
        sender: Option<&ActionSender>,
    ) -> Option<PageLoadInteractor<S>> {
        match (name, sender) {
            (LOAD_PAGE_ACTION, Some(&ActionSender::Page(page))) => {
                if self.loading.contains(&page) {
                    return None;
                }
                let compute_row_count = page == 0 || self.rows.is_empty();
                Some(PageLoadInteractor::new(
                    Arc::clone(&self.source),
                    page,
                    self.settings.pagination,
                    compute_row_count,
                    self.core.cache_strategy(),
                ))
            }
            _ => None,
        }
    }

    fn on_page_loaded(&mut self, mut interactor: PageLoadInteractor<S>) {
        let result = interactor.merge(&self.rows);
        tracing::info!(
            page = result.page,
            rows = result.page_rows.len(),
            row_count = result.row_count,
            "Page loaded"
        );
        self.rows = result.all_rows;
        self.view.refresh();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_page_loaded(result.page, &result.page_rows, result.row_count);
        }
    }

    fn on_page_failure(&mut self, page: usize, error: ScreenletError) {
        tracing::warn!(page, error = %error, "Page load failed");
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_page_error(page, &error);
        }
    }
}

impl<S: ListSource> Coordinated for ListScreenlet<S> {
    type Message = ListMessage<S>;

    fn core_mut(&mut self) -> &mut ScreenletCore<ListMessage<S>> {
        &mut self.core
    }

    fn handle(&mut self, message: ListMessage<S>) {
        let ListMessage::PageLoaded(completion) = message;
        self.core.finished(completion.id());
        let page = completion.interactor().page();
        self.loading.remove(&page);

        match completion.resolve() {
            Resolved::Success(interactor) => self.on_page_loaded(interactor),
            Resolved::Failure { error, .. } => self.on_page_failure(page, error),
        }
    }
}
