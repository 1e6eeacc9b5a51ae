use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::api::{Comment, CommentPage, CommentQuery, Pagination, SortMode};
use crate::data::{CommentService, LikeStore};
use crate::options::Options as ReaderOptions;
use crate::view::{ItemActions, LoggingActions, Snapshot, Viewport};

pub const DEFAULT_SORT_REFETCH_DELAY: Duration = Duration::from_millis(266);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read comment likes")]
    StorageRead(#[source] anyhow::Error),
    #[error("persist comment likes")]
    StorageWrite(#[source] anyhow::Error),
    #[error("fetch comments page {page}")]
    Fetch {
        page: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("timed out after {0:?} waiting for comments")]
    Timeout(Duration),
}

pub struct Options {
    pub service: Arc<dyn CommentService>,
    pub like_store: Arc<dyn LikeStore>,
    pub reader: ReaderOptions,
    pub sort: SortMode,
    pub sort_refetch_delay: Duration,
    pub actions: Arc<dyn ItemActions>,
}

impl Options {
    pub fn new(service: Arc<dyn CommentService>, like_store: Arc<dyn LikeStore>) -> Self {
        Self {
            service,
            like_store,
            reader: ReaderOptions::default(),
            sort: SortMode::default(),
            sort_refetch_delay: DEFAULT_SORT_REFETCH_DELAY,
            actions: Arc::new(LoggingActions),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LoadMode {
    Replace,
    Append,
}

struct PendingFetch {
    request_id: u64,
    page: u32,
    mode: LoadMode,
    cancel_flag: Arc<AtomicBool>,
}

struct FetchResponse {
    request_id: u64,
    page: u32,
    result: anyhow::Result<CommentPage>,
}

type Subscriber = Box<dyn Fn(&Snapshot) + Send>;

pub struct Controller {
    service: Arc<dyn CommentService>,
    like_store: Arc<dyn LikeStore>,
    actions: Arc<dyn ItemActions>,
    reader: ReaderOptions,
    sort_refetch_delay: Duration,
    post_id: Option<i64>,
    sort: SortMode,
    // Sort mode the displayed comments were fetched with.
    list_sort: SortMode,
    comments: Arc<Vec<Comment>>,
    comment_ids: HashSet<i64>,
    pagination: Option<Pagination>,
    liked: Arc<HashSet<i64>>,
    viewport: Option<Box<dyn Viewport>>,
    subscribers: Vec<Subscriber>,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
    next_request_id: u64,
    pending: Option<PendingFetch>,
}

impl Controller {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            service: opts.service,
            like_store: opts.like_store,
            actions: opts.actions,
            reader: opts.reader,
            sort_refetch_delay: opts.sort_refetch_delay,
            post_id: None,
            sort: opts.sort,
            list_sort: opts.sort,
            comments: Arc::new(Vec::new()),
            comment_ids: HashSet::new(),
            pagination: None,
            liked: Arc::new(HashSet::new()),
            viewport: None,
            subscribers: Vec::new(),
            response_tx,
            response_rx,
            next_request_id: 1,
            pending: None,
        }
    }

    pub fn initialize(&mut self, post_id: i64) -> u64 {
        self.post_id = Some(post_id);
        self.comments = Arc::new(Vec::new());
        self.comment_ids.clear();
        self.pagination = None;
        self.list_sort = self.sort;

        match self.like_store.load_comment_likes() {
            Ok(likes) => self.liked = Arc::new(likes),
            Err(err) => {
                let err = Error::StorageRead(err);
                tracing::warn!(error = ?err, "get local comment likes failed");
                self.liked = Arc::new(HashSet::new());
            }
        }

        self.start_fetch(post_id, 1, Duration::ZERO)
    }

    pub fn fetch_page(&mut self, page: u32) -> Option<u64> {
        let post_id = self.post_id?;
        Some(self.start_fetch(post_id, page.max(1), Duration::ZERO))
    }

    pub fn refresh(&mut self) -> Option<u64> {
        self.fetch_page(1)
    }

    pub fn load_more(&mut self) -> Option<u64> {
        if self.is_loading() || self.is_no_more_data() {
            return None;
        }
        let pagination = self.pagination?;
        if self.list_sort != self.sort {
            // The re-fetch after a sort change failed; start over instead of
            // appending pages of one order to a list of the other.
            return self.fetch_page(1);
        }
        self.fetch_page(pagination.current_page + 1)
    }

    pub fn toggle_sort_mode(&mut self) -> Option<u64> {
        let post_id = self.post_id?;
        if self.pagination.is_some_and(|p| p.total > 0) {
            if let Some(viewport) = self.viewport.as_mut() {
                viewport.scroll_to_top();
            }
        }
        self.sort = self.sort.toggled();
        Some(self.start_fetch(post_id, 1, self.sort_refetch_delay))
    }

    pub fn is_liked(&self, comment_id: i64) -> bool {
        self.liked.contains(&comment_id)
    }

    /// Marks a comment liked and persists the whole set. Returns `false`
    /// when it was already liked. A failed write is rolled back so the like
    /// can be retried.
    pub fn like_comment(&mut self, comment_id: i64) -> Result<bool, Error> {
        if self.liked.contains(&comment_id) {
            return Ok(false);
        }
        Arc::make_mut(&mut self.liked).insert(comment_id);
        self.notify();
        if let Err(err) = self.like_store.save_comment_likes(&self.liked) {
            Arc::make_mut(&mut self.liked).remove(&comment_id);
            self.notify();
            return Err(Error::StorageWrite(err));
        }
        Ok(true)
    }

    pub fn press_reply(&self, index: usize) -> bool {
        match self.comments.get(index) {
            Some(comment) => {
                self.actions.on_reply(comment);
                true
            }
            None => false,
        }
    }

    pub fn press_author(&self, index: usize) -> bool {
        match self.comments.get(index) {
            Some(comment) => {
                self.actions.on_press_author(&comment.author);
                true
            }
            None => false,
        }
    }

    pub fn press_like(&mut self, index: usize) -> Result<bool, Error> {
        let Some(comment) = self.comments.get(index) else {
            return Ok(false);
        };
        self.actions.on_like(comment);
        let id = comment.id;
        self.like_comment(id)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_no_more_data(&self) -> bool {
        self.pagination.is_some_and(|p| p.is_last_page())
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn post_id(&self) -> Option<i64> {
        self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn reader_options(&self) -> ReaderOptions {
        self.reader
    }

    pub fn set_reader_options(&mut self, reader: ReaderOptions) {
        if self.reader != reader {
            self.reader = reader;
            self.notify();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            comments: self.comments.clone(),
            pagination: self.pagination,
            loading: self.is_loading(),
            sort: self.sort,
            liked: self.liked.clone(),
            options: self.reader,
        }
    }

    pub fn bind_viewport(&mut self, viewport: Box<dyn Viewport>) {
        self.viewport = Some(viewport);
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: Fn(&Snapshot) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Applies finished fetches without blocking. Returns whether the state
    /// changed, or the error of a failed fetch.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let mut changed = false;
        let mut failure = None;
        while let Ok(response) = self.response_rx.try_recv() {
            match self.handle_response(response) {
                Ok(applied) => changed |= applied,
                Err(err) => {
                    changed = true;
                    failure.get_or_insert(err);
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }

    /// Blocks until no fetch is pending. Returns the first fetch error seen.
    pub fn wait_idle(&mut self, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        let mut failure = None;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let response = self
                .response_rx
                .recv_timeout(remaining)
                .map_err(|_| Error::Timeout(timeout))?;
            if let Err(err) = self.handle_response(response) {
                failure.get_or_insert(err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start_fetch(&mut self, post_id: i64, page: u32, delay: Duration) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let mode = if page == 1 {
            LoadMode::Replace
        } else {
            LoadMode::Append
        };
        let query = CommentQuery::new(post_id, self.sort, page);

        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending = Some(PendingFetch {
            request_id,
            page,
            mode,
            cancel_flag: cancel_flag.clone(),
        });
        tracing::debug!(
            request_id,
            post_id,
            page,
            sort = query.sort.as_str(),
            "request comments"
        );
        self.notify();

        let tx = self.response_tx.clone();
        let service = self.service.clone();
        thread::spawn(move || {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let result = service.list_comments(&query);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(FetchResponse {
                request_id,
                page,
                result,
            });
        });

        request_id
    }

    fn handle_response(&mut self, response: FetchResponse) -> Result<bool, Error> {
        let Some(pending) = &self.pending else {
            tracing::debug!(request_id = response.request_id, "dropping stale comments");
            return Ok(false);
        };
        if pending.request_id != response.request_id {
            tracing::debug!(request_id = response.request_id, "dropping stale comments");
            return Ok(false);
        }
        let mode = pending.mode;
        let page = pending.page;
        self.pending = None;

        match response.result {
            Ok(result) => {
                self.apply_page(result, mode);
                self.notify();
                Ok(true)
            }
            Err(source) => {
                tracing::warn!(page = response.page, error = ?source, "fetch comment list failed");
                self.notify();
                Err(Error::Fetch { page, source })
            }
        }
    }

    fn apply_page(&mut self, result: CommentPage, mode: LoadMode) {
        let CommentPage { data, pagination } = result;
        if mode == LoadMode::Replace {
            self.comment_ids.clear();
            self.list_sort = self.sort;
            let mut comments = Vec::with_capacity(data.len());
            for comment in data {
                if self.comment_ids.insert(comment.id) {
                    comments.push(comment);
                }
            }
            self.comments = Arc::new(comments);
        } else {
            let comments = Arc::make_mut(&mut self.comments);
            for comment in data {
                if self.comment_ids.insert(comment.id) {
                    comments.push(comment);
                }
            }
        }
        self.pagination = Some(pagination);
    }

    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for subscriber in &self.subscribers {
            subscriber(&snapshot);
        }
    }
}
