
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{Author, Comment, Pagination, SortMode};
use crate::options::{Language, Options};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    Loading,
    Exhausted,
    MoreAvailable,
}

impl Footer {
    pub fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Footer::Loading, Language::Zh) => "加载中...",
            (Footer::Loading, Language::En) => "Loading...",
            (Footer::Exhausted, Language::Zh) => "没有更多啦",
            (Footer::Exhausted, Language::En) => "No more comments",
            (Footer::MoreAvailable, Language::Zh) => "上拉以加载更多",
            (Footer::MoreAvailable, Language::En) => "Pull up to load more",
        }
    }
}

pub fn empty_label(language: Language) -> &'static str {
    match language {
        Language::Zh => "暂无数据，下拉刷新重试",
        Language::En => "Nothing here yet, pull down to retry",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toolbar {
    pub total: u64,
    pub sort: SortMode,
}

impl Toolbar {
    pub fn label(&self, language: Language) -> String {
        match (self.total, language) {
            (0, Language::Zh) => "暂无评论".to_string(),
            (0, Language::En) => "No comments".to_string(),
            (n, Language::Zh) => format!("{n} 条评论"),
            (1, Language::En) => "1 comment".to_string(),
            (n, Language::En) => format!("{n} comments"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub comments: Arc<Vec<Comment>>,
    pub pagination: Option<Pagination>,
    pub loading: bool,
    pub sort: SortMode,
    pub liked: Arc<HashSet<i64>>,
    pub options: Options,
}

impl Snapshot {
    pub fn is_no_more_data(&self) -> bool {
        self.pagination.is_some_and(|p| p.is_last_page())
    }

    pub fn is_empty_state(&self) -> bool {
        !self.loading && self.comments.is_empty()
    }

    pub fn footer(&self) -> Option<Footer> {
        if self.comments.is_empty() {
            return None;
        }
        if self.loading {
            Some(Footer::Loading)
        } else if self.is_no_more_data() {
            Some(Footer::Exhausted)
        } else {
            Some(Footer::MoreAvailable)
        }
    }

    pub fn is_liked(&self, comment_id: i64) -> bool {
        self.liked.contains(&comment_id)
    }

    pub fn toolbar(&self) -> Toolbar {
        Toolbar {
            total: self.pagination.map(|p| p.total).unwrap_or(0),
            sort: self.sort,
        }
    }

    pub fn item_key(&self, index: usize) -> Option<String> {
        self.comments
            .get(index)
            .map(|comment| format!("index:{index}:sep:{}", comment.id))
    }
}

pub trait Viewport: Send {
    fn scroll_to_top(&mut self);
}

pub trait ItemActions: Send + Sync {
    fn on_reply(&self, comment: &Comment);
    fn on_like(&self, comment: &Comment);
    fn on_press_author(&self, author: &Author);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActions;

impl ItemActions for LoggingActions {
    fn on_reply(&self, comment: &Comment) {
        tracing::info!(comment_id = comment.id, "reply to comment");
    }

    fn on_like(&self, comment: &Comment) {
        tracing::info!(comment_id = comment.id, "like comment");
    }

    fn on_press_author(&self, author: &Author) {
        tracing::info!(author = %author.name, "pressed comment author");
    }
}
