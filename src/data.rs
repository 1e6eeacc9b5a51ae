use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};

use crate::api::{self, Author, Comment, CommentPage, CommentQuery, Pagination, SortMode};
use crate::storage::{self, StorageKey};

pub trait CommentService: Send + Sync {
    fn list_comments(&self, query: &CommentQuery) -> Result<CommentPage>;
}

pub trait LikeStore: Send + Sync {
    fn load_comment_likes(&self) -> Result<HashSet<i64>>;
    fn save_comment_likes(&self, likes: &HashSet<i64>) -> Result<()>;
}

pub struct HttpCommentService {
    client: Arc<api::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn list_comments(&self, query: &CommentQuery) -> Result<CommentPage> {
        self.client
            .comments(query)
            .with_context(|| format!("fetch comments for post {} page {}", query.post_id, query.page))
    }
}

impl LikeStore for storage::Store {
    fn load_comment_likes(&self) -> Result<HashSet<i64>> {
        let likes: Option<Vec<i64>> = self
            .get(StorageKey::CommentLikes)
            .context("load comment likes")?;
        Ok(likes.unwrap_or_default().into_iter().collect())
    }

    fn save_comment_likes(&self, likes: &HashSet<i64>) -> Result<()> {
        let mut ids: Vec<i64> = likes.iter().copied().collect();
        ids.sort_unstable();
        self.set(StorageKey::CommentLikes, &ids)
            .context("save comment likes")
    }
}

pub struct MockCommentService {
    total: u64,
}

impl MockCommentService {
    pub fn new(total: u64) -> Self {
        Self { total }
    }
}

impl Default for MockCommentService {
    fn default() -> Self {
        Self::new(150)
    }
}

impl CommentService for MockCommentService {
    fn list_comments(&self, query: &CommentQuery) -> Result<CommentPage> {
        let per_page = u64::from(query.per_page.max(1));
        let total_page = self.total.div_ceil(per_page).max(1) as u32;
        let page = query.page.max(1);
        let start = u64::from(page - 1) * per_page;
        let end = (start + per_page).min(self.total);

        let mut ids: Vec<i64> = (1..=self.total as i64).collect();
        if query.sort == SortMode::Recent {
            ids.reverse();
        }
        let data = ids
            .into_iter()
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize)
            .map(|id| mock_comment(query.post_id, id, self.total as i64))
            .collect();

        Ok(CommentPage {
            data,
            pagination: Pagination {
                current_page: page,
                total_page,
                total: self.total,
            },
        })
    }
}

fn mock_comment(post_id: i64, id: i64, total: i64) -> Comment {
    Comment {
        id,
        post_id,
        pid: 0,
        content: format!("Sample comment #{id}. Comments are generated while offline."),
        author: Author {
            name: format!("reader-{}", id % 7),
            site: None,
            email: None,
        },
        likes: total - id,
        agent: None,
        created_at: Utc.timestamp_opt(1_546_300_800 + id * 3_600, 0).single(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_pages_cover_total() {
        let service = MockCommentService::new(150);
        let mut seen = Vec::new();
        for page in 1..=3 {
            let result = service
                .list_comments(&CommentQuery::new(1, SortMode::Hot, page))
                .unwrap();
            assert_eq!(result.pagination.total_page, 3);
            seen.extend(result.data.into_iter().map(|c| c.id));
        }
        assert_eq!(seen.len(), 150);
        assert_eq!(seen.first(), Some(&1));
    }

    #[test]
    fn mock_recent_sort_reverses_order() {
        let service = MockCommentService::new(10);
        let page = service
            .list_comments(&CommentQuery::new(1, SortMode::Recent, 1))
            .unwrap();
        assert_eq!(page.data.first().map(|c| c.id), Some(10));
    }

    #[test]
    fn store_round_trips_likes() {
        let store = storage::Store::open_in_memory().unwrap();
        assert!(store.load_comment_likes().unwrap().is_empty());

        let likes: HashSet<i64> = [9, 5].into_iter().collect();
        store.save_comment_likes(&likes).unwrap();
        assert_eq!(store.load_comment_likes().unwrap(), likes);

        let raw: Option<Vec<i64>> = store.get(StorageKey::CommentLikes).unwrap();
        assert_eq!(raw, Some(vec![5, 9]));
    }
}
