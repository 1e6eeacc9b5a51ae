use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use textwrap::{wrap, Options as WrapOptions};

use crate::api::{self, SortMode};
use crate::config;
use crate::controller::{self, Controller};
use crate::data::{CommentService, HttpCommentService, MockCommentService};
use crate::options::{Language, Options as ReaderOptions};
use crate::storage;
use crate::view::{self, Snapshot};

const RENDER_WIDTH: usize = 80;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub post_id: i64,
    pub hot: bool,
    pub pages: u32,
    pub offline: bool,
    pub like: Vec<i64>,
    pub language: Option<Language>,
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );

    let mut reader = ReaderOptions::load(&store).unwrap_or_else(|err| {
        tracing::warn!(error = ?err, "load reader options failed");
        ReaderOptions::default()
    });
    if let Some(language) = opts.language {
        reader.language = language;
        reader.save(&store).context("save reader options")?;
    }

    let service: Arc<dyn CommentService> = if opts.offline {
        Arc::new(MockCommentService::default())
    } else {
        let client = api::Client::new(api::ClientConfig {
            user_agent: cfg.api.user_agent.clone(),
            base_url: Some(cfg.api.base_url.clone()),
            timeout: Some(cfg.api.timeout),
            http_client: None,
        })
        .context("build api client")?;
        Arc::new(HttpCommentService::new(Arc::new(client)))
    };

    let mut ctl_opts = controller::Options::new(service, store.clone());
    ctl_opts.reader = reader;
    ctl_opts.sort = if opts.hot {
        SortMode::Hot
    } else {
        cfg.comments.default_sort
    };
    ctl_opts.sort_refetch_delay = cfg.comments.sort_refetch_delay;

    let wait = cfg.api.timeout + Duration::from_secs(5);
    let mut ctl = Controller::new(ctl_opts);
    ctl.initialize(opts.post_id);
    ctl.wait_idle(wait)?;

    let mut loaded = 1;
    while loaded < opts.pages.max(1) {
        if ctl.load_more().is_none() {
            break;
        }
        ctl.wait_idle(wait)?;
        loaded += 1;
    }

    for id in &opts.like {
        ctl.like_comment(*id)?;
    }

    print!("{}", render(&ctl.snapshot(), RENDER_WIDTH));
    Ok(())
}

pub fn render(snapshot: &Snapshot, width: usize) -> String {
    let language = snapshot.options.language;
    let mut out = String::new();

    let toolbar = snapshot.toolbar();
    out.push_str(&format!(
        "{}  [sort: {}]\n\n",
        toolbar.label(language),
        toolbar.sort.as_str()
    ));

    if snapshot.is_empty_state() {
        out.push_str(view::empty_label(language));
        out.push('\n');
        return out;
    }

    let body_opts = WrapOptions::new(width.max(20))
        .initial_indent("  ")
        .subsequent_indent("  ");
    for comment in snapshot.comments.iter() {
        let marker = if snapshot.is_liked(comment.id) { " ♥" } else { "" };
        let when = comment
            .created_at
            .map(|ts| format!(" · {}", ts.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        out.push_str(&format!(
            "#{} {}{} ({} likes){}\n",
            comment.id, comment.author.name, marker, comment.likes, when
        ));
        for line in wrap(comment.content.trim(), &body_opts) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    if let Some(footer) = snapshot.footer() {
        out.push_str(footer.label(language));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Author, Comment, Pagination};
    use std::collections::HashSet;

    fn snapshot_with(ids: &[i64], liked: &[i64], current: u32, total_page: u32) -> Snapshot {
        Snapshot {
            comments: Arc::new(
                ids.iter()
                    .map(|&id| Comment {
                        id,
                        post_id: 1,
                        pid: 0,
                        content: format!("body of {id}"),
                        author: Author {
                            name: format!("user{id}"),
                            site: None,
                            email: None,
                        },
                        likes: 2,
                        agent: None,
                        created_at: None,
                    })
                    .collect(),
            ),
            pagination: Some(Pagination {
                current_page: current,
                total_page,
                total: ids.len() as u64,
            }),
            liked: Arc::new(liked.iter().copied().collect::<HashSet<_>>()),
            options: ReaderOptions {
                language: Language::En,
                dark_theme: false,
            },
            ..Snapshot::default()
        }
    }

    #[test]
    fn render_marks_liked_comments() {
        let out = render(&snapshot_with(&[1, 2], &[2], 1, 1), 60);
        assert!(out.starts_with("2 comments  [sort: recent]"));
        assert!(out.contains("#1 user1 (2 likes)"));
        assert!(out.contains("#2 user2 ♥ (2 likes)"));
        assert!(out.contains("  body of 2"));
        assert!(out.trim_end().ends_with("No more comments"));
    }

    #[test]
    fn render_shows_more_available_footer() {
        let out = render(&snapshot_with(&[1], &[], 1, 2), 60);
        assert!(out.trim_end().ends_with("Pull up to load more"));
    }

    #[test]
    fn render_empty_state() {
        let mut snapshot = snapshot_with(&[], &[], 1, 1);
        snapshot.pagination = None;
        let out = render(&snapshot, 60);
        assert!(out.contains("No comments"));
        assert!(out.contains("Nothing here yet"));
    }
}
