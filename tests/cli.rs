use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn blog_reader(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("blog-reader").expect("binary built");
    cmd.env("BLOG_READER_STORAGE__PATH", dir.join("state.db"))
        .env_remove("BLOG_READER_LOG")
        .arg("--config")
        .arg(dir.join("config.yaml"));
    cmd
}

#[test]
fn prints_version() {
    Command::cargo_bin("blog-reader")
        .expect("binary built")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("blog-reader")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("blog-reader").and(predicate::str::contains("--post")));
}

#[test]
fn missing_post_is_rejected() {
    Command::cargo_bin("blog-reader")
        .expect("binary built")
        .arg("--offline")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--post is required"));
}

#[test]
fn offline_run_loads_requested_pages() {
    let dir = tempdir().unwrap();
    blog_reader(dir.path())
        .args(["--post", "1", "--offline", "--pages", "2", "--lang", "en"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("150 comments  [sort: recent]")
                .and(predicate::str::contains("#150 "))
                .and(predicate::str::contains("#19 "))
                .and(predicate::str::contains("#18 ").not())
                .and(predicate::str::contains("Pull up to load more")),
        );
}

#[test]
fn liked_comments_are_remembered() {
    let dir = tempdir().unwrap();
    blog_reader(dir.path())
        .args(["--post", "1", "--offline", "--hot", "--like", "5", "--lang", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#5 reader-5 ♥"));

    blog_reader(dir.path())
        .args(["--post", "1", "--offline", "--hot"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("#5 reader-5 ♥")
                .and(predicate::str::contains("150 comments"))
                .and(predicate::str::contains("#6 reader-6 ("))
                .and(predicate::str::contains("上拉以加载更多").not()),
        );
}

#[test]
fn config_file_sets_default_sort() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "comments:\n  default_sort: hot\n  sort_refetch_delay: 0s\n",
    )
    .unwrap();

    blog_reader(dir.path())
        .args(["--post", "1", "--offline", "--lang", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains("150 comments  [sort: hot]"));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "comments: [hot]\n").unwrap();

    blog_reader(dir.path())
        .args(["--post", "1", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("load config"));
}
