//! Snapshot workflows driven through the console

use crate::common::TestTree;
use cli_lib::Output;

#[tokio::test]
async fn test_store_then_restore_brings_back_file() {
    let tree = TestTree::new();

    tree.edit("notes.txt", "hello").await;
    let stored_clock = tree.clock("notes.txt");
    assert_eq!(tree.console("store demo\n").await, Output::Silent);

    tree.edit("notes.txt", "hello world").await;
    assert_eq!(tree.records("notes.txt"), 2);

    assert_eq!(tree.console("restore demo\n").await, Output::Silent);
    assert_eq!(tree.read("notes.txt"), "hello");
    assert_eq!(tree.clock("notes.txt"), stored_clock);
    assert_eq!(tree.records("notes.txt"), 1);
}

#[tokio::test]
async fn test_merge_of_older_snapshot_keeps_newer_edit() {
    let tree = TestTree::new();

    tree.edit("notes.txt", "hello").await;
    tree.console("store demo\n").await;
    tree.edit("notes.txt", "hello world").await;

    assert_eq!(tree.console("merge demo\n").await, Output::Silent);
    assert_eq!(tree.read("notes.txt"), "hello world");
    // Everything in the snapshot was already known
    assert_eq!(tree.records("notes.txt"), 2);
}

#[tokio::test]
async fn test_repeated_merge_appends_nothing() {
    let tree = TestTree::new();

    tree.edit("doc.txt", "v1").await;
    tree.console("store base\n").await;
    tree.edit("doc.txt", "v2").await;
    tree.console("store head\n").await;
    tree.console("restore base\n").await;

    tree.console("merge head\n").await;
    assert_eq!(tree.read("doc.txt"), "v2");
    let after_first = tree.records("doc.txt");

    tree.console("merge head\n").await;
    assert_eq!(tree.records("doc.txt"), after_first);
}

#[tokio::test]
async fn test_snapshot_exchange_between_trees_converges() {
    let left = TestTree::new();
    let right = TestTree::new();

    left.edit("conf.json", r#"{"name": "left", "port": 1}"#).await;
    left.console("store share\n").await;

    // Ship left's snapshot to right, which has never seen the file
    let src = left.root().join(".bz/snapshot/share/conf.json");
    let dst = right.root().join(".bz/snapshot/share/conf.json");
    std::fs::create_dir_all(dst.parent().unwrap()).unwrap();
    std::fs::copy(&src, &dst).unwrap();

    // Right starts tracking the path with its own edit to another key
    right.edit("conf.json", r#"{"name": "left", "port": 1}"#).await;
    right.edit("conf.json", r#"{"name": "left", "port": 2}"#).await;

    right.console("merge share\n").await;
    let merged: serde_json::Value = serde_json::from_str(&right.read("conf.json")).unwrap();
    assert_eq!(merged["port"], 2);
    assert_eq!(merged["name"], "left");
}

#[tokio::test]
async fn test_nested_paths_are_snapshotted() {
    let tree = TestTree::new();

    tree.edit("src/deep/mod.txt", "one").await;
    tree.edit("top.txt", "top").await;
    tree.console("store s\n").await;

    assert!(tree.root().join(".bz/snapshot/s/src/deep/mod.txt").is_file());
    assert!(tree.root().join(".bz/snapshot/s/top.txt").is_file());

    tree.edit("src/deep/mod.txt", "two").await;
    tree.console("restore\n\ts\n").await;
    assert_eq!(tree.read("src/deep/mod.txt"), "one");
}

#[tokio::test]
async fn test_console_errors_are_notation() {
    let tree = TestTree::new();

    assert_eq!(
        tree.console("store\n").await,
        Output::Stderr("error\n\t\\Undefined snapshot name\n".to_string())
    );
    assert_eq!(
        tree.console("restore nope\n").await,
        Output::Stderr("error\n\t\\snapshot not found: nope\n".to_string())
    );
    assert_eq!(
        tree.console("snapshot demo\n").await,
        Output::Stderr("error\n\t\\Unsupported command\n\t\\input#1:1/8\n".to_string())
    );

    // Still usable afterwards
    assert_eq!(tree.console("store ok\n").await, Output::Silent);
}

#[tokio::test]
async fn test_list_shows_stored_names() {
    let tree = TestTree::new();
    assert_eq!(tree.console("list\n").await, Output::Silent);

    tree.edit("a.txt", "a").await;
    tree.console("store one\n").await;
    tree.console("store two\n").await;

    let Output::Stdout(text) = tree.console("list\n").await else {
        panic!("list printed nothing");
    };
    let mut names: Vec<&str> = text.lines().collect();
    names.sort();
    assert_eq!(names, vec!["\\one", "\\two"]);
}
