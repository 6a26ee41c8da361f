//! End-to-end tests of the sync and search commands against a real
//! repository and an in-memory store.

use std::path::Path;
use std::sync::Arc;

use git2::{Repository, Signature};
use tempfile::TempDir;

use gitsync_cli::{build_request, sync_repository, SearchArgs, SyncArgs, TargetArg};
use gitsync_search::{DocumentStore, MemoryDocumentStore, SearchService};
use gitsync_types::{SearchOrder, Settings};

const INDEX: &str = "gitsync-repository";

fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> String {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full = workdir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Job van der Voort", "job@gitlab.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}

fn settings_for(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.repository.path = Some(dir.path().to_string_lossy().to_string());
    settings.repository.id = Some("1".to_string());
    settings.indexing.initial_backoff_ms = 1;
    settings
}

fn search_args(query: &str, target: TargetArg) -> SearchArgs {
    SearchArgs {
        query: query.to_string(),
        target,
        page: 1,
        per_page: None,
        repository_ids: Vec::new(),
        languages: Vec::new(),
        order: SearchOrder::Default,
        highlight: false,
        pre_tag: "<em>".to_string(),
        post_tag: "</em>".to_string(),
        json: false,
    }
}

#[tokio::test]
async fn test_sync_then_search() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_files(
        &repo,
        &[
            ("lib/project.rb", "def project_name_regex\n  /\\A[a-z]+\\z/\nend\n"),
            ("README.md", "# Sample\n"),
        ],
        "Initial commit",
    );

    let settings = settings_for(&dir);
    let store = Arc::new(MemoryDocumentStore::new());
    let report = sync_repository(&settings, &SyncArgs::default(), store.clone())
        .await
        .unwrap();

    assert_eq!(report.commits_indexed, 1);
    assert_eq!(report.blobs_indexed, 2);
    assert_eq!(report.failed, 0);
    assert!(store.get(INDEX, "1_lib/project.rb").is_some());

    let service = SearchService::from_settings(store.clone(), &settings);

    let request = build_request(&settings, &search_args("Initial", TargetArg::Commits));
    let results = service.search_commits(&request).await.unwrap();
    assert_eq!(results.total_count, 1);

    let request = build_request(
        &settings,
        &search_args("def project_name_regex", TargetArg::Blobs),
    );
    let results = service.search_blobs(&request).await.unwrap();
    assert_eq!(results.total_count, 1);
}

#[tokio::test]
async fn test_incremental_sync_deletes_removed_file() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let first = commit_files(
        &repo,
        &[("a.txt", "alpha\n"), ("b.txt", "beta\n")],
        "Add files",
    );

    let settings = settings_for(&dir);
    let store = Arc::new(MemoryDocumentStore::new());
    sync_repository(&settings, &SyncArgs::default(), store.clone())
        .await
        .unwrap();
    assert_eq!(store.ids(INDEX).len(), 3);

    let mut index = repo.index().unwrap();
    index.remove_path(Path::new("b.txt")).unwrap();
    std::fs::remove_file(dir.path().join("b.txt")).unwrap();
    index.write().unwrap();
    let second = commit_files(&repo, &[("a.txt", "alpha two\n")], "Drop b");

    let args = SyncArgs {
        from: Some(first),
        to: Some(second.clone()),
        ..Default::default()
    };
    let report = sync_repository(&settings, &args, store.clone())
        .await
        .unwrap();

    assert_eq!(report.blobs_indexed, 1);
    assert_eq!(report.blobs_deleted, 1);
    assert_eq!(report.commits_indexed, 1);
    assert!(store.get(INDEX, "1_b.txt").is_none());
    let body = store.get(INDEX, "1_a.txt").unwrap();
    assert_eq!(body["blob"]["content"], "alpha two\n");
    assert_eq!(body["blob"]["commit_sha"], second.as_str());
}

#[tokio::test]
async fn test_sync_requires_repository_path() {
    let store = Arc::new(MemoryDocumentStore::new());
    let result = sync_repository(&Settings::default(), &SyncArgs::default(), store.clone()).await;

    assert!(result.is_err());
    assert!(!store.index_exists(INDEX).await.unwrap());
}

#[tokio::test]
async fn test_invalid_revision_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_files(&repo, &[("a.txt", "alpha\n")], "Add a");

    let store = Arc::new(MemoryDocumentStore::new());
    let args = SyncArgs {
        from: Some("nope".to_string()),
        ..Default::default()
    };
    let result = sync_repository(&settings_for(&dir), &args, store.clone()).await;

    assert!(result.is_err());
    assert!(!store.index_exists(INDEX).await.unwrap());
}

#[tokio::test]
async fn test_deleted_ref_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_files(&repo, &[("a.txt", "alpha\n")], "Add a");

    let store = Arc::new(MemoryDocumentStore::new());
    let args = SyncArgs {
        to: Some("0".repeat(40)),
        ..Default::default()
    };
    let report = sync_repository(&settings_for(&dir), &args, store.clone())
        .await
        .unwrap();

    assert_eq!(report.processed(), 0);
    assert!(!store.index_exists(INDEX).await.unwrap());
}

#[tokio::test]
async fn test_commits_only() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_files(&repo, &[("a.txt", "alpha\n")], "Add a");

    let store = Arc::new(MemoryDocumentStore::new());
    let args = SyncArgs {
        commits_only: true,
        ..Default::default()
    };
    let report = sync_repository(&settings_for(&dir), &args, store.clone())
        .await
        .unwrap();

    assert_eq!(report.commits_indexed, 1);
    assert_eq!(report.blobs_indexed, 0);
    assert!(store.get(INDEX, "1_a.txt").is_none());
}
