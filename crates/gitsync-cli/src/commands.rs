//! Command implementations for the gitsync binary.
//!
//! Handles:
//! - sync: resolve a revision range and index it
//! - search: run a blob and/or commit query
//! - init-index: create the index with its mappings
//! - config: print the effective settings

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use gitsync_indexing::{SyncEngine, SyncReport};
use gitsync_search::{
    DocumentStore, HttpDocumentStore, IndexedDocument, SearchResults, SearchService,
};
use gitsync_types::{HighlightOptions, SearchRequest, Settings};

use crate::cli::{SearchArgs, SyncArgs};

/// Load settings and apply the global CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn open_store(settings: &Settings, dry_run: bool) -> Result<Arc<dyn DocumentStore>> {
    if dry_run {
        return dry_run_store();
    }
    let store = HttpDocumentStore::from_settings(&settings.store)
        .with_context(|| format!("Failed to create store client for {}", settings.store.url))?;
    Ok(Arc::new(store))
}

#[cfg(feature = "dry-run")]
fn dry_run_store() -> Result<Arc<dyn DocumentStore>> {
    info!("Dry run, writing to an in-memory store");
    Ok(Arc::new(gitsync_search::MemoryDocumentStore::new()))
}

#[cfg(not(feature = "dry-run"))]
fn dry_run_store() -> Result<Arc<dyn DocumentStore>> {
    anyhow::bail!("--dry-run requires the dry-run feature")
}

/// Synchronize the configured repository into `store`.
pub async fn sync_repository(
    settings: &Settings,
    args: &SyncArgs,
    store: Arc<dyn DocumentStore>,
) -> Result<SyncReport> {
    let mut settings = settings.clone();
    if let Some(repo) = &args.repo {
        settings.repository.path = Some(repo.clone());
    }
    if let Some(id) = &args.repo_id {
        settings.repository.id = Some(id.clone());
    }

    // Validate configuration and revisions before touching the store
    let engine = SyncEngine::open(&settings, store.clone()).context("Failed to open repository")?;
    let Some(range) = engine
        .resolve(args.from.as_deref(), args.to.as_deref())
        .context("Invalid revision range")?
    else {
        info!("Ref deleted, nothing to synchronize");
        return Ok(SyncReport::new());
    };

    let service = SearchService::from_settings(store, &settings);
    if service
        .ensure_index(false)
        .await
        .context("Failed to prepare index")?
    {
        info!(index = %service.index_name(), "Created index");
    }

    let result = if args.blobs_only {
        engine.index_blobs_range(&range).await
    } else if args.commits_only {
        engine.index_commits_range(&range).await
    } else {
        engine.synchronize_range(&range).await
    };
    let report = result.context("Synchronization failed")?;

    if let Err(e) = service.refresh().await {
        warn!(error = %e, "Index refresh failed");
    }
    Ok(report)
}

pub async fn run_sync(settings: &Settings, args: SyncArgs) -> Result<()> {
    let store = open_store(settings, args.dry_run)?;
    let report = sync_repository(settings, &args, store).await?;
    print!("{}", format_report(&report));
    if report.has_failures() {
        warn!(failed = report.failed, "Some documents could not be written");
    }
    Ok(())
}

pub fn format_report(report: &SyncReport) -> String {
    format!(
        "Commits indexed: {}\nBlobs indexed:   {}\nBlobs deleted:   {}\nSkipped:         {}\nFailed:          {}\n",
        report.commits_indexed,
        report.blobs_indexed,
        report.blobs_deleted,
        report.skipped,
        report.failed
    )
}

/// Turn search arguments into a request. Without an explicit repository
/// filter the search is scoped to the configured repository, if any.
pub fn build_request(settings: &Settings, args: &SearchArgs) -> SearchRequest {
    let per_page = args.per_page.unwrap_or(settings.search.per_page);
    let mut request = SearchRequest::new(args.query.clone(), args.target.into())
        .with_page(args.page, per_page)
        .with_order(args.order);
    for id in &args.repository_ids {
        request = request.with_repository(id.clone());
    }
    for language in &args.languages {
        request = request.with_language(language.clone());
    }
    if args.highlight {
        request = request.with_highlight(HighlightOptions::new(&args.pre_tag, &args.post_tag));
    }
    if let Ok(id) = settings.repository_id() {
        request = request.scoped_to(id);
    }
    request
}

pub async fn run_search(settings: &Settings, args: SearchArgs) -> Result<()> {
    let store = open_store(settings, false)?;
    let service = SearchService::from_settings(store, settings);
    let request = build_request(settings, &args);

    let response = service.query(&request).await.context("Search failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    if let Some(commits) = &response.commits {
        print!("{}", format_results("Commits", commits));
    }
    if let Some(blobs) = &response.blobs {
        print!("{}", format_results("Blobs", blobs));
    }
    Ok(())
}

pub fn format_results(title: &str, results: &SearchResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} total)", title, results.total_count);

    for hit in &results.hits {
        let score = hit
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        match &hit.document {
            IndexedDocument::Commit(commit) => {
                let summary = commit.message.lines().next().unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  [{}] {} {} ({} <{}>)",
                    score, commit.sha, summary, commit.author.name, commit.author.email
                );
            }
            IndexedDocument::Blob(blob) => {
                let _ = writeln!(
                    out,
                    "  [{}] {}:{} ({})",
                    score, blob.rid, blob.path, blob.language
                );
            }
        }
        for fragment in &hit.highlight {
            let _ = writeln!(out, "      {}", fragment);
        }
    }

    if !results.facets.languages.is_empty() {
        let _ = writeln!(out, "  Languages:");
        for bucket in &results.facets.languages {
            let _ = writeln!(out, "    {}: {}", bucket.key, bucket.count);
        }
    }
    if !results.facets.repositories.is_empty() {
        let _ = writeln!(out, "  Repositories:");
        for bucket in &results.facets.repositories {
            let _ = writeln!(out, "    {}: {}", bucket.key, bucket.count);
        }
    }
    out
}

pub async fn run_init_index(settings: &Settings, force: bool) -> Result<()> {
    let store = open_store(settings, false)?;
    let service = SearchService::from_settings(store, settings);
    let created = service
        .ensure_index(force)
        .await
        .with_context(|| format!("Failed to create index {}", service.index_name()))?;

    if created {
        println!("Created index {}", service.index_name());
    } else {
        println!("Index {} already exists", service.index_name());
    }
    Ok(())
}

pub fn show_config(settings: &Settings) -> Result<()> {
    let rendered = toml::to_string_pretty(settings).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
