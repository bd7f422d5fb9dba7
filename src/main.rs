//! CLI entry point for the photosync tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::Parser;
use photosync_core::auth::StoredCredential;
use photosync_core::{
    CredentialStore, Database, MediaStore, PhotosClient, RemoteLibrary, StaticTokenSource,
    StoredTokenSource, SyncEngine, TimeRange, TokenSource,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Photosync starting");

    let db = Database::new(&args.dir.join("sync.db")).await?;
    let store = MediaStore::new(db);
    let credentials = CredentialStore::new(store.clone());

    // Token import is a standalone operation
    if let Some(token_file) = &args.import_token {
        let token = tokio::fs::read_to_string(token_file)
            .await
            .with_context(|| format!("reading token file {}", token_file.display()))?;
        credentials
            .save(&StoredCredential::from_access_token(token.trim()))
            .await?;
        info!("access token imported into the state store");
        return Ok(());
    }

    let tokens: Arc<dyn TokenSource> = match &args.access_token {
        Some(token) => StaticTokenSource::shared(token),
        None => Arc::new(StoredTokenSource::new(credentials)),
    };
    let client = Arc::new(PhotosClient::new(tokens));

    // Diagnostic single-item lookup, outside the sync loop
    if let Some(id) = &args.query {
        let meta = client.get_item(id).await?;
        let local = store.get_item(id).await?;
        println!("id:            {}", meta.id);
        println!("filename:      {}", meta.filename);
        println!("creation time: {}", meta.creation_time);
        println!("mime type:     {}", meta.mime_type);
        println!("kind:          {}", meta.kind);
        match local {
            Some(item) => println!("local status:  {}", item.status()),
            None => println!("local status:  not in store"),
        }
        return Ok(());
    }

    let engine = SyncEngine::new(store, client, args.dir.clone());

    if args.resync {
        let vanished = engine.resync().await?;
        info!(vanished, "resync demoted vanished items");
        let stats = engine.download_pending().await?;
        info!(
            downloaded = stats.downloaded,
            failed = stats.failed,
            "re-download complete"
        );
        return Ok(());
    }

    let explicit = explicit_range(args.since, args.until)?;
    // The windowing heuristic only applies without an explicit range
    let heuristic = !args.all && explicit.is_none();

    engine.drive(explicit, heuristic).await?;
    info!("sync complete");
    Ok(())
}

/// Builds an explicit time window from the `--since`/`--until` flags.
///
/// A missing bound defaults to the epoch (start) or to now (end), matching
/// the full-window defaults of the engine.
fn explicit_range(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Option<TimeRange>> {
    if since.is_none() && until.is_none() {
        return Ok(None);
    }

    let start = match since {
        Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
        None => chrono::DateTime::UNIX_EPOCH,
    };
    let end = match until {
        Some(date) => date
            .and_hms_opt(23, 59, 59)
            .context("invalid --until date")?
            .and_utc(),
        None => Utc::now(),
    };

    Ok(Some(TimeRange::new(start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_range_none_when_no_flags() {
        assert!(explicit_range(None, None).unwrap().is_none());
    }

    #[test]
    fn test_explicit_range_since_only_ends_now() {
        let since = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let range = explicit_range(Some(since), None).unwrap().unwrap();
        assert_eq!(range.start.date_naive(), since);
        assert!(range.end > range.start);
    }

    #[test]
    fn test_explicit_range_until_only_starts_at_epoch() {
        let until = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        let range = explicit_range(None, Some(until)).unwrap().unwrap();
        assert_eq!(range.start, chrono::DateTime::UNIX_EPOCH);
        assert_eq!(range.end.date_naive(), until);
    }

    #[test]
    fn test_explicit_range_both_bounds() {
        let since = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        let range = explicit_range(Some(since), Some(until)).unwrap().unwrap();
        assert!(range.start < range.end);
    }
}
