//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

/// Synchronize a remote photo library to local storage.
///
/// Photosync discovers new items, downloads their content into a
/// date-based directory layout, and repairs files that have vanished
/// locally. State lives in `sync.db` inside the root directory, so an
/// interrupted run can simply be restarted.
#[derive(Parser, Debug)]
#[command(name = "photosync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Root directory: where content is downloaded and the database lives
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Fetch the full history instead of only before the oldest / after the
    /// newest known item. Needed if items were uploaded in between.
    #[arg(long)]
    pub all: bool,

    /// Only fetch metadata created on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub since: Option<NaiveDate>,

    /// Only fetch metadata created on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub until: Option<NaiveDate>,

    /// Check the local filesystem for vanished files and re-download them
    #[arg(long)]
    pub resync: bool,

    /// Look up one item by id and print its remote metadata, then exit
    #[arg(long, value_name = "ID")]
    pub query: Option<String>,

    /// Import an access token from a file into the state store, then exit
    #[arg(long, value_name = "FILE")]
    pub import_token: Option<PathBuf>,

    /// Use this access token instead of the stored credential
    #[arg(long, value_name = "TOKEN")]
    pub access_token: Option<String>,
}
