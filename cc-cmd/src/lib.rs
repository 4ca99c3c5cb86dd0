//! Command implementations for the curves CLI.
//!
//! Provides subcommands for polling upstream sources into the cache,
//! listing series and coverage, and building trend figures.

use cc_cache::VersionedCache;
use cc_source::{SourceAdapter, SourceCatalog};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub mod list;
pub mod plot;
pub mod poll;

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Root of the snapshot cache
    #[arg(long, env = "CURVES_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Directory figures are written under
    #[arg(long, env = "CURVES_OUTPUT_DIR", default_value = "static", global = true)]
    pub output_dir: PathBuf,

    /// Per-request timeout when fetching sources
    #[arg(long, default_value_t = 60, global = true)]
    pub timeout_secs: u64,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache(&self) -> VersionedCache {
        VersionedCache::new(&self.data_dir)
    }

    /// Catalog of every embedded source over this cache.
    pub fn catalog(&self) -> anyhow::Result<SourceCatalog> {
        Ok(SourceCatalog::with_adapters(
            self.cache(),
            SourceAdapter::embedded_sources()?,
        ))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every source and publish changed ones into the cache
    Poll,

    /// Build a figure from an encoded request: `path@series@n~s~c@n~s~c...`
    ///
    /// An empty path writes to the memoized location under the output
    /// directory.
    Build {
        request: String,
    },

    /// Build (or reuse) the figure for a series and geographies
    Plot {
        /// Series to plot, e.g. cases_NYT
        #[arg(short, long, default_value = "cases_JHU")]
        series: String,

        /// Geography as nation~state~county; repeat for more
        #[arg(short, long = "geo", required = true)]
        geos: Vec<String>,
    },

    /// Build one figure per channel of a YAML batch document
    Batch {
        yaml: PathBuf,
    },

    /// List providers and their series
    List,

    /// Print the merged coverage tree of a series as JSON
    Geotree {
        series: String,
    },
}

pub async fn run(settings: Settings, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Poll => poll::run_poll(&settings).await,
        Command::Build { request } => plot::run_build(&settings, &request),
        Command::Plot { series, geos } => plot::run_plot(&settings, &series, &geos),
        Command::Batch { yaml } => plot::run_batch(&settings, &yaml),
        Command::List => list::run_list(&settings),
        Command::Geotree { series } => list::run_geotree(&settings, &series),
    }
}
