//! Fetch command - child entry point of the subprocess backend.
//!
//! Runs the blocking bulk fetch and nothing else. The parent process
//! monitors bytes on disk, reads the summary printed as one JSON line on
//! stdout and the exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | all matching files fetched |
//! | 3 | registry or access error |
//! | 1 | any other failure |

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{error, warn};

use modeldock::registry::{ExpectedManifest, RegistrySizeProbe, ReqwestClient, SizeProbe};
use modeldock::repo::{NamePattern, RepoId};
use modeldock::transfer::{BulkFetch, FetchJob, HubFetcher};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Repository identifier
    pub repo: String,

    /// Destination directory for completed files
    #[arg(long, value_name = "DIR")]
    pub dest: PathBuf,

    /// Hub blob cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: PathBuf,

    /// File-name filter
    #[arg(long)]
    pub pattern: Option<String>,

    /// Re-fetch files that already exist at the destination
    #[arg(long)]
    pub no_resume: bool,
}

/// Run the fetch command.
pub fn run(config_path: Option<&Path>, args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("fetch");
    let registry = &runner.config().registry;

    let repo_id = RepoId::parse(&args.repo).map_err(|e| CliError::Config(e.to_string()))?;
    let pattern = NamePattern::new(args.pattern.as_deref().unwrap_or(""));
    let manifest = listed_sizes(&repo_id, &pattern, &registry.endpoint, registry.token.as_deref());

    let job = FetchJob {
        repo_id,
        destination: args.dest,
        cache_dir: args.cache_dir,
        pattern,
        resume: !args.no_resume,
        endpoint: Some(registry.endpoint.clone()),
        token: registry.token.clone(),
        expected_sizes: Default::default(),
    }
    .with_expected_sizes(&manifest);

    let summary = HubFetcher::new().fetch(&job).map_err(|e| {
        error!(repo = %job.repo_id, error = %e, "Fetch failed");
        CliError::Fetch(e)
    })?;

    let line = serde_json::to_string(&summary)
        .map_err(|e| CliError::Config(format!("Failed to encode fetch summary: {}", e)))?;
    println!("{}", line);
    Ok(())
}

/// Listed file sizes, used to decide which present files are current.
fn listed_sizes(
    repo_id: &RepoId,
    pattern: &NamePattern,
    endpoint: &str,
    token: Option<&str>,
) -> ExpectedManifest {
    match ReqwestClient::new(token) {
        Ok(client) => {
            RegistrySizeProbe::new(client, endpoint).fetch_expected_manifest(repo_id, pattern)
        }
        Err(e) => {
            warn!(error = %e, "Registry client unavailable, present files will be fetched again");
            ExpectedManifest::unknown()
        }
    }
}
