use std::path::PathBuf;

use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// Files imported directly with the given scope ids
    #[arg(long, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Folders imported recursively, scoped by their .perms files
    #[arg(long, num_args = 1..)]
    pub folders: Vec<PathBuf>,

    /// Scope ids applied to --files (defaults to the global scope)
    #[arg(long = "scope-id")]
    pub scope_ids: Vec<String>,

    /// TOML file with service and batching settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URI of the service receiving documents
    #[arg(long)]
    pub service_uri: Option<String>,

    /// Number of batches submitted at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the import plan without submitting anything
    #[arg(long)]
    pub dry_run: bool,
}
