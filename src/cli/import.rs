use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};

use super::commands::ImportArgs;
use crate::config::ImportConfig;
use crate::import::{
    BatchLimits, BatchSink, ImportPlan, IngestionClient, ScopeGroup, make_batches, plan_folder,
    submit_batches,
};
use crate::types::{FileDescriptor, ScopeId, filter_scope_ids};

fn load_config(args: &ImportArgs) -> anyhow::Result<ImportConfig> {
    let mut config = match &args.config {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::default(),
    };
    if let Some(uri) = &args.service_uri {
        config.service_uri = uri.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    Ok(config)
}

/// Groups explicitly listed files under the command-line scope ids.
fn plan_files(files: &[PathBuf], scope_ids: &[String]) -> anyhow::Result<ImportPlan> {
    let scope_ids = if scope_ids.is_empty() {
        vec![ScopeId::global()]
    } else {
        let parsed = filter_scope_ids(scope_ids);
        if parsed.is_empty() {
            bail!("No valid scope ids were given");
        }
        parsed
    };

    let mut descriptors = Vec::with_capacity(files.len());
    for path in files {
        let metadata =
            fs::metadata(path).with_context(|| format!("File {} does not exist", path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a file", path.display());
        }
        descriptors.push(FileDescriptor {
            path: path.clone(),
            size_bytes: metadata.len(),
        });
    }

    Ok(ImportPlan {
        root: PathBuf::from("."),
        groups: vec![ScopeGroup {
            scope_ids,
            files: descriptors,
        }],
    })
}

fn scope_list(scope_ids: &[ScopeId]) -> String {
    scope_ids
        .iter()
        .map(ScopeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_plan(label: &str, plan: &ImportPlan, limits: BatchLimits) {
    println!("{label} ({} files)", plan.file_count());
    for group in &plan.groups {
        let batches = make_batches(&group.scope_ids, group.files.clone(), limits);
        let sizes: Vec<String> = batches.iter().map(|b| b.len().to_string()).collect();
        println!("  scopes: {}", scope_list(&group.scope_ids));
        println!(
            "    files: {}, batches: {} [{}]",
            group.files.len(),
            batches.len(),
            sizes.join(", ")
        );
    }
}

/// Builds the plans for every `--files` list and `--folders` root. A root
/// that cannot be planned is reported and skipped; the second element
/// counts those failures.
pub fn import_plan(args: &ImportArgs) -> anyhow::Result<(Vec<(String, ImportPlan)>, usize)> {
    if args.files.is_empty() && args.folders.is_empty() {
        bail!("Nothing to import. Pass --files or --folders.");
    }

    let mut plans = Vec::new();
    if !args.files.is_empty() {
        plans.push(("Files".to_string(), plan_files(&args.files, &args.scope_ids)?));
    }

    let mut failed = 0;
    for root in &args.folders {
        match plan_folder(root) {
            Ok(plan) => plans.push((format!("Folder {}", plan.root.display()), plan)),
            Err(e) => {
                eprintln!("Error: {e}");
                failed += 1;
            }
        }
    }

    Ok((plans, failed))
}

pub async fn run_import(args: ImportArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let limits = config.limits();
    let (plans, failed_roots) = import_plan(&args)?;

    if args.dry_run {
        for (label, plan) in &plans {
            print_plan(label, plan, limits);
        }
        if failed_roots > 0 {
            bail!("{failed_roots} folder(s) could not be planned");
        }
        return Ok(());
    }

    let client = IngestionClient::new(
        &config.service_uri,
        config.access_token.clone(),
        config.directory_token.clone(),
    )?;
    let sink: Arc<dyn BatchSink> = Arc::new(client);

    let mut failed_batches = 0;
    for (label, plan) in plans {
        let batches = plan.batches(limits);
        println!(
            "{label}: submitting {} files in {} batches to {}",
            plan.file_count(),
            batches.len(),
            config.service_uri
        );

        let report = submit_batches(Arc::clone(&sink), batches, config.concurrency).await;
        for outcome in report.failures() {
            if let Err(e) = &outcome.result {
                eprintln!("  batch {} ({} files) failed: {e}", outcome.index, outcome.files);
            }
        }
        println!(
            "{label}: imported {} of {} files",
            report.imported_files(),
            plan.file_count()
        );
        failed_batches += report.failures().count();
    }

    if failed_roots > 0 || failed_batches > 0 {
        bail!("Import incomplete: {failed_roots} folder(s) and {failed_batches} batch(es) failed");
    }
    Ok(())
}
