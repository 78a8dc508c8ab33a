//! Command handlers.

use super::broker::ConsoleBroker;
use super::commands::{Cli, Commands, OutputFormat};
use futures::TryStreamExt;
use mediadir_core::{ContentRecord, ContentUri, MediaCategory, MediaDirConfig};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use mediadir_storage::{
    ContentRecordStore, CorrelationCode, FileSystemProvider, MutationOutcome,
    PermissionRecoveryFlow, PhotoMetadataReader, StreamTransfer, VisibilityGate,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

type Output<'a> = &'a mut (dyn Write + Send);

fn emit(out: Output<'_>, line: impl std::fmt::Display) -> MediaDirResult<()> {
    writeln!(out, "{}", line)
        .map_err(|e| StoreError::new(StoreErrorKind::Io(format!("write output: {}", e))).into())
}

/// Configuration for a CLI invocation.
///
/// `--config` replaces the layered lookup; `--root` overrides the root of
/// whichever configuration was loaded.
///
/// # Errors
///
/// Returns a configuration error if loading or validation fails.
pub fn resolve_config(cli: &Cli) -> MediaDirResult<MediaDirConfig> {
    let config = match &cli.config {
        Some(path) => MediaDirConfig::from_file(path)?,
        None => MediaDirConfig::load()?,
    };
    Ok(match &cli.root {
        Some(root) => config.with_root(root.clone()),
        None => config,
    })
}

/// Open the filesystem store described by `config`.
///
/// # Errors
///
/// Returns an error if the store root cannot be created or its index read.
pub fn open_store(config: &MediaDirConfig) -> MediaDirResult<ContentRecordStore> {
    let provider = FileSystemProvider::open(config.root(), *config.storage_mode())?;
    Ok(ContentRecordStore::new(Arc::new(provider)).with_default_sort(*config.default_sort()))
}

/// Execute a parsed command line, writing results to `out`.
///
/// # Errors
///
/// Returns whatever the underlying store operation fails with.
#[instrument(skip_all, fields(verbose = cli.verbose))]
pub async fn run(cli: &Cli, out: Output<'_>) -> MediaDirResult<()> {
    match &cli.command {
        Commands::Categories => return list_categories(out),
        Commands::Locate { category, sub_path } => {
            let location = category.locate(sub_path.as_deref());
            return emit(
                out,
                format!("{}\t{}", location.address(), location.relative_path()),
            );
        }
        _ => {}
    }

    let config = resolve_config(cli)?;
    debug!(root = %config.root().display(), mode = %config.storage_mode(), "Resolved configuration");
    let store = open_store(&config)?;

    match &cli.command {
        Commands::List {
            category,
            sub_path,
            visible_only,
            format,
        } => {
            list_records(
                &store,
                *category,
                sub_path.as_deref(),
                *visible_only,
                *format,
                out,
            )
            .await
        }
        Commands::Save {
            category,
            file,
            sub_path,
            staged,
        } => {
            let transfer = StreamTransfer::from_config(store, &config);
            let uri = if *staged {
                save_staged_file(&transfer, *category, file, sub_path.as_deref()).await?
            } else {
                transfer
                    .copy_private_file_to_category(*category, file, sub_path.as_deref())
                    .await?
            };
            emit(out, uri)
        }
        Commands::Export {
            category,
            name,
            dest,
            sub_path,
        } => {
            let uri = find(&store, *category, name, sub_path.as_deref()).await?;
            let copied = StreamTransfer::from_config(store, &config)
                .copy_category_file_to_private(&uri, dest)
                .await?;
            emit(
                out,
                format!("Exported {} bytes to {}", copied, dest.display()),
            )
        }
        Commands::Delete {
            category,
            name,
            sub_path,
        } => {
            let mut flow = PermissionRecoveryFlow::new(store, Arc::new(ConsoleBroker));
            let outcome = flow
                .delete_by_display_name(
                    CorrelationCode(std::process::id()),
                    *category,
                    name,
                    sub_path.as_deref(),
                )
                .await?;
            match outcome {
                MutationOutcome::Completed { rows } => {
                    emit(out, format!("Deleted {} record(s)", rows))
                }
                MutationOutcome::PendingGrant { correlation, .. } => {
                    emit(out, format!("Awaiting approval ({})", correlation))
                }
            }
        }
        Commands::Hide {
            category,
            name,
            sub_path,
        } => set_hidden(&store, *category, name, sub_path.as_deref(), true, out).await,
        Commands::Show {
            category,
            name,
            sub_path,
        } => set_hidden(&store, *category, name, sub_path.as_deref(), false, out).await,
        Commands::Exif {
            category,
            name,
            sub_path,
        } => {
            let info = PhotoMetadataReader::new(store)
                .read_by_display_name(*category, name, sub_path.as_deref())
                .await?;
            emit(out, info)
        }
        Commands::Categories | Commands::Locate { .. } => Ok(()),
    }
}

fn list_categories(out: Output<'_>) -> MediaDirResult<()> {
    for category in MediaCategory::iter() {
        emit(
            out,
            format!(
                "{:<14}{:<15}{}",
                category.to_string(),
                category.root(),
                category.collection_address()
            ),
        )?;
    }
    Ok(())
}

fn human_line(record: &ContentRecord) -> String {
    format!(
        "{:>6}  {:<32} {:>10}  {}{}",
        record.id(),
        record.display_name(),
        record.size(),
        record.mime_type(),
        if record.is_pending() { "  (pending)" } else { "" }
    )
}

async fn list_records(
    store: &ContentRecordStore,
    category: MediaCategory,
    sub_path: Option<&str>,
    visible_only: bool,
    format: OutputFormat,
    out: Output<'_>,
) -> MediaDirResult<()> {
    let mut query = store.query_all(category, sub_path, None);
    if visible_only {
        query = query.visible_only();
    }

    match format {
        OutputFormat::Json => {
            let records = query.collect().await?;
            let json = serde_json::to_string_pretty(&records).map_err(|e| {
                StoreError::new(StoreErrorKind::Io(format!("serialize records: {}", e)))
            })?;
            emit(out, json)
        }
        OutputFormat::Human => {
            let mut records = query.stream();
            let mut count = 0usize;
            while let Some(record) = records.try_next().await? {
                emit(&mut *out, human_line(&record))?;
                count += 1;
            }
            emit(out, format!("Total: {} records", count))
        }
    }
}

async fn save_staged_file(
    transfer: &StreamTransfer,
    category: MediaCategory,
    file: &Path,
    sub_path: Option<&str>,
) -> MediaDirResult<ContentUri> {
    let invalid = |reason: String| StoreError::new(StoreErrorKind::InvalidArgument(reason));
    let display_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| invalid(format!("{} has no file name", file.display())))?;
    let source = tokio::fs::File::open(file)
        .await
        .map_err(|e| invalid(format!("{}: {}", file.display(), e)))?;
    transfer
        .save_staged(category, source, &display_name, sub_path)
        .await
}

async fn find(
    store: &ContentRecordStore,
    category: MediaCategory,
    name: &str,
    sub_path: Option<&str>,
) -> MediaDirResult<ContentUri> {
    store
        .find_by_display_name(category, name, sub_path)
        .await?
        .ok_or_else(|| {
            StoreError::new(StoreErrorKind::NotFound(format!(
                "{} in {}",
                name,
                category.locate(sub_path).relative_path()
            )))
            .into()
        })
}

async fn set_hidden(
    store: &ContentRecordStore,
    category: MediaCategory,
    name: &str,
    sub_path: Option<&str>,
    hidden: bool,
    out: Output<'_>,
) -> MediaDirResult<()> {
    let uri = find(store, category, name, sub_path).await?;
    let changed = VisibilityGate::new(store.clone())
        .set_hidden(&uri, hidden)
        .await?;
    let state = if hidden { "hidden" } else { "visible" };
    if changed {
        emit(out, format!("{} is now {}", uri, state))
    } else {
        emit(out, format!("{} was not updated", uri))
    }
}
