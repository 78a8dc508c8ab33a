//! Filesystem-backed content provider.
//!
//! Record bytes live in ordinary files laid out by relative path, and the
//! metadata table is kept in a SQLite index next to them.

use crate::index::{RecordIndex, StoredRecord};
use crate::{ContentProvider, ReadStream, RowCursor, Selection, VecCursor, WriteStream};
use mediadir_core::{CollectionAddress, Column, ContentUri, RecordValues, SortOrder, StorageMode};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Directory under the root that holds the metadata index.
const INDEX_DIR: &str = ".mediadir";
const INDEX_FILE: &str = "index.db";

/// Filesystem content provider.
///
/// Stores each record's bytes at `{root}/{relative_path}/{display_name}`:
///
/// ```text
/// /var/lib/mediadir/
/// ├── .mediadir/
/// │   └── index.db
/// ├── DCIM/
/// │   └── trip/
/// │       └── IMG_1.jpg
/// └── Documents/
///     └── reports/
///         ├── q1.pdf
///         └── q1 (1).pdf
/// ```
///
/// # Features
///
/// - **Unique names**: a second record with the same name at the same path is
///   stored as `name (1).ext`
/// - **Consistent moves**: a rename touches the index only after the file has
///   moved, and never lands on a name another record holds
/// - **Live sizes**: size and modification time come from the file itself
/// - **Contained paths**: relative paths may not climb out of the root
#[derive(Debug)]
pub struct FileSystemProvider {
    root: PathBuf,
    mode: StorageMode,
    index: Mutex<RecordIndex>,
}

fn io_error(context: impl std::fmt::Display, e: std::io::Error) -> StoreError {
    StoreError::new(StoreErrorKind::Io(format!("{}: {}", context, e)))
}

impl FileSystemProvider {
    /// Open (or create) a filesystem provider rooted at `root`.
    ///
    /// Creates the root directory if it doesn't exist and loads the metadata
    /// index if one is present.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the index cannot be
    /// read.
    #[tracing::instrument(skip(root))]
    pub fn open(root: impl Into<PathBuf>, mode: StorageMode) -> MediaDirResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(root.join(INDEX_DIR)).map_err(|e| {
            StoreError::new(StoreErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        let index = RecordIndex::open(&root.join(INDEX_DIR).join(INDEX_FILE))?;

        tracing::info!(path = %root.display(), %mode, "Opened filesystem provider");
        Ok(Self {
            root,
            mode,
            index: Mutex::new(index),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, relative_path: &str, display_name: &str) -> PathBuf {
        self.root.join(relative_path).join(display_name)
    }

    fn record_path(&self, record: &StoredRecord) -> PathBuf {
        self.object_path(&record.relative_path, &record.display_name)
    }

    fn data_path(&self, record: &StoredRecord) -> Option<String> {
        self.mode
            .exposes_paths()
            .then(|| self.record_path(record).to_string_lossy().to_string())
    }

    /// Pick a name no other record uses at `relative_path`.
    fn unique_name(
        index: &RecordIndex,
        relative_path: &str,
        display_name: &str,
    ) -> MediaDirResult<String> {
        if !index.name_taken(relative_path, display_name, None)? {
            return Ok(display_name.to_string());
        }
        let (stem, suffix) = match display_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
            _ => (display_name, String::new()),
        };
        let mut n = 1u64;
        loop {
            let candidate = format!("{} ({}){}", stem, n, suffix);
            if !index.name_taken(relative_path, &candidate, None)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Refresh size and modification time of records from their files.
    async fn refresh(&self, index: &mut RecordIndex) -> MediaDirResult<()> {
        let records = index.select(
            CollectionAddress::Files,
            &Selection::all(),
            &SortOrder::default(),
        )?;
        let mut stats = Vec::new();
        for record in &records {
            let path = self.record_path(record);
            match tokio::fs::metadata(&path).await {
                Ok(metadata) => {
                    let date_modified = metadata
                        .modified()
                        .map(|modified| chrono::DateTime::<chrono::Utc>::from(modified).timestamp())
                        .unwrap_or(record.date_modified);
                    if metadata.len() != record.size || date_modified != record.date_modified {
                        stats.push((record.id, metadata.len(), date_modified));
                    }
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Backing file unavailable");
                }
            }
        }
        index.record_stats(&stats)
    }
}

async fn create_parent(path: &Path) -> MediaDirResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StoreError::new(StoreErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }
    Ok(())
}

async fn create_backing_file(path: &Path) -> MediaDirResult<()> {
    create_parent(path).await?;
    tokio::fs::File::create(path)
        .await
        .map_err(|e| io_error(path.display(), e))?;
    Ok(())
}

fn check_contained(relative_path: &str) -> MediaDirResult<()> {
    if relative_path
        .split('/')
        .any(|segment| segment == ".." || segment == INDEX_DIR)
    {
        return Err(StoreError::new(StoreErrorKind::InsertDenied(format!(
            "relative path {:?} leaves the store",
            relative_path
        )))
        .into());
    }
    Ok(())
}

#[async_trait::async_trait]
impl ContentProvider for FileSystemProvider {
    fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    #[tracing::instrument(skip(self, values), fields(address = %address))]
    async fn insert(
        &self,
        address: CollectionAddress,
        values: &RecordValues,
    ) -> MediaDirResult<ContentUri> {
        let index = self.index.lock().await;

        let mut values = values.clone();
        if let (Some(relative_path), Some(display_name)) =
            (values.relative_path().clone(), values.display_name().clone())
        {
            check_contained(&relative_path)?;
            let unique = Self::unique_name(&index, &relative_path, &display_name)?;
            if unique != display_name {
                tracing::debug!(requested = %display_name, stored = %unique, "Renamed duplicate");
                values = values.with_display_name(unique);
            }
        }

        let id = index.insert(address, &values, chrono::Utc::now().timestamp())?;
        let uri = ContentUri::new(address, id);
        let path = match index.get(address, id)? {
            Some(record) => self.record_path(&record),
            None => return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into()),
        };

        if let Err(e) = create_backing_file(&path).await {
            if let Err(cleanup) = index.remove(address, id) {
                tracing::error!(%uri, error = %cleanup, "Failed to drop row after file creation failed");
            }
            return Err(e);
        }

        tracing::info!(%uri, path = %path.display(), "Inserted record");
        Ok(uri)
    }

    #[tracing::instrument(skip(self, projection, selection, sort), fields(address = %address, selection = %selection))]
    async fn query(
        &self,
        address: CollectionAddress,
        projection: &[Column],
        selection: &Selection,
        sort: &SortOrder,
    ) -> MediaDirResult<Box<dyn RowCursor>> {
        let mut index = self.index.lock().await;
        self.refresh(&mut index).await?;
        let records = index.select(address, selection, sort)?;
        let rows = records
            .iter()
            .map(|record| record.row(projection, self.data_path(record)))
            .collect::<Vec<_>>();
        tracing::debug!(count = rows.len(), "Query matched");
        Ok(Box::new(VecCursor::new(rows)))
    }

    #[tracing::instrument(skip(self, values), fields(uri = %uri))]
    async fn update(&self, uri: &ContentUri, values: &RecordValues) -> MediaDirResult<u64> {
        let index = self.index.lock().await;
        let Some(before) = index.get(uri.address(), uri.id())? else {
            return Ok(0);
        };
        if let Some(relative_path) = values.relative_path() {
            check_contained(relative_path)?;
        }
        let Some(after) = index.revise(uri.address(), uri.id(), values)? else {
            return Ok(0);
        };

        let (from, to) = (self.record_path(&before), self.record_path(&after));
        let moved = from != to;
        if moved {
            let held = index.name_taken(&after.relative_path, &after.display_name, Some(after.id))?;
            if held
                || tokio::fs::try_exists(&to)
                    .await
                    .map_err(|e| io_error(to.display(), e))?
            {
                return Err(StoreError::new(StoreErrorKind::InvalidArgument(format!(
                    "{} is already in use",
                    to.display()
                )))
                .into());
            }
            create_parent(&to).await?;
            tokio::fs::rename(&from, &to).await.map_err(|e| {
                io_error(format!("rename {} to {}", from.display(), to.display()), e)
            })?;
            tracing::debug!(from = %from.display(), to = %to.display(), "Moved backing file");
        }

        let written = index.write(&after);
        match written {
            Ok(rows) => Ok(rows),
            Err(e) => {
                if moved {
                    if let Err(undo) = tokio::fs::rename(&to, &from).await {
                        tracing::error!(
                            from = %to.display(),
                            to = %from.display(),
                            error = %undo,
                            "Failed to move backing file back"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn delete(&self, uri: &ContentUri) -> MediaDirResult<u64> {
        let index = self.index.lock().await;
        let Some(record) = index.get(uri.address(), uri.id())? else {
            return Ok(0);
        };
        let path = self.record_path(&record);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Backing file already gone");
            }
            Err(e) => return Err(io_error(format!("delete {}", path.display()), e).into()),
        }

        let rows = index.remove(uri.address(), uri.id())?;
        tracing::info!(path = %path.display(), "Deleted record");
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn open_read(&self, uri: &ContentUri) -> MediaDirResult<ReadStream> {
        let path = {
            let index = self.index.lock().await;
            match index.get(uri.address(), uri.id())? {
                Some(record) => self.record_path(&record),
                None => {
                    return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
                }
            }
        };
        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::new(StoreErrorKind::NotFound(path.display().to_string()))
            } else {
                io_error(path.display(), e)
            }
        })?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn open_write(&self, uri: &ContentUri) -> MediaDirResult<WriteStream> {
        let path = {
            let index = self.index.lock().await;
            match index.get(uri.address(), uri.id())? {
                Some(record) => self.record_path(&record),
                None => {
                    return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
                }
            }
        };
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| io_error(path.display(), e))?;
        Ok(Box::new(file))
    }
}
