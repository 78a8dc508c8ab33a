//! SQLite metadata index shared by the bundled providers.
//!
//! Selections built by [`QueryBuilder`](crate::QueryBuilder) are run here as
//! real SQL: the clause text goes into the `WHERE` and the arguments are bound
//! to its `?` placeholders.

use crate::{Row, Selection};
use mediadir_core::{
    CollectionAddress, Column, OCTET_STREAM, RecordValues, SortDirection, SortOrder,
};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::time::Duration;
use strum::IntoEnumIterator;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      address TEXT NOT NULL,
      display_name TEXT NOT NULL,
      mime_type TEXT NOT NULL,
      relative_path TEXT NOT NULL,
      bucket TEXT,
      title TEXT,
      data_path TEXT,
      is_pending INTEGER NOT NULL DEFAULT 0,
      date_modified INTEGER NOT NULL,
      size INTEGER NOT NULL DEFAULT 0,
      duration INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_records_location
      ON records(relative_path, display_name);
"#;

const COLUMNS: &str = "id, address, display_name, mime_type, relative_path, bucket, title, \
                       is_pending, date_modified, size, duration";

/// One stored metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredRecord {
    pub(crate) id: u64,
    pub(crate) address: CollectionAddress,
    pub(crate) display_name: String,
    pub(crate) mime_type: String,
    pub(crate) relative_path: String,
    pub(crate) bucket: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) pending: bool,
    pub(crate) date_modified: i64,
    pub(crate) size: u64,
    pub(crate) duration: u64,
}

impl StoredRecord {
    /// Project the record onto `projection`.
    pub(crate) fn row(&self, projection: &[Column], data_path: Option<String>) -> Row {
        let mut row = Row::new();
        for column in projection {
            match column {
                Column::Id => row.insert(*column, self.id),
                Column::Title => row.insert(*column, self.title.clone()),
                Column::DataPath => row.insert(*column, data_path.clone()),
                Column::MimeType => row.insert(*column, self.mime_type.clone()),
                Column::DisplayName => row.insert(*column, self.display_name.clone()),
                Column::Size => row.insert(*column, self.size),
                Column::RelativePath => row.insert(*column, self.relative_path.clone()),
                Column::Bucket => row.insert(*column, self.bucket.clone()),
                Column::DateModified => row.insert(*column, self.date_modified),
                Column::Duration => row.insert(*column, self.duration),
                Column::IsPending => row.insert(*column, self.pending),
            }
        }
        row
    }
}

fn index_error(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StoreError::new(StoreErrorKind::MalformedRecord(e.to_string()))
        }
        e => StoreError::new(StoreErrorKind::Io(format!("metadata index: {}", e))),
    }
}

fn conversion_failure(idx: usize, ty: Type, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, reason.into())
}

fn unsigned(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value)
        .map_err(|_| conversion_failure(idx, Type::Integer, format!("negative value {}", value)))
}

fn signed(value: u64) -> MediaDirResult<i64> {
    i64::try_from(value).map_err(|_| {
        StoreError::new(StoreErrorKind::InvalidArgument(format!(
            "{} does not fit the index",
            value
        )))
        .into()
    })
}

fn parse_address(text: &str) -> Option<CollectionAddress> {
    CollectionAddress::iter().find(|address| address.to_string() == text)
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    let address: String = row.get(1)?;
    Ok(StoredRecord {
        id: unsigned(row, 0)?,
        address: parse_address(&address).ok_or_else(|| {
            conversion_failure(1, Type::Text, format!("unknown collection {}", address))
        })?,
        display_name: row.get(2)?,
        mime_type: row.get(3)?,
        relative_path: row.get(4)?,
        bucket: row.get(5)?,
        title: row.get(6)?,
        pending: row.get(7)?,
        date_modified: row.get(8)?,
        size: unsigned(row, 9)?,
        duration: unsigned(row, 10)?,
    })
}

fn bucket_of(relative_path: &str) -> Option<String> {
    relative_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn title_for(display_name: &str) -> String {
    match display_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => display_name.to_string(),
    }
}

fn check_display_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("display name is empty".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("display name {:?} names a directory", name));
    }
    if name.contains('/') {
        return Err(format!("display name {:?} contains a path separator", name));
    }
    Ok(())
}

fn check_placement(
    address: CollectionAddress,
    relative_path: &str,
    mime_type: &str,
) -> Result<(), String> {
    let root = relative_path.split('/').next().unwrap_or_default();
    if let Some(roots) = address.allowed_roots() {
        if !roots.contains(&root) {
            return Err(format!(
                "{:?} is not an allowed root for {} (allowed: {})",
                root,
                address,
                roots.join(", ")
            ));
        }
    }
    if let Some(prefix) = address.required_mime_prefix() {
        if !mime_type.starts_with(prefix) {
            return Err(format!(
                "{} does not accept MIME type {}",
                address, mime_type
            ));
        }
    }
    Ok(())
}

/// Record metadata in a SQLite table.
///
/// Identifiers start at 1 and are never reused, even after a delete.
#[derive(Debug)]
pub(crate) struct RecordIndex {
    conn: Connection,
}

impl RecordIndex {
    /// Index persisted at `path`, created if missing.
    pub(crate) fn open(path: &Path) -> MediaDirResult<Self> {
        let conn = Connection::open(path).map_err(index_error)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(index_error)?;
        Self::install(conn)
    }

    /// Index that lives as long as the process.
    pub(crate) fn in_memory() -> MediaDirResult<Self> {
        Self::install(Connection::open_in_memory().map_err(index_error)?)
    }

    fn install(conn: Connection) -> MediaDirResult<Self> {
        conn.execute_batch(SCHEMA).map_err(index_error)?;
        Ok(Self { conn })
    }

    /// Validate and store a new row, returning its identifier.
    pub(crate) fn insert(
        &self,
        address: CollectionAddress,
        values: &RecordValues,
        now: i64,
    ) -> MediaDirResult<u64> {
        let denied = |reason: String| StoreError::new(StoreErrorKind::InsertDenied(reason));

        let display_name = values
            .display_name()
            .clone()
            .ok_or_else(|| denied("display name is required".to_string()))?;
        check_display_name(&display_name).map_err(denied)?;

        let relative_path = values
            .relative_path()
            .clone()
            .ok_or_else(|| denied("relative path is required".to_string()))?;
        let mime_type = values
            .mime_type()
            .clone()
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        check_placement(address, &relative_path, &mime_type).map_err(denied)?;

        let title = values
            .title()
            .clone()
            .unwrap_or_else(|| title_for(&display_name));
        let bucket = bucket_of(&relative_path);
        self.conn
            .execute(
                "INSERT INTO records \
                 (address, display_name, mime_type, relative_path, bucket, title, is_pending, date_modified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    address.to_string(),
                    display_name,
                    mime_type,
                    relative_path,
                    bucket,
                    title,
                    values.pending().unwrap_or(false),
                    values.date_modified().unwrap_or(now),
                ],
            )
            .map_err(index_error)?;
        let id = self.conn.last_insert_rowid();
        u64::try_from(id).map_err(|_| {
            StoreError::new(StoreErrorKind::MalformedRecord(format!(
                "index assigned negative identifier {}",
                id
            )))
            .into()
        })
    }

    /// Record reachable through `address`. The files collection reaches
    /// every record.
    pub(crate) fn get(
        &self,
        address: CollectionAddress,
        id: u64,
    ) -> MediaDirResult<Option<StoredRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", COLUMNS),
                params![signed(id)?],
                read_record,
            )
            .optional()
            .map_err(index_error)?;
        Ok(record
            .filter(|record| address == CollectionAddress::Files || record.address == address))
    }

    /// Records in `address` matching `selection`, in `sort` order.
    ///
    /// Ties are broken by identifier in the same direction, so the order is
    /// total.
    pub(crate) fn select(
        &self,
        address: CollectionAddress,
        selection: &Selection,
        sort: &SortOrder,
    ) -> MediaDirResult<Vec<StoredRecord>> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if address != CollectionAddress::Files {
            clauses.push("address = ?".to_string());
            args.push(address.to_string());
        }
        if !selection.is_empty() {
            clauses.push(format!("({})", selection.clause()));
            args.extend(selection.args().iter().cloned());
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let direction = match sort.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let sql = format!(
            "SELECT {columns} FROM records{filter} ORDER BY {column} {direction}, id {direction}",
            columns = COLUMNS,
            filter = filter,
            column = sort.column,
            direction = direction,
        );

        let mut stmt = self.conn.prepare(&sql).map_err(index_error)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), read_record)
            .map_err(index_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(index_error)?;
        Ok(records)
    }

    /// The record as it would be after applying `values`, without writing it.
    ///
    /// `None` if the record is not reachable through `address`.
    pub(crate) fn revise(
        &self,
        address: CollectionAddress,
        id: u64,
        values: &RecordValues,
    ) -> MediaDirResult<Option<StoredRecord>> {
        let Some(mut record) = self.get(address, id)? else {
            return Ok(None);
        };
        let invalid = |reason: String| StoreError::new(StoreErrorKind::InvalidArgument(reason));

        if let Some(display_name) = values.display_name() {
            check_display_name(display_name).map_err(invalid)?;
            record.display_name = display_name.clone();
        }
        if let Some(relative_path) = values.relative_path() {
            record.relative_path = relative_path.clone();
            record.bucket = bucket_of(relative_path);
        }
        if let Some(mime_type) = values.mime_type() {
            record.mime_type = mime_type.clone();
        }
        check_placement(record.address, &record.relative_path, &record.mime_type)
            .map_err(invalid)?;

        if let Some(title) = values.title() {
            record.title = Some(title.clone());
        }
        if let Some(pending) = values.pending() {
            record.pending = *pending;
        }
        if let Some(date_modified) = values.date_modified() {
            record.date_modified = *date_modified;
        }
        Ok(Some(record))
    }

    /// Store the mutable columns of `record`, returning rows affected.
    pub(crate) fn write(&self, record: &StoredRecord) -> MediaDirResult<u64> {
        let rows = self
            .conn
            .execute(
                "UPDATE records SET display_name = ?1, mime_type = ?2, relative_path = ?3, \
                 bucket = ?4, title = ?5, is_pending = ?6, date_modified = ?7 WHERE id = ?8",
                params![
                    record.display_name,
                    record.mime_type,
                    record.relative_path,
                    record.bucket,
                    record.title,
                    record.pending,
                    record.date_modified,
                    signed(record.id)?,
                ],
            )
            .map_err(index_error)?;
        Ok(rows as u64)
    }

    /// Apply `values` to one record, returning rows affected.
    pub(crate) fn apply(
        &self,
        address: CollectionAddress,
        id: u64,
        values: &RecordValues,
    ) -> MediaDirResult<u64> {
        match self.revise(address, id, values)? {
            Some(record) => self.write(&record),
            None => Ok(0),
        }
    }

    /// Remove one record, returning rows affected.
    pub(crate) fn remove(&self, address: CollectionAddress, id: u64) -> MediaDirResult<u64> {
        if self.get(address, id)?.is_none() {
            return Ok(0);
        }
        let rows = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", params![signed(id)?])
            .map_err(index_error)?;
        Ok(rows as u64)
    }

    /// Whether a record other than `except` sits at this relative path under
    /// this name.
    pub(crate) fn name_taken(
        &self,
        relative_path: &str,
        display_name: &str,
        except: Option<u64>,
    ) -> MediaDirResult<bool> {
        let except = match except {
            Some(id) => signed(id)?,
            None => 0,
        };
        let taken = self
            .conn
            .query_row(
                "SELECT 1 FROM records WHERE relative_path = ?1 AND display_name = ?2 AND id <> ?3",
                params![relative_path, display_name, except],
                |_| Ok(()),
            )
            .optional()
            .map_err(index_error)?
            .is_some();
        Ok(taken)
    }

    /// Record size and modification time for each `(id, size, date_modified)`,
    /// in one transaction.
    pub(crate) fn record_stats(&mut self, stats: &[(u64, u64, i64)]) -> MediaDirResult<()> {
        if stats.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction().map_err(index_error)?;
        for (id, size, date_modified) in stats {
            tx.execute(
                "UPDATE records SET size = ?1, date_modified = ?2 WHERE id = ?3",
                params![signed(*size)?, date_modified, signed(*id)?],
            )
            .map_err(index_error)?;
        }
        tx.commit().map_err(index_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryBuilder;
    use mediadir_core::MediaCategory;

    fn values(name: &str, mime: &str, path: &str) -> RecordValues {
        RecordValues::default()
            .with_display_name(name)
            .with_mime_type(mime)
            .with_relative_path(path)
    }

    #[test]
    fn identifiers_are_never_reused() {
        let index = RecordIndex::in_memory().unwrap();
        let address = MediaCategory::Documents.collection_address();
        let first = index
            .insert(address, &values("a.txt", "text/plain", "Documents"), 0)
            .unwrap();
        assert_eq!(index.remove(address, first).unwrap(), 1);
        let second = index
            .insert(address, &values("a.txt", "text/plain", "Documents"), 0)
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn image_collection_rejects_foreign_root() {
        let index = RecordIndex::in_memory().unwrap();
        let err = index
            .insert(
                CollectionAddress::Images,
                &values("a.jpg", "image/jpeg", "Music"),
                0,
            )
            .unwrap_err();
        assert!(matches!(
            err.store_kind(),
            Some(StoreErrorKind::InsertDenied(_))
        ));
    }

    #[test]
    fn image_collection_rejects_non_image_mime() {
        let index = RecordIndex::in_memory().unwrap();
        let err = index
            .insert(
                CollectionAddress::Images,
                &values("a.pdf", "application/pdf", "Pictures"),
                0,
            )
            .unwrap_err();
        assert!(matches!(
            err.store_kind(),
            Some(StoreErrorKind::InsertDenied(_))
        ));
    }

    #[test]
    fn dot_names_are_denied() {
        let index = RecordIndex::in_memory().unwrap();
        for name in [".", ".."] {
            let err = index
                .insert(
                    CollectionAddress::Files,
                    &values(name, "text/plain", "Documents"),
                    0,
                )
                .unwrap_err();
            assert!(matches!(
                err.store_kind(),
                Some(StoreErrorKind::InsertDenied(_))
            ));
        }
        let all = index
            .select(CollectionAddress::Files, &Selection::all(), &SortOrder::default())
            .unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn title_defaults_to_stem_and_bucket_to_last_segment() {
        let index = RecordIndex::in_memory().unwrap();
        let id = index
            .insert(
                CollectionAddress::Files,
                &values("q1.pdf", "application/pdf", "Documents/reports"),
                0,
            )
            .unwrap();
        let record = index.get(CollectionAddress::Files, id).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("q1"));
        assert_eq!(record.bucket.as_deref(), Some("reports"));
    }

    #[test]
    fn files_collection_reaches_every_record() {
        let index = RecordIndex::in_memory().unwrap();
        let id = index
            .insert(
                CollectionAddress::Images,
                &values("a.jpg", "image/jpeg", "Pictures"),
                0,
            )
            .unwrap();
        assert!(index.get(CollectionAddress::Files, id).unwrap().is_some());
        assert!(index.get(CollectionAddress::Audio, id).unwrap().is_none());
    }

    #[test]
    fn select_breaks_ties_by_id() {
        let index = RecordIndex::in_memory().unwrap();
        let address = CollectionAddress::Files;
        for _ in 0..3 {
            index
                .insert(address, &values("same.txt", "text/plain", "Documents"), 5)
                .unwrap();
        }
        let sort = SortOrder::new(Column::DateModified, SortDirection::Descending);
        let ids: Vec<u64> = index
            .select(address, &Selection::all(), &sort)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn like_wildcards_in_paths_match_literally() {
        let index = RecordIndex::in_memory().unwrap();
        let address = CollectionAddress::Files;
        let wanted = index
            .insert(address, &values("a.txt", "text/plain", "Documents/100%_done"), 0)
            .unwrap();
        index
            .insert(address, &values("a.txt", "text/plain", "Documents/100xxdone"), 0)
            .unwrap();

        let location = MediaCategory::Documents.locate(Some("100%_done"));
        let lookup = QueryBuilder::build_lookup(Some("a.txt"), Some(&location));
        let ids: Vec<u64> = index
            .select(address, &lookup.selection, &lookup.sort)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![wanted]);
    }

    #[test]
    fn pending_term_filters() {
        let index = RecordIndex::in_memory().unwrap();
        let address = CollectionAddress::Files;
        index
            .insert(
                address,
                &values("a.txt", "text/plain", "Documents").with_pending(true),
                0,
            )
            .unwrap();
        let visible = index
            .insert(address, &values("b.txt", "text/plain", "Documents"), 0)
            .unwrap();

        let lookup = QueryBuilder::new().visible_only().build();
        let ids: Vec<u64> = index
            .select(address, &lookup.selection, &lookup.sort)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![visible]);
    }

    #[test]
    fn revise_does_not_write() {
        let index = RecordIndex::in_memory().unwrap();
        let address = CollectionAddress::Files;
        let id = index
            .insert(address, &values("a.txt", "text/plain", "Documents"), 0)
            .unwrap();

        let revised = index
            .revise(address, id, &RecordValues::default().with_display_name("b.txt"))
            .unwrap()
            .unwrap();
        assert_eq!(revised.display_name, "b.txt");
        assert_eq!(
            index.get(address, id).unwrap().unwrap().display_name,
            "a.txt"
        );

        assert_eq!(index.write(&revised).unwrap(), 1);
        assert_eq!(
            index.get(address, id).unwrap().unwrap().display_name,
            "b.txt"
        );
    }

    #[test]
    fn name_taken_ignores_the_record_itself() {
        let index = RecordIndex::in_memory().unwrap();
        let id = index
            .insert(
                CollectionAddress::Files,
                &values("a.txt", "text/plain", "Documents"),
                0,
            )
            .unwrap();
        assert!(index.name_taken("Documents", "a.txt", None).unwrap());
        assert!(!index.name_taken("Documents", "a.txt", Some(id)).unwrap());
        assert!(!index.name_taken("Documents/other", "a.txt", None).unwrap());
    }
}
