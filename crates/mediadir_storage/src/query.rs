//! Parameterized record lookups.
//!
//! Caller-supplied text never becomes part of a predicate. Every value travels
//! as a positional argument bound to a `?` placeholder, and values matched with
//! `LIKE` have their wildcard characters escaped first.

use mediadir_core::{Column, ContentLocation, SortOrder};

/// Escape character used in `LIKE` patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Comparison applied by one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Operator {
    /// Exact equality
    #[display("=")]
    Equals,
    /// Pattern match with `%` and `_` wildcards
    #[display("LIKE")]
    Like,
}

/// One `column op ?` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Predicate {
    /// Column compared
    pub column: Column,
    /// Comparison
    pub operator: Operator,
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{} = ?", self.column),
            Operator::Like => write!(f, "{} LIKE ? ESCAPE '{}'", self.column, LIKE_ESCAPE),
        }
    }
}

/// Conjunction of predicates with their positional arguments.
///
/// Predicates and arguments are only ever added in pairs, so the clause always
/// has exactly as many placeholders as there are arguments.
///
/// # Examples
///
/// ```
/// use mediadir_core::Column;
/// use mediadir_storage::Selection;
///
/// let selection = Selection::all()
///     .equals(Column::DisplayName, "IMG_1.jpg")
///     .like(Column::RelativePath, "%DCIM/trip%");
///
/// assert_eq!(
///     selection.clause(),
///     "display_name = ? AND relative_path LIKE ? ESCAPE '\\'"
/// );
/// assert_eq!(selection.args(), ["IMG_1.jpg", "%DCIM/trip%"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    predicates: Vec<Predicate>,
    args: Vec<String>,
}

impl Selection {
    /// Selection matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality term.
    pub fn equals(self, column: Column, value: impl Into<String>) -> Self {
        self.push(column, Operator::Equals, value.into())
    }

    /// Add a `LIKE` term. `pattern` is used as given; escape literal text with
    /// [`escape_like`] first.
    pub fn like(self, column: Column, pattern: impl Into<String>) -> Self {
        self.push(column, Operator::Like, pattern.into())
    }

    fn push(mut self, column: Column, operator: Operator, arg: String) -> Self {
        self.predicates.push(Predicate { column, operator });
        self.args.push(arg);
        self
    }

    /// Placeholder text, e.g. `display_name = ? AND relative_path LIKE ? ESCAPE '\'`.
    ///
    /// Empty when the selection matches everything.
    pub fn clause(&self) -> String {
        self.predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Positional arguments, in placeholder order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Terms of the selection.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether the selection has no terms.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.clause())
    }
}

/// A selection paired with the order results come back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Which records
    pub selection: Selection,
    /// In what order
    pub sort: SortOrder,
}

/// Builds lookups from optional filters.
///
/// # Examples
///
/// ```
/// use mediadir_core::MediaCategory;
/// use mediadir_storage::QueryBuilder;
///
/// let location = MediaCategory::Documents.locate(Some("reports"));
/// let lookup = QueryBuilder::new()
///     .display_name("q1.pdf")
///     .within(&location)
///     .build();
///
/// assert_eq!(lookup.selection.args(), ["q1.pdf", "%Documents/reports%"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    id: Option<u64>,
    display_name: Option<String>,
    path_fragment: Option<String>,
    visible_only: bool,
    sort: Option<SortOrder>,
}

impl QueryBuilder {
    /// Builder that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a single identifier.
    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Match an exact display name.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Match records whose relative path contains the location's path.
    pub fn within(mut self, location: &ContentLocation) -> Self {
        self.path_fragment = Some(location.relative_path().clone());
        self
    }

    /// Match records whose relative path contains `fragment`.
    pub fn path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.path_fragment = Some(fragment.into());
        self
    }

    /// Skip records that are still pending.
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Order results; the default is newest first.
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Assemble the lookup.
    pub fn build(self) -> Lookup {
        let mut selection = Selection::all();
        if let Some(id) = self.id {
            selection = selection.equals(Column::Id, id.to_string());
        }
        if let Some(name) = self.display_name {
            selection = selection.equals(Column::DisplayName, name);
        }
        if let Some(fragment) = self.path_fragment {
            selection = selection.like(
                Column::RelativePath,
                format!("%{}%", escape_like(&fragment)),
            );
        }
        if self.visible_only {
            selection = selection.equals(Column::IsPending, "0");
        }
        Lookup {
            selection,
            sort: self.sort.unwrap_or_default(),
        }
    }

    /// Lookup for an optional display name within an optional location.
    pub fn build_lookup(display_name: Option<&str>, location: Option<&ContentLocation>) -> Lookup {
        let mut builder = Self::new();
        if let Some(name) = display_name {
            builder = builder.display_name(name);
        }
        if let Some(location) = location {
            builder = builder.within(location);
        }
        builder.build()
    }
}

/// Escape `%`, `_` and the escape character itself so `text` matches literally
/// inside a `LIKE` pattern.
///
/// ```
/// use mediadir_storage::escape_like;
///
/// assert_eq!(escape_like("100%_done"), "100\\%\\_done");
/// ```
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadir_core::MediaCategory;

    #[test]
    fn empty_builder_matches_everything() {
        let lookup = QueryBuilder::new().build();
        assert!(lookup.selection.is_empty());
        assert_eq!(lookup.selection.clause(), "");
        assert_eq!(lookup.sort, SortOrder::newest_first());
    }

    #[test]
    fn hostile_name_stays_an_argument() {
        let name = "x' OR '1'='1";
        let lookup = QueryBuilder::build_lookup(Some(name), None);
        assert_eq!(lookup.selection.clause(), "display_name = ?");
        assert_eq!(lookup.selection.args(), [name]);
    }

    #[test]
    fn path_wildcards_are_escaped() {
        let location = MediaCategory::Documents.locate(Some("100%_done"));
        let lookup = QueryBuilder::build_lookup(None, Some(&location));
        assert_eq!(
            lookup.selection.clause(),
            "relative_path LIKE ? ESCAPE '\\'"
        );
        assert_eq!(lookup.selection.args(), ["%Documents/100\\%\\_done%"]);
    }

    #[test]
    fn visible_only_adds_pending_term() {
        let lookup = QueryBuilder::new().display_name("a.txt").visible_only().build();
        assert_eq!(lookup.selection.clause(), "display_name = ? AND is_pending = ?");
        assert_eq!(lookup.selection.args(), ["a.txt", "0"]);
    }

    #[test]
    fn id_term_comes_first() {
        let lookup = QueryBuilder::new().display_name("a.txt").id(7).build();
        assert_eq!(lookup.selection.clause(), "id = ? AND display_name = ?");
        assert_eq!(lookup.selection.args(), ["7", "a.txt"]);
    }
}
