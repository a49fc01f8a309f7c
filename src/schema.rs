//! Row schemas describe the shape of the rows a scan produces.
//!
//! A schema is either built at runtime from catalog column metadata, or known statically for a
//! fixed row shape such as a system table (see [`StaticSchema`]).  Schemas never change once built and
//! are shared by every row of a scan.

use crate::column::ColumnDefinition;
use crate::typed_row::Row;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchema {
    columns: Arc<[ColumnDefinition]>,
}

impl RowSchema {
    pub fn new(columns: Vec<ColumnDefinition>) -> RowSchema {
        RowSchema {
            columns: columns.into(),
        }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the first column called `name`, compared case-insensitively like SQL Server's default collation.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A Rust type whose rows have a shape known at compile time.
pub trait StaticSchema: Sized {
    fn schema() -> RowSchema;

    /// Converts a row scanned with `schema()` into the typed form.
    fn from_row(row: Row) -> Result<Self, crate::typed_row::Error>;
}

#[test]
fn test_row_schema() {
    let s = RowSchema::new(vec![
        ColumnDefinition::new("id", "int").unwrap(),
        ColumnDefinition::new("Name", "nvarchar(50)").unwrap().nullable(),
    ]);
    assert_eq!(s.len(), 2);
    assert_eq!(s.column_index("name"), Some(1));
    assert_eq!(s.column_index("missing"), None);
    assert_eq!(s.column_names(), vec!["id".to_string(), "Name".to_string()]);
    // Clones share the column list.
    let t = s.clone();
    assert!(Arc::ptr_eq(&s.columns, &t.columns));
}
