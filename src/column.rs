//! Column definitions: name, type, and the flags that change how a column is stored.

use crate::sql_type::{self, SqlType};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Non-key column carried in the leaf level of an index.
    pub included: bool,
    /// Sparse columns live in a column set outside the regular record layout.
    pub sparse: bool,
}

impl ColumnDefinition {
    /// Makes a NOT NULL column from a catalog type string like `varchar(20)`.
    pub fn new(name: &str, type_string: &str) -> Result<ColumnDefinition, sql_type::Error> {
        Ok(ColumnDefinition {
            name: name.to_string(),
            sql_type: SqlType::from_str(type_string)?,
            nullable: false,
            included: false,
            sparse: false,
        })
    }

    pub fn from_type(name: &str, sql_type: SqlType) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            sql_type,
            nullable: false,
            included: false,
            sparse: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn included(mut self) -> Self {
        self.included = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// The hidden column SQL Server adds to rows of a non-unique clustered index.
    pub fn uniquifier() -> ColumnDefinition {
        ColumnDefinition::from_type("___uniquifier", SqlType::Uniquifier)
    }

    /// The hidden row locator column.
    pub fn rid() -> ColumnDefinition {
        ColumnDefinition::from_type("___rid", SqlType::Rid)
    }
}

impl std::fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)?;
        if self.nullable {
            write!(f, " NULL")?;
        }
        Ok(())
    }
}

#[test]
fn test_column_definition() {
    let c = ColumnDefinition::new("price", "decimal(10,2)").unwrap().nullable();
    assert_eq!(
        c.sql_type,
        SqlType::Decimal {
            precision: 10,
            scale: 2
        }
    );
    assert!(c.nullable);
    assert!(!c.sparse);
    assert_eq!(c.to_string(), "price decimal(10,2) NULL");
    assert_eq!(
        ColumnDefinition::new("shape", "geometry"),
        Err(sql_type::Error::UnsupportedType("geometry".to_string()))
    );
    assert_eq!(ColumnDefinition::uniquifier().sql_type, SqlType::Uniquifier);
    assert_eq!(ColumnDefinition::rid().to_string(), "___rid rid");
    let key = ColumnDefinition::new("code", "char(4)").unwrap().included();
    assert!(key.included);
    assert_eq!(key.sql_type, SqlType::Char(4));
}
