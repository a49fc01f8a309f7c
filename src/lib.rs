//! mdfscan reads the rows of tables directly from SQL Server data files, without a server.
//!
//! A scan needs two things: a [`Catalog`](catalog::Catalog) that says which tables exist and where
//! their pages are, and a [`PageStore`](page_store::PageStore) that hands out 8 KiB pages by address.
//! [`TableScanner`] combines them into lazy row iterators:
//!
//! ```no_run
//! use mdfscan::{MdfFile, MemoryCatalog, TableScanner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = MdfFile::open("db.mdf")?;
//! let catalog = MemoryCatalog::new();
//! let scanner = TableScanner::new(&catalog, &file);
//! for row in scanner.scan("orders")? {
//!     println!("{}", row?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod column;
pub mod compression;
pub mod config;
pub mod mdf_file;
pub mod page;
pub mod page_pointer;
pub mod page_store;
pub mod parser;
pub mod record;
pub mod scanner;
pub mod schema;
pub mod sql_type;
pub mod sql_value;
pub mod typed_row;
pub mod vardecimal;

extern crate pest;
#[macro_use]
extern crate pest_derive;

pub use catalog::{Catalog, MemoryCatalog};
pub use column::ColumnDefinition;
pub use compression::{CompressionContext, CompressionLevel};
pub use config::ScanConfig;
pub use mdf_file::MdfFile;
pub use page_pointer::PagePointer;
pub use page_store::{MemoryPageStore, PageStore};
pub use scanner::{TableScan, TableScanner};
pub use schema::{RowSchema, StaticSchema};
pub use sql_type::SqlType;
pub use sql_value::SqlValue;
pub use typed_row::Row;
