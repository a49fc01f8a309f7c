//! Scanners turn the page structures of an allocation unit into a lazy sequence of rows.
//!
//! A scan is a cursor: each call to `next` decodes at most the rest of the current page, and fetches
//! a new page only once the current one has no more rows.  Pages are released as soon as their rows
//! have been produced.
//!
//! Page walks ([`PageWalk`]) decide which data pages to visit and in what order; [`Rows`] decodes the
//! pages a walk produces.  After producing an error, a scan produces nothing more.

use std::collections::HashSet;

use tracing::trace;

use crate::compression::CompressionContext;
use crate::config::ScanConfig;
use crate::page::{self, DataPage, Header, IamPage, PfsPage};
use crate::page_pointer::PagePointer;
use crate::page_store::{self, PageStore};
use crate::schema::RowSchema;
use crate::typed_row::{self, Row};

/// module `heap` walks the pages of a heap through its IAM chain.
pub mod heap;
/// module `linked` walks a chain of data pages linked by their next-page pointers.
pub mod linked;
/// module `table` resolves table names through the catalog and scans their partitions.
pub mod table;

pub use heap::HeapWalk;
pub use linked::LinkedWalk;
pub use table::{TableScan, TableScanner};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Table {0} does not exist.")]
    NotFound(String),
    #[error("Table name {name} matches {count} tables.")]
    Ambiguous { name: String, count: usize },
    #[error("Table {0} has no heap or clustered index partitions.")]
    NoPartitions(String),
    #[error("Partition {partition_id}.{partition_number} does not exist.")]
    PartitionNotFound {
        partition_id: i64,
        partition_number: i32,
    },
    #[error("Partition {0} has no in-row data allocation unit.")]
    NoAllocationUnit(i64),
    #[error("Database is corrupt: {0}")]
    Corruption(String),
    #[error("{0}")]
    UnsupportedType(#[from] crate::sql_type::Error),
    #[error("Error reading row: {0}")]
    Record(#[from] page::Error),
    #[error("Error converting row: {0}")]
    Conversion(#[from] typed_row::Error),
    #[error("Error reading page: {0}")]
    Store(page_store::Error),
}

impl Error {
    /// Whether the error shows that the database files are damaged or inconsistent, as opposed to a bad
    /// request, a storage feature that cannot be read, or an I/O failure.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::Corruption(_) => true,
            Error::Record(page::Error::BadRecord { detail, .. }) => !matches!(
                detail,
                typed_row::Error::RowOverflow(_) | typed_row::Error::SparseColumn(_)
            ),
            Error::Record(_) => true,
            _ => false,
        }
    }
}

/// Fetches pages for one scan, checking that each is what the scan expects to find.
#[derive(Clone, Copy)]
pub struct Pages<'a> {
    store: &'a dyn PageStore,
    config: ScanConfig,
}

impl<'a> Pages<'a> {
    pub fn new(store: &'a dyn PageStore, config: ScanConfig) -> Self {
        Pages { store, config }
    }

    // A page that is missing or of the wrong kind means the pointer leading to it is dangling.
    fn classify(pointer: PagePointer, kind: &str, e: page_store::Error) -> Error {
        match e {
            page_store::Error::PageNotFound(_)
            | page_store::Error::UnknownFile(_)
            | page_store::Error::Page(_) => {
                Error::Corruption(format!("{} page {}: {}", kind, pointer, e))
            }
            e => Error::Store(e),
        }
    }

    fn verify(&self, requested: PagePointer, header: &Header, kind: &str) -> Result<(), Error> {
        if self.config.verify_page_ids && header.pointer != requested {
            return Err(Error::Corruption(format!(
                "{} page fetched from {} has address {} in its header",
                kind, requested, header.pointer
            )));
        }
        Ok(())
    }

    pub fn data_page(&self, pointer: PagePointer) -> Result<DataPage, Error> {
        trace!(page = %pointer, "fetching data page");
        let page = self
            .store
            .get_data_page(pointer)
            .map_err(|e| Self::classify(pointer, "data", e))?;
        self.verify(pointer, &page.header, "data")?;
        Ok(page)
    }

    pub fn iam_page(&self, pointer: PagePointer) -> Result<IamPage, Error> {
        trace!(page = %pointer, "fetching IAM page");
        let page = self
            .store
            .get_iam_page(pointer)
            .map_err(|e| Self::classify(pointer, "IAM", e))?;
        self.verify(pointer, &page.header, "IAM")?;
        Ok(page)
    }

    pub fn pfs_page(&self, pointer: PagePointer) -> Result<PfsPage, Error> {
        trace!(page = %pointer, "fetching PFS page");
        let page = self
            .store
            .get_pfs_page(pointer)
            .map_err(|e| Self::classify(pointer, "PFS", e))?;
        self.verify(pointer, &page.header, "PFS")?;
        Ok(page)
    }
}

/// Remembers the pages of one chain, to stop a damaged chain from looping forever.
#[derive(Debug, Default)]
pub struct Visited {
    enabled: bool,
    seen: HashSet<PagePointer>,
}

impl Visited {
    pub fn new(enabled: bool) -> Self {
        Visited {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// Records a visit to `pointer`; fails if it was visited before.
    pub fn visit(&mut self, pointer: PagePointer, chain: &str) -> Result<(), Error> {
        if self.enabled && !self.seen.insert(pointer) {
            return Err(Error::Corruption(format!(
                "{} chain returns to page {}",
                chain, pointer
            )));
        }
        Ok(())
    }
}

/// Produces the data pages of an allocation unit, in scan order.
pub trait PageWalk {
    /// Returns the next page, or `None` when the walk is complete.
    fn next_page(&mut self) -> Option<Result<DataPage, Error>>;
}

/// iterates over the rows of the pages produced by a `PageWalk`.
pub struct Rows<W> {
    walk: W,
    page: Option<DataPage>,
    slot: usize,
    schema: RowSchema,
    ctx: CompressionContext,
    done: bool,
}

impl<W: PageWalk> Rows<W> {
    pub fn new(walk: W, schema: RowSchema, ctx: CompressionContext) -> Self {
        Rows {
            walk,
            page: None,
            slot: 0,
            schema,
            ctx,
            done: false,
        }
    }

    fn fail(&mut self, e: Error) -> Option<Result<Row, Error>> {
        self.done = true;
        self.page = None;
        Some(Err(e))
    }
}

impl<W: PageWalk> Iterator for Rows<W> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(page) = &self.page {
                while self.slot < page.slot_count() {
                    let slot = self.slot;
                    self.slot += 1;
                    match page.row_at(slot, &self.schema, &self.ctx) {
                        Ok(Some(row)) => return Some(Ok(row)),
                        Ok(None) => continue,
                        Err(e) => return self.fail(Error::Record(e)),
                    }
                }
                self.page = None;
            }
            match self.walk.next_page() {
                Some(Ok(page)) => {
                    self.page = Some(page);
                    self.slot = 0;
                }
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

#[test]
fn test_visited_detects_revisit() {
    let mut v = Visited::new(true);
    assert!(v.visit(PagePointer::new(1, 5), "data").is_ok());
    assert!(v.visit(PagePointer::new(1, 6), "data").is_ok());
    let e = v.visit(PagePointer::new(1, 5), "data").unwrap_err();
    assert!(e.is_corruption());
    let mut off = Visited::new(false);
    assert!(off.visit(PagePointer::new(1, 5), "data").is_ok());
    assert!(off.visit(PagePointer::new(1, 5), "data").is_ok());
}

#[test]
fn test_error_classification() {
    assert!(Error::Corruption("x".to_string()).is_corruption());
    assert!(!Error::NotFound("t".to_string()).is_corruption());
    let overflow = Error::Record(page::Error::BadRecord {
        pointer: PagePointer::new(1, 1),
        slot: 0,
        detail: typed_row::Error::RowOverflow(2),
    });
    assert!(!overflow.is_corruption());
    let truncated = Error::Record(page::Error::BadRecord {
        pointer: PagePointer::new(1, 1),
        slot: 0,
        detail: typed_row::Error::Truncated(2),
    });
    assert!(truncated.is_corruption());
    let missing = Pages::classify(
        PagePointer::new(1, 9),
        "data",
        page_store::Error::PageNotFound(PagePointer::new(1, 9)),
    );
    assert!(missing.is_corruption());
}
