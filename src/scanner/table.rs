//! table scans tables by name.
//!
//! The catalog is consulted in this order:
//! 1. the name is resolved to exactly one table object;
//! 2. the object's heap and clustered index partitions are listed, clustered index first;
//! 3. for each partition, when the scan reaches it: its in-row allocation unit and compression level.
//!
//! An allocation unit with a root page is a clustered index, read by following the leaf page chain
//! from its first page.  One without is a heap, read through its IAM chain.  Partitions are read one
//! after the other; rows are not sorted across them.

use tracing::debug;

use super::{Error, HeapWalk, LinkedWalk, PageWalk, Pages, Rows};
use crate::catalog::{Catalog, Partition, SysObject};
use crate::compression::{CompressionContext, CompressionLevel};
use crate::config::ScanConfig;
use crate::page::DataPage;
use crate::page_pointer::PagePointer;
use crate::page_store::PageStore;
use crate::schema::{RowSchema, StaticSchema};
use crate::typed_row::Row;

/// Scans tables of one database, described by `catalog` and stored in `store`.
#[derive(Clone, Copy)]
pub struct TableScanner<'a> {
    catalog: &'a dyn Catalog,
    store: &'a dyn PageStore,
    config: ScanConfig,
}

impl<'a> TableScanner<'a> {
    pub fn new(catalog: &'a dyn Catalog, store: &'a dyn PageStore) -> Self {
        TableScanner {
            catalog,
            store,
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    fn resolve(&self, table_name: &str) -> Result<SysObject, Error> {
        let mut found = self.catalog.tables_named(table_name);
        match found.len() {
            0 => Err(Error::NotFound(table_name.to_string())),
            1 => Ok(found.remove(0)),
            count => Err(Error::Ambiguous {
                name: table_name.to_string(),
                count,
            }),
        }
    }

    /// Scans the table called `table_name`, with the schema its catalog columns describe.
    ///
    /// Name resolution, partition listing and schema construction happen before this returns; no page is
    /// read until the first row is requested.
    pub fn scan(&self, table_name: &str) -> Result<TableScan<'a>, Error> {
        let object = self.resolve(table_name)?;
        let schema = self.catalog.schema_of(object.id)?;
        self.scan_object(object, schema)
    }

    /// Scans the table called `table_name`, decoding its records with `schema`.
    pub fn scan_with_schema(&self, table_name: &str, schema: RowSchema) -> Result<TableScan<'a>, Error> {
        let object = self.resolve(table_name)?;
        self.scan_object(object, schema)
    }

    /// Scans a table whose row shape is known statically, converting each row to `T`.
    pub fn scan_typed<T: StaticSchema + 'a>(
        &self,
        table_name: &str,
    ) -> Result<impl Iterator<Item = Result<T, Error>> + 'a, Error> {
        let rows = self.scan_with_schema(table_name, T::schema())?;
        Ok(rows.map(|row| -> Result<T, Error> { Ok(T::from_row(row?)?) }))
    }

    /// Reads the rows of a chain of data pages starting at `first`.
    pub fn scan_linked_pages(
        &self,
        first: PagePointer,
        schema: RowSchema,
        level: CompressionLevel,
    ) -> Rows<LinkedWalk<'a>> {
        let walk = LinkedWalk::new(Pages::new(self.store, self.config), first, self.config.detect_cycles);
        Rows::new(walk, schema, CompressionContext::from(level))
    }

    fn scan_object(&self, object: SysObject, schema: RowSchema) -> Result<TableScan<'a>, Error> {
        let partitions = self.catalog.data_partitions(object.id);
        if partitions.is_empty() {
            return Err(Error::NoPartitions(object.name));
        }
        debug!(
            table = %object.name,
            object_id = object.id,
            partitions = partitions.len(),
            columns = schema.len(),
            "scanning table"
        );
        Ok(TableScan {
            scanner: *self,
            schema,
            partitions: partitions.into_iter(),
            current: None,
            done: false,
        })
    }

    fn open_partition(&self, listed: &Partition, schema: &RowSchema) -> Result<Rows<Walk<'a>>, Error> {
        let partition = self
            .catalog
            .partition(listed.partition_id, listed.partition_number)
            .ok_or(Error::PartitionNotFound {
                partition_id: listed.partition_id,
                partition_number: listed.partition_number,
            })?;
        let au = self
            .catalog
            .in_row_allocation_unit(partition.partition_id)
            .map_err(|e| Error::Corruption(e.to_string()))?
            .ok_or(Error::NoAllocationUnit(partition.partition_id))?;
        let level = CompressionLevel::try_from(partition.data_compression).map_err(|e| {
            Error::Corruption(format!("partition {}: {}", partition.partition_id, e))
        })?;
        let pages = Pages::new(self.store, self.config);
        let walk = if !au.root_page.is_zero() {
            debug!(
                partition = partition.partition_id,
                first_page = %au.first_page,
                ?level,
                "scanning clustered index leaf pages"
            );
            Walk::Linked(LinkedWalk::new(pages, au.first_page, self.config.detect_cycles))
        } else {
            debug!(
                partition = partition.partition_id,
                first_iam_page = %au.first_iam_page,
                ?level,
                "scanning heap"
            );
            Walk::Heap(HeapWalk::new(pages, au.first_iam_page, self.config.detect_cycles))
        };
        Ok(Rows::new(walk, schema.clone(), CompressionContext::from(level)))
    }
}

/// The page walk of one partition: either kind of organization.
pub enum Walk<'a> {
    Linked(LinkedWalk<'a>),
    Heap(HeapWalk<'a>),
}

impl<'a> PageWalk for Walk<'a> {
    fn next_page(&mut self) -> Option<Result<DataPage, Error>> {
        match self {
            Walk::Linked(w) => w.next_page(),
            Walk::Heap(w) => w.next_page(),
        }
    }
}

/// iterates over the rows of all partitions of a table.
///
/// The scan is lazy.  To read the table again, start a new scan.
pub struct TableScan<'a> {
    scanner: TableScanner<'a>,
    schema: RowSchema,
    partitions: std::vec::IntoIter<Partition>,
    current: Option<Rows<Walk<'a>>>,
    done: bool,
}

impl<'a> TableScan<'a> {
    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }
}

impl<'a> Iterator for TableScan<'a> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(rows) = &mut self.current {
                match rows.next() {
                    Some(Ok(row)) => return Some(Ok(row)),
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }
            let Some(partition) = self.partitions.next() else {
                self.done = true;
                return None;
            };
            match self.scanner.open_partition(&partition, &self.schema) {
                Ok(rows) => self.current = Some(rows),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
