//! Defines the `PageStore` trait, through which scans fetch pages, and `MemoryPageStore`, which holds
//! page images in memory.
//!
//! A page store only hands out bytes.  Parsing them into typed pages is done by the provided methods,
//! which fail when the page found at an address is not of the expected kind.

use std::collections::HashMap;

use crate::page::{self, DataPage, IamPage, PfsPage, PAGE_SIZE};
use crate::page_pointer::PagePointer;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page {0} does not exist.")]
    PageNotFound(PagePointer),
    #[error("No data file with id {0} is attached.")]
    UnknownFile(u16),
    #[error("Error reading data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data file lock was poisoned by a panicking reader.")]
    LockPoisoned,
    #[error("Invalid page: {0}")]
    Page(#[from] page::Error),
}

/// Read access to the pages of a database, addressed by `PagePointer`.
///
/// Implementations take `&self` so that independent scans can share one store.
pub trait PageStore {
    /// Returns the raw bytes of one page.
    fn get_page(&self, pointer: PagePointer) -> Result<Vec<u8>, Error>;

    fn get_data_page(&self, pointer: PagePointer) -> Result<DataPage, Error> {
        Ok(DataPage::parse(self.get_page(pointer)?)?)
    }

    fn get_iam_page(&self, pointer: PagePointer) -> Result<IamPage, Error> {
        Ok(IamPage::parse(self.get_page(pointer)?)?)
    }

    fn get_pfs_page(&self, pointer: PagePointer) -> Result<PfsPage, Error> {
        Ok(PfsPage::parse(self.get_page(pointer)?)?)
    }
}

impl<T: PageStore + ?Sized> PageStore for &T {
    fn get_page(&self, pointer: PagePointer) -> Result<Vec<u8>, Error> {
        (**self).get_page(pointer)
    }
}

/// Page images held in memory, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct MemoryPageStore {
    pages: HashMap<PagePointer, Vec<u8>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `page` at `pointer`, replacing any page already there.
    ///
    /// # Arguments
    ///
    /// * `pointer` - The address the page is served from.  This need not match the address in the page's
    ///               own header, which allows misplaced pages to be staged.
    /// * `page` - A whole page image.
    pub fn insert(&mut self, pointer: PagePointer, page: Vec<u8>) -> Result<(), Error> {
        if page.len() != PAGE_SIZE {
            return Err(Error::Page(page::Error::WrongSize(page.len())));
        }
        self.pages.insert(pointer, page);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageStore for MemoryPageStore {
    fn get_page(&self, pointer: PagePointer) -> Result<Vec<u8>, Error> {
        self.pages
            .get(&pointer)
            .cloned()
            .ok_or(Error::PageNotFound(pointer))
    }
}

#[cfg(test)]
fn blank_page(page_type: u8, pointer: PagePointer) -> Vec<u8> {
    let mut page = vec![0_u8; PAGE_SIZE];
    page[1] = page_type;
    page[32..36].copy_from_slice(&pointer.page_id.to_le_bytes());
    page[36..38].copy_from_slice(&pointer.file_id.to_le_bytes());
    page
}

#[test]
fn test_memory_page_store() {
    let mut store = MemoryPageStore::new();
    let p = PagePointer::new(1, 100);
    store.insert(p, blank_page(1, p)).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get_page(p).unwrap().len(), PAGE_SIZE);
    assert_eq!(store.get_data_page(p).unwrap().pointer(), p);
    assert!(matches!(
        store.get_page(PagePointer::new(1, 101)),
        Err(Error::PageNotFound(x)) if x == PagePointer::new(1, 101)
    ));
}

#[test]
fn test_typed_fetch_checks_page_type() {
    let mut store = MemoryPageStore::new();
    let p = PagePointer::new(1, 1);
    store.insert(p, blank_page(11, p)).unwrap();
    assert!(store.get_pfs_page(p).is_ok());
    assert!(matches!(
        store.get_iam_page(p),
        Err(Error::Page(page::Error::WrongType { .. }))
    ));
    assert!(matches!(
        store.get_data_page(p),
        Err(Error::Page(page::Error::WrongType { .. }))
    ));
}

#[test]
fn test_insert_rejects_partial_page() {
    let mut store = MemoryPageStore::new();
    assert!(store.insert(PagePointer::new(1, 1), vec![0; 10]).is_err());
    assert!(store.is_empty());
}
