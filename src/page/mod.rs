//! SQL Server data files are divided into 8 KiB pages.
//! Every page starts with a 96 byte header, and most pages end with a slot array.
//! A page is divided into regions in the following order
//! 1 The 96-byte page header
//! 2 The page body: records, allocation bitmaps or PFS bytes, depending on the page type
//! 3 Free space
//! 4 The slot array, growing backwards from the end of the page: one u16 record offset per slot
//!
//! Only the page kinds a table scan touches are parsed: data pages, IAM pages and PFS pages.

/// module `header` reads the fixed page header common to all page types.
pub mod header;
/// module `data` gives access to the records of data and index pages.
pub mod data;
/// module `iam` reads Index Allocation Map pages.
pub mod iam;
/// module `pfs` reads Page Free Space pages.
pub mod pfs;

pub use data::DataPage;
pub use header::Header;
pub use iam::{Extent, IamPage};
pub use pfs::{PageDescription, PfsPage};

use crate::page_pointer::PagePointer;

pub const PAGE_SIZE: usize = 8192;
pub const PAGE_HEADER_SIZE: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Data,
    Index,
    TextMix,
    TextTree,
    Sort,
    Gam,
    Sgam,
    Iam,
    Pfs,
    Boot,
    FileHeader,
    DiffMap,
    MlMap,
    Unknown(u8),
}

impl From<u8> for PageType {
    fn from(b: u8) -> Self {
        match b {
            1 => PageType::Data,
            2 => PageType::Index,
            3 => PageType::TextMix,
            4 => PageType::TextTree,
            7 => PageType::Sort,
            8 => PageType::Gam,
            9 => PageType::Sgam,
            10 => PageType::Iam,
            11 => PageType::Pfs,
            13 => PageType::Boot,
            15 => PageType::FileHeader,
            16 => PageType::DiffMap,
            17 => PageType::MlMap,
            x => PageType::Unknown(x),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Page is {0} bytes, expected 8192.")]
    WrongSize(usize),
    #[error("Page {pointer} is a {actual:?} page, expected {expected}.")]
    WrongType {
        pointer: PagePointer,
        expected: &'static str,
        actual: PageType,
    },
    #[error("IAM page {pointer} maps a range starting at {start}, which is not on an extent boundary.")]
    MisalignedIam {
        pointer: PagePointer,
        start: PagePointer,
    },
    #[error("IAM page {pointer} maps a range starting at {start}, which runs past the last page id.")]
    IamRangeOverflow {
        pointer: PagePointer,
        start: PagePointer,
    },
    #[error("Slot {slot} of page {pointer} points to offset {offset}, outside the record area.")]
    BadSlot {
        pointer: PagePointer,
        slot: usize,
        offset: usize,
    },
    #[error("Slot {slot} of page {pointer}: {detail}")]
    BadRecord {
        pointer: PagePointer,
        slot: usize,
        detail: crate::typed_row::Error,
    },
}
