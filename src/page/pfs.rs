//! pfs reads Page Free Space pages.
//!
//! A PFS page holds one descriptor byte for each of the 8088 pages of its interval, starting at
//! offset 100.  The first PFS page of a file is page 1 and covers pages 0 to 8087; after that there is
//! one PFS page every 8088 pages, at the first page of its interval.
//!
//! ```text
//! bits 0-2  fullness
//! bit 3     ghost records present
//! bit 4     IAM page
//! bit 5     mixed extent
//! bit 6     allocated
//! ```

use super::{Error, Header, PageType};
use crate::page_pointer::PagePointer;

pub const PAGES_PER_PFS: u32 = 8088;

const DESCRIPTORS_OFFSET: usize = 100;
const FULLNESS_MASK: u8 = 0x07;
const GHOST_RECORDS_BIT: u8 = 0x08;
const IAM_BIT: u8 = 0x10;
const MIXED_EXTENT_BIT: u8 = 0x20;
const ALLOCATED_BIT: u8 = 0x40;

/// How full a page is, as tracked by PFS.  Only meaningful for heap and LOB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fullness {
    Empty,
    UpTo50,
    UpTo80,
    UpTo95,
    UpTo100,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescription(pub u8);

impl PageDescription {
    pub fn is_allocated(&self) -> bool {
        self.0 & ALLOCATED_BIT != 0
    }

    pub fn in_mixed_extent(&self) -> bool {
        self.0 & MIXED_EXTENT_BIT != 0
    }

    pub fn is_iam_page(&self) -> bool {
        self.0 & IAM_BIT != 0
    }

    pub fn has_ghost_records(&self) -> bool {
        self.0 & GHOST_RECORDS_BIT != 0
    }

    pub fn fullness(&self) -> Fullness {
        match self.0 & FULLNESS_MASK {
            0 => Fullness::Empty,
            1 => Fullness::UpTo50,
            2 => Fullness::UpTo80,
            3 => Fullness::UpTo95,
            4 => Fullness::UpTo100,
            x => Fullness::Unknown(x),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PfsPage {
    pub header: Header,
    data: Vec<u8>,
}

impl PfsPage {
    pub fn parse(data: Vec<u8>) -> Result<PfsPage, Error> {
        let header = Header::parse(&data)?;
        header.expect_type(PageType::Pfs, "PFS")?;
        Ok(PfsPage { header, data })
    }

    /// The address of the PFS page that tracks `page`.
    pub fn pointer_for_page(page: PagePointer) -> PagePointer {
        let page_id = match page.page_id {
            p if p < PAGES_PER_PFS => 1,
            p => p - p % PAGES_PER_PFS,
        };
        PagePointer::new(page.file_id, page_id)
    }

    /// The descriptor of `page_id`, which must fall in this PFS page's interval.
    pub fn page_description(&self, page_id: u32) -> PageDescription {
        let index = (page_id % PAGES_PER_PFS) as usize;
        PageDescription(self.data[DESCRIPTORS_OFFSET + index])
    }

    pub fn is_allocated(&self, page_id: u32) -> bool {
        self.page_description(page_id).is_allocated()
    }
}

#[test]
fn test_pointer_for_page() {
    let p = |id| PfsPage::pointer_for_page(PagePointer::new(1, id));
    assert_eq!(p(0), PagePointer::new(1, 1));
    assert_eq!(p(8087), PagePointer::new(1, 1));
    assert_eq!(p(8088), PagePointer::new(1, 8088));
    assert_eq!(p(20000), PagePointer::new(1, 16176));
    assert_eq!(
        PfsPage::pointer_for_page(PagePointer::new(3, 9000)),
        PagePointer::new(3, 8088)
    );
}

#[test]
fn test_page_descriptions() {
    let mut page = super::header::page_with_header(11, PagePointer::new(1, 8088), PagePointer::ZERO, 1);
    page[DESCRIPTORS_OFFSET + 2] = 0x60 | 0x01;
    page[DESCRIPTORS_OFFSET + 5] = 0x40 | 0x08 | 0x04;
    page[DESCRIPTORS_OFFSET + 6] = 0x70;
    let pfs = PfsPage::parse(page).unwrap();
    assert!(pfs.is_allocated(8090));
    assert!(pfs.page_description(8090).in_mixed_extent());
    assert_eq!(pfs.page_description(8090).fullness(), Fullness::UpTo50);
    assert!(pfs.is_allocated(8093));
    assert!(pfs.page_description(8093).has_ghost_records());
    assert_eq!(pfs.page_description(8093).fullness(), Fullness::UpTo100);
    assert!(pfs.page_description(8094).is_iam_page());
    assert!(!pfs.is_allocated(8091));
    assert!(!pfs.is_allocated(8088));
}
