//! iam reads Index Allocation Map pages.
//!
//! An IAM page lists the pages of one allocation unit within a 4 GB range of one file:
//!
//! ```text
//! offset  size   field
//! 136     6      start page of the mapped range
//! 142     8*6    single page allocations (header slots), zero when unused
//! 194     7988   extent bitmap: bit i (least significant bit first) is extent start + 8*i
//! ```
//!
//! IAM pages of one allocation unit are chained through the next-page pointer of their headers.

use super::{Error, Header, PageType, PAGE_SIZE};
use crate::page_pointer::{PagePointer, PAGE_POINTER_SIZE};

pub const PAGES_PER_EXTENT: u32 = 8;
pub const HEADER_SLOT_COUNT: usize = 8;

const START_PAGE_OFFSET: usize = 136;
const SLOTS_OFFSET: usize = 142;
const BITMAP_OFFSET: usize = 194;
const BITMAP_SIZE: usize = 7988;
/// Pages in the range one IAM page maps.
const MAPPED_PAGES: u32 = BITMAP_SIZE as u32 * 8 * PAGES_PER_EXTENT;

/// Eight contiguous pages, starting on a multiple of eight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub start: PagePointer,
}

impl Extent {
    pub fn pages(&self) -> impl Iterator<Item = PagePointer> {
        let start = self.start;
        (0..PAGES_PER_EXTENT).filter_map(move |i| start.offset(i))
    }
}

#[derive(Debug, Clone)]
pub struct IamPage {
    pub header: Header,
    pub start_page: PagePointer,
    slots: [PagePointer; HEADER_SLOT_COUNT],
    data: Vec<u8>,
}

impl IamPage {
    pub fn parse(data: Vec<u8>) -> Result<IamPage, Error> {
        let header = Header::parse(&data)?;
        header.expect_type(PageType::Iam, "IAM")?;
        // Header::parse checked the page size, so these fixed offsets are in bounds.
        let pointer_at = |offset: usize| {
            PagePointer::from_bytes(&data[offset..offset + PAGE_POINTER_SIZE]).unwrap_or_default()
        };
        let start_page = pointer_at(START_PAGE_OFFSET);
        if start_page.page_id % PAGES_PER_EXTENT != 0 {
            return Err(Error::MisalignedIam {
                pointer: header.pointer,
                start: start_page,
            });
        }
        if start_page.offset(MAPPED_PAGES - 1).is_none() {
            return Err(Error::IamRangeOverflow {
                pointer: header.pointer,
                start: start_page,
            });
        }
        let mut slots = [PagePointer::ZERO; HEADER_SLOT_COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = pointer_at(SLOTS_OFFSET + i * PAGE_POINTER_SIZE);
        }
        Ok(IamPage {
            header,
            start_page,
            slots,
            data,
        })
    }

    pub fn next_page(&self) -> PagePointer {
        self.header.next_page
    }

    /// The 8 header slots in slot order, including unused (zero) ones.
    pub fn slots(&self) -> &[PagePointer; HEADER_SLOT_COUNT] {
        &self.slots
    }

    /// The extents the bitmap marks as allocated, in bitmap order.
    pub fn allocated_extents(&self) -> impl Iterator<Item = Extent> + '_ {
        let bitmap = &self.data[BITMAP_OFFSET..(BITMAP_OFFSET + BITMAP_SIZE).min(PAGE_SIZE)];
        let start = self.start_page;
        bitmap.iter().enumerate().flat_map(move |(byte_index, &byte)| {
            // parse checked that the whole mapped range is addressable.
            (0..8_u32)
                .filter(move |bit| byte & (1 << bit) != 0)
                .filter_map(move |bit| start.offset((byte_index as u32 * 8 + bit) * PAGES_PER_EXTENT))
                .map(|start| Extent { start })
        })
    }
}

#[cfg(test)]
fn iam_page(start: PagePointer, slots: &[PagePointer], extent_bits: &[usize]) -> Vec<u8> {
    let mut page = super::header::page_with_header(10, PagePointer::new(1, 9), PagePointer::ZERO, 2);
    page[START_PAGE_OFFSET..START_PAGE_OFFSET + 4].copy_from_slice(&start.page_id.to_le_bytes());
    page[START_PAGE_OFFSET + 4..START_PAGE_OFFSET + 6].copy_from_slice(&start.file_id.to_le_bytes());
    for (i, p) in slots.iter().enumerate() {
        let at = SLOTS_OFFSET + i * PAGE_POINTER_SIZE;
        page[at..at + 4].copy_from_slice(&p.page_id.to_le_bytes());
        page[at + 4..at + 6].copy_from_slice(&p.file_id.to_le_bytes());
    }
    for bit in extent_bits {
        page[BITMAP_OFFSET + bit / 8] |= 1 << (bit % 8);
    }
    page
}

#[test]
fn test_iam_slots() {
    let page = iam_page(
        PagePointer::new(1, 0),
        &[PagePointer::new(1, 80), PagePointer::ZERO, PagePointer::new(1, 115)],
        &[],
    );
    let iam = IamPage::parse(page).unwrap();
    assert_eq!(iam.slots()[0], PagePointer::new(1, 80));
    assert!(iam.slots()[1].is_zero());
    assert_eq!(iam.slots()[2], PagePointer::new(1, 115));
    assert!(iam.slots()[3..].iter().all(|p| p.is_zero()));
    assert_eq!(iam.allocated_extents().count(), 0);
    assert!(iam.next_page().is_zero());
}

#[test]
fn test_iam_allocated_extents() {
    let iam = IamPage::parse(iam_page(PagePointer::new(1, 0), &[], &[2, 9, 63903])).unwrap();
    let starts: Vec<u32> = iam.allocated_extents().map(|e| e.start.page_id).collect();
    assert_eq!(starts, vec![16, 72, 63903 * 8]);
    // All extents are in the file of the mapped range.
    assert!(iam.allocated_extents().all(|e| e.start.file_id == 1));
}

#[test]
fn test_extent_pages() {
    let e = Extent {
        start: PagePointer::new(1, 24),
    };
    let pages: Vec<u32> = e.pages().map(|p| p.page_id).collect();
    assert_eq!(pages, (24..32).collect::<Vec<u32>>());
}

#[test]
fn test_iam_rejects_range_past_last_page() {
    let page = iam_page(PagePointer::new(1, 0xFFFF_FFF8), &[], &[1]);
    assert!(matches!(IamPage::parse(page), Err(Error::IamRangeOverflow { .. })));
    // The last range that still fits.
    let last = u32::MAX - (MAPPED_PAGES - 1);
    let last = last - last % PAGES_PER_EXTENT;
    assert!(IamPage::parse(iam_page(PagePointer::new(1, last), &[], &[])).is_ok());
}

#[test]
fn test_iam_rejects_misaligned_range() {
    let page = iam_page(PagePointer::new(1, 3), &[], &[]);
    assert!(matches!(IamPage::parse(page), Err(Error::MisalignedIam { .. })));
}
