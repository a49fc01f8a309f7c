//! Defines `PagePointer`, the address of one page in a (possibly multi-file) database.
//!
//! SQL Server addresses pages as `(file id : page id)`.  On disk a pointer takes 6 bytes:
//! the page id as a little-endian u32, followed by the file id as a little-endian u16.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Size in bytes of a page pointer as stored in page headers, IAM pages and catalog rows.
pub const PAGE_POINTER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PagePointer {
    pub file_id: u16,
    pub page_id: u32,
}

impl PagePointer {
    /// The null pointer: "no page".  Ends page chains and marks unused IAM slots.
    pub const ZERO: PagePointer = PagePointer {
        file_id: 0,
        page_id: 0,
    };

    pub fn new(file_id: u16, page_id: u32) -> Self {
        PagePointer { file_id, page_id }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Reads a 6 byte on-disk pointer from the start of `bytes`.
    ///
    /// Returns `None` if fewer than 6 bytes are available.
    pub fn from_bytes(bytes: &[u8]) -> Option<PagePointer> {
        if bytes.len() < PAGE_POINTER_SIZE {
            return None;
        }
        let mut c = Cursor::new(bytes);
        let page_id = c.read_u32::<LittleEndian>().ok()?;
        let file_id = c.read_u16::<LittleEndian>().ok()?;
        Some(PagePointer { file_id, page_id })
    }

    /// The pointer `n` pages further along in the same file, or `None` past the last addressable page.
    pub fn offset(&self, n: u32) -> Option<PagePointer> {
        Some(PagePointer {
            file_id: self.file_id,
            page_id: self.page_id.checked_add(n)?,
        })
    }
}

impl std::fmt::Display for PagePointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.file_id, self.page_id)
    }
}

#[test]
fn test_page_pointer_from_bytes() {
    let p = PagePointer::from_bytes(&[0x10, 0x01, 0x00, 0x00, 0x01, 0x00]).unwrap();
    assert_eq!(p, PagePointer::new(1, 272));
    assert_eq!(p.to_string(), "(1:272)");
    assert!(PagePointer::from_bytes(&[0x00; 5]).is_none());
    assert!(PagePointer::from_bytes(&[0x00; 6]).unwrap().is_zero());
}

#[test]
fn test_page_pointer_offset() {
    let p = PagePointer::new(3, 16);
    assert_eq!(p.offset(7), Some(PagePointer::new(3, 23)));
    assert_ne!(p.offset(1), Some(p));
    assert_eq!(PagePointer::new(1, u32::MAX).offset(0), Some(PagePointer::new(1, u32::MAX)));
    assert_eq!(PagePointer::new(1, u32::MAX - 2).offset(3), None);
}
