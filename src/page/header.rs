//! header reads the 96 byte header at the start of every page.

use super::{Error, PageType, PAGE_SIZE};
use crate::page_pointer::PagePointer;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub page_type: PageType,
    /// B-tree level; 0 for leaf pages.
    pub level: u8,
    pub index_id: u16,
    pub prev_page: PagePointer,
    /// Bytes of fixed-length data in the records of this page.
    pub pminlen: u16,
    pub next_page: PagePointer,
    pub slot_count: u16,
    pub object_id: u32,
    pub free_count: u16,
    /// Offset of the first free byte after the last record.
    pub free_data: u16,
    /// The address of this page, as recorded by the page itself.
    pub pointer: PagePointer,
}

fn short(_: std::io::Error) -> Error {
    Error::WrongSize(0)
}

impl Header {
    /// Reads the header at the start of `page`, which must be a whole page.
    pub fn parse(page: &[u8]) -> Result<Header, Error> {
        if page.len() != PAGE_SIZE {
            return Err(Error::WrongSize(page.len()));
        }
        let mut c = Cursor::new(page);

        // Offset	Size	Description
        // 0	1	Header version, always 1.
        c.seek(SeekFrom::Start(1)).map_err(short)?;
        // 1	1	Page type.
        let page_type = PageType::from(c.read_u8().map_err(short)?);
        // 2	1	Type flag bits.
        c.seek(SeekFrom::Current(1)).map_err(short)?;
        // 3	1	Level in the b-tree.
        let level = c.read_u8().map_err(short)?;
        // 4	2	Flag bits.
        c.seek(SeekFrom::Current(2)).map_err(short)?;
        // 6	2	Index id.
        let index_id = c.read_u16::<LittleEndian>().map_err(short)?;
        // 8	4	Previous page id, 12	2	previous page file id.
        let prev_page_id = c.read_u32::<LittleEndian>().map_err(short)?;
        let prev_file_id = c.read_u16::<LittleEndian>().map_err(short)?;
        // 14	2	Fixed length of the records on the page.
        let pminlen = c.read_u16::<LittleEndian>().map_err(short)?;
        // 16	4	Next page id, 20	2	next page file id.
        let next_page_id = c.read_u32::<LittleEndian>().map_err(short)?;
        let next_file_id = c.read_u16::<LittleEndian>().map_err(short)?;
        // 22	2	Number of slots.
        let slot_count = c.read_u16::<LittleEndian>().map_err(short)?;
        // 24	4	Allocation unit / object id.
        let object_id = c.read_u32::<LittleEndian>().map_err(short)?;
        // 28	2	Free bytes, 30	2	offset of free space.
        let free_count = c.read_u16::<LittleEndian>().map_err(short)?;
        let free_data = c.read_u16::<LittleEndian>().map_err(short)?;
        // 32	4	This page's id, 36	2	this page's file id.
        let page_id = c.read_u32::<LittleEndian>().map_err(short)?;
        let file_id = c.read_u16::<LittleEndian>().map_err(short)?;
        // The rest of the header (reserved count, LSN, checksum) is not needed for reading rows.

        Ok(Header {
            page_type,
            level,
            index_id,
            prev_page: PagePointer::new(prev_file_id, prev_page_id),
            pminlen,
            next_page: PagePointer::new(next_file_id, next_page_id),
            slot_count,
            object_id,
            free_count,
            free_data,
            pointer: PagePointer::new(file_id, page_id),
        })
    }

    /// Fails unless the page is of type `expected`.
    pub fn expect_type(&self, expected: PageType, name: &'static str) -> Result<(), Error> {
        if self.page_type == expected {
            Ok(())
        } else {
            Err(Error::WrongType {
                pointer: self.pointer,
                expected: name,
                actual: self.page_type,
            })
        }
    }
}

#[cfg(test)]
pub fn page_with_header(page_type: u8, pointer: PagePointer, next: PagePointer, slot_count: u16) -> Vec<u8> {
    let mut page = vec![0_u8; PAGE_SIZE];
    page[0] = 1;
    page[1] = page_type;
    page[16..20].copy_from_slice(&next.page_id.to_le_bytes());
    page[20..22].copy_from_slice(&next.file_id.to_le_bytes());
    page[22..24].copy_from_slice(&slot_count.to_le_bytes());
    page[32..36].copy_from_slice(&pointer.page_id.to_le_bytes());
    page[36..38].copy_from_slice(&pointer.file_id.to_le_bytes());
    page
}

#[test]
fn test_parse_header() {
    let mut page = page_with_header(1, PagePointer::new(1, 153), PagePointer::new(1, 154), 3);
    page[3] = 0;
    page[8..12].copy_from_slice(&152_u32.to_le_bytes());
    page[12..14].copy_from_slice(&1_u16.to_le_bytes());
    page[14..16].copy_from_slice(&8_u16.to_le_bytes());
    page[24..28].copy_from_slice(&0x1234_u32.to_le_bytes());
    let h = Header::parse(&page).unwrap();
    assert_eq!(h.page_type, PageType::Data);
    assert_eq!(h.pointer, PagePointer::new(1, 153));
    assert_eq!(h.prev_page, PagePointer::new(1, 152));
    assert_eq!(h.next_page, PagePointer::new(1, 154));
    assert_eq!(h.slot_count, 3);
    assert_eq!(h.pminlen, 8);
    assert_eq!(h.object_id, 0x1234);
    assert!(h.expect_type(PageType::Data, "data").is_ok());
    assert_eq!(
        h.expect_type(PageType::Iam, "IAM"),
        Err(Error::WrongType {
            pointer: PagePointer::new(1, 153),
            expected: "IAM",
            actual: PageType::Data
        })
    );
}

#[test]
fn test_header_rejects_partial_page() {
    assert_eq!(Header::parse(&[0_u8; 100]), Err(Error::WrongSize(100)));
}
