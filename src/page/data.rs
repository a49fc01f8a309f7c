//! data gives access to the rows stored on a data page.

use super::{Error, Header, PageType, PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::compression::CompressionContext;
use crate::page_pointer::PagePointer;
use crate::record::Record;
use crate::schema::RowSchema;
use crate::typed_row::{self, Row};

const SLOT_SIZE: usize = 2;

/// A data page: heap pages and the leaf level of clustered indexes.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub header: Header,
    data: Vec<u8>,
}

impl DataPage {
    pub fn parse(data: Vec<u8>) -> Result<DataPage, Error> {
        let header = Header::parse(&data)?;
        header.expect_type(PageType::Data, "data")?;
        Ok(DataPage { header, data })
    }

    pub fn pointer(&self) -> PagePointer {
        self.header.pointer
    }

    pub fn next_page(&self) -> PagePointer {
        self.header.next_page
    }

    pub fn slot_count(&self) -> usize {
        self.header.slot_count as usize
    }

    // Records live between the header and the slot array.
    fn record_area_end(&self) -> usize {
        PAGE_SIZE.saturating_sub(SLOT_SIZE * self.slot_count())
    }

    /// Offset of the record in `slot`, or `None` for an emptied slot.
    /// Slots are numbered from the end of the page backwards.
    pub fn slot_offset(&self, slot: usize) -> Result<Option<usize>, Error> {
        let bad_slot = |offset| Error::BadSlot {
            pointer: self.pointer(),
            slot,
            offset,
        };
        if slot >= self.slot_count() || self.record_area_end() <= PAGE_HEADER_SIZE {
            return Err(bad_slot(0));
        }
        let at = PAGE_SIZE - SLOT_SIZE * (slot + 1);
        let offset = u16::from_le_bytes([self.data[at], self.data[at + 1]]) as usize;
        match offset {
            0 => Ok(None),
            o if o < PAGE_HEADER_SIZE || o >= self.record_area_end() => Err(bad_slot(o)),
            o => Ok(Some(o)),
        }
    }

    /// The record in `slot`, or `None` for an emptied slot.
    pub fn record(&self, slot: usize) -> Result<Option<Record<'_>>, Error> {
        let Some(offset) = self.slot_offset(slot)? else {
            return Ok(None);
        };
        let record = Record::parse(&self.data[offset..self.record_area_end()]).map_err(|e| {
            Error::BadRecord {
                pointer: self.pointer(),
                slot,
                detail: typed_row::Error::Record(e),
            }
        })?;
        Ok(Some(record))
    }

    /// Decodes the row in `slot`.
    ///
    /// Returns `None` when the slot holds no live row: it is empty, or holds a ghost, a forwarding
    /// stub or some other non-data record.
    pub fn row_at(
        &self,
        slot: usize,
        schema: &RowSchema,
        ctx: &CompressionContext,
    ) -> Result<Option<Row>, Error> {
        let Some(record) = self.record(slot)? else {
            return Ok(None);
        };
        if !record.record_type().has_row_data() {
            return Ok(None);
        }
        typed_row::build_row(schema, &record, ctx)
            .map(Some)
            .map_err(|detail| Error::BadRecord {
                pointer: self.pointer(),
                slot,
                detail,
            })
    }

    /// Iterates the live rows of the page in slot order.
    pub fn rows<'a>(
        &'a self,
        schema: &'a RowSchema,
        ctx: CompressionContext,
    ) -> impl Iterator<Item = Result<Row, Error>> + 'a {
        (0..self.slot_count()).filter_map(move |slot| self.row_at(slot, schema, &ctx).transpose())
    }
}

#[cfg(test)]
fn data_page(pointer: PagePointer, records: &[Option<Vec<u8>>]) -> Vec<u8> {
    let mut page = super::header::page_with_header(1, pointer, PagePointer::ZERO, records.len() as u16);
    let mut offset = PAGE_HEADER_SIZE;
    for (slot, record) in records.iter().enumerate() {
        let at = PAGE_SIZE - SLOT_SIZE * (slot + 1);
        if let Some(r) = record {
            page[offset..offset + r.len()].copy_from_slice(r);
            page[at..at + 2].copy_from_slice(&(offset as u16).to_le_bytes());
            offset += r.len();
        }
    }
    page
}

#[cfg(test)]
use crate::sql_value::SqlValue;

#[cfg(test)]
fn int_schema() -> RowSchema {
    RowSchema::new(vec![crate::column::ColumnDefinition::new("id", "int").unwrap()])
}

#[cfg(test)]
fn int_record(i: i32) -> Vec<u8> {
    crate::record::fixed_var_record(&i.to_le_bytes(), &[false], &[])
}

#[test]
fn test_rows_in_slot_order() {
    let mut ghost = int_record(3);
    ghost[0] |= 6 << 1;
    let page = data_page(
        PagePointer::new(1, 80),
        &[Some(int_record(1)), None, Some(ghost), Some(int_record(2))],
    );
    let page = DataPage::parse(page).unwrap();
    assert_eq!(page.slot_count(), 4);
    assert_eq!(page.slot_offset(1), Ok(None));
    let schema = int_schema();
    let rows: Vec<SqlValue> = page
        .rows(&schema, CompressionContext::NONE)
        .map(|r| r.unwrap().items[0].clone())
        .collect();
    assert_eq!(rows, vec![SqlValue::Int(1), SqlValue::Int(2)]);
}

#[test]
fn test_data_page_rejects_other_types() {
    let page = super::header::page_with_header(10, PagePointer::new(1, 9), PagePointer::ZERO, 0);
    assert!(matches!(DataPage::parse(page), Err(Error::WrongType { .. })));
}

#[test]
fn test_bad_slot_offset() {
    let mut page = data_page(PagePointer::new(1, 80), &[Some(int_record(1))]);
    page[PAGE_SIZE - 2..].copy_from_slice(&10_u16.to_le_bytes());
    let page = DataPage::parse(page).unwrap();
    assert_eq!(
        page.slot_offset(0),
        Err(Error::BadSlot {
            pointer: PagePointer::new(1, 80),
            slot: 0,
            offset: 10
        })
    );
    assert!(page.rows(&int_schema(), CompressionContext::NONE).next().unwrap().is_err());
}

#[test]
fn test_row_decode_error_reports_slot() {
    let page = data_page(PagePointer::new(1, 80), &[Some(int_record(1))]);
    let page = DataPage::parse(page).unwrap();
    let wide = RowSchema::new(vec![crate::column::ColumnDefinition::new("id", "bigint").unwrap()]);
    assert!(matches!(
        page.row_at(0, &wide, &CompressionContext::NONE),
        Err(Error::BadRecord { slot: 0, detail: typed_row::Error::Truncated(0), .. })
    ));
}
