//! Data page slots hold Records, which contain table rows in the FixedVar format.
//!
//! ```text
//! offset  size  field
//! 0       1     status A: record type in bits 1-3, 0x10 null bitmap, 0x20 variable columns, 0x40 version tag
//! 1       1     status B
//! 2       2     offset of the column count (end of the fixed-length data)
//! 4       n     fixed-length column data
//! ..      2     column count
//! ..      c/8   null bitmap, one bit per column, if status A has 0x10
//! ..      2     variable-length column count, if status A has 0x20
//! ..      2*v   end offset of each variable-length column; 0x8000 marks a complex (off-row) column
//! ..      ..    variable-length column data
//! ```
//!
//! Record parsing only splits the record into spans.  Column types are applied in `typed_row`.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

const NULL_BITMAP_BIT: u8 = 0x10;
const VARIABLE_COLUMNS_BIT: u8 = 0x20;
const COMPLEX_COLUMN_BIT: u16 = 0x8000;
const FIXED_DATA_START: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Primary,
    Forwarded,
    ForwardingStub,
    Index,
    Blob,
    GhostIndex,
    GhostData,
    GhostVersion,
}

impl RecordType {
    pub fn from_status(status_a: u8) -> RecordType {
        match (status_a >> 1) & 0x07 {
            0 => RecordType::Primary,
            1 => RecordType::Forwarded,
            2 => RecordType::ForwardingStub,
            3 => RecordType::Index,
            4 => RecordType::Blob,
            5 => RecordType::GhostIndex,
            6 => RecordType::GhostData,
            _ => RecordType::GhostVersion,
        }
    }

    /// Whether the record carries a live table row.
    /// A forwarded record is read where it lives; its stub in the original slot is skipped.
    pub fn has_row_data(&self) -> bool {
        matches!(self, RecordType::Primary | RecordType::Forwarded)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Record is {len} bytes long but its layout needs {needed}.")]
    Truncated { needed: usize, len: usize },
    #[error("Fixed data ends at offset {0}, before the record header.")]
    BadFixedEnd(usize),
    #[error("Variable column {index} spans {start}..{end}, outside the record.")]
    BadVariableOffset {
        index: usize,
        start: usize,
        end: usize,
    },
}

/// The bytes of one variable-length column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarColumn<'a> {
    pub bytes: &'a [u8],
    /// The bytes are a pointer to data stored outside the record.
    pub complex: bool,
}

#[derive(Debug, Clone)]
pub struct Record<'a> {
    data: &'a [u8],
    status_a: u8,
    fixed_end: usize,
    column_count: usize,
    null_bitmap: &'a [u8],
    var_data_start: usize,
    var_ends: Vec<u16>,
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, Error> {
    let mut c = Cursor::new(data.get(offset..).unwrap_or_default());
    c.read_u16::<LittleEndian>().map_err(|_| Error::Truncated {
        needed: offset + 2,
        len: data.len(),
    })
}

fn slice(data: &[u8], start: usize, len: usize) -> Result<&[u8], Error> {
    data.get(start..start + len).ok_or(Error::Truncated {
        needed: start + len,
        len: data.len(),
    })
}

impl<'a> Record<'a> {
    /// Splits the bytes of one slot into the parts of a FixedVar record.
    ///
    /// # Arguments
    ///
    /// * `data` - The record, starting at its status byte.  Borrowed for the lifetime of the record.
    ///            It may extend past the end of the record; trailing bytes are ignored.
    pub fn parse(data: &'a [u8]) -> Result<Record<'a>, Error> {
        let status_a = *data.first().ok_or(Error::Truncated { needed: 1, len: 0 })?;
        let fixed_end = read_u16(data, 2)? as usize;
        if fixed_end < FIXED_DATA_START {
            return Err(Error::BadFixedEnd(fixed_end));
        }
        let column_count = read_u16(data, fixed_end)? as usize;
        let mut pos = fixed_end + 2;

        let null_bitmap = if status_a & NULL_BITMAP_BIT != 0 {
            let len = (column_count + 7) / 8;
            let bitmap = slice(data, pos, len)?;
            pos += len;
            bitmap
        } else {
            &[]
        };

        let mut var_ends = vec![];
        if status_a & VARIABLE_COLUMNS_BIT != 0 {
            let var_count = read_u16(data, pos)? as usize;
            pos += 2;
            for i in 0..var_count {
                var_ends.push(read_u16(data, pos + 2 * i)?);
            }
            pos += 2 * var_count;
        }

        Ok(Record {
            data,
            status_a,
            fixed_end,
            column_count,
            null_bitmap,
            var_data_start: pos,
            var_ends,
        })
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::from_status(self.status_a)
    }

    /// Number of columns the record was written with.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn var_column_count(&self) -> usize {
        self.var_ends.len()
    }

    /// The fixed-length column data, in column order.
    pub fn fixed_data(&self) -> &'a [u8] {
        &self.data[FIXED_DATA_START..self.fixed_end]
    }

    /// Whether column `colnum` (0-based, counting every column of the record) is NULL.
    /// Columns the record was not written with are NULL.
    pub fn is_null(&self, colnum: usize) -> bool {
        if colnum >= self.column_count {
            return true;
        }
        match self.null_bitmap.get(colnum / 8) {
            Some(b) => b & (1 << (colnum % 8)) != 0,
            None => false,
        }
    }

    /// Returns the `index`th variable-length column, or `None` when the record has fewer.
    pub fn var_column(&self, index: usize) -> Result<Option<VarColumn<'a>>, Error> {
        let Some(&end) = self.var_ends.get(index) else {
            return Ok(None);
        };
        let start = match index {
            0 => self.var_data_start,
            _ => (self.var_ends[index - 1] & !COMPLEX_COLUMN_BIT) as usize,
        };
        let complex = end & COMPLEX_COLUMN_BIT != 0;
        let end = (end & !COMPLEX_COLUMN_BIT) as usize;
        if start > end || end > self.data.len() {
            return Err(Error::BadVariableOffset { index, start, end });
        }
        Ok(Some(VarColumn {
            bytes: &self.data[start..end],
            complex,
        }))
    }
}

#[cfg(test)]
pub fn fixed_var_record(fixed: &[u8], nulls: &[bool], vars: &[&[u8]]) -> Vec<u8> {
    let mut status_a = NULL_BITMAP_BIT;
    if !vars.is_empty() {
        status_a |= VARIABLE_COLUMNS_BIT;
    }
    let mut r = vec![status_a, 0x00];
    r.extend_from_slice(&((FIXED_DATA_START + fixed.len()) as u16).to_le_bytes());
    r.extend_from_slice(fixed);
    r.extend_from_slice(&(nulls.len() as u16).to_le_bytes());
    let mut bitmap = vec![0_u8; (nulls.len() + 7) / 8];
    for (i, null) in nulls.iter().enumerate() {
        if *null {
            bitmap[i / 8] |= 1 << (i % 8);
        }
    }
    r.extend_from_slice(&bitmap);
    if !vars.is_empty() {
        r.extend_from_slice(&(vars.len() as u16).to_le_bytes());
        let mut end = r.len() + 2 * vars.len();
        for v in vars {
            end += v.len();
            r.extend_from_slice(&(end as u16).to_le_bytes());
        }
        for v in vars {
            r.extend_from_slice(v);
        }
    }
    r
}

#[test]
fn test_parse_fixed_only_record() {
    // int 7, smallint 2; two columns, no nulls.
    let data = hex::decode("10000a00070000000200020000").unwrap();
    let r = Record::parse(&data).unwrap();
    assert_eq!(r.record_type(), RecordType::Primary);
    assert_eq!(r.fixed_data(), &[0x07, 0x00, 0x00, 0x00, 0x02, 0x00]);
    assert_eq!(r.column_count(), 2);
    assert_eq!(r.var_column_count(), 0);
    assert!(!r.is_null(0));
    assert!(!r.is_null(1));
    // A column added after the record was written.
    assert!(r.is_null(2));
    assert_eq!(r.var_column(0), Ok(None));
}

#[test]
fn test_parse_record_with_variable_columns() {
    let data = fixed_var_record(&[0x01, 0x00, 0x00, 0x00], &[false, true, false], &[&b"abc"[..], &b""[..], &b"de"[..]]);
    let r = Record::parse(&data).unwrap();
    assert!(r.is_null(1));
    assert_eq!(r.var_column_count(), 3);
    assert_eq!(
        r.var_column(0).unwrap(),
        Some(VarColumn { bytes: b"abc", complex: false })
    );
    assert_eq!(r.var_column(1).unwrap().unwrap().bytes, b"");
    assert_eq!(r.var_column(2).unwrap().unwrap().bytes, b"de");
    assert_eq!(r.var_column(3).unwrap(), None);
}

#[test]
fn test_complex_column_flag() {
    let mut data = fixed_var_record(&[], &[false], &[&[0xaa_u8; 4][..]]);
    // Set the complex bit on the only end offset, which follows the var count.
    let end_offset = data.len() - 4 - 2;
    data[end_offset + 1] |= 0x80;
    let r = Record::parse(&data).unwrap();
    let v = r.var_column(0).unwrap().unwrap();
    assert!(v.complex);
    assert_eq!(v.bytes, &[0xaa; 4]);
}

#[test]
fn test_record_types() {
    assert_eq!(RecordType::from_status(0x30), RecordType::Primary);
    assert_eq!(RecordType::from_status(0x32), RecordType::Forwarded);
    assert_eq!(RecordType::from_status(0x04), RecordType::ForwardingStub);
    assert_eq!(RecordType::from_status(0x3c), RecordType::GhostData);
    assert!(RecordType::Forwarded.has_row_data());
    assert!(!RecordType::GhostData.has_row_data());
}

#[test]
fn test_malformed_records() {
    assert_eq!(Record::parse(&[]).unwrap_err(), Error::Truncated { needed: 1, len: 0 });
    assert_eq!(Record::parse(&[0x10, 0x00, 0x02, 0x00]).unwrap_err(), Error::BadFixedEnd(2));
    // Column count offset past the end.
    assert!(matches!(
        Record::parse(&[0x10, 0x00, 0x08, 0x00, 0x01]).unwrap_err(),
        Error::Truncated { .. }
    ));
    // Variable column ending beyond the record.
    let mut data = fixed_var_record(&[], &[false], &[&b"xy"[..]]);
    data.truncate(data.len() - 1);
    let r = Record::parse(&data).unwrap();
    assert!(matches!(r.var_column(0), Err(Error::BadVariableOffset { .. })));
}
