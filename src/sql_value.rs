//! Defines an enum of all the possible values that a decoded column can have.

use chrono::NaiveDateTime;
use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
/// can hold any value that a scanned column decodes to.
/// Several SQL Server types share one variant: every integer width is an `Int`, every character type
/// is a `Text`, and `money`/`decimal`/`numeric` are all `Decimal`s.
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Decimal(Decimal),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
    Guid(Guid),
    Rid(Rid),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => "NULL".fmt(f),
            SqlValue::Bool(x) => x.fmt(f),
            SqlValue::Int(x) => x.fmt(f),
            SqlValue::Real(x) => x.fmt(f),
            SqlValue::Decimal(x) => x.fmt(f),
            SqlValue::Text(x) => x.fmt(f),
            SqlValue::Blob(_) => "<BLOB>".fmt(f),
            SqlValue::DateTime(x) => x.fmt(f),
            SqlValue::Guid(x) => x.fmt(f),
            SqlValue::Rid(x) => x.fmt(f),
        }
    }
}

/// An exact decimal: `unscaled / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub unscaled: i128,
    pub scale: u8,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u8) -> Self {
        Decimal { unscaled, scale }
    }

    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.unscaled < 0 { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let digits = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

/// A `uniqueidentifier`, kept in on-disk byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl std::fmt::Display for Guid {
    // The first three groups are stored little-endian, the last two as-is.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15]
        )
    }
}

/// Internal row identifier of a heap row: the page and slot it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub file_id: u16,
    pub page_id: u32,
    pub slot: u16,
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{}:{})", self.file_id, self.page_id, self.slot)
    }
}

#[test]
fn test_decimal_display() {
    assert_eq!(Decimal::new(12345, 2).to_string(), "123.45");
    assert_eq!(Decimal::new(-5, 3).to_string(), "-0.005");
    assert_eq!(Decimal::new(42, 0).to_string(), "42");
    assert_eq!(Decimal::new(0, 4).to_string(), "0.0000");
    assert!((Decimal::new(-12345, 2).to_f64() + 123.45).abs() < 1e-9);
}

#[test]
fn test_guid_display() {
    let g = Guid([
        0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ]);
    assert_eq!(g.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
}

#[test]
fn test_sql_value_accessors() {
    let v = SqlValue::Int(7);
    assert_eq!(v.as_int(), Some(&7));
    assert!(v.as_text().is_none());
    assert!(SqlValue::Null.is_null());
    assert_eq!(SqlValue::Null.to_string(), "NULL");
}
