//! Defines the closed set of SQL Server column types, their on-disk lengths, and how to decode them.
//!
//! Length and decoding are kept together: the record parser hands each column exactly
//! `fixed_length()` bytes, so a wrong length here misaligns every later column of the record.
//!
//! Decimal-family types (`decimal`, `numeric`, `float`) are the only types whose length depends on
//! the compression context: under vardecimal storage they move to the variable-length section.

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read};
use std::str::FromStr;

use crate::compression::CompressionContext;
use crate::parser::{parse_type_string, TypeArg};
use crate::sql_value::{self, Guid, SqlValue};

/// Floats are stored as two 4-byte storage units whatever their declared precision.
const FLOAT_STORAGE_UNITS: usize = 2;
const STORAGE_UNIT_BYTES: usize = 4;

const MAX_DECIMAL_PRECISION: u32 = 38;
const MAX_FLOAT_PRECISION: u32 = 53;
const MAX_SINGLE_PRECISION: u8 = 24;
const MAX_FIXED_LENGTH: u32 = 8000;
const MONEY_SCALE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Bit,
    Decimal { precision: u8, scale: u8 },
    Numeric { precision: u8, scale: u8 },
    Float { precision: u8 },
    Money,
    SmallMoney,
    DateTime,
    SmallDateTime,
    /// Fixed-length character data of the given byte length.
    Char(u16),
    /// Fixed-length UTF-16 data of the given byte length.
    NChar(u16),
    Binary(u16),
    VarChar,
    NVarChar,
    VarBinary,
    Text,
    NText,
    Image,
    UniqueIdentifier,
    /// Hidden column that makes non-unique clustered index keys unique.
    Uniquifier,
    /// Hidden row locator (file, page, slot).
    Rid,
    SqlVariant,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Invalid value length for {sql_type}: {actual} bytes, expected {expected}.")]
    LengthMismatch {
        sql_type: SqlType,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid {sql_type} value: {detail}")]
    InvalidValue { sql_type: SqlType, detail: String },
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use SqlType::*;
        match self {
            TinyInt => "tinyint".fmt(f),
            SmallInt => "smallint".fmt(f),
            Int => "int".fmt(f),
            BigInt => "bigint".fmt(f),
            Bit => "bit".fmt(f),
            Decimal { precision, scale } => write!(f, "decimal({},{})", precision, scale),
            Numeric { precision, scale } => write!(f, "numeric({},{})", precision, scale),
            Float { precision } => write!(f, "float({})", precision),
            Money => "money".fmt(f),
            SmallMoney => "smallmoney".fmt(f),
            DateTime => "datetime".fmt(f),
            SmallDateTime => "smalldatetime".fmt(f),
            Char(n) => write!(f, "char({})", n),
            NChar(n) => write!(f, "nchar({})", n),
            Binary(n) => write!(f, "binary({})", n),
            VarChar => "varchar".fmt(f),
            NVarChar => "nvarchar".fmt(f),
            VarBinary => "varbinary".fmt(f),
            Text => "text".fmt(f),
            NText => "ntext".fmt(f),
            Image => "image".fmt(f),
            UniqueIdentifier => "uniqueidentifier".fmt(f),
            Uniquifier => "uniquifier".fmt(f),
            Rid => "rid".fmt(f),
            SqlVariant => "sql_variant".fmt(f),
        }
    }
}

impl FromStr for SqlType {
    type Err = Error;

    /// Parses a catalog type string such as `int`, `char(10)` or `decimal(18,2)`.
    ///
    /// Lengths in `char`, `nchar` and `binary` are byte lengths, as the catalog stores them.
    /// Precision is taken as written; no adjustment is applied for `numeric`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SqlType::*;
        let unsupported = || Error::UnsupportedType(s.to_string());
        let ts = parse_type_string(s).ok_or_else(unsupported)?;
        let int_arg = |i: usize| match ts.args.get(i) {
            Some(TypeArg::Int(n)) => Some(*n),
            _ => None,
        };
        let length = || -> Result<u16, Error> {
            match int_arg(0) {
                Some(n) if n > 0 && n <= MAX_FIXED_LENGTH => Ok(n as u16),
                _ => Err(unsupported()),
            }
        };
        let precision_scale = || -> Result<(u8, u8), Error> {
            let precision = if ts.args.is_empty() { Some(18) } else { int_arg(0) };
            let scale = if ts.args.len() > 1 { int_arg(1) } else { Some(0) };
            match (precision, scale) {
                (Some(p), Some(s))
                    if ts.args.len() <= 2 && (1..=MAX_DECIMAL_PRECISION).contains(&p) && s <= p =>
                {
                    Ok((p as u8, s as u8))
                }
                _ => Err(unsupported()),
            }
        };
        let t = match ts.name.as_str() {
            "tinyint" => TinyInt,
            "smallint" => SmallInt,
            "int" => Int,
            "bigint" => BigInt,
            "bit" => Bit,
            "decimal" => {
                let (precision, scale) = precision_scale()?;
                Decimal { precision, scale }
            }
            "numeric" => {
                let (precision, scale) = precision_scale()?;
                Numeric { precision, scale }
            }
            "float" => {
                let precision = if ts.args.is_empty() {
                    MAX_FLOAT_PRECISION
                } else {
                    int_arg(0).ok_or_else(unsupported)?
                };
                if ts.args.len() > 1 || !(1..=MAX_FLOAT_PRECISION).contains(&precision) {
                    return Err(unsupported());
                }
                Float {
                    precision: precision as u8,
                }
            }
            "real" => Float {
                precision: MAX_SINGLE_PRECISION,
            },
            "money" => Money,
            "smallmoney" => SmallMoney,
            "datetime" => DateTime,
            "smalldatetime" => SmallDateTime,
            "char" => Char(length()?),
            "nchar" => NChar(length()?),
            "binary" => Binary(length()?),
            "varchar" => VarChar,
            "nvarchar" | "sysname" => NVarChar,
            "varbinary" => VarBinary,
            "text" => Text,
            "ntext" => NText,
            "image" => Image,
            "uniqueidentifier" => UniqueIdentifier,
            "uniquifier" => Uniquifier,
            "rid" => Rid,
            "sql_variant" => SqlVariant,
            _ => return Err(unsupported()),
        };
        Ok(t)
    }
}

impl SqlType {
    /// The number of bytes a value occupies when stored in the fixed-length section,
    /// or `None` for types that are always variable length.
    fn storage_length(&self) -> Option<usize> {
        use SqlType::*;
        match self {
            TinyInt | Bit => Some(1),
            SmallInt => Some(2),
            Int | SmallMoney | SmallDateTime => Some(4),
            BigInt | Money | DateTime | Rid => Some(8),
            Decimal { precision, .. } | Numeric { precision, .. } => {
                Some(decimal_storage_length(*precision))
            }
            Float { .. } => Some(FLOAT_STORAGE_UNITS * STORAGE_UNIT_BYTES),
            Char(n) | NChar(n) | Binary(n) => Some(*n as usize),
            UniqueIdentifier => Some(16),
            VarChar | NVarChar | VarBinary | Text | NText | Image | Uniquifier | SqlVariant => None,
        }
    }

    /// Whether values of this type live in the variable-length section of a record.
    pub fn is_variable_length(&self, ctx: &CompressionContext) -> bool {
        match self {
            SqlType::Decimal { .. } | SqlType::Numeric { .. } | SqlType::Float { .. } => {
                ctx.uses_vardecimals
            }
            _ => self.storage_length().is_none(),
        }
    }

    /// Byte length in the fixed-length section; `None` when the type is variable length in `ctx`.
    pub fn fixed_length(&self, ctx: &CompressionContext) -> Option<usize> {
        if self.is_variable_length(ctx) {
            None
        } else {
            self.storage_length()
        }
    }

    /// Large object types, whose in-row value may be a pointer to off-row data.
    pub fn is_lob(&self) -> bool {
        matches!(self, SqlType::Text | SqlType::NText | SqlType::Image)
    }

    fn invalid(&self, detail: impl Into<String>) -> Error {
        Error::InvalidValue {
            sql_type: *self,
            detail: detail.into(),
        }
    }

    fn length_mismatch(&self, expected: usize, actual: usize) -> Error {
        Error::LengthMismatch {
            sql_type: *self,
            expected,
            actual,
        }
    }

    /// Converts the raw bytes of one column into a value.
    ///
    /// `bytes` must be exactly `fixed_length(ctx)` long when that is `Some`.
    /// Bit columns are passed as a single byte holding 0 or 1.
    pub fn decode(&self, bytes: &[u8], ctx: &CompressionContext) -> Result<SqlValue, Error> {
        use SqlType::*;
        if let Some(expected) = self.fixed_length(ctx) {
            if bytes.len() != expected {
                return Err(self.length_mismatch(expected, bytes.len()));
            }
        }
        let short = |_: std::io::Error| self.invalid("value is truncated");
        let mut c = Cursor::new(bytes);
        match self {
            TinyInt => Ok(SqlValue::Int(c.read_u8().map_err(short)? as i64)),
            SmallInt => Ok(SqlValue::Int(
                c.read_i16::<LittleEndian>().map_err(short)? as i64,
            )),
            Int => Ok(SqlValue::Int(
                c.read_i32::<LittleEndian>().map_err(short)? as i64,
            )),
            BigInt => Ok(SqlValue::Int(c.read_i64::<LittleEndian>().map_err(short)?)),
            Bit => Ok(SqlValue::Bool(c.read_u8().map_err(short)? & 1 == 1)),
            Decimal { scale, .. } | Numeric { scale, .. } => {
                if ctx.uses_vardecimals {
                    crate::vardecimal::decode(bytes, *scale)
                        .map(SqlValue::Decimal)
                        .map_err(|e| self.invalid(e.to_string()))
                } else {
                    self.decode_fixed_decimal(bytes, *scale)
                }
            }
            Float { precision } => {
                // The storage unit count is fixed, so the span must be complete even when the
                // column sits in the variable-length section.
                let expected = FLOAT_STORAGE_UNITS * STORAGE_UNIT_BYTES;
                if bytes.len() != expected {
                    return Err(self.length_mismatch(expected, bytes.len()));
                }
                let v = c.read_f64::<LittleEndian>().map_err(short)?;
                if *precision <= MAX_SINGLE_PRECISION {
                    Ok(SqlValue::Real(v as f32 as f64))
                } else {
                    Ok(SqlValue::Real(v))
                }
            }
            Money => Ok(SqlValue::Decimal(sql_value::Decimal::new(
                c.read_i64::<LittleEndian>().map_err(short)? as i128,
                MONEY_SCALE,
            ))),
            SmallMoney => Ok(SqlValue::Decimal(sql_value::Decimal::new(
                c.read_i32::<LittleEndian>().map_err(short)? as i128,
                MONEY_SCALE,
            ))),
            DateTime => {
                // Time as 1/300 second ticks since midnight, then days since 1900-01-01.
                let ticks = c.read_i32::<LittleEndian>().map_err(short)? as i64;
                let days = c.read_i32::<LittleEndian>().map_err(short)? as i64;
                since_1900(days, Duration::nanoseconds(ticks * 10_000_000 / 3))
                    .map(SqlValue::DateTime)
                    .ok_or_else(|| self.invalid("date out of range"))
            }
            SmallDateTime => {
                let minutes = c.read_u16::<LittleEndian>().map_err(short)? as i64;
                let days = c.read_u16::<LittleEndian>().map_err(short)? as i64;
                since_1900(days, Duration::minutes(minutes))
                    .map(SqlValue::DateTime)
                    .ok_or_else(|| self.invalid("date out of range"))
            }
            Char(_) | VarChar => Ok(SqlValue::Text(latin1(bytes))),
            NChar(_) | NVarChar => utf16le(bytes)
                .map(SqlValue::Text)
                .ok_or_else(|| self.invalid("not valid UTF-16")),
            Binary(_) | VarBinary => Ok(SqlValue::Blob(bytes.to_vec())),
            // In-row LOB values are text pointers or inline data; both are returned raw.
            Text | NText | Image => Ok(SqlValue::Blob(bytes.to_vec())),
            UniqueIdentifier => {
                let mut g = [0_u8; 16];
                c.read_exact(&mut g).map_err(short)?;
                Ok(SqlValue::Guid(Guid(g)))
            }
            Uniquifier => match bytes.len() {
                0 => Ok(SqlValue::Int(0)),
                4 => Ok(SqlValue::Int(
                    c.read_i32::<LittleEndian>().map_err(short)? as i64,
                )),
                n => Err(self.length_mismatch(4, n)),
            },
            Rid => {
                let page_id = c.read_u32::<LittleEndian>().map_err(short)?;
                let file_id = c.read_u16::<LittleEndian>().map_err(short)?;
                let slot = c.read_u16::<LittleEndian>().map_err(short)?;
                Ok(SqlValue::Rid(sql_value::Rid {
                    file_id,
                    page_id,
                    slot,
                }))
            }
            SqlVariant => self.decode_variant(bytes),
        }
    }

    // Sign byte (1 = positive) followed by the little-endian magnitude.
    fn decode_fixed_decimal(&self, bytes: &[u8], scale: u8) -> Result<SqlValue, Error> {
        let (sign, magnitude) = bytes
            .split_first()
            .ok_or_else(|| self.invalid("missing sign byte"))?;
        if magnitude.len() > 16 {
            return Err(self.invalid("magnitude wider than 128 bits"));
        }
        let mut buf = [0_u8; 16];
        buf[..magnitude.len()].copy_from_slice(magnitude);
        let unscaled = i128::try_from(u128::from_le_bytes(buf))
            .map_err(|_| self.invalid("magnitude out of range"))?;
        let unscaled = if *sign == 1 { unscaled } else { -unscaled };
        Ok(SqlValue::Decimal(sql_value::Decimal::new(unscaled, scale)))
    }

    // sql_variant: base type id, version, type-specific properties, then the value.
    fn decode_variant(&self, bytes: &[u8]) -> Result<SqlValue, Error> {
        use SqlType::*;
        const HEADER: usize = 2;
        let (&base_type, _) = bytes
            .split_first()
            .ok_or_else(|| self.invalid("missing base type"))?;
        let (inner, properties) = match base_type {
            48 => (TinyInt, 0),
            52 => (SmallInt, 0),
            56 => (Int, 0),
            127 => (BigInt, 0),
            104 => (Bit, 0),
            59 => (Float { precision: 24 }, 0),
            62 => (Float { precision: 53 }, 0),
            60 => (Money, 0),
            122 => (SmallMoney, 0),
            61 => (DateTime, 0),
            58 => (SmallDateTime, 0),
            36 => (UniqueIdentifier, 0),
            106 | 108 => (Numeric { precision: 0, scale: 0 }, 2),
            165 | 173 => (VarBinary, 2),
            167 | 175 => (VarChar, 7),
            231 | 239 => (NVarChar, 7),
            x => return Err(self.invalid(format!("unsupported base type {}", x))),
        };
        let value = bytes
            .get(HEADER + properties..)
            .ok_or_else(|| self.invalid("value is truncated"))?;
        let inner = match inner {
            SqlType::Numeric { .. } => SqlType::Numeric {
                precision: bytes[HEADER],
                scale: bytes[HEADER + 1],
            },
            // Real values are stored in 4 bytes inside a variant.
            SqlType::Float { precision: 24 } => {
                if value.len() != STORAGE_UNIT_BYTES {
                    return Err(inner.length_mismatch(STORAGE_UNIT_BYTES, value.len()));
                }
                let v = Cursor::new(value)
                    .read_f32::<LittleEndian>()
                    .map_err(|_| self.invalid("value is truncated"))?;
                return Ok(SqlValue::Real(v as f64));
            }
            t => t,
        };
        if let SqlType::Numeric { scale, .. } = inner {
            return inner.decode_fixed_decimal(value, scale);
        }
        inner.decode(value, &CompressionContext::NONE)
    }
}

/// Bytes in the fixed-length section of a non-vardecimal decimal of the given precision.
fn decimal_storage_length(precision: u8) -> usize {
    match precision {
        0..=9 => 5,
        10..=19 => 9,
        20..=28 => 13,
        _ => 17,
    }
}

fn since_1900(days: i64, time: Duration) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1900, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(time)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn utf16le(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
use crate::compression::CompressionLevel;

#[test]
fn test_parse_sql_types() {
    use SqlType::*;
    let cases = vec![
        ("int", Int),
        ("bigint", BigInt),
        ("decimal(10,2)", Decimal { precision: 10, scale: 2 }),
        ("numeric(18,0)", Numeric { precision: 18, scale: 0 }),
        ("numeric(9)", Numeric { precision: 9, scale: 0 }),
        ("float(53)", Float { precision: 53 }),
        ("float", Float { precision: 53 }),
        ("real", Float { precision: 24 }),
        ("char(10)", Char(10)),
        ("nchar(20)", NChar(20)),
        ("binary(6)", Binary(6)),
        ("nvarchar(max)", NVarChar),
        ("sysname", NVarChar),
        ("uniquifier", Uniquifier),
        ("sql_variant", SqlVariant),
    ];
    for (input, expected) in cases {
        assert_eq!(SqlType::from_str(input), Ok(expected), "parsing {}", input);
    }
}

#[test]
fn test_parse_unsupported_types() {
    for input in ["xml", "geography", "char", "decimal(39,0)", "decimal(5,6)", "float(60)", "char(max)", "decimal(1,2,3)"] {
        assert_eq!(
            SqlType::from_str(input),
            Err(Error::UnsupportedType(input.to_string())),
            "parsing {}",
            input
        );
    }
}

#[test]
fn test_decimal_length_depends_on_compression() {
    let t = SqlType::from_str("decimal(10,2)").unwrap();
    let none = CompressionContext::from(CompressionLevel::None);
    let page = CompressionContext::from(CompressionLevel::Page);
    assert!(!t.is_variable_length(&none));
    assert_eq!(t.fixed_length(&none), Some(9));
    assert!(t.is_variable_length(&page));
    assert_eq!(t.fixed_length(&page), None);

    // Types outside the decimal family ignore compression.
    let i = SqlType::Int;
    assert_eq!(i.fixed_length(&none), Some(4));
    assert_eq!(i.fixed_length(&page), Some(4));
    assert!(SqlType::VarChar.is_variable_length(&none));
}

#[test]
fn test_decode_float() {
    let t = SqlType::Float { precision: 53 };
    let ctx = CompressionContext::NONE;
    assert_eq!(t.fixed_length(&ctx), Some(8));
    let bytes = 3.14_f64.to_le_bytes();
    assert_eq!(t.decode(&bytes, &ctx).unwrap(), SqlValue::Real(3.14));
    assert_eq!(
        t.decode(&bytes[..7], &ctx),
        Err(Error::LengthMismatch {
            sql_type: t,
            expected: 8,
            actual: 7
        })
    );
    // Variable length under vardecimal storage, but the span is still two storage units.
    let page = CompressionContext::from(CompressionLevel::Page);
    assert_eq!(t.decode(&bytes, &page).unwrap(), SqlValue::Real(3.14));
    assert!(t.decode(&bytes[..7], &page).is_err());
}

#[test]
fn test_decode_real_narrows_to_single() {
    let t = SqlType::Float { precision: 24 };
    let v = t
        .decode(&3.14_f64.to_le_bytes(), &CompressionContext::NONE)
        .unwrap();
    assert_eq!(v, SqlValue::Real(3.14_f32 as f64));
}

#[test]
fn test_decode_integers() {
    let ctx = CompressionContext::NONE;
    assert_eq!(SqlType::TinyInt.decode(&[0xff], &ctx).unwrap(), SqlValue::Int(255));
    assert_eq!(SqlType::SmallInt.decode(&[0xff, 0xff], &ctx).unwrap(), SqlValue::Int(-1));
    assert_eq!(SqlType::Int.decode(&[0x00, 0x01, 0x00, 0x00], &ctx).unwrap(), SqlValue::Int(256));
    assert_eq!(
        SqlType::BigInt.decode(&(-2_i64).to_le_bytes(), &ctx).unwrap(),
        SqlValue::Int(-2)
    );
    assert!(SqlType::Int.decode(&[0x00, 0x01], &ctx).is_err());
}

#[test]
fn test_decode_fixed_decimal() {
    let ctx = CompressionContext::NONE;
    let t = SqlType::Decimal { precision: 5, scale: 2 };
    assert_eq!(
        t.decode(&[0x01, 0x39, 0x30, 0x00, 0x00], &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(12345, 2))
    );
    assert_eq!(
        t.decode(&[0x00, 0x39, 0x30, 0x00, 0x00], &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(-12345, 2))
    );
    let wide = SqlType::Numeric { precision: 38, scale: 0 };
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&u128::from(u64::MAX).to_le_bytes());
    assert_eq!(
        wide.decode(&bytes, &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(u64::MAX as i128, 0))
    );
}

#[test]
fn test_decode_vardecimal_column() {
    let page = CompressionContext::from(CompressionLevel::Page);
    let t = SqlType::Decimal { precision: 10, scale: 2 };
    assert_eq!(
        t.decode(&[0xc3, 0x1e, 0xdc, 0x20], &page).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(12345, 2))
    );
}

#[test]
fn test_decode_money() {
    let ctx = CompressionContext::NONE;
    // 1.5 = 15000 ten-thousandths, as one little-endian int64.
    assert_eq!(
        SqlType::Money.decode(&15000_i64.to_le_bytes(), &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(15000, 4))
    );
    // Values past 32 bits and negative values need the whole int64.
    assert_eq!(
        SqlType::Money.decode(&(-(5_i64 << 32) - 1).to_le_bytes(), &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(-(5_i128 << 32) - 1, 4))
    );
    assert_eq!(
        SqlType::SmallMoney.decode(&(-25_i32).to_le_bytes(), &ctx).unwrap(),
        SqlValue::Decimal(sql_value::Decimal::new(-25, 4))
    );
}

#[test]
fn test_decode_datetimes() {
    let ctx = CompressionContext::NONE;
    // 2001-01-01 12:00:00 is day 36890, 12 hours = 12960000 ticks.
    let mut bytes = 12_960_000_i32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&36890_i32.to_le_bytes());
    let expected = NaiveDate::from_ymd_opt(2001, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(SqlType::DateTime.decode(&bytes, &ctx).unwrap(), SqlValue::DateTime(expected));

    let mut bytes = 90_u16.to_le_bytes().to_vec();
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    let expected = NaiveDate::from_ymd_opt(1900, 1, 2)
        .unwrap()
        .and_hms_opt(1, 30, 0)
        .unwrap();
    assert_eq!(
        SqlType::SmallDateTime.decode(&bytes, &ctx).unwrap(),
        SqlValue::DateTime(expected)
    );
}

#[test]
fn test_decode_strings_and_binary() {
    let ctx = CompressionContext::NONE;
    assert_eq!(
        SqlType::Char(5).decode(b"ab   ", &ctx).unwrap(),
        SqlValue::Text("ab   ".to_string())
    );
    assert_eq!(
        SqlType::VarChar.decode(&[0x63, 0x61, 0x66, 0xe9], &ctx).unwrap(),
        SqlValue::Text("café".to_string())
    );
    assert_eq!(
        SqlType::NVarChar.decode(&[0x48, 0x00, 0x69, 0x00], &ctx).unwrap(),
        SqlValue::Text("Hi".to_string())
    );
    assert!(SqlType::NVarChar.decode(&[0x48, 0x00, 0x69], &ctx).is_err());
    assert!(SqlType::NChar(4).decode(&[0x48, 0x00], &ctx).is_err());
    assert_eq!(
        SqlType::VarBinary.decode(&[0x00, 0xff], &ctx).unwrap(),
        SqlValue::Blob(vec![0x00, 0xff])
    );
}

#[test]
fn test_decode_hidden_columns() {
    let ctx = CompressionContext::NONE;
    assert_eq!(SqlType::Uniquifier.decode(&[], &ctx).unwrap(), SqlValue::Int(0));
    assert_eq!(SqlType::Uniquifier.decode(&[0x02, 0, 0, 0], &ctx).unwrap(), SqlValue::Int(2));
    assert!(SqlType::Uniquifier.decode(&[0x02], &ctx).is_err());
    assert_eq!(
        SqlType::Rid.decode(&[0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x03, 0x00], &ctx).unwrap(),
        SqlValue::Rid(sql_value::Rid { file_id: 1, page_id: 16, slot: 3 })
    );
}

#[test]
fn test_decode_sql_variant() {
    let ctx = CompressionContext::NONE;
    assert_eq!(
        SqlType::SqlVariant.decode(&[56, 1, 0x2a, 0, 0, 0], &ctx).unwrap(),
        SqlValue::Int(42)
    );
    // varchar: 7 property bytes before the data.
    let mut bytes = vec![167, 1, 0, 0, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(b"abc");
    assert_eq!(
        SqlType::SqlVariant.decode(&bytes, &ctx).unwrap(),
        SqlValue::Text("abc".to_string())
    );
    assert!(SqlType::SqlVariant.decode(&[241, 1], &ctx).is_err());
    // real: exactly 4 value bytes.
    let mut real = vec![59, 1];
    real.extend_from_slice(&1.5_f32.to_le_bytes());
    assert_eq!(SqlType::SqlVariant.decode(&real, &ctx).unwrap(), SqlValue::Real(1.5));
    real.push(0);
    assert_eq!(
        SqlType::SqlVariant.decode(&real, &ctx),
        Err(Error::LengthMismatch {
            sql_type: SqlType::Float { precision: 24 },
            expected: 4,
            actual: 5
        })
    );
}

#[test]
fn test_fixed_width_round_trip() {
    let ctx = CompressionContext::NONE;
    let cases: Vec<(SqlType, Vec<u8>, SqlValue)> = vec![
        (SqlType::TinyInt, vec![7], SqlValue::Int(7)),
        (SqlType::SmallInt, (-300_i16).to_le_bytes().to_vec(), SqlValue::Int(-300)),
        (SqlType::Int, 123_456_i32.to_le_bytes().to_vec(), SqlValue::Int(123_456)),
        (SqlType::BigInt, i64::MIN.to_le_bytes().to_vec(), SqlValue::Int(i64::MIN)),
        (SqlType::Bit, vec![1], SqlValue::Bool(true)),
        (SqlType::Float { precision: 53 }, (-0.5_f64).to_le_bytes().to_vec(), SqlValue::Real(-0.5)),
        (
            SqlType::Money,
            i64::MIN.to_le_bytes().to_vec(),
            SqlValue::Decimal(sql_value::Decimal::new(i64::MIN as i128, 4)),
        ),
        (SqlType::Binary(3), vec![1, 2, 3], SqlValue::Blob(vec![1, 2, 3])),
        (SqlType::UniqueIdentifier, vec![9; 16], SqlValue::Guid(Guid([9; 16]))),
    ];
    for (t, bytes, expected) in cases {
        assert_eq!(t.fixed_length(&ctx), Some(bytes.len()), "length of {}", t);
        assert_eq!(t.decode(&bytes, &ctx).unwrap(), expected, "decoding {}", t);
    }
}
