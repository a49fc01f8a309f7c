//! provides access to table records in a typed form.
//! Records on data pages are stored as FixedVar bytes, and need to be converted to Rust values
//! according to the column types of a schema.
//! Any failure to convert any column in a record is treated as a failure to convert the entire row.
//! Null values are not a conversion failure.
//! Columns added to the table after a record was written are read as NULL.
//! Off-row values of LOB columns are returned as their in-row pointer bytes; off-row values of any
//! other column type, and sparse columns, cannot be read and fail the row.

use crate::compression::CompressionContext;
use crate::record::Record;
use crate::schema::RowSchema;
use crate::sql_type::SqlType;
use crate::sql_value::SqlValue;

/// can hold a sequence of values of any of the SQL types, in the order of the schema it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub items: Vec<SqlValue>,
    schema: RowSchema,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Deserialization error, column number {}, detail : {}", colnum, detail)]
    Deserialization {
        detail: crate::sql_type::Error,
        colnum: usize,
    },
    #[error("Fixed data ends before column number {0}.")]
    Truncated(usize),
    #[error("Column number {0} is stored off-row, which is not supported.")]
    RowOverflow(usize),
    #[error("Column number {0} is sparse, which is not supported.")]
    SparseColumn(usize),
    #[error("Malformed record: {0}")]
    Record(#[from] crate::record::Error),
    #[error("Row has no column named {0}.")]
    MissingColumn(String),
    #[error("Column {column} holds {value}, which cannot be converted to {wanted}.")]
    Conversion {
        column: String,
        value: String,
        wanted: &'static str,
    },
}

impl Row {
    pub fn new(schema: RowSchema, items: Vec<SqlValue>) -> Row {
        Row { items, schema }
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    /// Looks a value up by column name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.schema.column_index(name).map(|i| &self.items[i])
    }

    fn value(&self, name: &str) -> Result<&SqlValue, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    fn conversion(name: &str, value: &SqlValue, wanted: &'static str) -> Error {
        Error::Conversion {
            column: name.to_string(),
            value: value.to_string(),
            wanted,
        }
    }

    /// The integer in column `name`, or `None` when it is NULL.
    pub fn int_or_null(&self, name: &str) -> Result<Option<i64>, Error> {
        match self.value(name)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int(i) => Ok(Some(*i)),
            v => Err(Self::conversion(name, v, "an integer")),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, Error> {
        let v = self.value(name)?;
        v.as_int().copied().ok_or_else(|| Self::conversion(name, v, "an integer"))
    }

    pub fn text(&self, name: &str) -> Result<&str, Error> {
        let v = self.value(name)?;
        v.as_text().map(|s| s.as_str()).ok_or_else(|| Self::conversion(name, v, "text"))
    }

    pub fn blob(&self, name: &str) -> Result<&[u8], Error> {
        let v = self.value(name)?;
        v.as_blob().map(|b| b.as_slice()).ok_or_else(|| Self::conversion(name, v, "binary data"))
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

/// Decodes one FixedVar record into a row of `schema`.
///
/// # Arguments
///
/// * `schema` - The columns, in the order SQL Server lays them out: that is the order of fixed-length
///              columns in the fixed data, and of variable-length columns in the variable data.
/// * `record` - The parsed record.
/// * `ctx` - The compression context of the partition the record was read from.
pub fn build_row(schema: &RowSchema, record: &Record, ctx: &CompressionContext) -> Result<Row, Error> {
    let fixed = record.fixed_data();
    let mut fixed_offset = 0;
    let mut var_index = 0;
    // Bit columns share bytes: eight consecutive bit columns fill one byte of fixed data.
    let mut bit_byte = 0;
    let mut bits_used = 8;
    let mut items = Vec::with_capacity(schema.len());

    for (colnum, column) in schema.columns().iter().enumerate() {
        if column.sparse {
            return Err(Error::SparseColumn(colnum));
        }
        let null = record.is_null(colnum);
        let decode_err = |detail| Error::Deserialization { detail, colnum };

        if column.sql_type == SqlType::Bit {
            if bits_used == 8 {
                bit_byte = fixed_offset;
                fixed_offset += 1;
                bits_used = 0;
            }
            let bit = bits_used;
            bits_used += 1;
            if null {
                items.push(SqlValue::Null);
                continue;
            }
            let b = fixed.get(bit_byte).ok_or(Error::Truncated(colnum))?;
            items.push(
                column
                    .sql_type
                    .decode(&[(b >> bit) & 1], ctx)
                    .map_err(decode_err)?,
            );
            continue;
        }

        match column.sql_type.fixed_length(ctx) {
            Some(len) => {
                let start = fixed_offset;
                fixed_offset += len;
                if null {
                    items.push(SqlValue::Null);
                    continue;
                }
                let bytes = fixed
                    .get(start..start + len)
                    .ok_or(Error::Truncated(colnum))?;
                items.push(column.sql_type.decode(bytes, ctx).map_err(decode_err)?);
            }
            None => {
                let index = var_index;
                var_index += 1;
                // A zero uniquifier is not stored at all, whether or not the record counts its column.
                if column.sql_type == SqlType::Uniquifier && colnum >= record.column_count() {
                    items.push(SqlValue::Int(0));
                    continue;
                }
                if null {
                    items.push(SqlValue::Null);
                    continue;
                }
                let value = match record.var_column(index)? {
                    None if column.sql_type == SqlType::Uniquifier => SqlValue::Int(0),
                    None => SqlValue::Null,
                    Some(v) if v.complex && column.sql_type.is_lob() => SqlValue::Blob(v.bytes.to_vec()),
                    Some(v) if v.complex => return Err(Error::RowOverflow(colnum)),
                    Some(v) => column.sql_type.decode(v.bytes, ctx).map_err(decode_err)?,
                };
                items.push(value);
            }
        }
    }
    Ok(Row::new(schema.clone(), items))
}

#[cfg(test)]
use crate::column::ColumnDefinition;

#[cfg(test)]
fn schema_of(columns: &[(&str, &str, bool)]) -> RowSchema {
    RowSchema::new(
        columns
            .iter()
            .map(|(name, ty, nullable)| {
                let c = ColumnDefinition::new(name, ty).unwrap();
                if *nullable {
                    c.nullable()
                } else {
                    c
                }
            })
            .collect(),
    )
}

#[test]
fn test_build_row_fixed_and_variable() {
    use SqlValue::*;
    let schema = schema_of(&[
        ("id", "int", false),
        ("name", "varchar(20)", true),
        ("score", "smallint", true),
        ("note", "varchar(20)", true),
    ]);
    let data = crate::record::fixed_var_record(
        &[0x05, 0x00, 0x00, 0x00, 0x00, 0x00],
        &[false, false, true, false],
        &[&b"Ann"[..], &b"hi"[..]],
    );
    let record = Record::parse(&data).unwrap();
    let row = build_row(&schema, &record, &CompressionContext::NONE).unwrap();
    assert_eq!(
        row.items,
        vec![Int(5), Text("Ann".to_string()), Null, Text("hi".to_string())]
    );
    assert_eq!(row.get("NAME"), Some(&Text("Ann".to_string())));
    assert_eq!(row.int("id"), Ok(5));
    assert_eq!(row.int_or_null("score"), Ok(None));
    assert!(matches!(row.int("name"), Err(Error::Conversion { .. })));
    assert_eq!(row.to_string(), "5|Ann|NULL|hi");
}

#[test]
fn test_build_row_packed_bits() {
    use SqlValue::*;
    let schema = schema_of(&[
        ("a", "bit", false),
        ("n", "tinyint", false),
        ("b", "bit", false),
        ("c", "bit", true),
    ]);
    // a, b and c share the first byte; n follows it.
    let data = crate::record::fixed_var_record(&[0b0000_0011, 0x2a], &[false, false, false, true], &[]);
    let record = Record::parse(&data).unwrap();
    let row = build_row(&schema, &record, &CompressionContext::NONE).unwrap();
    assert_eq!(row.items, vec![Bool(true), Int(42), Bool(true), Null]);
}

#[test]
fn test_build_row_with_vardecimal() {
    use crate::compression::CompressionLevel;
    let schema = schema_of(&[("id", "int", false), ("price", "decimal(10,2)", false)]);
    let data = crate::record::fixed_var_record(
        &[0x01, 0x00, 0x00, 0x00],
        &[false, false],
        &[&[0xc3, 0x1e, 0xdc, 0x20][..]],
    );
    let record = Record::parse(&data).unwrap();
    let ctx = CompressionContext::from(CompressionLevel::Page);
    let row = build_row(&schema, &record, &ctx).unwrap();
    assert_eq!(
        row.items[1],
        SqlValue::Decimal(crate::sql_value::Decimal::new(12345, 2))
    );
    // The same record read as uncompressed is missing the decimal's fixed bytes.
    assert_eq!(
        build_row(&schema, &record, &CompressionContext::NONE),
        Err(Error::Truncated(1))
    );
}

#[test]
fn test_build_row_missing_trailing_columns() {
    // Written with one column; the table has since gained two more.
    let schema = schema_of(&[("id", "int", false), ("extra", "int", true), ("u", "uniquifier", false)]);
    let data = crate::record::fixed_var_record(&[0x09, 0x00, 0x00, 0x00], &[false], &[]);
    let record = Record::parse(&data).unwrap();
    let row = build_row(&schema, &record, &CompressionContext::NONE).unwrap();
    assert_eq!(row.items, vec![SqlValue::Int(9), SqlValue::Null, SqlValue::Int(0)]);
}

#[test]
fn test_build_row_absent_uniquifier_is_zero() {
    let schema = schema_of(&[("id", "int", false), ("u", "uniquifier", false)]);
    let data = crate::record::fixed_var_record(&[0x09, 0x00, 0x00, 0x00], &[false, false], &[]);
    let record = Record::parse(&data).unwrap();
    let row = build_row(&schema, &record, &CompressionContext::NONE).unwrap();
    assert_eq!(row.items, vec![SqlValue::Int(9), SqlValue::Int(0)]);
}

#[test]
fn test_build_row_unsupported_storage() {
    let ctx = CompressionContext::NONE;
    let mut data = crate::record::fixed_var_record(&[], &[false], &[&[0xaa_u8; 4][..]]);
    let end_offset = data.len() - 4 - 2;
    data[end_offset + 1] |= 0x80;
    let record = Record::parse(&data).unwrap();

    let varchar = schema_of(&[("v", "varchar(max)", false)]);
    assert_eq!(build_row(&varchar, &record, &ctx), Err(Error::RowOverflow(0)));
    let image = schema_of(&[("v", "image", false)]);
    assert_eq!(
        build_row(&image, &record, &ctx).unwrap().items,
        vec![SqlValue::Blob(vec![0xaa; 4])]
    );

    let sparse = RowSchema::new(vec![ColumnDefinition::new("s", "int").unwrap().sparse()]);
    assert_eq!(build_row(&sparse, &record, &ctx), Err(Error::SparseColumn(0)));
}

#[test]
fn test_build_row_decode_error_names_column() {
    let schema = schema_of(&[("id", "int", false), ("n", "nvarchar(10)", false)]);
    let data = crate::record::fixed_var_record(&[0x01, 0x00, 0x00, 0x00], &[false, false], &[&[0x41, 0x00, 0x42][..]]);
    let record = Record::parse(&data).unwrap();
    assert!(matches!(
        build_row(&schema, &record, &CompressionContext::NONE),
        Err(Error::Deserialization { colnum: 1, .. })
    ));
}
