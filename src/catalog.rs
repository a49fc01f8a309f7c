//! The catalog describes which tables exist and where their pages are.
//!
//! It is modeled as plain queryable tables: objects, partitions, allocation units and columns.
//! `MemoryCatalog` holds them in memory.  Its rows can come from anywhere, including scans of the
//! system base tables `sysschobjs`, `sysrowsets` and `sysallocunits`, whose row shapes are provided
//! here as [`StaticSchema`] implementations.

use itertools::Itertools;
use lazy_static::lazy_static;

use crate::column::ColumnDefinition;
use crate::page_pointer::PagePointer;
use crate::schema::{RowSchema, StaticSchema};
use crate::sql_type;
use crate::typed_row::{self, Row};

/// Allocation unit type holding in-row data.  The only type a scan reads.
pub const IN_ROW_DATA: u8 = 1;
pub const LOB_DATA: u8 = 2;
pub const ROW_OVERFLOW_DATA: u8 = 3;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Partition {partition_id} has {count} in-row data allocation units.")]
    DuplicateAllocationUnit { partition_id: i64, count: usize },
}

/// Index id of a heap.  Clustered indexes have index id 1.
pub const HEAP_INDEX_ID: i32 = 0;
pub const CLUSTERED_INDEX_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    InternalTable,
    SystemTable,
    UserTable,
    Other(String),
}

impl ObjectType {
    /// Whether objects of this type have rows that can be scanned.
    pub fn is_table(&self) -> bool {
        !matches!(self, ObjectType::Other(_))
    }
}

impl From<&str> for ObjectType {
    /// Converts a catalog type code, which may be blank padded (`"U "`).
    fn from(code: &str) -> Self {
        match code.trim() {
            "IT" => ObjectType::InternalTable,
            "S" => ObjectType::SystemTable,
            "U" => ObjectType::UserTable,
            other => ObjectType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysObject {
    pub id: i32,
    pub name: String,
    pub object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub partition_id: i64,
    pub object_id: i32,
    pub index_id: i32,
    pub partition_number: i32,
    /// Compression level code, see `CompressionLevel`.
    pub data_compression: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationUnit {
    pub allocation_unit_id: i64,
    /// For in-row data, the id of the owning partition.
    pub container_id: i64,
    pub unit_type: u8,
    /// Non-zero only for B-tree organized data.
    pub root_page: PagePointer,
    pub first_page: PagePointer,
    pub first_iam_page: PagePointer,
}

/// One column of a table, as the catalog lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRecord {
    pub object_id: i32,
    /// Position of the column in the record layout, starting at 1.
    pub column_id: i32,
    pub name: String,
    /// The type as a string like `nvarchar(50)`.
    pub type_name: String,
    pub nullable: bool,
    pub sparse: bool,
}

/// Source of catalog rows.
///
/// The required methods are plain lookups; the provided ones add the selection rules a table scan needs.
pub trait Catalog {
    /// Objects called `name`, of any type.
    fn objects_named(&self, name: &str) -> Vec<SysObject>;
    fn partitions_of(&self, object_id: i32) -> Vec<Partition>;
    fn partition(&self, partition_id: i64, partition_number: i32) -> Option<Partition>;
    fn allocation_units_of(&self, container_id: i64) -> Vec<AllocationUnit>;
    fn columns_of(&self, object_id: i32) -> Vec<ColumnRecord>;

    /// Tables (internal, system or user) called `name`.
    fn tables_named(&self, name: &str) -> Vec<SysObject> {
        self.objects_named(name)
            .into_iter()
            .filter(|o| o.object_type.is_table())
            .collect()
    }

    /// The heap and clustered index partitions of an object, clustered first, each in partition number order.
    fn data_partitions(&self, object_id: i32) -> Vec<Partition> {
        self.partitions_of(object_id)
            .into_iter()
            .filter(|p| p.index_id <= CLUSTERED_INDEX_ID)
            .sorted_by(|a, b| {
                b.index_id
                    .cmp(&a.index_id)
                    .then(a.partition_number.cmp(&b.partition_number))
            })
            .collect()
    }

    /// The in-row data allocation unit of a partition.  A partition has at most one.
    fn in_row_allocation_unit(&self, partition_id: i64) -> Result<Option<AllocationUnit>, Error> {
        self.allocation_units_of(partition_id)
            .into_iter()
            .filter(|au| au.unit_type == IN_ROW_DATA)
            .at_most_one()
            .map_err(|found| Error::DuplicateAllocationUnit {
                partition_id,
                count: found.count(),
            })
    }

    /// Builds the row schema of an object from its columns, in column id order.
    fn schema_of(&self, object_id: i32) -> Result<RowSchema, sql_type::Error> {
        let columns = self
            .columns_of(object_id)
            .into_iter()
            .sorted_by_key(|c| c.column_id)
            .map(|c| -> Result<ColumnDefinition, sql_type::Error> {
                let mut def = ColumnDefinition::new(&c.name, &c.type_name)?;
                def.nullable = c.nullable;
                def.sparse = c.sparse;
                Ok(def)
            })
            .collect::<Result<Vec<_>, sql_type::Error>>()?;
        Ok(RowSchema::new(columns))
    }
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    pub objects: Vec<SysObject>,
    pub partitions: Vec<Partition>,
    pub allocation_units: Vec<AllocationUnit>,
    pub columns: Vec<ColumnRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, id: i32, name: &str, object_type: ObjectType) -> &mut Self {
        self.objects.push(SysObject {
            id,
            name: name.to_string(),
            object_type,
        });
        self
    }

    pub fn add_partition(&mut self, partition: Partition) -> &mut Self {
        self.partitions.push(partition);
        self
    }

    pub fn add_allocation_unit(&mut self, au: AllocationUnit) -> &mut Self {
        self.allocation_units.push(au);
        self
    }

    /// Appends a column to an object; column ids are assigned in call order.
    pub fn add_column(&mut self, object_id: i32, name: &str, type_name: &str, nullable: bool) -> &mut Self {
        let column_id = self.columns.iter().filter(|c| c.object_id == object_id).count() as i32 + 1;
        self.columns.push(ColumnRecord {
            object_id,
            column_id,
            name: name.to_string(),
            type_name: type_name.to_string(),
            nullable,
            sparse: false,
        });
        self
    }
}

impl Catalog for MemoryCatalog {
    fn objects_named(&self, name: &str) -> Vec<SysObject> {
        self.objects.iter().filter(|o| o.name == name).cloned().collect()
    }

    fn partitions_of(&self, object_id: i32) -> Vec<Partition> {
        self.partitions
            .iter()
            .filter(|p| p.object_id == object_id)
            .cloned()
            .collect()
    }

    fn partition(&self, partition_id: i64, partition_number: i32) -> Option<Partition> {
        self.partitions
            .iter()
            .find(|p| p.partition_id == partition_id && p.partition_number == partition_number)
            .cloned()
    }

    fn allocation_units_of(&self, container_id: i64) -> Vec<AllocationUnit> {
        self.allocation_units
            .iter()
            .filter(|au| au.container_id == container_id)
            .cloned()
            .collect()
    }

    fn columns_of(&self, object_id: i32) -> Vec<ColumnRecord> {
        self.columns
            .iter()
            .filter(|c| c.object_id == object_id)
            .cloned()
            .collect()
    }
}

fn schema_from(columns: &[(&str, &str)]) -> Result<RowSchema, sql_type::Error> {
    Ok(RowSchema::new(
        columns
            .iter()
            .map(|(name, ty)| ColumnDefinition::new(name, ty))
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

lazy_static! {
    static ref SYSSCHOBJS_SCHEMA: RowSchema = schema_from(&[
        ("id", "int"),
        ("name", "sysname"),
        ("nsid", "int"),
        ("nsclass", "tinyint"),
        ("status", "int"),
        ("type", "char(2)"),
        ("pid", "int"),
        ("pclass", "tinyint"),
        ("intprop", "int"),
        ("created", "datetime"),
        ("modified", "datetime"),
        ("status2", "int"),
    ])
    .expect("sysschobjs column types should parse");
    static ref SYSROWSETS_SCHEMA: RowSchema = schema_from(&[
        ("rowsetid", "bigint"),
        ("ownertype", "tinyint"),
        ("idmajor", "int"),
        ("idminor", "int"),
        ("numpart", "int"),
        ("status", "int"),
        ("fgidfs", "smallint"),
        ("rcrows", "bigint"),
        ("cmprlevel", "tinyint"),
        ("fillfact", "tinyint"),
        ("maxnullbit", "smallint"),
        ("maxleaf", "int"),
        ("maxint", "smallint"),
        ("minleaf", "smallint"),
        ("minint", "smallint"),
        ("rsguid", "varbinary(16)"),
        ("lockres", "varbinary(8)"),
        ("dbfragid", "int"),
    ])
    .expect("sysrowsets column types should parse");
    static ref SYSALLOCUNITS_SCHEMA: RowSchema = schema_from(&[
        ("auid", "bigint"),
        ("type", "tinyint"),
        ("ownerid", "bigint"),
        ("status", "int"),
        ("fgid", "smallint"),
        ("pgfirst", "binary(6)"),
        ("pgroot", "binary(6)"),
        ("pgfirstiam", "binary(6)"),
        ("pcused", "bigint"),
        ("pcdata", "bigint"),
        ("pcreserved", "bigint"),
        ("dbfragid", "int"),
    ])
    .expect("sysallocunits column types should parse");
}

fn narrow<T: TryFrom<i64>>(row: &Row, name: &str) -> Result<T, typed_row::Error> {
    let v = row.int(name)?;
    T::try_from(v).map_err(|_| typed_row::Error::Conversion {
        column: name.to_string(),
        value: v.to_string(),
        wanted: std::any::type_name::<T>(),
    })
}

fn page_pointer(row: &Row, name: &str) -> Result<PagePointer, typed_row::Error> {
    let bytes = row.blob(name)?;
    PagePointer::from_bytes(bytes).ok_or_else(|| typed_row::Error::Conversion {
        column: name.to_string(),
        value: format!("{} bytes", bytes.len()),
        wanted: "a page pointer",
    })
}

/// Rows of `sys.sysschobjs`.
impl StaticSchema for SysObject {
    fn schema() -> RowSchema {
        SYSSCHOBJS_SCHEMA.clone()
    }

    fn from_row(row: Row) -> Result<Self, typed_row::Error> {
        Ok(SysObject {
            id: narrow(&row, "id")?,
            name: row.text("name")?.to_string(),
            object_type: ObjectType::from(row.text("type")?),
        })
    }
}

/// Rows of `sys.sysrowsets`.
impl StaticSchema for Partition {
    fn schema() -> RowSchema {
        SYSROWSETS_SCHEMA.clone()
    }

    fn from_row(row: Row) -> Result<Self, typed_row::Error> {
        Ok(Partition {
            partition_id: row.int("rowsetid")?,
            object_id: narrow(&row, "idmajor")?,
            index_id: narrow(&row, "idminor")?,
            partition_number: narrow(&row, "numpart")?,
            data_compression: narrow(&row, "cmprlevel")?,
        })
    }
}

/// Rows of `sys.sysallocunits`.
impl StaticSchema for AllocationUnit {
    fn schema() -> RowSchema {
        SYSALLOCUNITS_SCHEMA.clone()
    }

    fn from_row(row: Row) -> Result<Self, typed_row::Error> {
        Ok(AllocationUnit {
            allocation_unit_id: row.int("auid")?,
            container_id: row.int("ownerid")?,
            unit_type: narrow(&row, "type")?,
            root_page: page_pointer(&row, "pgroot")?,
            first_page: page_pointer(&row, "pgfirst")?,
            first_iam_page: page_pointer(&row, "pgfirstiam")?,
        })
    }
}

#[cfg(test)]
fn test_catalog() -> MemoryCatalog {
    let mut c = MemoryCatalog::new();
    c.add_object(5, "orders", ObjectType::UserTable)
        .add_object(6, "orders", ObjectType::Other("P".to_string()))
        .add_object(7, "dup", ObjectType::UserTable)
        .add_object(8, "dup", ObjectType::SystemTable);
    for (partition_id, index_id, partition_number) in [(50, 0, 2), (51, 1, 2), (52, 1, 1), (53, 2, 1), (54, 0, 1)] {
        c.add_partition(Partition {
            partition_id,
            object_id: 5,
            index_id,
            partition_number,
            data_compression: 0,
        });
    }
    c.add_allocation_unit(AllocationUnit {
        allocation_unit_id: 900,
        container_id: 52,
        unit_type: LOB_DATA,
        root_page: PagePointer::ZERO,
        first_page: PagePointer::ZERO,
        first_iam_page: PagePointer::new(1, 300),
    })
    .add_allocation_unit(AllocationUnit {
        allocation_unit_id: 901,
        container_id: 52,
        unit_type: IN_ROW_DATA,
        root_page: PagePointer::new(1, 200),
        first_page: PagePointer::new(1, 201),
        first_iam_page: PagePointer::new(1, 202),
    });
    c.add_column(5, "id", "int", false)
        .add_column(5, "note", "varchar(10)", true);
    c
}

#[test]
fn test_tables_named_filters_object_types() {
    let c = test_catalog();
    let found = c.tables_named("orders");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 5);
    assert_eq!(c.tables_named("dup").len(), 2);
    assert!(c.tables_named("nothing").is_empty());
}

#[test]
fn test_data_partitions_prefer_clustered() {
    let c = test_catalog();
    let ids: Vec<i64> = c.data_partitions(5).iter().map(|p| p.partition_id).collect();
    assert_eq!(ids, vec![52, 51, 54, 50]);
    assert!(c.data_partitions(7).is_empty());
}

#[test]
fn test_in_row_allocation_unit() {
    let c = test_catalog();
    assert_eq!(c.in_row_allocation_unit(52).unwrap().unwrap().allocation_unit_id, 901);
    assert_eq!(c.in_row_allocation_unit(51), Ok(None));
}

#[test]
fn test_duplicate_in_row_allocation_units() {
    let mut c = test_catalog();
    c.add_allocation_unit(AllocationUnit {
        allocation_unit_id: 902,
        container_id: 52,
        unit_type: IN_ROW_DATA,
        root_page: PagePointer::new(1, 400),
        first_page: PagePointer::new(1, 401),
        first_iam_page: PagePointer::new(1, 402),
    });
    assert_eq!(
        c.in_row_allocation_unit(52),
        Err(Error::DuplicateAllocationUnit {
            partition_id: 52,
            count: 2
        })
    );
}

#[test]
fn test_system_table_schemas() {
    assert_eq!(SysObject::schema().len(), 12);
    assert_eq!(Partition::schema().len(), 18);
    assert_eq!(AllocationUnit::schema().len(), 12);
    assert!(matches!(
        schema_from(&[("a", "int"), ("b", "hierarchyid"), ("c", "int")]),
        Err(sql_type::Error::UnsupportedType(t)) if t == "hierarchyid"
    ));
}

#[test]
fn test_schema_of() {
    let mut c = test_catalog();
    let s = c.schema_of(5).unwrap();
    assert_eq!(s.column_names(), vec!["id".to_string(), "note".to_string()]);
    assert!(s.columns()[1].nullable);
    c.add_column(5, "geo", "geography", true);
    assert_eq!(
        c.schema_of(5),
        Err(sql_type::Error::UnsupportedType("geography".to_string()))
    );
}

#[test]
fn test_object_type_codes() {
    assert_eq!(ObjectType::from("U "), ObjectType::UserTable);
    assert_eq!(ObjectType::from("IT"), ObjectType::InternalTable);
    assert_eq!(ObjectType::from("S"), ObjectType::SystemTable);
    assert!(!ObjectType::from("V").is_table());
}

#[test]
fn test_allocation_unit_from_sysallocunits_row() {
    use crate::sql_value::SqlValue::*;
    let schema = AllocationUnit::schema();
    assert_eq!(schema.len(), 12);
    let row = Row::new(
        schema,
        vec![
            Int(72057594043170816),
            Int(1),
            Int(72057594038386688),
            Int(0),
            Int(1),
            Blob(vec![0x50, 0, 0, 0, 1, 0]),
            Blob(vec![0; 6]),
            Blob(vec![0x51, 0, 0, 0, 1, 0]),
            Int(2),
            Int(1),
            Int(2),
            Int(0),
        ],
    );
    let au = AllocationUnit::from_row(row).unwrap();
    assert_eq!(au.unit_type, IN_ROW_DATA);
    assert_eq!(au.container_id, 72057594038386688);
    assert!(au.root_page.is_zero());
    assert_eq!(au.first_page, PagePointer::new(1, 0x50));
    assert_eq!(au.first_iam_page, PagePointer::new(1, 0x51));
}

#[test]
fn test_partition_from_sysrowsets_row_rejects_bad_values() {
    use crate::sql_value::SqlValue::*;
    let mut items = vec![Int(0); 18];
    items[0] = Int(72057594038386688);
    items[2] = Int(5);
    items[4] = Int(1);
    items[8] = Int(300);
    items[15] = Blob(vec![]);
    items[16] = Blob(vec![]);
    let row = Row::new(Partition::schema(), items);
    assert!(matches!(
        Partition::from_row(row),
        Err(typed_row::Error::Conversion { ref column, .. }) if column == "cmprlevel"
    ));
}
