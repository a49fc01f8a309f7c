mod common;

use common::*;
use mdfscan::catalog::{AllocationUnit, ObjectType, IN_ROW_DATA};
use mdfscan::scanner::Error;
use mdfscan::sql_value::Decimal;
use mdfscan::{CompressionLevel, PagePointer, Row, ScanConfig, SqlValue, StaticSchema, TableScanner};

fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().map(|r| r.int("id").unwrap()).collect()
}

fn collect(scanner: &TableScanner, table: &str) -> Vec<Row> {
    scanner
        .scan(table)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// A heap whose IAM page lists one single page allocation holding rows 1 and 2, and one extent (pages
/// 40 to 47) of which only pages 42 and 45 are allocated to anything, holding rows 3 and 4.
fn heap_db() -> TestDb {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(20))
        .add_page(iam_page(p(20), PagePointer::ZERO, p(0), &[p(30)], &[5]))
        .add_page(pfs_page(p(1), &[1, 20, 30, 42, 45]))
        .add_page(data_page(p(30), PagePointer::ZERO, &[person(1, "ann"), person(2, "bob")]))
        .add_page(data_page(p(42), PagePointer::ZERO, &[person(3, "cy")]))
        .add_page(data_page(p(45), PagePointer::ZERO, &[person(4, "di")]));
    db
}

/// The rows of `heap_db`, stored as a clustered index with leaf pages 50 -> 51 -> 52.
fn clustered_db() -> TestDb {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7000, 1, 0, p(60), p(50))
        .add_page(data_page(p(50), p(51), &[person(1, "ann")]))
        .add_page(data_page(p(51), p(52), &[person(2, "bob"), person(3, "cy")]))
        .add_page(data_page(p(52), PagePointer::ZERO, &[person(4, "di")]));
    db
}

#[test]
fn test_scan_heap_in_iam_order() {
    let db = heap_db();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let rows = collect(&scanner, "people");
    assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
    assert_eq!(rows[0].text("name").unwrap(), "ann");
    assert_eq!(rows[3].text("name").unwrap(), "di");
}

#[test]
fn test_scan_heap_across_iam_chain_and_extents() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(20))
        // Extents 5, 7, 9 and 11 are pages 40-47, 56-63, 72-79 and 88-95.
        .add_page(iam_page(p(20), p(21), p(0), &[p(30)], &[5, 7]))
        .add_page(iam_page(p(21), PagePointer::ZERO, p(0), &[p(31)], &[9, 11]))
        .add_page(pfs_page(p(1), &[1, 20, 21, 30, 31, 41, 46, 58, 72, 79, 90]))
        .add_page(data_page(p(30), PagePointer::ZERO, &[person(1, "ann")]))
        .add_page(data_page(p(41), PagePointer::ZERO, &[person(2, "bob")]))
        .add_page(data_page(p(46), PagePointer::ZERO, &[person(3, "cy")]))
        .add_page(data_page(p(58), PagePointer::ZERO, &[person(4, "di")]))
        .add_page(data_page(p(31), PagePointer::ZERO, &[person(5, "ed")]))
        .add_page(data_page(p(72), PagePointer::ZERO, &[person(6, "flo")]))
        .add_page(data_page(p(79), PagePointer::ZERO, &[person(7, "gus")]))
        .add_page(data_page(p(90), PagePointer::ZERO, &[person(8, "hal")]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    // Each IAM page gives its slot pages, then its extents; then the next IAM page follows.
    assert_eq!(ids(&collect(&scanner, "people")), vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_iam_range_past_last_page_is_corruption() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(20))
        .add_page(iam_page(p(20), PagePointer::ZERO, p(0xFFFF_FFF8), &[], &[1]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let mut scan = scanner.scan("people").unwrap();
    let e = scan.next().unwrap().unwrap_err();
    assert!(e.is_corruption(), "{}", e);
    assert!(scan.next().is_none());
}

#[test]
fn test_scan_clustered_index_follows_leaf_chain() {
    let db = clustered_db();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let rows = collect(&scanner, "people");
    assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
    assert_eq!(rows[1].to_string(), "2|bob");
}

#[test]
fn test_heap_and_clustered_scans_agree() {
    let heap = heap_db();
    let clustered = clustered_db();
    let mut a: Vec<String> = collect(&TableScanner::new(&heap.catalog, &heap.store), "people")
        .iter()
        .map(|r| r.to_string())
        .collect();
    let mut b: Vec<String> = collect(&TableScanner::new(&clustered.catalog, &clustered.store), "people")
        .iter()
        .map(|r| r.to_string())
        .collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn test_scan_skips_empty_slots_and_null_columns() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7000, 1, 0, p(60), p(50))
        .add_page(data_page(
            p(50),
            PagePointer::ZERO,
            &[
                person(1, "ann"),
                vec![],
                fixed_var_record(&2_i32.to_le_bytes(), &[false, true], &[]),
            ],
        ));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let rows = collect(&scanner, "people");
    assert_eq!(ids(&rows), vec![1, 2]);
    assert_eq!(rows[1].get("name"), Some(&SqlValue::Null));
}

#[test]
fn test_scan_is_lazy() {
    let mut db = clustered_db();
    // The second leaf page is damaged; the first row is still produced.
    db.add_page_at(p(51), pfs_page(p(51), &[]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let mut scan = scanner.scan("people").unwrap();
    assert_eq!(scan.schema().column_names(), vec!["id".to_string(), "name".to_string()]);
    assert_eq!(scan.next().unwrap().unwrap().int("id").unwrap(), 1);
    let e = scan.next().unwrap().unwrap_err();
    assert!(e.is_corruption(), "{}", e);
    assert!(scan.next().is_none());
}

#[test]
fn test_empty_heap() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, PagePointer::ZERO);
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(collect(&scanner, "people").is_empty());
}

#[test]
fn test_unknown_table() {
    let db = heap_db();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(matches!(scanner.scan("nobody"), Err(Error::NotFound(name)) if name == "nobody"));
}

#[test]
fn test_non_table_object_is_not_found() {
    let mut db = heap_db();
    db.catalog.add_object(200, "a_view", ObjectType::Other("V".to_string()));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(matches!(scanner.scan("a_view"), Err(Error::NotFound(_))));
}

#[test]
fn test_ambiguous_table_name() {
    let mut db = heap_db();
    db.add_person_table(101, "people");
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(matches!(
        scanner.scan("people"),
        Err(Error::Ambiguous { count: 2, .. })
    ));
}

#[test]
fn test_table_without_partitions() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people");
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(matches!(scanner.scan("people"), Err(Error::NoPartitions(_))));
}

#[test]
fn test_unsupported_column_type_fails_before_scanning() {
    let mut db = heap_db();
    db.catalog.add_column(100, "shape", "geometry", true);
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert!(matches!(scanner.scan("people"), Err(Error::UnsupportedType(_))));
}

#[test]
fn test_missing_allocation_unit() {
    let mut db = heap_db();
    db.catalog.allocation_units.clear();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let mut scan = scanner.scan("people").unwrap();
    assert!(matches!(scan.next(), Some(Err(Error::NoAllocationUnit(7000)))));
    assert!(scan.next().is_none());
}

#[test]
fn test_duplicate_allocation_units_are_corruption() {
    let mut db = heap_db();
    db.catalog.add_allocation_unit(AllocationUnit {
        allocation_unit_id: 9999,
        container_id: 7000,
        unit_type: IN_ROW_DATA,
        root_page: PagePointer::ZERO,
        first_page: PagePointer::ZERO,
        first_iam_page: p(20),
    });
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let e = scanner.scan("people").unwrap().next().unwrap().unwrap_err();
    assert!(matches!(e, Error::Corruption(_)), "{}", e);
}

#[test]
fn test_unknown_compression_level() {
    let mut db = heap_db();
    db.catalog.partitions[0].data_compression = 9;
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let e = scanner.scan("people").unwrap().next().unwrap().unwrap_err();
    assert!(e.is_corruption());
}

#[test]
fn test_leaf_chain_cycle_is_corruption() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7000, 1, 0, p(60), p(50))
        .add_page(data_page(p(50), p(51), &[person(1, "ann")]))
        .add_page(data_page(p(51), p(50), &[person(2, "bob")]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let results: Vec<_> = scanner.scan("people").unwrap().collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().int("id").unwrap(), 1);
    assert_eq!(results[1].as_ref().unwrap().int("id").unwrap(), 2);
    assert!(results[2].as_ref().unwrap_err().is_corruption());
}

#[test]
fn test_iam_chain_cycle_is_corruption() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(20))
        .add_page(iam_page(p(20), p(21), p(0), &[p(30)], &[]))
        .add_page(iam_page(p(21), p(20), p(0), &[], &[]))
        .add_page(data_page(p(30), PagePointer::ZERO, &[person(1, "ann")]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let results: Vec<_> = scanner.scan("people").unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(&results[1], Err(Error::Corruption(_))));
}

#[test]
fn test_dangling_pointers_are_corruption() {
    // Leaf chain into a page that does not exist.
    let mut db = clustered_db();
    db.add_page(data_page(p(52), p(999), &[person(4, "di")]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let results: Vec<_> = scanner.scan("people").unwrap().collect();
    assert_eq!(results.len(), 5);
    assert!(matches!(&results[4], Err(Error::Corruption(_))));

    // IAM slot pointing at a PFS page.
    let mut db = heap_db();
    db.add_page(iam_page(p(20), PagePointer::ZERO, p(0), &[p(1)], &[]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let e = scanner.scan("people").unwrap().next().unwrap().unwrap_err();
    assert!(e.is_corruption());

    // Extent whose tracking PFS page is missing.
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(20))
        .add_page(iam_page(p(20), PagePointer::ZERO, p(0), &[], &[5]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let e = scanner.scan("people").unwrap().next().unwrap().unwrap_err();
    assert!(e.is_corruption());
}

#[test]
fn test_page_address_verification() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7000, 1, 0, p(60), p(50))
        .add_page_at(p(50), data_page(p(77), PagePointer::ZERO, &[person(1, "ann")]));

    let strict = TableScanner::new(&db.catalog, &db.store);
    let e = strict.scan("people").unwrap().next().unwrap().unwrap_err();
    assert!(e.is_corruption());

    let lenient = strict.with_config(ScanConfig::new().with_page_id_verification(false));
    assert_eq!(ids(&collect(&lenient, "people")), vec![1]);
}

#[test]
fn test_partitions_scanned_in_order() {
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7002, 2, 0, p(61), p(52))
        .add_clustered_partition(100, 7001, 1, 0, p(60), p(50))
        .add_page(data_page(p(50), PagePointer::ZERO, &[person(1, "ann")]))
        .add_page(data_page(p(52), PagePointer::ZERO, &[person(5, "ed")]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    assert_eq!(ids(&collect(&scanner, "people")), vec![1, 5]);
}

#[test]
fn test_compression_level_per_partition() {
    let mut db = TestDb::new();
    db.catalog
        .add_object(100, "prices", ObjectType::UserTable)
        .add_column(100, "id", "int", false)
        .add_column(100, "price", "decimal(10,2)", false);
    // Partition 1 is uncompressed: the decimal is 9 fixed bytes, sign first.
    let mut fixed = 1_i32.to_le_bytes().to_vec();
    fixed.push(1);
    fixed.extend_from_slice(&12345_u64.to_le_bytes());
    let plain = fixed_var_record(&fixed, &[false, false], &[]);
    // Partition 2 is row compressed: the decimal moves to the variable section as a vardecimal.
    let compressed = fixed_var_record(&2_i32.to_le_bytes(), &[false, false], &[&[0xc3, 0x1e, 0xdc, 0x20][..]]);
    db.add_clustered_partition(100, 7001, 1, 0, p(60), p(50))
        .add_clustered_partition(100, 7002, 2, 1, p(61), p(51))
        .add_page(data_page(p(50), PagePointer::ZERO, &[plain]))
        .add_page(data_page(p(51), PagePointer::ZERO, &[compressed]));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let rows = collect(&scanner, "prices");
    assert_eq!(ids(&rows), vec![1, 2]);
    for row in &rows {
        assert_eq!(row.get("price"), Some(&SqlValue::Decimal(Decimal::new(12345, 2))));
    }
}

fn sysallocunits_record(au: &AllocationUnit) -> Vec<u8> {
    let mut fixed = vec![];
    fixed.extend_from_slice(&au.allocation_unit_id.to_le_bytes());
    fixed.push(au.unit_type);
    fixed.extend_from_slice(&au.container_id.to_le_bytes());
    fixed.extend_from_slice(&0_i32.to_le_bytes());
    fixed.extend_from_slice(&1_i16.to_le_bytes());
    for pointer in [au.first_page, au.root_page, au.first_iam_page] {
        fixed.extend_from_slice(&pointer.page_id.to_le_bytes());
        fixed.extend_from_slice(&pointer.file_id.to_le_bytes());
    }
    for _ in 0..3 {
        fixed.extend_from_slice(&1_i64.to_le_bytes());
    }
    fixed.extend_from_slice(&0_i32.to_le_bytes());
    fixed_var_record(&fixed, &[false; 12], &[])
}

#[test]
fn test_scan_typed_system_table() {
    let units = vec![
        AllocationUnit {
            allocation_unit_id: 327680,
            container_id: 327680,
            unit_type: IN_ROW_DATA,
            root_page: p(22),
            first_page: p(21),
            first_iam_page: p(23),
        },
        AllocationUnit {
            allocation_unit_id: 72057594043170816,
            container_id: 72057594038386688,
            unit_type: IN_ROW_DATA,
            root_page: PagePointer::ZERO,
            first_page: p(80),
            first_iam_page: p(81),
        },
    ];
    let mut db = TestDb::new();
    db.catalog.add_object(7, "sysallocunits", ObjectType::SystemTable);
    db.add_clustered_partition(7, 458752, 1, 0, p(14), p(13))
        .add_page(data_page(
            p(13),
            PagePointer::ZERO,
            &units.iter().map(sysallocunits_record).collect::<Vec<_>>(),
        ));
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let found = scanner
        .scan_typed::<AllocationUnit>("sysallocunits")
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(found, units);
    assert_eq!(AllocationUnit::schema().len(), 12);
}

#[test]
fn test_scan_linked_pages_directly() {
    let db = clustered_db();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let schema = db_schema(&db);
    let rows = scanner
        .scan_linked_pages(p(51), schema, CompressionLevel::None)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(ids(&rows), vec![2, 3, 4]);
    assert_eq!(
        scanner
            .scan_linked_pages(PagePointer::ZERO, db_schema(&db), CompressionLevel::None)
            .count(),
        0
    );
}

fn db_schema(db: &TestDb) -> mdfscan::RowSchema {
    use mdfscan::Catalog;
    db.catalog.schema_of(100).unwrap()
}

#[test]
fn test_scan_with_schema_reads_leading_columns() {
    let db = heap_db();
    let scanner = TableScanner::new(&db.catalog, &db.store);
    let schema = mdfscan::RowSchema::new(vec![mdfscan::ColumnDefinition::new("id", "int").unwrap()]);
    let rows = scanner
        .scan_with_schema("people", schema)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
    assert_eq!(rows[0].items.len(), 1);
}
