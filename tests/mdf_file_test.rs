mod common;

use std::io::Write;

use common::*;
use mdfscan::{MdfFile, PagePointer, TableScanner};

/// Writes `pages` to a temporary data file, each at the offset its header address gives.
fn write_data_file(pages: &[Vec<u8>]) -> anyhow::Result<tempfile::NamedTempFile> {
    let count = pages
        .iter()
        .map(|page| PagePointer::from_bytes(&page[32..38]).map_or(0, |p| p.page_id + 1))
        .max()
        .unwrap_or(0);
    let mut image = vec![0_u8; count as usize * mdfscan::page::PAGE_SIZE];
    for page in pages {
        let at = PagePointer::from_bytes(&page[32..38]).unwrap().page_id as usize * page.len();
        image[at..at + page.len()].copy_from_slice(page);
    }
    let mut f = tempfile::NamedTempFile::new()?;
    f.write_all(&image)?;
    f.flush()?;
    Ok(f)
}

#[test]
fn test_scan_heap_from_data_file() -> anyhow::Result<()> {
    let f = write_data_file(&[
        pfs_page(p(1), &[1, 2, 3, 9, 12]),
        iam_page(p(2), PagePointer::ZERO, p(0), &[p(3)], &[1]),
        data_page(p(3), PagePointer::ZERO, &[person(1, "ann")]),
        data_page(p(9), PagePointer::ZERO, &[person(2, "bob"), person(3, "cy")]),
        data_page(p(12), PagePointer::ZERO, &[person(4, "di")]),
    ])?;
    let file = MdfFile::open(f.path())?;
    assert_eq!(file.page_count(1)?, 13);

    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_heap_partition(100, 7000, 1, 0, p(2));
    let scanner = TableScanner::new(&db.catalog, &file);
    let mut ids = vec![];
    for row in scanner.scan("people")? {
        ids.push(row?.int("id")?);
    }
    // Pages 8, 10, 11 and 13 to 15 of the extent are not allocated and never read.
    assert_eq!(ids, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_scan_clustered_index_from_data_file() -> anyhow::Result<()> {
    let f = write_data_file(&[
        data_page(p(4), p(6), &[person(1, "ann"), person(2, "bob")]),
        data_page(p(6), PagePointer::ZERO, &[person(3, "cy")]),
    ])?;
    let file = MdfFile::open(f.path())?;
    let mut db = TestDb::new();
    db.add_person_table(100, "people")
        .add_clustered_partition(100, 7000, 1, 0, p(5), p(4));
    let scanner = TableScanner::new(&db.catalog, &file);
    let names = scanner
        .scan("people")?
        .map(|row| -> anyhow::Result<String> { Ok(row?.text("name")?.to_string()) })
        .collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(names, vec!["ann", "bob", "cy"]);
    Ok(())
}
