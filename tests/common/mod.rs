//! Builds small synthetic databases: page images in a `MemoryPageStore` and the catalog rows that
//! point at them.
#![allow(dead_code)]

use mdfscan::catalog::{AllocationUnit, ObjectType, Partition, HEAP_INDEX_ID, IN_ROW_DATA};
use mdfscan::page::PAGE_SIZE;
use mdfscan::{MemoryCatalog, MemoryPageStore, PagePointer};

pub const DATA_PAGE: u8 = 1;
pub const IAM_PAGE: u8 = 10;
pub const PFS_PAGE: u8 = 11;

const ALLOCATED: u8 = 0x40;

pub fn p(page_id: u32) -> PagePointer {
    PagePointer::new(1, page_id)
}

fn put_pointer(page: &mut [u8], at: usize, pointer: PagePointer) {
    page[at..at + 4].copy_from_slice(&pointer.page_id.to_le_bytes());
    page[at + 4..at + 6].copy_from_slice(&pointer.file_id.to_le_bytes());
}

/// A zeroed page with the header fields a scan reads.
pub fn page_header(page_type: u8, pointer: PagePointer, next: PagePointer, slot_count: u16) -> Vec<u8> {
    let mut page = vec![0_u8; PAGE_SIZE];
    page[0] = 1;
    page[1] = page_type;
    put_pointer(&mut page, 16, next);
    page[22..24].copy_from_slice(&slot_count.to_le_bytes());
    put_pointer(&mut page, 32, pointer);
    page
}

/// A primary FixedVar record with a null bitmap.
pub fn fixed_var_record(fixed: &[u8], nulls: &[bool], vars: &[&[u8]]) -> Vec<u8> {
    let mut status_a = 0x10;
    if !vars.is_empty() {
        status_a |= 0x20;
    }
    let mut r = vec![status_a, 0x00];
    r.extend_from_slice(&((4 + fixed.len()) as u16).to_le_bytes());
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

/// A row of the `(id int, name varchar(20))` tables used throughout the tests.
pub fn person(id: i32, name: &str) -> Vec<u8> {
    fixed_var_record(&id.to_le_bytes(), &[false, false], &[name.as_bytes()])
}

/// A data page holding `records` in slot order.  An empty record leaves its slot empty.
pub fn data_page(pointer: PagePointer, next: PagePointer, records: &[Vec<u8>]) -> Vec<u8> {
    let mut page = page_header(DATA_PAGE, pointer, next, records.len() as u16);
    let mut offset = 96;
    for (slot, record) in records.iter().enumerate() {
        let at = PAGE_SIZE - 2 * (slot + 1);
        if record.is_empty() {
            continue;
        }
        page[offset..offset + record.len()].copy_from_slice(record);
        page[at..at + 2].copy_from_slice(&(offset as u16).to_le_bytes());
        offset += record.len();
    }
    page[30..32].copy_from_slice(&(offset as u16).to_le_bytes());
    page
}

/// An IAM page mapping the range starting at `start`, with `slots` as its single page allocations and
/// the extents numbered `extents` (relative to `start`) marked allocated.
pub fn iam_page(
    pointer: PagePointer,
    next: PagePointer,
    start: PagePointer,
    slots: &[PagePointer],
    extents: &[usize],
) -> Vec<u8> {
    let mut page = page_header(IAM_PAGE, pointer, next, 2);
    put_pointer(&mut page, 136, start);
    for (i, slot) in slots.iter().enumerate() {
        put_pointer(&mut page, 142 + 6 * i, *slot);
    }
    for extent in extents {
        page[194 + extent / 8] |= 1 << (extent % 8);
    }
    page
}

/// A PFS page marking `allocated` (page ids within its interval) as allocated.
pub fn pfs_page(pointer: PagePointer, allocated: &[u32]) -> Vec<u8> {
    let mut page = page_header(PFS_PAGE, pointer, PagePointer::ZERO, 1);
    for page_id in allocated {
        page[100 + (*page_id % 8088) as usize] = ALLOCATED;
    }
    page
}

#[derive(Default)]
pub struct TestDb {
    pub store: MemoryPageStore,
    pub catalog: MemoryCatalog,
}

impl TestDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, page: Vec<u8>) -> &mut Self {
        let pointer = PagePointer::from_bytes(&page[32..38]).unwrap();
        self.store.insert(pointer, page).unwrap();
        self
    }

    /// Puts `page` at `pointer`, whatever address its header carries.
    pub fn add_page_at(&mut self, pointer: PagePointer, page: Vec<u8>) -> &mut Self {
        self.store.insert(pointer, page).unwrap();
        self
    }

    /// Registers a user table with columns `id int, name varchar(20)`.
    pub fn add_person_table(&mut self, object_id: i32, name: &str) -> &mut Self {
        self.catalog
            .add_object(object_id, name, ObjectType::UserTable)
            .add_column(object_id, "id", "int", false)
            .add_column(object_id, "name", "varchar(20)", true);
        self
    }

    fn add_partition(
        &mut self,
        object_id: i32,
        partition_id: i64,
        index_id: i32,
        partition_number: i32,
        data_compression: u8,
        au: AllocationUnit,
    ) -> &mut Self {
        self.catalog
            .add_partition(Partition {
                partition_id,
                object_id,
                index_id,
                partition_number,
                data_compression,
            })
            .add_allocation_unit(au);
        self
    }

    pub fn add_heap_partition(
        &mut self,
        object_id: i32,
        partition_id: i64,
        partition_number: i32,
        data_compression: u8,
        first_iam: PagePointer,
    ) -> &mut Self {
        let au = AllocationUnit {
            allocation_unit_id: partition_id + 1000,
            container_id: partition_id,
            unit_type: IN_ROW_DATA,
            root_page: PagePointer::ZERO,
            first_page: PagePointer::ZERO,
            first_iam_page: first_iam,
        };
        self.add_partition(object_id, partition_id, HEAP_INDEX_ID, partition_number, data_compression, au)
    }

    pub fn add_clustered_partition(
        &mut self,
        object_id: i32,
        partition_id: i64,
        partition_number: i32,
        data_compression: u8,
        root: PagePointer,
        first: PagePointer,
    ) -> &mut Self {
        let au = AllocationUnit {
            allocation_unit_id: partition_id + 1000,
            container_id: partition_id,
            unit_type: IN_ROW_DATA,
            root_page: root,
            first_page: first,
            first_iam_page: PagePointer::ZERO,
        };
        self.add_partition(object_id, partition_id, 1, partition_number, data_compression, au)
    }
}
