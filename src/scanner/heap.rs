//! heap walks the pages of a heap allocation unit.
//!
//! For each IAM page in the chain, in chain order:
//! 1. the pages in the 8 header slots, in slot order, skipping unused slots;
//! 2. the pages of each extent allocated in the IAM bitmap, in bitmap order, skipping pages the
//!    tracking PFS page does not mark as allocated.  An extent may be mixed, with some of its pages
//!    belonging to other allocation units.
//!
//! The resulting order is physical; it says nothing about insertion order.

use tracing::{debug, trace};

use super::{Error, PageWalk, Pages, Visited};
use crate::page::iam::PAGES_PER_EXTENT;
use crate::page::{DataPage, Extent, IamPage, PfsPage};
use crate::page_pointer::PagePointer;

/// Position within the pages listed by one IAM page.
struct IamCursor {
    slots: Vec<PagePointer>,
    slot_index: usize,
    extents: Vec<Extent>,
    extent_index: usize,
    /// PFS page tracking the current extent, fetched when the extent is entered and kept until it is left.
    pfs: Option<PfsPage>,
    page_in_extent: u32,
}

impl IamCursor {
    fn new(iam: &IamPage) -> Self {
        IamCursor {
            slots: iam.slots().iter().copied().filter(|p| !p.is_zero()).collect(),
            slot_index: 0,
            extents: iam.allocated_extents().collect(),
            extent_index: 0,
            pfs: None,
            page_in_extent: 0,
        }
    }
}

pub struct HeapWalk<'a> {
    pages: Pages<'a>,
    next_iam: PagePointer,
    visited: Visited,
    current: Option<IamCursor>,
}

impl<'a> HeapWalk<'a> {
    /// Creates a walk over the IAM chain starting at `first_iam`.  A zero `first_iam` is an empty heap.
    pub fn new(pages: Pages<'a>, first_iam: PagePointer, detect_cycles: bool) -> Self {
        HeapWalk {
            pages,
            next_iam: first_iam,
            visited: Visited::new(detect_cycles),
            current: None,
        }
    }
}

impl<'a> PageWalk for HeapWalk<'a> {
    fn next_page(&mut self) -> Option<Result<DataPage, Error>> {
        loop {
            if let Some(cur) = &mut self.current {
                if let Some(&pointer) = cur.slots.get(cur.slot_index) {
                    cur.slot_index += 1;
                    return Some(self.pages.data_page(pointer));
                }
                while let Some(extent) = cur.extents.get(cur.extent_index).copied() {
                    let pfs = match cur.pfs.take() {
                        Some(pfs) => pfs,
                        None => match self.pages.pfs_page(PfsPage::pointer_for_page(extent.start)) {
                            Ok(pfs) => pfs,
                            Err(e) => return Some(Err(e)),
                        },
                    };
                    while cur.page_in_extent < PAGES_PER_EXTENT {
                        let Some(pointer) = extent.start.offset(cur.page_in_extent) else {
                            return Some(Err(Error::Corruption(format!(
                                "extent at {} runs past the last page id",
                                extent.start
                            ))));
                        };
                        cur.page_in_extent += 1;
                        if pfs.is_allocated(pointer.page_id) {
                            cur.pfs = Some(pfs);
                            return Some(self.pages.data_page(pointer));
                        }
                        trace!(page = %pointer, "skipping page not allocated in PFS");
                    }
                    cur.extent_index += 1;
                    cur.page_in_extent = 0;
                }
                self.current = None;
            }

            if self.next_iam.is_zero() {
                return None;
            }
            let pointer = self.next_iam;
            if let Err(e) = self.visited.visit(pointer, "IAM page") {
                return Some(Err(e));
            }
            let iam = match self.pages.iam_page(pointer) {
                Ok(iam) => iam,
                Err(e) => return Some(Err(e)),
            };
            let cursor = IamCursor::new(&iam);
            debug!(
                iam = %pointer,
                slots = cursor.slots.len(),
                extents = cursor.extents.len(),
                "reading IAM page"
            );
            self.next_iam = iam.next_page();
            self.current = Some(cursor);
        }
    }
}
