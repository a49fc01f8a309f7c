//! linked walks a chain of data pages from a start page, following each page's next-page pointer
//! until it is zero.  The leaf level of a clustered index is such a chain, in key order.

use tracing::trace;

use super::{Error, PageWalk, Pages, Visited};
use crate::page::DataPage;
use crate::page_pointer::PagePointer;

pub struct LinkedWalk<'a> {
    pages: Pages<'a>,
    next: PagePointer,
    visited: Visited,
}

impl<'a> LinkedWalk<'a> {
    /// Creates a walk starting at `first`.  A zero `first` is an empty chain.
    pub fn new(pages: Pages<'a>, first: PagePointer, detect_cycles: bool) -> Self {
        LinkedWalk {
            pages,
            next: first,
            visited: Visited::new(detect_cycles),
        }
    }
}

impl<'a> PageWalk for LinkedWalk<'a> {
    fn next_page(&mut self) -> Option<Result<DataPage, Error>> {
        if self.next.is_zero() {
            return None;
        }
        let pointer = std::mem::replace(&mut self.next, PagePointer::ZERO);
        if let Err(e) = self.visited.visit(pointer, "data page") {
            return Some(Err(e));
        }
        let page = match self.pages.data_page(pointer) {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };
        self.next = page.next_page();
        trace!(page = %pointer, next = %self.next, "following page chain");
        Some(Ok(page))
    }
}
