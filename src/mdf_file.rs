//! Defines `MdfFile` type, which represents one disk-backed database.
//!
//! Manages the file access to the data files (.mdf, .ndf) of one SQL Server database.
//! Page `n` of a file starts at byte `n * 8192`.  Pages are read on demand and not cached.

// TODO: take an OS-level shared lock on the data files so they cannot be modified while being read.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use crate::page::PAGE_SIZE;
use crate::page_pointer::PagePointer;
use crate::page_store::{Error, PageStore};

/// File id of the primary data file.
pub const PRIMARY_FILE_ID: u16 = 1;

/// An `MdfFile` gives read-only access to the pages of a database's data files.
///
/// Each file sits behind its own `Mutex`, since a read is a seek followed by a read on a shared
/// handle.  That makes an `MdfFile` usable from several threads at once.
///
/// # Examples
///
/// ```no_run
/// use mdfscan::mdf_file::MdfFile;
/// use mdfscan::page_pointer::PagePointer;
/// use mdfscan::page_store::PageStore;
///
/// let db = MdfFile::open("AdventureWorks.mdf").unwrap();
/// let boot_page = db.get_page(PagePointer::new(1, 9)).unwrap();
/// ```
#[derive(Debug)]
pub struct MdfFile {
    files: HashMap<u16, Mutex<File>>,
}

fn open_read_only(path: &Path) -> Result<File, Error> {
    Ok(std::fs::OpenOptions::new()
        .read(true)
        .write(false)
        .create(false)
        .open(path)?)
}

impl MdfFile {
    /// opens the primary data file of a single-file database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::open_files(&[(PRIMARY_FILE_ID, path)])
    }

    /// opens several data files of one database, each under its file id.
    pub fn open_files<P: AsRef<Path>>(files: &[(u16, P)]) -> Result<Self, Error> {
        let mut opened = HashMap::new();
        for (file_id, path) in files {
            debug!(file_id, path = %path.as_ref().display(), "opening data file");
            opened.insert(*file_id, Mutex::new(open_read_only(path.as_ref())?));
        }
        Ok(MdfFile { files: opened })
    }

    /// Number of whole pages in the file with id `file_id`.
    pub fn page_count(&self, file_id: u16) -> Result<u32, Error> {
        let file = self
            .files
            .get(&file_id)
            .ok_or(Error::UnknownFile(file_id))?
            .lock()
            .map_err(|_| Error::LockPoisoned)?;
        Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
    }
}

impl PageStore for MdfFile {
    fn get_page(&self, pointer: PagePointer) -> Result<Vec<u8>, Error> {
        let mut file = self
            .files
            .get(&pointer.file_id)
            .ok_or(Error::UnknownFile(pointer.file_id))?
            .lock()
            .map_err(|_| Error::LockPoisoned)?;
        let mut v = vec![0_u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(pointer.page_id as u64 * PAGE_SIZE as u64))?;
        match file.read_exact(&mut v[..]) {
            Ok(()) => Ok(v),
            // A page past the end of the file.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::PageNotFound(pointer)),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
fn temp_file_with_pages(pages: u32) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    for i in 0..pages {
        let mut page = vec![0_u8; PAGE_SIZE];
        page[1] = 1;
        page[32..36].copy_from_slice(&i.to_le_bytes());
        page[36..38].copy_from_slice(&PRIMARY_FILE_ID.to_le_bytes());
        f.write_all(&page).unwrap();
    }
    f.flush().unwrap();
    f
}

#[test]
fn test_read_pages_from_file() {
    let f = temp_file_with_pages(3);
    let db = MdfFile::open(f.path()).unwrap();
    assert_eq!(db.page_count(1).unwrap(), 3);
    let page = db.get_data_page(PagePointer::new(1, 2)).unwrap();
    assert_eq!(page.pointer(), PagePointer::new(1, 2));
}

#[test]
fn test_read_past_end_of_file() {
    let f = temp_file_with_pages(2);
    let db = MdfFile::open(f.path()).unwrap();
    assert!(matches!(
        db.get_page(PagePointer::new(1, 2)),
        Err(Error::PageNotFound(_))
    ));
    assert!(matches!(
        db.get_page(PagePointer::new(2, 0)),
        Err(Error::UnknownFile(2))
    ));
}

#[test]
fn test_open_missing_file() {
    assert!(matches!(
        MdfFile::open("/nonexistent/dir/db.mdf"),
        Err(Error::Io(_))
    ));
}
