//! Options that control how strictly a scan checks the structures it walks.

/// Configuration for table scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Fail when a page chain (linked data pages or IAM pages) leads back to a page already visited.
    pub detect_cycles: bool,

    /// Fail when a fetched page's header reports a different address than the one it was fetched from.
    pub verify_page_ids: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            verify_page_ids: true,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with all checks enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the page chain cycle check.
    pub fn with_cycle_detection(mut self, enable: bool) -> Self {
        self.detect_cycles = enable;
        self
    }

    /// Enables or disables the page address check.
    pub fn with_page_id_verification(mut self, enable: bool) -> Self {
        self.verify_page_ids = enable;
        self
    }
}

#[test]
fn test_scan_config() {
    let c = ScanConfig::new();
    assert!(c.detect_cycles);
    assert!(c.verify_page_ids);
    let c = c.with_cycle_detection(false).with_page_id_verification(false);
    assert!(!c.detect_cycles);
    assert!(!c.verify_page_ids);
}
