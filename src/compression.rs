//! Partition compression levels and the decode context derived from them.
//!
//! Compression is chosen per partition, so one table scan can see several levels.  The context is
//! passed explicitly to every length computation and decode call; nothing caches it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    #[default]
    None,
    Row,
    Page,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown data compression level {0}.")]
    UnknownLevel(u8),
}

impl TryFrom<u8> for CompressionLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionLevel::None),
            1 => Ok(CompressionLevel::Row),
            2 => Ok(CompressionLevel::Page),
            x => Err(Error::UnknownLevel(x)),
        }
    }
}

/// What the value decoders need to know about how a partition stores its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionContext {
    pub level: CompressionLevel,
    /// Decimal-family values are stored in the variable-length vardecimal format.
    pub uses_vardecimals: bool,
}

impl CompressionContext {
    pub const NONE: CompressionContext = CompressionContext {
        level: CompressionLevel::None,
        uses_vardecimals: false,
    };

    pub fn new(level: CompressionLevel) -> Self {
        CompressionContext {
            level,
            uses_vardecimals: level != CompressionLevel::None,
        }
    }
}

impl From<CompressionLevel> for CompressionContext {
    fn from(level: CompressionLevel) -> Self {
        CompressionContext::new(level)
    }
}

impl Default for CompressionContext {
    fn default() -> Self {
        CompressionContext::NONE
    }
}

#[test]
fn test_compression_level_from_catalog_value() {
    assert_eq!(CompressionLevel::try_from(0), Ok(CompressionLevel::None));
    assert_eq!(CompressionLevel::try_from(1), Ok(CompressionLevel::Row));
    assert_eq!(CompressionLevel::try_from(2), Ok(CompressionLevel::Page));
    assert_eq!(CompressionLevel::try_from(3), Err(Error::UnknownLevel(3)));
}

#[test]
fn test_vardecimal_storage_follows_level() {
    assert!(!CompressionContext::from(CompressionLevel::None).uses_vardecimals);
    assert!(CompressionContext::from(CompressionLevel::Row).uses_vardecimals);
    assert!(CompressionContext::from(CompressionLevel::Page).uses_vardecimals);
}
