//! Orders Data

/// Page size used when the caller does not give one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Paging for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    pub take: u32,
    pub skip: u32,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            take: DEFAULT_PAGE_SIZE,
            skip: 0,
        }
    }
}
