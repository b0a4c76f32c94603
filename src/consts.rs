//! Shared constants.

/// File name for the local fallback copy of the workspace.
pub const CACHE_FILE_NAME: &str = "siteline-cache.json";

/// Names of the document-store collections.
pub mod collections {
    pub const SITES: &str = "sites";
    pub const TECHNICIANS: &str = "technicians";
    pub const REPORTS: &str = "reports";
    pub const QUOTES: &str = "quotes";

    /// Every collection the sync context mirrors, in load order.
    pub const ALL: &[&str] = &[SITES, TECHNICIANS, REPORTS, QUOTES];
}
