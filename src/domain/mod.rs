pub mod change_request;
pub mod report;
pub mod types;

pub use change_request::{change_request_number, extract_change_request_id};
pub use report::{matches_any, parse_keywords, sort_rows, ReportRow};
pub use types::{
    format_timestamp, short_hash, AppConfig, AuthorInfo, BranchInfo, BranchKind, Commit,
    MergeResolution, PlatformProfile, RepositoryConfig,
};
