//! mergetrail - branch merge-status reports
//!
//! Given a repository (local path or remote URL), a keyword list and a
//! target branch, reports which matching branches have landed on the
//! target, when, by whom and through which merge or pull request.

pub mod adapters;
pub mod api;
pub mod branches;
pub mod config;
pub mod domain;
pub mod error;
pub mod merge;
pub mod platform;
pub mod ports;
pub mod report;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
