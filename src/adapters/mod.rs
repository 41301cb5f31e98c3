pub mod git2_adapter;
pub mod json_config_store;

pub use git2_adapter::{Git2Client, Git2Repo};
pub use json_config_store::JsonConfigStore;
