pub mod config_store;
pub mod git;

pub use config_store::ConfigStore;
pub use git::{GitClient, GitRepo, LocalBranch, LogQuery, Remote, RemoteBranch};
