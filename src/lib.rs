pub mod cli;
pub mod config;
pub mod download;
pub mod filter;
pub mod load_config;
pub mod render;
pub mod synchronise;
pub mod upload;

pub use cli::{run, Cli};
pub use config::Settings;
pub use load_config::RepoRef;
