pub mod archive;
pub mod bili_client;
pub mod configuration;
pub mod download;
pub mod error;
pub mod limiter;
pub mod models;
pub mod retry;
pub mod run;

pub use configuration::{Credentials, Settings};
pub use error::DownloadError;
pub use models::Cli;
pub use run::run;
