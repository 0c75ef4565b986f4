pub mod api;
pub mod cli;

pub use api::{ComicDetail, Episode, ImageIndex, ImageToken, VerifyResult};
pub use cli::Cli;
