pub mod config;
pub mod error;
pub mod error_utils;
pub mod html;
pub mod types;

pub use config::AppConfig;
pub use error::*;
pub use error_utils::*;
pub use html::{collapse_whitespace, strip_html};
pub use types::*;
