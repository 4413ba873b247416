pub mod config;
pub mod error;
pub mod types;
pub mod window;

pub use config::Config;
pub use error::CvMonError;
pub use types::*;
pub use window::ReportWindow;
