pub mod collector;
pub mod logging;
pub mod notify;
pub mod render;
pub mod reporter;
pub mod types;
