pub mod category;
pub mod config;
pub mod document;
pub mod progress;
pub mod task;
pub mod theme;

pub use category::*;
pub use config::*;
pub use document::*;
pub use progress::*;
pub use task::*;
pub use theme::*;
