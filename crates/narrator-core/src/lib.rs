pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::NarratorConfig;
pub use error::{NarratorError, Result};
pub use events::NarrationEvent;
pub use types::*;
