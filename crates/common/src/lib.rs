pub mod config;
pub mod error;
pub mod notifier;
pub mod source;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use notifier::Notifier;
pub use source::Extractor;
pub use store::RecordStore;
pub use types::*;
