pub mod error;
pub mod reply;


pub use error::{DisqueError, Result};
pub use reply::{render, Reply};
