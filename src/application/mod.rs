// Application layer - use cases and orchestration over the repository.

pub mod error;
mod service;
mod session;

pub use error::*;
pub use service::*;
pub use session::*;
