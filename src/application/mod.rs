// Application layer - use cases and orchestration on top of the domain and storage.

pub mod error;
pub mod reporting;
pub mod service;
pub mod sources;

pub use error::*;
pub use reporting::*;
pub use service::*;
pub use sources::*;
