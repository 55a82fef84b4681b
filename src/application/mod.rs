// Application layer - use cases on top of whichever store was configured.
// Validation of caller input happens here, never in the stores.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
