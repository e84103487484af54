// Application layer - operation orchestration and the error taxonomy.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
