pub mod health;
pub mod connect;
pub mod doc_sessions;
pub mod diagnostics;
pub mod error;

pub use health::*;
pub use connect::*;
pub use doc_sessions::*;
pub use diagnostics::*;
pub use error::*;
