pub mod health;
pub mod doc_sessions;
pub mod diagnostics;

pub use health::*;
pub use doc_sessions::*;
pub use diagnostics::*;
