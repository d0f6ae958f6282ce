mod forum_service;
mod session_service;

pub use forum_service::*;
pub use session_service::*;
