mod forum_service_impl;
mod session_service_impl;

pub use forum_service_impl::*;
pub use session_service_impl::*;
