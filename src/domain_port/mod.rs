mod chat_connector;
mod remote;
mod session_store;

pub use chat_connector::*;
pub use remote::*;
pub use session_store::*;
