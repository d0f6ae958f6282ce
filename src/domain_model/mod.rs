mod connection;
mod forum;
mod message;
mod pagination;
mod user;

pub use connection::*;
pub use forum::*;
pub use message::*;
pub use pagination::*;
pub use user::*;
