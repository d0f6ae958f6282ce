mod chat_log;
mod chat_sync;
mod list_sync;

pub use chat_log::*;
pub use chat_sync::*;
pub use list_sync::*;

#[cfg(test)]
mod test_support;
