mod chat_connector_ws;

pub use chat_connector_ws::*;
