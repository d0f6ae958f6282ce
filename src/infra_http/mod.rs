mod auth_gateway_http;
mod forum_gateway_http;
mod http_client;
mod page_fetcher_http;

pub use auth_gateway_http::*;
pub use forum_gateway_http::*;
pub use http_client::*;
pub use page_fetcher_http::*;
