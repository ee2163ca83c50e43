pub mod auth_http;
pub mod chat_http;
pub mod socket;
pub mod storage;

pub use auth_http::HttpAuthApi;
pub use chat_http::HttpChatApi;
pub use socket::WsTransport;
pub use storage::FileCredentialStore;
