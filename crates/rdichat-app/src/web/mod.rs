// Web frontend module
pub mod protocol;
pub mod routes;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use routes::{create_router, AppState, WebSink};
pub use server::WebServer;
