pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::LspClient;
pub use config::LspConfig;
pub use dispatcher::{handler, Dispatch, Dispatcher, ResponseHandler};
pub use error::{FrameError, LspError};
pub use protocol::*;
pub use session::{Session, SessionState};
pub use transport::Transport;
