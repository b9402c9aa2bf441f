pub mod battlefield_client;
pub mod console_sink;
pub mod poll_service;
pub mod telegram;

pub use battlefield_client::*;
pub use console_sink::*;
pub use poll_service::*;
pub use telegram::*;
