// Domain entities
pub mod chat;
pub mod config;
pub mod mob;
pub mod reward;
pub mod subscriber;

pub use chat::*;
pub use config::*;
pub use mob::*;
pub use reward::*;
pub use subscriber::*;
