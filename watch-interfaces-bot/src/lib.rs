pub mod alarms;
pub mod error;
pub mod responder;

pub use alarms::*;
pub use error::*;
pub use responder::*;
