// Domain value objects
pub mod region;

pub use region::*;
