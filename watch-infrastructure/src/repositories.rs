pub mod reward_files;
pub mod subscriber_file;

pub use reward_files::*;
pub use subscriber_file::*;
