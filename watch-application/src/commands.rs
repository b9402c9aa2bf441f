pub mod bot_commands;
pub mod poll_commands;
