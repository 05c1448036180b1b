// Interactive chat loop modules

pub mod animation;
pub mod commands;
pub mod display;
pub mod helper;
pub mod input;
pub mod runner;

pub use commands::COMMANDS;
pub use runner::run_chat;
