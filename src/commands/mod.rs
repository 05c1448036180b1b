pub mod auth;
pub mod profile;

// Re-export all the command structs
pub use auth::{LoginArgs, RegisterArgs};
pub use profile::ProfileArgs;
