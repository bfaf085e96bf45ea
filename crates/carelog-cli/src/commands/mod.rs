pub mod auth_cmd;
pub mod chronic;
pub mod common;
pub mod document;
pub mod family;
pub mod sync_cmd;
pub mod visit;
