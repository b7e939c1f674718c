//! TUI widgets for FXLens.

pub mod header;
pub mod input;
pub mod output;
pub mod sidebar;
pub mod table;
