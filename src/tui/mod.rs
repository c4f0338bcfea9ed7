//! TUI module for terminal user interfaces

mod check_view;

pub use check_view::CheckProgressApp;
