//! Terminal rendering for the `tu` command line.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::create_spinner;
pub use tables::{
    TableBuilder, create_build_table, create_cache_table, create_completion_table,
    create_symbol_table,
};
pub use theme::{THEME, Theme};
