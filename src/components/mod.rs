//! Maud HTML components for the web UI.
//!
//! - `layout`: base page layout and navigation
//! - `table`: simple table builder used by the dashboard pages

pub mod layout;
pub mod table;

pub use self::layout::BaseLayout;
pub use self::table::{Table, TableRow};
