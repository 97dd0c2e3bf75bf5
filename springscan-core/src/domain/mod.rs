//! Domain types for springscan

pub mod bar;

pub use bar::{Bar, BarError, BarSeries};

/// Symbol type alias
pub type Symbol = String;
