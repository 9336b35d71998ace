//! Numeric building blocks shared by the spiceval crates.
//!
//! This crate owns the SPICE numeric literal scanner (magnitude suffixes,
//! `mil`/`meg` disambiguation, trailing units) and the formatting routines
//! used when numbers are written back into text.

pub mod units;

pub use units::{
    MIL_SCALE, NumberScan, UnitChars, format_general, format_literal, format_number, format_value,
    parse_value, scan_number, scan_number_with,
};
