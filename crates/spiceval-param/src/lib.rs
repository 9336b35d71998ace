//! Parameter tables and recursive substitution for SPICE expressions.
//!
//! A [`ParamTable`] holds `name = value` parameters and `name(args) = body`
//! macros. [`ParamTable::line_subst`] rewrites a line of text with every
//! reference expanded, folding quoted expressions to numbers when they can be
//! evaluated.
//!
//! # Example
//!
//! ```
//! use spiceval_param::{ParamTable, SubstOptions, extract_params};
//!
//! let mut table = ParamTable::new();
//! extract_params(&mut table, ".param pi=3.14159 r(x)=pi*x*x", &SubstOptions::default())
//!     .unwrap();
//!
//! assert_eq!(table.line_subst("r(5)").unwrap(), "3.14159*5*5");
//! assert_eq!(table.line_subst("'r(5)'").unwrap(), "78.53975");
//! ```

pub mod error;
pub mod extract;
mod scan;
pub mod subst;
pub mod table;

pub use error::{Error, Result};
pub use extract::extract_params;
pub use subst::{ExtractMode, MacroDefinition, MacroSink, SubstOptions, Substituter};
pub use table::{ParamEntry, ParamKey, ParamTable};
