//! # spiceval
//!
//! SPICE expression handling in Rust.
//!
//! spiceval provides:
//! - Numeric literals with SPICE scale suffixes (`1.5meg`, `10u`, `2mil`)
//! - Lexing and operator-precedence parsing of expressions into trees
//! - Printing trees back with minimal parentheses
//! - Evaluation against constants, built-in functions and caller-supplied
//!   values, including vectors and probes such as `v(out)`
//! - Parameter tables with recursive substitution and macros
//!
//! ## Quick Start
//!
//! ```rust
//! use spiceval::prelude::*;
//!
//! let tree = parse_expression("2 * pi * f").unwrap();
//! let mut ctx = EvalContext::new();
//! ctx.set_real("f", 1e3);
//! let value = ctx.evaluate(&tree).unwrap().real().unwrap();
//! assert!((value - 6283.185307179586).abs() < 1e-9);
//! ```
//!
//! ## Parameters
//!
//! ```rust
//! use spiceval::prelude::*;
//!
//! let mut table = ParamTable::new();
//! extract_params(&mut table, ".param w=2u l=1u", &SubstOptions::default()).unwrap();
//! assert_eq!(table.line_subst("'w/l'").unwrap(), "2");
//! ```

// Re-export member crates
pub use spiceval_core as core;
pub use spiceval_expr as expr;
pub use spiceval_param as param;

// ============================================================================
// Numbers
// ============================================================================

pub use spiceval_core::{
    MIL_SCALE, NumberScan, UnitChars, format_literal, format_number, format_value, parse_value,
    scan_number, scan_number_with,
};

// ============================================================================
// Expressions
// ============================================================================

pub use spiceval_expr::{
    BinaryOp, ErrorCode, EvalContext, EvalError, Evaluate, Evaluation, Expr, ParseError,
    ParseOptions, Parser, UnaryOp, Value, eval_function, is_probe_function, parse_expression,
    parse_expression_with, parse_list, parse_list_with,
};

// ============================================================================
// Parameters
// ============================================================================

pub use spiceval_param::{
    Error as ParamError, ExtractMode, MacroDefinition, MacroSink, ParamEntry, ParamKey, ParamTable,
    SubstOptions, Substituter, extract_params,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use spiceval::prelude::*;
/// ```
pub mod prelude {
    // Expressions
    pub use crate::{EvalContext, Evaluate, Evaluation, Expr, Value, parse_expression};

    // Parameters
    pub use crate::{ParamTable, SubstOptions, extract_params};

    // Numbers
    pub use crate::{format_number, parse_value};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_evaluate() {
        let tree = parse_expression("max(1k, 2meg) / 1e6").unwrap();
        let value = EvalContext::new().evaluate(&tree).unwrap().real();
        assert_eq!(value, Some(2.0));
    }

    #[test]
    fn test_substitute_and_evaluate() {
        let mut table = ParamTable::new();
        table.update("vdd", "3.3").unwrap();
        let text = table.line_subst("vdd/2").unwrap();
        let tree = parse_expression(&text).unwrap();
        let value = EvalContext::new().evaluate(&tree).unwrap().real().unwrap();
        assert!((value - 1.65).abs() < 1e-12);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        assert_eq!(parse_value("4.7k"), Some(4700.0));
        assert_eq!(format_number(0.5), "0.5");
        let _: ParamTable = ParamTable::new();
    }
}
