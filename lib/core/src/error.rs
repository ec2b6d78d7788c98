//! Error handling foundation for roundtable.
//!
//! Library crates define their own domain error enums in their own
//! `error` modules. Binaries wrap those in rootcause reports and add
//! layer-appropriate context with `.context()` as errors propagate.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
