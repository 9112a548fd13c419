//! Error handling foundation for tollgate.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types and wraps them
//! in a `Report` as they cross function boundaries.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_carries_context_type() {
        let ok: Result<&str, String> = Ok("issued");
        assert_eq!(ok.expect("should be ok"), "issued");
    }
}
