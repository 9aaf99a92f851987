//! Suppression of pre-approved errors.
//!
//! Filters are pure predicates over a recorded [`ValidationError`]. They
//! run once, after every validator has finished; an error matched by any
//! filter is moved to the context's ignored list.
//!
//! # Sub-modules
//!
//! - [`pattern`] - Anchored regexes and structured coordinate patterns.
//! - [`rule`] - The declarative [`rule::ExceptionFilterRule`].

pub mod pattern;
pub mod rule;

use crate::validation::ValidationError;
use std::fmt;

/// Decides whether a recorded error is suppressed.
#[cfg_attr(test, mockall::automock)]
pub trait ExceptionFilter {
    /// Return `true` to move `error` to the ignored list.
    fn should_ignore(&self, error: &ValidationError) -> bool;
}

/// Ordered list of filters combined with "any of" semantics.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ExceptionFilter>>,
}

impl FilterChain {
    /// Create a chain from filters supplied by the caller.
    #[must_use]
    pub fn new(filters: Vec<Box<dyn ExceptionFilter>>) -> Self {
        Self { filters }
    }

    /// Number of filters in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl ExceptionFilter for FilterChain {
    fn should_ignore(&self, error: &ValidationError) -> bool {
        self.filters.iter().any(|filter| filter.should_ignore(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorKind;

    fn sample() -> ValidationError {
        ValidationError::new("checksum", "a.jar", ErrorKind::ChecksumMismatch, "bad")
    }

    fn mock_returning(value: bool) -> Box<dyn ExceptionFilter> {
        let mut filter = MockExceptionFilter::new();
        filter.expect_should_ignore().return_const(value);
        Box::new(filter)
    }

    #[test]
    fn empty_chain_ignores_nothing() {
        let chain = FilterChain::default();
        assert!(chain.is_empty());
        assert!(!chain.should_ignore(&sample()));
    }

    #[test]
    fn chain_matches_when_any_filter_matches() {
        let chain = FilterChain::new(vec![mock_returning(false), mock_returning(true)]);
        assert_eq!(chain.len(), 2);
        assert!(chain.should_ignore(&sample()));
    }

    #[test]
    fn debug_output_counts_filters() {
        let chain = FilterChain::new(vec![mock_returning(false), mock_returning(true)]);
        assert_eq!(format!("{chain:?}"), "FilterChain { filters: 2 }");
    }

    #[test]
    fn chain_rejects_when_no_filter_matches() {
        let chain = FilterChain::new(vec![mock_returning(false), mock_returning(false)]);
        assert!(!chain.should_ignore(&sample()));
    }
}
