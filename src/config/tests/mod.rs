//! Unit tests for configuration loading and precedence.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, base URL, and merge request resolution tests
//! - `loading`: Environment and CLI loading tests
//! - `projections`: Conversion into retry, cache, and view options

mod helpers;
