//! The directive driver: conditional-compilation state, `#include`
//! resolution, and the top-level file loop that ties the tokenizer and
//! macro engine together.

pub mod conditional;
pub mod driver;
pub mod error;
pub mod include;

pub use conditional::ConditionalStack;
pub use driver::Session;
pub use error::DriverError;
pub use include::{parse_include_filename, IncludeResolver, SearchPathResolver};
