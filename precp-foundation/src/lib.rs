//! Foundational types shared by every layer of the preprocessor.

pub mod diagnostics;
pub mod source;
