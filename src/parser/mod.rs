//! Document parsing module.
//!
//! Two independent passes read a [`LineBuffer`](crate::model::LineBuffer):
//! [`StructureScanner`] looks for a tree diagram and [`CodeBlockParser`]
//! extracts fenced code correlated with path headings.

mod code_block;
mod heading;
mod options;
mod structure;

pub use code_block::{CodeBlockParser, ParserState, StepResult};
pub use heading::PathHeadingMatcher;
pub use options::{ErrorMode, FenceMatch, ParseOptions};
pub use structure::{ScanOutcome, StructureScanner, MIN_GLYPH_RUN};
