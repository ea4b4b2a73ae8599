//! CSV/JSON readers for [`reachab_types::GraphInput`].
//!
//! This is the "external collaborator" described as interfaces-only in the
//! specification: a thin, format-faithful reader for the two wire formats of
//! §6, nothing more. It does not attempt the breadth of a general graph
//! interchange tool (no DOT/mermaid/tree support, no diffing, no emitters) —
//! that belongs to a different, much larger tool than this one.

mod csv_format;
mod format;
mod json_format;

pub use format::{InputFormat, detect};

use reachab_types::GraphInput;

/// Parse `input` as the given format into a `GraphInput`. Both formats
/// produce a `Scalar`-variant graph: neither wire format in §6 has syntax
/// for expressing `Interval`/`PBox` bounds, so those variants are reachable
/// only by constructing `GraphInput` programmatically.
pub fn parse(format: InputFormat, input: &str) -> eyre::Result<GraphInput> {
    match format {
        InputFormat::Csv => csv_format::parse(input),
        InputFormat::Json => json_format::parse(input),
    }
}
