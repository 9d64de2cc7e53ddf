//! Claude API integration for event extraction.
//!
//! The primary extraction path sends free-form text to the Claude API and
//! parses the structured reply into [`ExtractedFields`]. The
//! [`extract_events`] pipeline wraps the primary path in a timeout and
//! degrades to the pure regex fallback in `tl-core` when the model is
//! unavailable, so extraction as a whole never fails on model trouble.

mod client;
mod pipeline;

pub use client::{Client, NluError, parse_analysis};
pub use pipeline::{ExtractorConfig, ModelAnalyzer, TextAnalyzer, extract_events};
