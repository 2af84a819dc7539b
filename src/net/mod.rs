// net/mod.rs
//! Networking layer: framing helpers shared by backend links.
//! Everything in here is transport-agnostic.

pub mod line_reader;

pub use line_reader::LineReader;
