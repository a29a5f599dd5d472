//! Types and methods for reading input and writing output.

pub mod file;

pub use file::{sanitize_path, InputFile, OutputFile};
