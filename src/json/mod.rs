//! Streaming JSON primitives: a pull tokenizer and an event writer.

pub mod reader;
pub mod writer;

pub use reader::{DEFAULT_MAX_DEPTH, JsonEvent, JsonReader, ReadError};
pub use writer::JsonWriter;
