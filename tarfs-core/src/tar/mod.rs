//! Sequential ustar / GNU / PAX reader.

pub mod decoder;
pub mod header;

pub use decoder::Decoder;
pub use header::{EntryKind, Header};
