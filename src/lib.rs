//! # huffpack
//!
//! Static Huffman compression of whole files.
//!
//! The compressed file carries the code tree in a self-describing header, so
//! expansion needs nothing but the compressed bytes.  See the `huffman` module
//! for the driver functions, and `tools` for the building blocks.

mod tools;
pub mod huffman;

pub use tools::huff_tree::{Symbol,END_OF_STREAM,NOT_A_SYMBOL};

type DYNERR = Box<dyn std::error::Error>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("file too large")]
    FileTooLarge,
    #[error("malformed header")]
    MalformedHeader,
    #[error("payload ended before the end of stream code")]
    TruncatedPayload,
    #[error("end of stream code was not repeated")]
    TrailerMismatch,
    #[error("frequency table is empty")]
    EmptyTable,
    #[error("input and output are the same file")]
    SameFile
}
