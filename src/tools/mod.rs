//! Building blocks for the Huffman codec.

pub mod bit_stream;
pub mod min_queue;
pub mod huff_tree;
pub mod tree_codec;
