//! Tree header encoding.
//!
//! The tree is written in pre-order.  An internal node is a 0 bit followed by
//! its left and right subtrees, a leaf is a 1 bit followed by its symbol in a
//! `SYMBOL_BITS` wide field.  No length is stored, the shape bits alone tell
//! the decoder when the tree is complete.
//!
//! Symbol fields are 9 bits rather than 8, since the end of stream symbol (256)
//! has no byte value.  Squeezing it into a byte would make it collide with a
//! real data byte.

use std::collections::BTreeSet;
use std::io::{Read,Write};
use crate::tools::bit_stream::{BitReader,BitWriter};
use crate::tools::huff_tree::*;
use crate::DYNERR;

/// Deepest node possible in a tree with `MAX_LEAVES` leaves.
const MAX_DEPTH: usize = MAX_LEAVES - 1;

fn write_node<W: Write>(node: &Node,writer: &mut BitWriter<W>) -> Result<(),std::io::Error> {
    if node.is_leaf() {
        writer.write_bit(true)?;
        return writer.write_bits(SYMBOL_BITS,node.symbol);
    }
    writer.write_bit(false)?;
    for bit in [false,true] {
        if let Some(child) = node.child(bit) {
            write_node(child,writer)?;
        }
    }
    Ok(())
}

/// Write the tree shape and leaf symbols, weights are not stored.
pub fn write_header<W: Write>(tree: &HuffTree,writer: &mut BitWriter<W>) -> Result<(),std::io::Error> {
    write_node(tree.root(),writer)
}

fn malformed(msg: &str) -> DYNERR {
    log::error!("{}",msg);
    Box::new(crate::Error::MalformedHeader)
}

struct HeaderDecoder<'a,R: Read> {
    reader: &'a mut BitReader<R>,
    seen: BTreeSet<Symbol>
}

impl <'a,R: Read> HeaderDecoder<'a,R> {
    fn read_node(&mut self,depth: usize) -> Result<Node,DYNERR> {
        if depth > MAX_DEPTH {
            return Err(malformed("tree is too deep"));
        }
        match self.reader.read_bit()? {
            Some(true) => {
                let sym = match self.reader.read_bits(SYMBOL_BITS)? {
                    Some(sym) => sym,
                    None => return Err(malformed("header ended inside a symbol"))
                };
                if sym > END_OF_STREAM {
                    return Err(malformed(&format!("leaf symbol {} out of range",sym)));
                }
                if !self.seen.insert(sym) {
                    return Err(malformed(&format!("leaf symbol {} repeated",sym)));
                }
                log::trace!("leaf {} at depth {}",sym,depth);
                Ok(Node::leaf(sym,0))
            },
            Some(false) => {
                let left = self.read_node(depth + 1)?;
                let right = self.read_node(depth + 1)?;
                Ok(Node::branch(left,right))
            },
            None => Err(malformed("header ended inside the tree"))
        }
    }
}

/// Rebuild the tree from the header.  Any partial tree is dropped if the
/// header turns out to be malformed.  The reader is left just after the last
/// bit of the header.
pub fn read_header<R: Read>(reader: &mut BitReader<R>) -> Result<HuffTree,DYNERR> {
    let mut decoder = HeaderDecoder {
        reader,
        seen: BTreeSet::new()
    };
    let tree = HuffTree::from_root(decoder.read_node(0)?);
    if !tree.contains(END_OF_STREAM) {
        return Err(malformed("tree has no end of stream leaf"));
    }
    log::debug!("header has {} leaves",tree.leaf_count());
    Ok(tree)
}

// *************** TESTS *****************

#[cfg(test)]
fn header_bytes(tree: &HuffTree) -> Vec<u8> {
    let mut writer = BitWriter::new(Vec::new());
    write_header(tree,&mut writer).expect("write failed");
    assert_eq!(writer.bits_written() as usize,2*tree.leaf_count() - 1 + SYMBOL_BITS*tree.leaf_count());
    writer.finish().expect("flush failed")
}

#[cfg(test)]
fn is_malformed(result: Result<HuffTree,DYNERR>) -> bool {
    match result {
        Err(e) => matches!(e.downcast_ref::<crate::Error>(),Some(crate::Error::MalformedHeader)),
        Ok(_) => false
    }
}

#[test]
fn header_for_aaab() {
    let tree = HuffTree::build(&FrequencyTable::from_slice(b"AAAB")).expect("build failed");
    // 0 0 1 B 1 EOS 1 A
    assert_eq!(header_bytes(&tree),hex::decode("242C0241").unwrap());
}

#[test]
fn header_for_empty_input() {
    let tree = HuffTree::build(&FrequencyTable::from_slice(&[])).expect("build failed");
    assert_eq!(header_bytes(&tree),hex::decode("C000").unwrap());
    let mut reader = BitReader::new(std::io::Cursor::new(hex::decode("C000").unwrap()));
    let decoded = read_header(&mut reader).expect("read failed");
    assert!(decoded.is_single_leaf());
    assert_eq!(decoded.root().symbol,END_OF_STREAM);
    assert_eq!(reader.bits_read(),10);
}

#[test]
fn header_reproduces_tree() {
    let all: Vec<u8> = (0..=255u8).chain(b"I am Sam. Sam I am.".iter().copied()).collect();
    for dat in [&b"I am Sam. Sam I am. I do not like this Sam I am.\n"[..],&all[..],&b"z"[..]] {
        let tree = HuffTree::build(&FrequencyTable::from_slice(dat)).expect("build failed");
        let bytes = header_bytes(&tree);
        let mut reader = BitReader::new(std::io::Cursor::new(bytes));
        let decoded = read_header(&mut reader).expect("read failed");
        assert!(decoded.root().same_shape(tree.root()));
        assert_eq!(decoded.leaf_count(),tree.leaf_count());
        assert_eq!(reader.bits_read() as usize,2*tree.leaf_count() - 1 + SYMBOL_BITS*tree.leaf_count());
    }
}

#[test]
fn exhausted_header() {
    let mut reader = BitReader::new(std::io::Cursor::new(Vec::new()));
    assert!(is_malformed(read_header(&mut reader)));
    // 0 1 A then nothing
    let mut reader = BitReader::new(std::io::Cursor::new(hex::decode("50").unwrap()));
    assert!(is_malformed(read_header(&mut reader)));
}

#[test]
fn bad_symbols() {
    // duplicate leaf
    let mut writer = BitWriter::new(Vec::new());
    writer.write_bit(false).unwrap();
    writer.write_bit(true).unwrap();
    writer.write_bits(SYMBOL_BITS,b'A' as u16).unwrap();
    writer.write_bit(true).unwrap();
    writer.write_bits(SYMBOL_BITS,b'A' as u16).unwrap();
    let mut reader = BitReader::new(std::io::Cursor::new(writer.finish().unwrap()));
    assert!(is_malformed(read_header(&mut reader)));
    // internal marker used as a leaf
    let mut writer = BitWriter::new(Vec::new());
    writer.write_bit(true).unwrap();
    writer.write_bits(SYMBOL_BITS,NOT_A_SYMBOL).unwrap();
    let mut reader = BitReader::new(std::io::Cursor::new(writer.finish().unwrap()));
    assert!(is_malformed(read_header(&mut reader)));
    // no end of stream leaf
    let mut writer = BitWriter::new(Vec::new());
    writer.write_bit(false).unwrap();
    writer.write_bit(true).unwrap();
    writer.write_bits(SYMBOL_BITS,b'A' as u16).unwrap();
    writer.write_bit(true).unwrap();
    writer.write_bits(SYMBOL_BITS,b'B' as u16).unwrap();
    let mut reader = BitReader::new(std::io::Cursor::new(writer.finish().unwrap()));
    assert!(is_malformed(read_header(&mut reader)));
}

#[test]
fn runaway_depth() {
    let mut reader = BitReader::new(std::io::Cursor::new(vec![0;64]));
    assert!(is_malformed(read_header(&mut reader)));
}
