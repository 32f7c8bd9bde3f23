//! Static Huffman Compression
//!
//! The input is read twice: once to count byte frequencies, and once to encode.
//! The compressed stream is laid out as follows, with bits packed MSB first:
//!
//! * tree header, see `tools::tree_codec`, padded with zeros to a byte boundary
//! * one separator byte, its value is not checked when expanding
//! * the code of every input byte, in order
//! * the end of stream code, twice
//! * zeros to complete the final byte
//!
//! If the input is empty, the tree is a lone end of stream leaf with no code
//! length, in that case the stream ends right after the separator.
//!
//! When expanding, the second end of stream code is checked, so that a file
//! missing its final bytes is reported rather than silently cut short.

use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter,ErrorKind};
use std::path::Path;
use bit_vec::BitVec;
use crate::tools::bit_stream::{BitReader,BitWriter};
use crate::tools::huff_tree::*;
use crate::tools::tree_codec;
use crate::DYNERR;

/// Options controlling compression
#[derive(Clone)]
pub struct Options {
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64,
    /// byte written between the header and the payload
    pub separator: u8,
    /// return error if file is larger
    pub max_file_size: u64
}

pub const STD_OPTIONS: Options = Options {
    in_offset: 0,
    out_offset: 0,
    separator: b' ',
    max_file_size: u32::MAX as u64
};

/// What can be learned from the header of a compressed file.
#[derive(Debug,Clone,PartialEq)]
pub struct HeaderInfo {
    /// number of leaves, including end of stream
    pub leaf_count: usize,
    /// length of the longest code
    pub depth: usize,
    /// size of the tree encoding, padding and separator excluded
    pub header_bits: u64,
    /// each symbol in the tree with the length of its code
    pub code_lengths: Vec<(Symbol,usize)>
}

/// Seek to `offset` and return the number of bytes from there to the end.
fn measure<S: Seek>(stream: &mut S,offset: u64,max_size: u64) -> Result<u64,DYNERR> {
    let end = stream.seek(SeekFrom::End(0))?;
    if offset > end {
        log::error!("offset {} is beyond end of data at {}",offset,end);
        return Err(Box::new(crate::Error::FileFormatMismatch));
    }
    if end - offset > max_size {
        return Err(Box::new(crate::Error::FileTooLarge));
    }
    stream.seek(SeekFrom::Start(offset))?;
    Ok(end - offset)
}

fn lookup(codes: &CodeTable,sym: Symbol) -> Result<&BitVec,DYNERR> {
    match codes.get(sym) {
        Some(code) => Ok(code),
        None => {
            log::error!("symbol {} has no code, input changed between passes?",sym);
            Err(Box::new(crate::Error::FileFormatMismatch))
        }
    }
}

/// Write the code of every byte in `reader`, followed by the end of stream code twice.
/// Nothing is written for a single leaf tree.
fn encode_payload<R: Read,W: Write>(reader: &mut R,tree: &HuffTree,writer: &mut BitWriter<W>) -> Result<(),DYNERR> {
    if tree.is_single_leaf() {
        log::debug!("single leaf tree, skipping payload");
        return Ok(());
    }
    let codes = CodeTable::from_tree(tree);
    for byte in reader.bytes() {
        let byte = byte?;
        let code = lookup(&codes,byte as Symbol)?;
        log::trace!("byte {} takes {} bits",byte,code.len());
        writer.write_code(code)?;
    }
    let eos = lookup(&codes,END_OF_STREAM)?;
    writer.write_code(eos)?;
    writer.write_code(eos)?;
    Ok(())
}

/// Walk from the root to a leaf and return its symbol,
/// or `None` if the bits run out first.
fn decode_symbol<R: Read>(root: &Node,reader: &mut BitReader<R>) -> Result<Option<Symbol>,DYNERR> {
    let mut curr = root;
    while !curr.is_leaf() {
        let bit = match reader.read_bit()? {
            Some(bit) => bit,
            None => return Ok(None)
        };
        curr = match curr.child(bit) {
            Some(child) => child,
            None => return Err(Box::new(crate::Error::MalformedHeader))
        };
    }
    Ok(Some(curr.symbol))
}

/// Decode bytes until the end of stream leaf, then verify the repeated
/// end of stream code.  Returns the number of bytes written.
fn decode_payload<R: Read,W: Write>(tree: &HuffTree,reader: &mut BitReader<R>,writer: &mut W) -> Result<u64,DYNERR> {
    if tree.is_single_leaf() {
        log::debug!("single leaf tree, no payload");
        return Ok(0);
    }
    let mut count: u64 = 0;
    loop {
        match decode_symbol(tree.root(),reader)? {
            Some(END_OF_STREAM) => break,
            Some(sym) => {
                writer.write_all(&[sym as u8])?;
                count += 1;
            },
            None => {
                log::error!("payload ended after {} bytes without end of stream",count);
                return Err(Box::new(crate::Error::TruncatedPayload));
            }
        }
    }
    log::debug!("end of stream after {} bytes",count);
    match decode_symbol(tree.root(),reader)? {
        Some(END_OF_STREAM) => Ok(count),
        Some(sym) => {
            log::error!("expected repeated end of stream, got {}",sym);
            Err(Box::new(crate::Error::TrailerMismatch))
        },
        None => {
            log::error!("payload ended inside the repeated end of stream");
            Err(Box::new(crate::Error::TruncatedPayload))
        }
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(expanded_in);
    let expanded_length = measure(&mut reader,opt.in_offset,opt.max_file_size)?;

    log::debug!("counting symbols");
    let table = FrequencyTable::from_reader(&mut reader)?;
    log::debug!("counted {} bytes with {} distinct symbols",table.total(),table.len());
    let tree = HuffTree::build(&table)?;

    compressed_out.seek(SeekFrom::Start(opt.out_offset))?;
    let mut writer = BitWriter::new(BufWriter::new(compressed_out));
    tree_codec::write_header(&tree,&mut writer)?;
    log::debug!("header has {} bits",writer.bits_written());
    writer.put(opt.separator)?;

    reader.seek(SeekFrom::Start(opt.in_offset))?;
    encode_payload(&mut reader,&tree,&mut writer)?;
    writer.flush()?;
    Ok((expanded_length,writer.bytes_written()))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  On error, whatever was written to `expanded_out` is not valid.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(compressed_in);
    let compressed_size = measure(&mut reader,opt.in_offset,opt.max_file_size)?;
    expanded_out.seek(SeekFrom::Start(opt.out_offset))?;
    let mut writer = BufWriter::new(expanded_out);
    let mut bits = BitReader::new(reader);

    let tree = tree_codec::read_header(&mut bits)?;
    log::debug!("header took {} bytes",bits.bytes_read());
    match bits.get()? {
        Some(sep) => log::trace!("separator {:#04x}",sep),
        None => {
            log::error!("missing separator after header");
            return Err(Box::new(crate::Error::MalformedHeader));
        }
    }
    let expanded_size = decode_payload(&tree,&mut bits,&mut writer)?;
    writer.flush()?;
    Ok((compressed_size,expanded_size))
}

/// Read only the header of a compressed stream.
pub fn inspect<R>(compressed_in: &mut R, opt: &Options) -> Result<HeaderInfo,DYNERR>
where R: Read + Seek {
    let mut reader = BufReader::new(compressed_in);
    measure(&mut reader,opt.in_offset,opt.max_file_size)?;
    let mut bits = BitReader::new(reader);
    let tree = tree_codec::read_header(&mut bits)?;
    let codes = CodeTable::from_tree(&tree);
    Ok(HeaderInfo {
        leaf_count: tree.leaf_count(),
        depth: tree.depth(),
        header_bits: bits.bits_read(),
        code_lengths: codes.iter().map(|(sym,code)| (sym,code.len())).collect()
    })
}

/// Open `path_in` for reading and create `path_out`, after making sure the input
/// is a regular file and that creating the output will not truncate it.
fn open_pair(path_in: &Path,path_out: &Path) -> Result<(std::fs::File,std::fs::File),DYNERR> {
    let in_file = std::fs::File::open(path_in)?;
    if !in_file.metadata()?.is_file() {
        return Err(Box::new(std::io::Error::new(ErrorKind::InvalidInput,
            format!("{} is not a regular file",path_in.display()))));
    }
    if path_out.exists() && std::fs::canonicalize(path_in)? == std::fs::canonicalize(path_out)? {
        log::error!("{} is both input and output",path_in.display());
        return Err(Box::new(crate::Error::SameFile));
    }
    let out_file = std::fs::File::create(path_out)?;
    Ok((in_file,out_file))
}

/// Run `op` from `path_in` to `path_out`, removing the output if `op` fails.
fn file_to_file<F>(path_in: &Path,path_out: &Path,op: F) -> Result<(u64,u64),DYNERR>
where F: FnOnce(&mut std::fs::File,&mut std::fs::File) -> Result<(u64,u64),DYNERR> {
    let (mut in_file,mut out_file) = open_pair(path_in,path_out)?;
    match op(&mut in_file,&mut out_file) {
        Ok(sizes) => Ok(sizes),
        Err(e) => {
            drop(out_file);
            if let Err(rm) = std::fs::remove_file(path_out) {
                log::warn!("could not remove {}: {}",path_out.display(),rm);
            }
            Err(e)
        }
    }
}

/// Compress the file at `path_in` into a new file at `path_out`.
/// If compression fails the output file is removed.
pub fn compress_file<P: AsRef<Path>,Q: AsRef<Path>>(path_in: P, path_out: Q) -> Result<(u64,u64),DYNERR> {
    file_to_file(path_in.as_ref(),path_out.as_ref(),|src,dst| compress(src,dst,&STD_OPTIONS))
}

/// Expand the file at `path_in` into a new file at `path_out`.
/// If expansion fails the output file is removed.
pub fn expand_file<P: AsRef<Path>,Q: AsRef<Path>>(path_in: P, path_out: Q) -> Result<(u64,u64),DYNERR> {
    file_to_file(path_in.as_ref(),path_out.as_ref(),|src,dst| expand(src,dst,&STD_OPTIONS))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
fn error_kind(result: Result<Vec<u8>,DYNERR>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(e) => match e.downcast_ref::<crate::Error>() {
            Some(err) => Some(format!("{:?}",err)),
            None => Some(e.to_string())
        }
    }
}

/// deterministic pseudo-random bytes
#[cfg(test)]
fn noise(len: usize,seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len).map(|_| {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (state >> 16) as u8
    }).collect()
}

#[test]
fn compression_works() {
    // header 0 0 1 'B' 1 EOS 1 'A', separator, then A A A B EOS EOS = 1 1 1 00 01 01
    let compressed = compress_slice("AAAB".as_bytes(),&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode("242C024120E280").unwrap());
}

#[test]
fn empty_input() {
    let compressed = compress_slice(&[],&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode("C00020").unwrap());
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert!(expanded.is_empty());
    let info = inspect(&mut Cursor::new(&compressed),&STD_OPTIONS).expect("inspect failed");
    assert_eq!(info.leaf_count,1);
    assert_eq!(info.code_lengths,vec![(END_OF_STREAM,0)]);
}

#[test]
fn invertibility() {
    let all_bytes: Vec<u8> = (0..=255u8).collect();
    let mut skewed = noise(3000,7);
    skewed.extend_from_slice(&[0xff;500]);
    skewed.extend_from_slice(&[0x00;200]);
    let cases: Vec<Vec<u8>> = vec![
        "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().to_vec(),
        "AAAB".as_bytes().to_vec(),
        "z".as_bytes().to_vec(),
        "zzzzzzzzzz".as_bytes().to_vec(),
        all_bytes.clone(),
        all_bytes.iter().rev().cycle().take(2000).copied().collect(),
        noise(5000,1),
        skewed
    ];
    for test_data in cases {
        let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
        let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
        assert_eq!(test_data,expanded);
    }
}

#[test]
fn deterministic_output() {
    let test_data = noise(2000,42);
    let first = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    let second = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(first,second);
}

#[test]
fn text_gets_smaller() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(20);
    let compressed = compress_slice(test_data.as_bytes(),&STD_OPTIONS).expect("compression failed");
    assert!(compressed.len() < test_data.len() / 2);
}

#[test]
fn header_inspection() {
    let compressed = compress_slice("AAAB".as_bytes(),&STD_OPTIONS).expect("compression failed");
    let info = inspect(&mut Cursor::new(&compressed),&STD_OPTIONS).expect("inspect failed");
    assert_eq!(info.leaf_count,3);
    assert_eq!(info.depth,2);
    assert_eq!(info.header_bits,32);
    assert_eq!(info.code_lengths,vec![(b'A' as Symbol,1),(b'B' as Symbol,2),(END_OF_STREAM,2)]);
}

#[test]
fn truncation_is_detected() {
    for test_data in [&b"AAAB"[..],&b""[..],&b"I am Sam. Sam I am. I do not like this Sam I am.\n"[..]] {
        let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
        for len in 0..compressed.len() {
            assert!(expand_slice(&compressed[0..len],&STD_OPTIONS).is_err(),"length {} was accepted",len);
        }
    }
    let compressed = hex::decode("242C024120E2").unwrap();
    assert_eq!(error_kind(expand_slice(&compressed,&STD_OPTIONS)),Some("TruncatedPayload".to_string()));
    let compressed = hex::decode("242C02").unwrap();
    assert_eq!(error_kind(expand_slice(&compressed,&STD_OPTIONS)),Some("MalformedHeader".to_string()));
    let compressed = hex::decode("242C0241").unwrap();
    assert_eq!(error_kind(expand_slice(&compressed,&STD_OPTIONS)),Some("MalformedHeader".to_string()));
}

#[test]
fn trailer_is_checked() {
    // second end of stream replaced by 'A'
    let compressed = hex::decode("242C024120E3").unwrap();
    assert_eq!(error_kind(expand_slice(&compressed,&STD_OPTIONS)),Some("TrailerMismatch".to_string()));
}

#[test]
fn separator_is_not_checked() {
    let mut opt = STD_OPTIONS;
    opt.separator = 0xAA;
    let compressed = compress_slice("AAAB".as_bytes(),&opt).expect("compression failed");
    assert_eq!(compressed[4],0xAA);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,"AAAB".as_bytes().to_vec());
}

#[test]
fn offsets() {
    let mut opt = STD_OPTIONS;
    opt.in_offset = 4;
    opt.out_offset = 2;
    let mut src = Cursor::new("SKIPAAAB".as_bytes());
    let mut ans = Cursor::new("XY".as_bytes().to_vec());
    let (in_size,out_size) = compress(&mut src,&mut ans,&opt).expect("compression failed");
    assert_eq!((in_size,out_size),(4,7));
    let compressed = ans.into_inner();
    assert_eq!(compressed,hex::decode("5859242C024120E280").unwrap());

    opt.in_offset = 2;
    opt.out_offset = 0;
    let mut src = Cursor::new(compressed.as_slice());
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let (in_size,out_size) = expand(&mut src,&mut ans,&opt).expect("expansion failed");
    assert_eq!((in_size,out_size),(7,4));
    assert_eq!(ans.into_inner(),"AAAB".as_bytes().to_vec());

    opt.in_offset = 100;
    assert_eq!(error_kind(compress_slice("AAAB".as_bytes(),&opt)),Some("FileFormatMismatch".to_string()));
}

#[test]
fn size_limit() {
    let mut opt = STD_OPTIONS;
    opt.max_file_size = 3;
    assert_eq!(error_kind(compress_slice("AAAB".as_bytes(),&opt)),Some("FileTooLarge".to_string()));
}

#[test]
fn files() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let orig = temp_dir.path().join("orig.bin");
    let packed = temp_dir.path().join("packed.huf");
    let unpacked = temp_dir.path().join("unpacked.bin");
    let test_data = noise(1000,3);
    std::fs::write(&orig,&test_data).expect("write failed");
    let (in_size,out_size) = compress_file(&orig,&packed).expect("compression failed");
    assert_eq!(in_size,1000);
    assert_eq!(out_size,std::fs::metadata(&packed).unwrap().len());
    expand_file(&packed,&unpacked).expect("expansion failed");
    assert_eq!(std::fs::read(&unpacked).unwrap(),test_data);

    let compressed = std::fs::read(&packed).unwrap();
    std::fs::write(&packed,&compressed[0..compressed.len()-1]).expect("write failed");
    std::fs::remove_file(&unpacked).expect("remove failed");
    assert!(expand_file(&packed,&unpacked).is_err());
    assert!(!unpacked.exists());

    assert!(compress_file(temp_dir.path().join("missing"),&packed).is_err());
}

#[test]
fn input_must_be_a_regular_file() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let packed = temp_dir.path().join("packed.huf");
    let result = compress_file(temp_dir.path(),&packed);
    match result {
        Err(e) => {
            let io_err = e.downcast_ref::<std::io::Error>().expect("expected an I/O error");
            assert_eq!(io_err.kind(),std::io::ErrorKind::InvalidInput);
        },
        Ok(_) => panic!("directory was accepted as input")
    }
    assert!(!packed.exists());
}

#[test]
fn input_is_not_clobbered() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let orig = temp_dir.path().join("orig.txt");
    std::fs::write(&orig,"hello hello").expect("write failed");
    let same = temp_dir.path().join(".").join("orig.txt");
    for result in [compress_file(&orig,&orig),compress_file(&orig,&same),expand_file(&orig,&same)] {
        match result {
            Err(e) => assert!(matches!(e.downcast_ref::<crate::Error>(),Some(crate::Error::SameFile))),
            Ok(_) => panic!("input was also used as output")
        }
    }
    assert_eq!(std::fs::read(&orig).unwrap(),"hello hello".as_bytes().to_vec());
}
