//! Bit level access to byte streams.
//!
//! Bits are packed starting from the most significant bit of each byte, both
//! when writing and when reading.  Whole bytes can also be passed through with
//! `put` and `get`, these always land on a byte boundary.

use bit_vec::BitVec;
use std::io::{Read,Write,ErrorKind};

/// Accumulates bits and hands each completed byte to the sink.
pub struct BitWriter<W: Write> {
    sink: W,
    /// pending bits, never more than 7 between calls
    bits: BitVec,
    /// bytes passed to the sink
    count: u64
}

/// Pulls bytes from the source as bits are requested.
pub struct BitReader<R: Read> {
    source: R,
    /// bits of the current byte
    bits: BitVec,
    ptr: usize,
    /// bytes taken from the source
    count: u64,
    /// bits handed out by `read_bit`
    consumed: u64
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            bits: BitVec::new(),
            count: 0
        }
    }
    /// Bytes passed to the sink so far, a pending partial byte is not counted.
    pub fn bytes_written(&self) -> u64 {
        self.count
    }
    /// Bits written so far, including pending bits.
    pub fn bits_written(&self) -> u64 {
        8 * self.count + self.bits.len() as u64
    }
    /// Pad any partial byte with zeros and pass it to the sink.
    fn drain(&mut self) -> Result<(),std::io::Error> {
        if !self.bits.is_empty() {
            self.sink.write_all(&self.bits.to_bytes())?;
            self.count += 1;
            self.bits.truncate(0);
        }
        Ok(())
    }
    pub fn write_bit(&mut self,bit: bool) -> Result<(),std::io::Error> {
        self.bits.push(bit);
        if self.bits.len() == 8 {
            self.drain()?;
        }
        Ok(())
    }
    /// output the low `num_bits` of `val` starting from the MSB of the field
    pub fn write_bits(&mut self,num_bits: usize,val: u16) -> Result<(),std::io::Error> {
        for i in (0..num_bits).rev() {
            self.write_bit((val >> i) & 1 > 0)?;
        }
        Ok(())
    }
    /// output every bit of `code` in order
    pub fn write_code(&mut self,code: &BitVec) -> Result<(),std::io::Error> {
        for bit in code.iter() {
            self.write_bit(bit)?;
        }
        Ok(())
    }
    /// Write a whole byte.  If bits are pending, the partial byte is
    /// completed with zeros first, so `byte` is always aligned.
    pub fn put(&mut self,byte: u8) -> Result<(),std::io::Error> {
        self.drain()?;
        self.sink.write_all(&[byte])?;
        self.count += 1;
        Ok(())
    }
    /// Pad the final byte with zeros and flush the sink.
    pub fn flush(&mut self) -> Result<(),std::io::Error> {
        self.drain()?;
        self.sink.flush()
    }
    /// Flush and give back the sink.
    #[cfg(test)]
    pub fn finish(mut self) -> Result<W,std::io::Error> {
        self.flush()?;
        Ok(self.sink)
    }
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            bits: BitVec::new(),
            ptr: 0,
            count: 0,
            consumed: 0
        }
    }
    pub fn bytes_read(&self) -> u64 {
        self.count
    }
    /// Bits handed out by `read_bit` (and `read_bits`) so far.
    pub fn bits_read(&self) -> u64 {
        self.consumed
    }
    fn next_byte(&mut self) -> Result<Option<u8>,std::io::Error> {
        let mut by: [u8;1] = [0];
        match self.source.read_exact(&mut by) {
            Ok(()) => {
                self.count += 1;
                Ok(Some(by[0]))
            },
            Err(e) if e.kind()==ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e)
        }
    }
    /// Get the next bit, reading from the source as needed.
    /// Returns `None` once the source is exhausted, this is not an error.
    pub fn read_bit(&mut self) -> Result<Option<bool>,std::io::Error> {
        if let Some(bit) = self.bits.get(self.ptr) {
            self.ptr += 1;
            self.consumed += 1;
            return Ok(Some(bit));
        }
        match self.next_byte()? {
            Some(by) => {
                self.bits = BitVec::from_bytes(&[by]);
                self.ptr = 0;
                self.read_bit()
            },
            None => Ok(None)
        }
    }
    /// Read a `num_bits` wide field, MSB first.  Returns `None` if the source
    /// runs out partway.
    pub fn read_bits(&mut self,num_bits: usize) -> Result<Option<u16>,std::io::Error> {
        let mut ans: u16 = 0;
        for _i in 0..num_bits {
            match self.read_bit()? {
                Some(bit) => {
                    ans <<= 1;
                    ans |= bit as u16;
                },
                None => return Ok(None)
            }
        }
        Ok(Some(ans))
    }
    /// Get a whole byte.  Unread bits of a partially consumed byte are skipped.
    pub fn get(&mut self) -> Result<Option<u8>,std::io::Error> {
        self.bits.truncate(0);
        self.ptr = 0;
        self.next_byte()
    }
}

// *************** TESTS *****************

#[test]
fn bits_are_msb_first() {
    let mut writer = BitWriter::new(Vec::new());
    for bit in [true,false,true,true,false,false,false,true,true] {
        writer.write_bit(bit).expect("write failed");
    }
    assert_eq!(writer.bits_written(),9);
    assert_eq!(writer.bytes_written(),1);
    let out = writer.finish().expect("flush failed");
    assert_eq!(out,vec![0xB1,0x80]);
}

#[test]
fn fields_and_alignment() {
    let mut writer = BitWriter::new(Vec::new());
    writer.write_bits(9,0x100).expect("write failed");
    writer.put(0x20).expect("put failed");
    writer.write_bits(3,0b101).expect("write failed");
    let out = writer.finish().expect("flush failed");
    assert_eq!(out,vec![0x80,0x00,0x20,0xA0]);
}

#[test]
fn reader_mirrors_writer() {
    let mut reader = BitReader::new(std::io::Cursor::new(vec![0x80,0x00,0x20,0xA0]));
    assert_eq!(reader.read_bits(9).unwrap(),Some(0x100));
    assert_eq!(reader.get().unwrap(),Some(0x20));
    assert_eq!(reader.read_bits(3).unwrap(),Some(0b101));
    assert_eq!(reader.bits_read(),12);
    for _i in 0..5 {
        assert_eq!(reader.read_bit().unwrap(),Some(false));
    }
    assert_eq!(reader.read_bit().unwrap(),None);
    assert_eq!(reader.get().unwrap(),None);
    assert_eq!(reader.bytes_read(),4);
}

#[test]
fn partial_field_at_end() {
    let mut reader = BitReader::new(std::io::Cursor::new(vec![0xFF]));
    assert_eq!(reader.read_bits(9).unwrap(),None);
}
