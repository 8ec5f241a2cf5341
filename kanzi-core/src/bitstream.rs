//! Bit-level I/O for the Kanzi bitstream container.
//!
//! Unlike byte-oriented codecs, Kanzi packs bits **MSB-first**: the first
//! bit written occupies the most significant position of the current
//! 64-bit accumulator, and accumulators are flushed big-endian to the
//! underlying byte sink. `BitWriter`/`BitReader` are generic over any
//! `std::io::Write`/`std::io::Read`, the same shape the bit-level types in
//! this codebase's sibling crates use for LSB-first formats.
//!
//! # Example
//!
//! ```
//! use kanzi_core::bitstream::{BitReader, BitWriter};
//! use std::io::Cursor;
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output, 1024).unwrap();
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.write_bits(0b1100, 4).unwrap();
//!     writer.close().unwrap();
//! }
//!
//! let mut reader = BitReader::new(Cursor::new(&output));
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(4).unwrap(), 0b1100);
//! ```

use crate::error::{KanziError, Result};
use std::io::{Read, Write};

const MASKS: [u64; 65] = {
    let mut m = [0u64; 65];
    let mut i = 1usize;
    while i <= 64 {
        m[i] = if i == 64 { u64::MAX } else { (1u64 << i) - 1 };
        i += 1;
    }
    m
};

/// Minimum internal buffer size, in bytes.
pub const MIN_BUFFER_SIZE: usize = 1024;
/// Maximum internal buffer size, in bytes (512 MiB).
pub const MAX_BUFFER_SIZE: usize = 512 * 1024 * 1024;

/// A bit-level writer packing bits MSB-first into a byte sink.
pub struct BitWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    position: usize,
    current: u64,
    avail_bits: u32,
    written: u64,
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer with the given internal buffer size (bytes).
    ///
    /// `buffer_size` must be in `[1024, 512 MiB]` and a multiple of 8.
    pub fn new(writer: W, buffer_size: usize) -> Result<Self> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&buffer_size) || buffer_size % 8 != 0 {
            return Err(KanziError::invalid_param(
                "buffer_size",
                "must be in [1024, 512 MiB] and a multiple of 8",
            ));
        }

        Ok(Self {
            writer,
            buffer: vec![0u8; buffer_size],
            position: 0,
            current: 0,
            avail_bits: 64,
            written: 0,
            closed: false,
        })
    }

    /// Total number of bits emitted so far (excludes padding added by `close`).
    pub fn written(&self) -> u64 {
        self.written + (64 - self.avail_bits) as u64
    }

    /// Recover the underlying writer. Any unflushed bits not yet passed to
    /// `close` are lost; callers that need them flushed should call
    /// `close` first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(KanziError::StreamClosed)
        } else {
            Ok(())
        }
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u64, 1)
    }

    /// Write the low `count` bits of `value` (`count` in `[1, 64]`), MSB of
    /// the field first.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        self.check_open()?;
        if !(1..=64).contains(&count) {
            return Err(KanziError::invalid_param("count", "must be in [1, 64]"));
        }

        if count < self.avail_bits {
            self.current |= (value & MASKS[count as usize]) << (self.avail_bits - count);
            self.avail_bits -= count;
        } else {
            let remaining = count - self.avail_bits;
            let masked = value & MASKS[count as usize];
            self.current |= masked >> remaining;
            self.push_current()?;

            if remaining != 0 {
                self.current = masked << (64 - remaining);
                self.avail_bits -= remaining;
            }
        }

        Ok(())
    }

    /// Write `n_bits` bits (`n_bits` in `[0, 8*bytes.len()]`) taken MSB-first
    /// from `bytes`.
    pub fn write_bits_from_bytes(&mut self, bytes: &[u8], n_bits: usize) -> Result<()> {
        self.check_open()?;
        let mut remaining = n_bits;
        let mut idx = 0usize;

        while remaining >= 8 {
            self.write_bits(bytes[idx] as u64, 8)?;
            idx += 1;
            remaining -= 8;
        }

        if remaining > 0 {
            let last = bytes[idx] >> (8 - remaining);
            self.write_bits(last as u64, remaining as u32)?;
        }

        Ok(())
    }

    fn push_current(&mut self) -> Result<()> {
        self.buffer[self.position..self.position + 8].copy_from_slice(&self.current.to_be_bytes());
        self.avail_bits = 64;
        self.current = 0;
        self.position += 8;

        if self.position >= self.buffer.len() {
            self.flush_buffer()?;
        }

        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        self.check_open()?;
        if self.position > 0 {
            self.writer.write_all(&self.buffer[..self.position])?;
            self.written += (self.position as u64) * 8;
            self.position = 0;
        }
        Ok(())
    }

    /// Pad the final partial byte with zeros, flush the sink, and close the
    /// stream. Idempotent: a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let size = (((64 - self.avail_bits) + 7) / 8) as usize;
        if size > 0 {
            let bytes = self.current.to_be_bytes();
            self.buffer[self.position..self.position + size].copy_from_slice(&bytes[..size]);
            self.position += size;
            self.current = 0;
            self.avail_bits = 64;
        }
        self.flush_buffer()?;
        self.writer.flush()?;

        self.closed = true;
        Ok(())
    }
}

/// A bit-level reader consuming bits MSB-first from a byte source.
pub struct BitReader<R: Read> {
    reader: R,
    current: u64,
    avail_bits: u32,
    read: u64,
    closed: bool,
}

impl<R: Read> BitReader<R> {
    /// Create a new reader wrapping `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            current: 0,
            avail_bits: 0,
            read: 0,
            closed: false,
        }
    }

    /// Total number of bits consumed so far.
    pub fn read_count(&self) -> u64 {
        self.read
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(KanziError::StreamClosed)
        } else {
            Ok(())
        }
    }

    /// `current` is always top-aligned: its most significant `avail_bits`
    /// bits are the next bits to deliver, MSB first. Trailing bits are
    /// always zero, which keeps the shifts below branch-free.
    fn refill(&mut self) -> Result<()> {
        let mut buf = [0u8; 8];
        let mut filled = 0usize;
        while filled < 8 {
            match self.reader.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if filled == 0 {
            return Err(KanziError::EndOfStream);
        }
        self.current = u64::from_be_bytes(buf);
        self.avail_bits = (filled * 8) as u32;
        Ok(())
    }

    /// Take the top `count` bits off `self.current` (`count <= avail_bits`,
    /// `count <= 64`), re-aligning the remainder to the top of the word.
    fn take(&mut self, count: u32) -> u64 {
        if count == 64 {
            let result = self.current;
            self.current = 0;
            self.avail_bits = 0;
            result
        } else {
            let result = self.current >> (64 - count);
            self.current <<= count;
            self.avail_bits -= count;
            result
        }
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Read `count` bits (`count` in `[1, 64]`) and return them right-aligned.
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        self.check_open()?;
        if !(1..=64).contains(&count) {
            return Err(KanziError::invalid_param("count", "must be in [1, 64]"));
        }

        if self.avail_bits >= count {
            let result = self.take(count);
            self.read += count as u64;
            return Ok(result);
        }

        // Not enough bits in the current word: drain what remains, refill,
        // and take the rest.
        let have = self.avail_bits;
        let high = self.take(have);
        self.read += have as u64;

        self.refill()?;
        let need = count - have;
        if self.avail_bits < need {
            return Err(KanziError::EndOfStream);
        }

        let low = self.take(need);
        self.read += need as u64;

        Ok((high << need) | low)
    }

    /// Read `n_bits` bits into `bytes`, MSB-first, `ceil(n_bits/8)` bytes
    /// written.
    pub fn read_bits_into_bytes(&mut self, bytes: &mut [u8], n_bits: usize) -> Result<()> {
        let mut remaining = n_bits;
        let mut idx = 0usize;

        while remaining >= 8 {
            bytes[idx] = self.read_bits(8)? as u8;
            idx += 1;
            remaining -= 8;
        }

        if remaining > 0 {
            let v = self.read_bits(remaining as u32)? as u8;
            bytes[idx] = v << (8 - remaining);
        }

        Ok(())
    }

    /// True if at least one more bit is plausibly available (best effort: a
    /// short read cannot be distinguished from EOF until attempted).
    pub fn has_more(&mut self) -> bool {
        if self.avail_bits > 0 {
            return true;
        }
        self.refill().is_ok()
    }

    /// Mark the reader closed; further reads fail with `StreamClosed`.
    pub fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_small_fields() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output, 1024).unwrap();
            writer.write_bits(0b101, 3).unwrap();
            writer.write_bits(0b1111, 4).unwrap();
            writer.write_bits(0b10, 2).unwrap();
            writer.write_bits(0b110011, 6).unwrap();
            writer.close().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(&output));
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1111);
        assert_eq!(reader.read_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_bits(6).unwrap(), 0b110011);
    }

    #[test]
    fn roundtrip_crosses_word_boundary() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output, 1024).unwrap();
            for i in 0..20u64 {
                writer.write_bits(i, 7).unwrap();
            }
            writer.close().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(&output));
        for i in 0..20u64 {
            assert_eq!(reader.read_bits(7).unwrap(), i);
        }
    }

    #[test]
    fn single_bits() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output, 1024).unwrap();
            writer.write_bit(true).unwrap();
            writer.write_bit(false).unwrap();
            writer.write_bit(true).unwrap();
            writer.close().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(&output));
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert!(reader.read_bit().unwrap());
    }

    #[test]
    fn write_after_close_fails() {
        let mut output = Vec::new();
        let mut writer = BitWriter::new(&mut output, 1024).unwrap();
        writer.write_bits(1, 1).unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.write_bits(1, 1),
            Err(KanziError::StreamClosed)
        ));
    }

    #[test]
    fn bytes_roundtrip() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output, 1024).unwrap();
            writer.write_bits(0b11, 2).unwrap();
            writer
                .write_bits_from_bytes(&[0xAB, 0xCD, 0xE0], 20)
                .unwrap();
            writer.close().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(&output));
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        let mut buf = [0u8; 3];
        reader.read_bits_into_bytes(&mut buf, 20).unwrap();
        assert_eq!(buf, [0xAB, 0xCD, 0xE0]);
    }

    #[test]
    fn buffer_size_validation() {
        assert!(BitWriter::new(Vec::new(), 100).is_err());
        assert!(BitWriter::new(Vec::new(), 1023).is_err());
        assert!(BitWriter::new(Vec::new(), 1024).is_ok());
    }
}
