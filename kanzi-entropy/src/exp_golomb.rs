//! Exp-Golomb coding, used to transmit Huffman code-length deltas
//! compactly (spec.md §4.5).

use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::Result;
use std::io::{Read, Write};

/// Write `value` Exp-Golomb coded. When `signed` is true, `value` may be
/// negative; otherwise it must be non-negative.
pub fn encode<W: Write>(out: &mut BitWriter<W>, value: i32, signed: bool) -> Result<()> {
    if value == 0 {
        return out.write_bit(true);
    }

    let (t, sgn): (u32, u64) = if signed {
        if value < 0 {
            (value.unsigned_abs(), 1)
        } else {
            (value as u32, 0)
        }
    } else {
        (value as u32, 0)
    };

    let mut log2 = 1u32;
    while t + 1 >= (1u32 << (log2 + 1)) {
        log2 += 1;
    }

    out.write_bit(false)?;
    for _ in 0..log2 - 1 {
        out.write_bit(false)?;
    }
    out.write_bit(true)?;

    if signed {
        let raw_high = t - (1 << log2) + 1;
        let raw = ((raw_high as u64) << 1) | sgn;
        out.write_bits(raw, log2 + 1)
    } else {
        let raw = t - (1 << log2) + 1;
        out.write_bits(raw as u64, log2)
    }
}

/// Read a value previously written by [`encode`] with the same `signed`
/// flag.
pub fn decode<R: Read>(input: &mut BitReader<R>, signed: bool) -> Result<i32> {
    if input.read_bit()? {
        return Ok(0);
    }

    let mut log2 = 1u32;
    while !input.read_bit()? {
        log2 += 1;
    }

    if signed {
        let raw = input.read_bits(log2 + 1)?;
        let sgn = raw & 1;
        let t = (raw >> 1) as i64 + (1i64 << log2) - 1;
        let result = if sgn != 0 { -t } else { t };
        Ok(result as i32)
    } else {
        let raw = input.read_bits(log2)?;
        let t = raw as i64 + (1i64 << log2) - 1;
        Ok(t as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn signed_roundtrip() {
        let values = [0, 1, -1, 2, -2, 3, -3, 23, -23, 127, -127];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            for &v in &values {
                encode(&mut w, v, true).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        for &v in &values {
            assert_eq!(decode(&mut r, true).unwrap(), v);
        }
    }

    #[test]
    fn unsigned_roundtrip() {
        let values = [0u32, 1, 2, 3, 7, 100, 4095];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            for &v in &values {
                encode(&mut w, v as i32, false).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::new(Cursor::new(buf));
        for &v in &values {
            assert_eq!(decode(&mut r, false).unwrap(), v as i32);
        }
    }
}
