//! Canonical, per-chunk static Huffman coding (spec.md §4.5).
//!
//! Code lengths are computed in place with the Moffat-Katajainen
//! two-phase algorithm rather than by building an explicit tree, and only
//! the length deltas are transmitted (signed Exp-Golomb).

use crate::alphabet::{decode_alphabet, encode_alphabet};
use crate::exp_golomb;
use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::{KanziError, Result};
use kanzi_core::histogram::histogram_order0;
use std::io::{Read, Write};

/// Codes longer than this cannot be represented; a chunk whose optimal
/// code exceeds it is retried with scaled-down frequencies.
pub const MAX_SYMBOL_SIZE: u32 = 24;
/// Maximum number of bytes encoded before the frequency table resets.
pub const MAX_CHUNK_SIZE: usize = 1 << 24;
/// Minimum configurable chunk size.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Run the Moffat-Katajainen in-place code-length algorithm over
/// `freqs[0..n]` (sorted ascending by frequency on entry), writing the bit
/// length of each entry's code back into `freqs`.
fn compute_in_place_sizes_phase1(data: &mut [u32], n: usize) {
    let (mut s, mut r) = (0usize, 0usize);
    for t in 0..n.saturating_sub(1) {
        let mut sum = 0u32;
        for _ in 0..2 {
            if s >= n || (r < t && data[r] < data[s]) {
                sum += data[r];
                data[r] = t as u32;
                r += 1;
            } else {
                sum += data[s];
                if s > t {
                    data[s] = 0;
                }
                s += 1;
            }
        }
        data[t] = sum;
    }
}

fn compute_in_place_sizes_phase2(data: &mut [u32], n: usize) {
    if n == 0 {
        return;
    }
    let mut top_level = (n - 2) as i64;
    let mut depth = 1u32;
    let mut i = n as i64;
    let mut total_nodes_at_level = 2i64;

    while i > 0 {
        let mut k = top_level;
        while k != 0 && data[(k - 1) as usize] as i64 >= top_level {
            k -= 1;
        }
        let internal_nodes_at_level = top_level - k;
        let leaves_at_level = total_nodes_at_level - internal_nodes_at_level;

        for _ in 0..leaves_at_level {
            i -= 1;
            data[i as usize] = depth;
        }

        total_nodes_at_level = internal_nodes_at_level << 1;
        top_level = k;
        depth += 1;
    }
}

/// Compute canonical code lengths for `count` symbols whose frequencies
/// are `freqs[alphabet[i]]`. Returns `(sizes, max_len)` with `sizes`
/// indexed by symbol.
fn compute_code_lengths(alphabet: &[u32], freqs: &[u32], count: usize) -> Result<([u16; 256], u32)> {
    let mut ranks: Vec<u32> = alphabet[..count]
        .iter()
        .map(|&s| (freqs[s as usize] << 8) | s)
        .collect();
    ranks.sort_unstable();

    let mut work: Vec<u32> = ranks.iter().map(|&r| r >> 8).collect();
    let mut symbols: Vec<u32> = ranks.iter().map(|&r| r & 0xFF).collect();

    compute_in_place_sizes_phase1(&mut work, count);
    compute_in_place_sizes_phase2(&mut work, count);

    let mut sizes = [0u16; 256];
    let mut max_len = 0u32;
    for i in 0..count {
        let len = work[i];
        if len == 0 {
            return Err(KanziError::CorruptedBlock {
                block_id: 0,
                offset: 0,
                message: "Huffman code length computed as 0".into(),
            });
        }
        max_len = max_len.max(len);
        sizes[symbols[i] as usize] = len as u16;
    }
    Ok((sizes, max_len))
}

/// Assign canonical codes given per-symbol bit lengths. `symbols` need not
/// be in any particular order; returns `codes[symbol] = (code << 8) | len`.
fn generate_canonical_codes(sizes: &[u16; 256], alphabet: &[u32], count: usize) -> [u32; 256] {
    let mut order: Vec<u32> = alphabet[..count].to_vec();
    order.sort_by_key(|&s| (sizes[s as usize], s));

    let mut codes = [0u32; 256];
    let mut cur_len = sizes[order[0] as usize];
    let mut code: u32 = 0;
    for &s in &order {
        let len = sizes[s as usize];
        if len > cur_len {
            code <<= len - cur_len;
            cur_len = len;
        }
        codes[s as usize] = (code << 8) | (len as u32);
        code += 1;
    }
    codes
}

/// Static canonical Huffman encoder, rebuilding its table every
/// `chunk_size` bytes.
pub struct HuffmanEncoder {
    chunk_size: usize,
}

impl HuffmanEncoder {
    /// Create an encoder with the given chunk size (bytes between table
    /// rebuilds).
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(KanziError::invalid_param(
                "chunk_size",
                "must be at least 1024",
            ));
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(KanziError::invalid_param(
                "chunk_size",
                "must be at most 1 << 24",
            ));
        }
        Ok(Self { chunk_size })
    }

    fn update_frequencies<W: Write>(
        &self,
        out: &mut BitWriter<W>,
        freqs: &mut [u32; 256],
    ) -> Result<([u32; 256], usize)> {
        let mut alphabet = [0u32; 256];
        let mut count = 0usize;
        for (sym, &f) in freqs.iter().enumerate() {
            if f > 0 {
                alphabet[count] = sym as u32;
                count += 1;
            }
        }
        encode_alphabet(out, &alphabet, 256, count)?;

        if count == 0 {
            return Ok(([0u32; 256], 0));
        }
        if count == 1 {
            let mut codes = [0u32; 256];
            codes[alphabet[0] as usize] = 1 << 8;
            let mut sizes = [0u16; 256];
            sizes[alphabet[0] as usize] = 1;
            self.write_lengths(out, &alphabet, count, &sizes)?;
            return Ok((codes, count));
        }

        let mut retries = 0;
        loop {
            let (sizes, max_len) = compute_code_lengths(&alphabet, &*freqs, count)?;
            if max_len <= MAX_SYMBOL_SIZE {
                let codes = generate_canonical_codes(&sizes, &alphabet, count);
                self.write_lengths(out, &alphabet, count, &sizes)?;
                return Ok((codes, count));
            }

            retries += 1;
            if retries > 2 {
                return Err(KanziError::CorruptedBlock {
                    block_id: 0,
                    offset: 0,
                    message: "Huffman max code length exceeded after retries".into(),
                });
            }
            let total: u32 = alphabet[..count].iter().map(|&s| freqs[s as usize]).sum();
            let mut alpha = alphabet;
            crate::alphabet::normalize_frequencies(
                freqs,
                &mut alpha,
                count,
                total,
                (MAX_CHUNK_SIZE >> (2 * retries)) as u32,
            )?;
        }
    }

    fn write_lengths<W: Write>(
        &self,
        out: &mut BitWriter<W>,
        alphabet: &[u32; 256],
        count: usize,
        sizes: &[u16; 256],
    ) -> Result<()> {
        let mut prev_size: i32 = 2;
        for &s in &alphabet[..count] {
            let size = sizes[s as usize] as i32;
            exp_golomb::encode(out, size - prev_size, true)?;
            prev_size = size;
        }
        Ok(())
    }

    /// Encode `block`, rebuilding the table every `chunk_size` bytes.
    pub fn encode<W: Write>(&mut self, out: &mut BitWriter<W>, block: &[u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let end = (start + self.chunk_size).min(block.len());
            let chunk = &block[start..end];

            let mut freqs = [0u32; 256];
            histogram_order0(chunk, &mut freqs);
            let (codes, count) = self.update_frequencies(out, &mut freqs)?;

            if count > 1 {
                for &b in chunk {
                    let code = codes[b as usize];
                    out.write_bits((code >> 8) as u64, code & 0xFF)?;
                }
            }
            start = end;
        }
        Ok(block.len())
    }
}

/// Static canonical Huffman decoder, rebuilding its table every chunk.
pub struct HuffmanDecoder {
    chunk_size: usize,
}

impl HuffmanDecoder {
    /// Create a decoder matching [`HuffmanEncoder::new`]'s `chunk_size`.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE || chunk_size > MAX_CHUNK_SIZE {
            return Err(KanziError::invalid_param(
                "chunk_size",
                "must be in [1024, 1 << 24]",
            ));
        }
        Ok(Self { chunk_size })
    }

    fn read_lengths<R: Read>(&self, input: &mut BitReader<R>) -> Result<([u16; 256], [u32; 256], usize)> {
        let mut alphabet = [0u32; 256];
        let count = decode_alphabet(input, &mut alphabet)?;
        if count == 0 {
            return Ok(([0u16; 256], alphabet, 0));
        }

        let mut sizes = [0u16; 256];
        let mut prev_size: i32 = 2;
        for &s in &alphabet[..count] {
            let delta = exp_golomb::decode(input, true)?;
            let size = prev_size + delta;
            if size <= 0 || size as u32 > MAX_SYMBOL_SIZE {
                return Err(KanziError::CorruptedBlock {
                    block_id: 0,
                    offset: 0,
                    message: format!("invalid Huffman code size {size}"),
                });
            }
            sizes[s as usize] = size as u16;
            prev_size = size;
        }
        Ok((sizes, alphabet, count))
    }

    /// Decode `block.len()` bytes, rebuilding the table every chunk.
    pub fn decode<R: Read>(&mut self, input: &mut BitReader<R>, block: &mut [u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let end = (start + self.chunk_size).min(block.len());

            let (sizes, alphabet, count) = self.read_lengths(input)?;
            if count == 0 {
                return Err(KanziError::CorruptedBlock {
                    block_id: 0,
                    offset: start,
                    message: "empty Huffman alphabet for non-empty chunk".into(),
                });
            }

            if count == 1 {
                let sym = alphabet[0] as u8;
                for slot in &mut block[start..end] {
                    input.read_bit()?;
                    *slot = sym;
                }
                start = end;
                continue;
            }

            let codes = generate_canonical_codes(&sizes, &alphabet, count);
            let mut by_len_and_code: std::collections::HashMap<(u16, u32), u8> =
                std::collections::HashMap::with_capacity(count);
            for &s in &alphabet[..count] {
                let packed = codes[s as usize];
                let len = (packed & 0xFF) as u16;
                let code = packed >> 8;
                by_len_and_code.insert((len, code), s as u8);
            }

            for slot in &mut block[start..end] {
                let mut code = 0u32;
                let mut len = 0u16;
                loop {
                    code = (code << 1) | input.read_bit()? as u32;
                    len += 1;
                    if let Some(&sym) = by_len_and_code.get(&(len, code)) {
                        *slot = sym;
                        break;
                    }
                    if len as u32 > MAX_SYMBOL_SIZE {
                        return Err(KanziError::CorruptedBlock {
                            block_id: 0,
                            offset: start,
                            message: "no Huffman code matched bit sequence".into(),
                        });
                    }
                }
            }
            start = end;
        }
        Ok(block.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], chunk_size: usize) {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            let mut enc = HuffmanEncoder::new(chunk_size).unwrap();
            enc.encode(&mut w, data).unwrap();
            w.close().unwrap();
        }
        let mut out = vec![0u8; data.len()];
        let mut r = BitReader::new(&buf[..]);
        let mut dec = HuffmanDecoder::new(chunk_size).unwrap();
        dec.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrip_mississippi() {
        roundtrip(b"mississippi river", 1024);
    }

    #[test]
    fn roundtrip_single_symbol() {
        roundtrip(&[42u8; 500], 1024);
    }

    #[test]
    fn roundtrip_full_alphabet() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        roundtrip(&data, 1024);
    }

    #[test]
    fn roundtrip_multiple_chunks() {
        let mut data = Vec::new();
        for i in 0..8192u32 {
            data.push((i % 251) as u8);
        }
        roundtrip(&data, 1024);
    }

    #[test]
    fn rejects_too_small_chunk_size() {
        assert!(HuffmanEncoder::new(10).is_err());
    }
}
