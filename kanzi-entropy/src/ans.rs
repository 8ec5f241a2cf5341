//! Range-variant Asymmetric Numeral System coding, order 0 or order 1
//! (spec.md §4.5).
//!
//! Symbols are encoded back-to-front into interleaved streams (2 for
//! order 0, 4 for order 1) so that the decoder, reading forward, reproduces
//! the same sequence the encoder saw. Division is used directly rather than
//! the reciprocal-multiply trick the reference encoder uses for speed.

use crate::alphabet::{
    decode_alphabet, encode_alphabet, normalize_frequencies, read_varint, write_varint,
};
use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::{KanziError, Result};
use kanzi_core::histogram::{histogram_order0, histogram_order1};
use std::io::{Read, Write};

const ANS_TOP: u64 = 1 << 15;
const DEFAULT_LOG_RANGE: u32 = 12;
const MIN_LOG_RANGE: u32 = 8;
const MAX_LOG_RANGE: u32 = 16;
const MAX_CHUNK_SIZE: usize = 1 << 24;
const MIN_CHUNK_SIZE: usize = 1024;

struct Symbol {
    cum_freq: u32,
    freq: u32,
}

fn build_symbols(freqs: &[u32], alphabet: &[u32], count: usize) -> [Symbol; 256] {
    let mut cum = 0u32;
    let mut syms: Vec<Symbol> = (0..256).map(|_| Symbol { cum_freq: 0, freq: 0 }).collect();
    for &s in &alphabet[..count] {
        let f = freqs[s as usize];
        syms[s as usize] = Symbol { cum_freq: cum, freq: f };
        cum += f;
    }
    syms.try_into().unwrap_or_else(|_| unreachable!())
}

fn encode_header<W: Write>(
    out: &mut BitWriter<W>,
    freqs: &[u32],
    alphabet: &[u32; 256],
    count: usize,
    log_range: u32,
) -> Result<()> {
    out.write_bits((log_range - MIN_LOG_RANGE) as u64, 3)?;
    encode_alphabet(out, alphabet, 256, count)?;

    let mut i = 0;
    while i < count {
        let chunk_len = (count - i).min(8);
        let max_freq = alphabet[i..i + chunk_len]
            .iter()
            .map(|&s| freqs[s as usize])
            .max()
            .unwrap_or(1)
            .max(1);
        let log_max = 32 - (max_freq.leading_zeros());
        out.write_bits(log_max as u64, 5)?;
        for &s in &alphabet[i..i + chunk_len] {
            out.write_bits(freqs[s as usize] as u64, log_max.max(1))?;
        }
        i += chunk_len;
    }
    Ok(())
}

fn decode_header<R: Read>(
    input: &mut BitReader<R>,
) -> Result<(u32, [u32; 256], [u32; 256], usize)> {
    let log_range = input.read_bits(3)? as u32 + MIN_LOG_RANGE;
    if !(MIN_LOG_RANGE..=MAX_LOG_RANGE).contains(&log_range) {
        return Err(KanziError::CorruptedBlock {
            block_id: 0,
            offset: 0,
            message: format!("invalid ANS log range {log_range}"),
        });
    }
    let mut alphabet = [0u32; 256];
    let count = decode_alphabet(input, &mut alphabet)?;

    let mut freqs = [0u32; 256];
    let mut i = 0;
    while i < count {
        let chunk_len = (count - i).min(8);
        let log_max = input.read_bits(5)? as u32;
        for &s in &alphabet[i..i + chunk_len] {
            freqs[s as usize] = input.read_bits(log_max.max(1))? as u32;
        }
        i += chunk_len;
    }
    Ok((log_range, freqs, alphabet, count))
}

/// Order-0 or order-1 ANS encoder.
pub struct AnsEncoder {
    order: u8,
    chunk_size: usize,
}

impl AnsEncoder {
    /// `order` must be 0 or 1.
    pub fn new(order: u8, chunk_size: usize) -> Result<Self> {
        if order > 1 {
            return Err(KanziError::invalid_param("order", "must be 0 or 1"));
        }
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(KanziError::invalid_param(
                "chunk_size",
                "must be in [1024, 1 << 24]",
            ));
        }
        Ok(Self { order, chunk_size })
    }

    fn encode_order0_chunk<W: Write>(&self, out: &mut BitWriter<W>, chunk: &[u8]) -> Result<()> {
        let mut freqs = [0u32; 256];
        histogram_order0(chunk, &mut freqs);
        let mut alphabet = [0u32; 256];
        let mut count = 0;
        for (s, &f) in freqs.iter().enumerate() {
            if f > 0 {
                alphabet[count] = s as u32;
                count += 1;
            }
        }
        let total: u32 = freqs.iter().sum();
        let scale = 1u32 << DEFAULT_LOG_RANGE;
        if total != scale && count > 0 {
            normalize_frequencies(&mut freqs, &mut alphabet, 256, total, scale)?;
        }
        encode_header(out, &freqs, &alphabet, count, DEFAULT_LOG_RANGE)?;

        if count == 0 {
            return Ok(());
        }
        let syms = build_symbols(&freqs, &alphabet, count);

        let mut states = [ANS_TOP as u32; 2];
        let mut bytes: Vec<u8> = Vec::with_capacity(chunk.len());
        for (i, &b) in chunk.iter().enumerate().rev() {
            let lane = i & 1;
            let sym = &syms[b as usize];
            let max_state = ((ANS_TOP >> DEFAULT_LOG_RANGE) << 8) * sym.freq as u64;
            let mut state = states[lane] as u64;
            while state >= max_state {
                bytes.push((state & 0xFF) as u8);
                state >>= 8;
            }
            state = ((state / sym.freq as u64) << DEFAULT_LOG_RANGE) + (state % sym.freq as u64)
                + sym.cum_freq as u64;
            states[lane] = state as u32;
        }
        bytes.reverse();

        write_varint(out, bytes.len() as u32)?;
        for &b in &bytes {
            out.write_bits(b as u64, 8)?;
        }
        out.write_bits(states[0] as u64, 32)?;
        out.write_bits(states[1] as u64, 32)
    }

    fn encode_order1_chunk<W: Write>(&self, out: &mut BitWriter<W>, chunk: &[u8]) -> Result<()> {
        let mut freqs1 = vec![0u32; 256 * 256];
        histogram_order1(chunk, &mut freqs1);

        let mut all_syms: Vec<[Symbol; 256]> = Vec::with_capacity(256);
        for ctx in 0..256 {
            let freqs = &mut freqs1[ctx * 256..(ctx + 1) * 256];
            let mut alphabet = [0u32; 256];
            let mut count = 0;
            for (s, &f) in freqs.iter().enumerate() {
                if f > 0 {
                    alphabet[count] = s as u32;
                    count += 1;
                }
            }
            let total: u32 = freqs.iter().sum();
            let scale = 1u32 << DEFAULT_LOG_RANGE;
            let mut padded = [0u32; 256];
            padded.copy_from_slice(freqs);
            if total != scale && count > 0 {
                normalize_frequencies(&mut padded, &mut alphabet, 256, total, scale)?;
            }
            out.write_bits(count as u64, 9)?;
            if count > 0 {
                encode_header(out, &padded, &alphabet, count, DEFAULT_LOG_RANGE)?;
            }
            all_syms.push(build_symbols(&padded, &alphabet, count));
        }

        let mut states = [ANS_TOP as u32; 4];
        let mut bytes: Vec<u8> = Vec::with_capacity(chunk.len());
        let mut prev = 0u8;
        let mut ctx_for_pos: Vec<u8> = Vec::with_capacity(chunk.len());
        for &b in chunk {
            ctx_for_pos.push(prev);
            prev = b;
        }

        for (i, (&b, &ctx)) in chunk.iter().zip(ctx_for_pos.iter()).enumerate().rev() {
            let lane = i & 3;
            let sym = &all_syms[ctx as usize][b as usize];
            let max_state = ((ANS_TOP >> DEFAULT_LOG_RANGE) << 8) * sym.freq.max(1) as u64;
            let mut state = states[lane] as u64;
            while state >= max_state {
                bytes.push((state & 0xFF) as u8);
                state >>= 8;
            }
            state = ((state / sym.freq as u64) << DEFAULT_LOG_RANGE) + (state % sym.freq as u64)
                + sym.cum_freq as u64;
            states[lane] = state as u32;
        }
        bytes.reverse();

        write_varint(out, bytes.len() as u32)?;
        for &b in &bytes {
            out.write_bits(b as u64, 8)?;
        }
        for &s in &states {
            out.write_bits(s as u64, 32)?;
        }
        Ok(())
    }

    /// Encode `block`, rebuilding frequency tables every `chunk_size` bytes.
    pub fn encode<W: Write>(&mut self, out: &mut BitWriter<W>, block: &[u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let end = (start + self.chunk_size).min(block.len());
            let chunk = &block[start..end];
            if self.order == 0 {
                self.encode_order0_chunk(out, chunk)?;
            } else {
                self.encode_order1_chunk(out, chunk)?;
            }
            start = end;
        }
        Ok(block.len())
    }
}

/// Order-0 or order-1 ANS decoder, matching [`AnsEncoder`].
pub struct AnsDecoder {
    order: u8,
    chunk_size: usize,
}

impl AnsDecoder {
    /// `order` must be 0 or 1 and match the encoder's.
    pub fn new(order: u8, chunk_size: usize) -> Result<Self> {
        if order > 1 {
            return Err(KanziError::invalid_param("order", "must be 0 or 1"));
        }
        Ok(Self { order, chunk_size })
    }

    fn find_symbol(freqs: &[u32; 256], alphabet: &[u32; 256], count: usize, target: u32) -> u8 {
        let mut cum = 0u32;
        for &s in &alphabet[..count] {
            let f = freqs[s as usize];
            if target < cum + f {
                return s as u8;
            }
            cum += f;
        }
        alphabet[count.saturating_sub(1)] as u8
    }

    fn decode_order0_chunk<R: Read>(&self, input: &mut BitReader<R>, chunk: &mut [u8]) -> Result<()> {
        let (log_range, freqs, alphabet, count) = decode_header(input)?;
        if count == 0 {
            return Ok(());
        }

        let n_bytes = read_varint(input)? as usize;
        let mut bytes = vec![0u8; n_bytes];
        for b in &mut bytes {
            *b = input.read_bits(8)? as u8;
        }
        let mut pos = 0usize;

        let mut states = [input.read_bits(32)? as u32, input.read_bits(32)? as u32];
        let mask = (1u32 << log_range) - 1;

        for (i, slot) in chunk.iter_mut().enumerate() {
            let lane = i & 1;
            let state = states[lane] as u64;
            let target = (state & mask as u64) as u32;
            let sym = Self::find_symbol(&freqs, &alphabet, count, target);
            *slot = sym;

            let cum_freq = {
                let mut c = 0u32;
                for &s in &alphabet[..count] {
                    if s as u8 == sym {
                        break;
                    }
                    c += freqs[s as usize];
                }
                c
            };
            let freq = freqs[sym as usize];
            let mut new_state = freq as u64 * (state >> log_range) + (state & mask as u64) as u64
                - cum_freq as u64;
            while new_state < ANS_TOP as u64 && pos < n_bytes {
                new_state = (new_state << 8) | bytes[pos] as u64;
                pos += 1;
            }
            states[lane] = new_state as u32;
        }
        Ok(())
    }

    fn decode_order1_chunk<R: Read>(&self, input: &mut BitReader<R>, chunk: &mut [u8]) -> Result<()> {
        let mut freqs_by_ctx: Vec<[u32; 256]> = Vec::with_capacity(256);
        let mut alphabet_by_ctx: Vec<[u32; 256]> = Vec::with_capacity(256);
        let mut count_by_ctx: Vec<usize> = Vec::with_capacity(256);
        let mut log_range = DEFAULT_LOG_RANGE;

        for _ in 0..256 {
            let count = input.read_bits(9)? as usize;
            if count == 0 {
                freqs_by_ctx.push([0u32; 256]);
                alphabet_by_ctx.push([0u32; 256]);
                count_by_ctx.push(0);
                continue;
            }
            let (lr, freqs, alphabet, c) = decode_header(input)?;
            log_range = lr;
            freqs_by_ctx.push(freqs);
            alphabet_by_ctx.push(alphabet);
            count_by_ctx.push(c);
        }

        let n_bytes = read_varint(input)? as usize;
        let mut bytes = vec![0u8; n_bytes];
        for b in &mut bytes {
            *b = input.read_bits(8)? as u8;
        }
        let mut pos = 0usize;

        let mut states = [0u32; 4];
        for s in &mut states {
            *s = input.read_bits(32)? as u32;
        }
        let mask = (1u32 << log_range) - 1;

        let mut prev = 0u8;
        for (i, slot) in chunk.iter_mut().enumerate() {
            let lane = i & 3;
            let ctx = prev as usize;
            let freqs = &freqs_by_ctx[ctx];
            let alphabet = &alphabet_by_ctx[ctx];
            let count = count_by_ctx[ctx];

            let state = states[lane] as u64;
            let target = (state & mask as u64) as u32;
            let sym = Self::find_symbol(freqs, alphabet, count, target);
            *slot = sym;
            prev = sym;

            let cum_freq = {
                let mut c = 0u32;
                for &s in &alphabet[..count] {
                    if s as u8 == sym {
                        break;
                    }
                    c += freqs[s as usize];
                }
                c
            };
            let freq = freqs[sym as usize];
            let mut new_state = freq as u64 * (state >> log_range) + (state & mask as u64) as u64
                - cum_freq as u64;
            while new_state < ANS_TOP as u64 && pos < n_bytes {
                new_state = (new_state << 8) | bytes[pos] as u64;
                pos += 1;
            }
            states[lane] = new_state as u32;
        }
        Ok(())
    }

    /// Decode `block.len()` bytes.
    pub fn decode<R: Read>(&mut self, input: &mut BitReader<R>, block: &mut [u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let end = (start + self.chunk_size).min(block.len());
            if self.order == 0 {
                self.decode_order0_chunk(input, &mut block[start..end])?;
            } else {
                self.decode_order1_chunk(input, &mut block[start..end])?;
            }
            start = end;
        }
        Ok(block.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], order: u8, chunk_size: usize) {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            let mut enc = AnsEncoder::new(order, chunk_size).unwrap();
            enc.encode(&mut w, data).unwrap();
            w.close().unwrap();
        }
        let mut out = vec![0u8; data.len()];
        let mut r = BitReader::new(&buf[..]);
        let mut dec = AnsDecoder::new(order, chunk_size).unwrap();
        dec.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn order0_roundtrip_text() {
        roundtrip(b"mississippi river mississippi river", 0, 4096);
    }

    #[test]
    fn order0_roundtrip_constant() {
        roundtrip(&[7u8; 2048], 0, 4096);
    }

    #[test]
    fn order1_roundtrip_text() {
        roundtrip(b"the quick brown fox jumps over the lazy dog", 1, 4096);
    }

    #[test]
    fn rejects_bad_order() {
        assert!(AnsEncoder::new(2, 4096).is_err());
    }
}
