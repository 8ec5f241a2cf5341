//! Block-pipeline decoder (spec.md §4.4): a pool of tasks each take a turn,
//! under the sequential gate, pulling one frame's raw bytes off the shared
//! source, then run entropy decode, transform-chain inverse, and checksum
//! verification concurrently with the other tasks. Decoded bytes are
//! buffered and handed back to the caller in block-id order.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use kanzi_core::bitstream::BitReader;
use kanzi_core::checksum::{xxhash32, xxhash64};
use kanzi_core::error::{KanziError, Result};
use kanzi_core::gate::SequentialGate;
use kanzi_core::registry::EntropyType;
use kanzi_transform::sequence::TransformSequence;

use crate::container::{parse_frame_header, read_frame, read_header};
use crate::entropy::{build_chain, BlockDecoder};
use crate::params::{ChecksumSize, DecoderParams};
use crate::pool::BlockPool;

/// `Some(bytes)` for a decoded block, `None` once the end-of-stream frame
/// has been read.
type TaskOutcome = Result<Option<Vec<u8>>>;

/// Reads a Kanzi bitstream, parallelizing per-block decode work while
/// keeping both frame reads and returned bytes in block-id order.
pub struct Decoder<R: Read + Send + 'static> {
    params: DecoderParams,
    source: Arc<Mutex<BitReader<R>>>,
    gate: Arc<SequentialGate>,
    pool: BlockPool,
    next_block_id: i64,
    pending: VecDeque<(i64, Receiver<TaskOutcome>)>,
    out_buf: VecDeque<u8>,
    eos: bool,
    closed: bool,
}

impl<R: Read + Send + 'static> Decoder<R> {
    pub fn new(source: R, mut params: DecoderParams) -> Result<Self> {
        params.validate()?;
        let mut br = BitReader::new(source);
        if !params.headerless {
            let header = read_header(&mut br)?;
            params.entropy = EntropyType::from_id(header.entropy_id)?;
            params.transform_chain = header.transform_chain;
            params.block_size = header.block_size;
            params.checksum = header.checksum;
        }
        let pool = BlockPool::new(params.jobs)?;
        let mut decoder = Self {
            gate: Arc::new(SequentialGate::new(1)),
            pool,
            next_block_id: 1,
            pending: VecDeque::new(),
            out_buf: VecDeque::new(),
            eos: false,
            closed: false,
            source: Arc::new(Mutex::new(br)),
            params,
        };
        decoder.top_up()?;
        Ok(decoder)
    }

    /// Keep `2*jobs` read-ahead tasks in flight until the end-of-stream
    /// frame has been observed.
    fn top_up(&mut self) -> Result<()> {
        while !self.eos && self.pending.len() < 2 * self.params.jobs {
            let id = self.next_block_id;
            self.next_block_id += 1;
            let params = self.params.clone();
            let source = self.source.clone();
            let gate = self.gate.clone();
            let rx = self
                .pool
                .spawn(move || decode_block_task(id, &params, &source, &gate));
            self.pending.push_back((id, rx));
        }
        Ok(())
    }

    fn in_range(&self, id: i64) -> bool {
        match self.params.block_range {
            None => true,
            Some((from, to)) => (id as u64) >= from && (id as u64) < to,
        }
    }

    /// Fill `out` with up to `out.len()` decoded bytes, returning the
    /// number actually written (`0` at end-of-stream).
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        while written < out.len() {
            if self.out_buf.is_empty() {
                if !self.advance()? {
                    break;
                }
                continue;
            }
            let n = self.out_buf.len().min(out.len() - written);
            for slot in &mut out[written..written + n] {
                *slot = self.out_buf.pop_front().unwrap();
            }
            written += n;
        }
        Ok(written)
    }

    /// Pull the next completed block into `out_buf`. Returns `false` once
    /// end-of-stream has been reached and there is nothing left to pull.
    fn advance(&mut self) -> Result<bool> {
        loop {
            let Some((id, rx)) = self.pending.pop_front() else {
                return Ok(false);
            };
            self.top_up()?;
            match rx.recv() {
                Ok(Ok(Some(bytes))) => {
                    if self.in_range(id) {
                        self.out_buf.extend(bytes);
                        return Ok(true);
                    }
                    continue;
                }
                Ok(Ok(None)) => {
                    self.eos = true;
                    self.pending.clear();
                    return Ok(false);
                }
                Ok(Err(e)) => {
                    self.gate.cancel();
                    return Err(e);
                }
                Err(_) => {
                    self.gate.cancel();
                    return Err(KanziError::Cancelled);
                }
            }
        }
    }

    /// Cancel outstanding work and tear down buffers. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.gate.cancel();
        self.pending.clear();
        self.out_buf.clear();
        Ok(())
    }
}

fn decode_block_task<R: Read>(
    id: i64,
    params: &DecoderParams,
    source: &Mutex<BitReader<R>>,
    gate: &SequentialGate,
) -> TaskOutcome {
    if gate.wait_for(id).is_err() {
        return Err(KanziError::Cancelled);
    }
    let payload = {
        let mut guard = source.lock().unwrap();
        let result = read_frame(&mut guard);
        gate.publish(id);
        result.map_err(|e| process_err(id, e))?
    };

    let Some(payload) = payload else {
        return Ok(None);
    };

    let parsed = parse_frame_header(&payload, params.checksum).map_err(|e| process_err(id, e))?;

    let bound = (params.block_size * 3 / 2).max(2048);
    if parsed.transformed_length > bound {
        return Err(KanziError::OversizedBlock {
            block_id: id as u64,
            length: parsed.transformed_length,
            bound,
        });
    }

    let entropy_type = if parsed.copy_block {
        EntropyType::None
    } else {
        params.entropy
    };
    let mut coder = BlockDecoder::new(entropy_type).map_err(|e| process_err(id, e))?;
    let mut transformed = vec![0u8; parsed.transformed_length];
    {
        let mut br = BitReader::new(&payload[parsed.header_len..]);
        coder
            .decode(&mut br, &mut transformed)
            .map_err(|e| process_err(id, e))?;
    }

    let original = if parsed.copy_block {
        transformed
    } else {
        let stages = build_chain(&params.transform_chain);
        let mut seq = TransformSequence::new(stages);
        seq.set_side_data(parsed.skip_mask, &parsed.side_data)
            .ok_or_else(|| KanziError::CorruptedBlock {
                block_id: id as u64,
                offset: 0,
                message: "transform side data truncated or malformed".into(),
            })?;
        seq.inverse(&transformed, parsed.skip_mask).ok_or_else(|| {
            KanziError::CorruptedBlock {
                block_id: id as u64,
                offset: 0,
                message: "transform chain inverse failed".into(),
            }
        })?
    };

    if let Some(expected) = parsed.checksum {
        let computed = match params.checksum {
            ChecksumSize::None => None,
            ChecksumSize::Bits32 => Some(xxhash32(&original) as u64),
            ChecksumSize::Bits64 => Some(xxhash64(&original)),
        };
        if let Some(computed) = computed {
            if computed != expected {
                return Err(KanziError::ChecksumMismatch {
                    block_id: id as u64,
                    expected,
                    computed,
                });
            }
        }
    }

    Ok(Some(original))
}

fn process_err(id: i64, e: KanziError) -> KanziError {
    KanziError::ProcessBlock {
        block_id: id as u64,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::params::EncoderParams;
    use kanzi_core::registry::TransformType;

    fn roundtrip(data: &[u8], enc_params: EncoderParams) -> Vec<u8> {
        let mut enc = Encoder::new(Vec::new(), enc_params).unwrap();
        enc.write(data).unwrap();
        let bytes = enc.into_inner().unwrap();

        let mut dec = Decoder::new(std::io::Cursor::new(bytes), DecoderParams::new()).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = dec.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn roundtrips_plain_text_with_transform_chain() {
        let mut params = EncoderParams::new();
        params.transform_chain = vec![TransformType::Bwt, TransformType::ZRlt];
        params.checksum = ChecksumSize::Bits32;
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(64);
        assert_eq!(roundtrip(&data, params), data);
    }

    #[test]
    fn roundtrips_empty_input() {
        let params = EncoderParams::new();
        assert_eq!(roundtrip(b"", params), Vec::<u8>::new());
    }

    #[test]
    fn close_is_idempotent() {
        let enc = Encoder::new(Vec::new(), EncoderParams::new()).unwrap();
        let bytes = enc.into_inner().unwrap();
        let mut dec = Decoder::new(std::io::Cursor::new(bytes), DecoderParams::new()).unwrap();
        dec.close().unwrap();
        dec.close().unwrap();
    }
}
