//! Block-pipeline encoder (spec.md §4.3): accumulates caller bytes into
//! block-sized chunks, runs each block's transform-chain-plus-entropy-coding
//! work on the worker pool, and serializes frame emission onto the shared
//! sink through the sequential gate.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use kanzi_core::bitstream::BitWriter;
use kanzi_core::checksum::{xxhash32, xxhash64};
use kanzi_core::error::{KanziError, Result};
use kanzi_core::gate::SequentialGate;
use kanzi_core::histogram::{first_order_entropy_1024, histogram_order0};
use kanzi_core::magic::{get_type, is_compressed};
use kanzi_core::registry::EntropyType;
use kanzi_transform::sequence::TransformSequence;

use crate::container::{build_frame_header, write_eos_frame, write_frame, write_header, FrameFields};
use crate::entropy::build_chain;
use crate::entropy::BlockEncoder;
use crate::params::{ChecksumSize, EncoderParams};
use crate::pool::BlockPool;

/// Order-0 entropy (in 1024ths of a bit/symbol) above which a block is
/// treated as already compressed and stored with `transform=NONE,
/// entropy=NONE` (the copy-block path). Tuned loosely rather than ported:
/// see DESIGN.md.
const INCOMPRESSIBLE_THRESHOLD_1024: i32 = 7700;

type TaskResult = Result<()>;

/// Writes a Kanzi bitstream to an underlying sink, fanning block-level work
/// out across a worker pool while keeping frame emission in block order.
pub struct Encoder<W: Write + Send + 'static> {
    params: EncoderParams,
    sink: Arc<Mutex<BitWriter<W>>>,
    gate: Arc<SequentialGate>,
    pool: BlockPool,
    next_block_id: i64,
    pending: VecDeque<Receiver<TaskResult>>,
    input_buf: Vec<u8>,
    closed: bool,
    first_error: Option<KanziError>,
}

impl<W: Write + Send + 'static> Encoder<W> {
    pub fn new(sink: W, params: EncoderParams) -> Result<Self> {
        params.validate()?;
        let mut bw = BitWriter::new(sink, 1 << 16)?;
        if !params.headerless {
            write_header(
                &mut bw,
                params.entropy.id(),
                &params.transform_chain,
                params.block_size,
                params.checksum,
                params.original_size,
            )?;
        }
        let pool = BlockPool::new(params.jobs)?;
        Ok(Self {
            gate: Arc::new(SequentialGate::new(1)),
            pool,
            next_block_id: 1,
            pending: VecDeque::new(),
            input_buf: Vec::with_capacity(params.block_size),
            closed: false,
            first_error: None,
            sink: Arc::new(Mutex::new(bw)),
            params,
        })
    }

    /// Accumulate `bytes`, submitting full blocks as the threshold is hit.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_error()?;
        self.input_buf.extend_from_slice(bytes);
        while self.input_buf.len() >= self.params.block_size {
            let block = self.input_buf.drain(..self.params.block_size).collect();
            self.submit_block(block)?;
        }
        Ok(())
    }

    fn check_error(&mut self) -> Result<()> {
        if let Some(e) = self.first_error.take() {
            return Err(e);
        }
        Ok(())
    }

    fn submit_block(&mut self, block: Vec<u8>) -> Result<()> {
        while self.pending.len() >= 2 * self.params.jobs {
            let rx = self.pending.pop_front().unwrap();
            self.drain_one(rx)?;
        }
        let id = self.next_block_id;
        self.next_block_id += 1;

        let params = self.params.clone();
        let sink = self.sink.clone();
        let gate = self.gate.clone();
        let rx = self
            .pool
            .spawn(move || encode_block_task(id, block, &params, &sink, &gate));
        self.pending.push_back(rx);
        Ok(())
    }

    fn drain_one(&mut self, rx: Receiver<TaskResult>) -> Result<()> {
        match rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.gate.cancel();
                Err(e)
            }
            Err(_) => {
                self.gate.cancel();
                Err(KanziError::Cancelled)
            }
        }
    }

    /// Submit the final partial block (if any), drain all outstanding work,
    /// write the end-of-stream terminator, and flush the sink. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if !self.input_buf.is_empty() {
            let last = std::mem::take(&mut self.input_buf);
            self.submit_block(last)?;
        }

        while let Some(rx) = self.pending.pop_front() {
            self.drain_one(rx)?;
        }

        let mut guard = self.sink.lock().unwrap();
        write_eos_frame(&mut guard)?;
        guard.close()
    }

    /// Close the stream and recover the underlying sink. Fails if any
    /// block task still holds a clone of the shared sink (it should not,
    /// once `close` has drained every pending task).
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        let mutex = Arc::try_unwrap(self.sink)
            .map_err(|_| KanziError::Other("sink still referenced by a pending task".into()))?;
        let bw = mutex
            .into_inner()
            .map_err(|_| KanziError::Other("sink mutex poisoned".into()))?;
        Ok(bw.into_inner())
    }
}

fn encode_block_task<W: Write>(
    id: i64,
    block: Vec<u8>,
    params: &EncoderParams,
    sink: &Mutex<BitWriter<W>>,
    gate: &SequentialGate,
) -> TaskResult {
    let checksum = match params.checksum {
        ChecksumSize::None => None,
        ChecksumSize::Bits32 => Some(xxhash32(&block) as u64),
        ChecksumSize::Bits64 => Some(xxhash64(&block)),
    };

    let mut histo = [0u32; 256];
    histogram_order0(&block, &mut histo);
    let entropy_estimate = first_order_entropy_1024(block.len(), &histo);
    let magic = get_type(&block);

    let incompressible = block.len() < 16
        || (params.skip_blocks
            && (is_compressed(magic) || entropy_estimate >= INCOMPRESSIBLE_THRESHOLD_1024));

    let (transformed, skip_mask, num_stages, side_data, copy_block, entropy_type) = if incompressible
    {
        (block.clone(), 0u8, 0usize, Vec::new(), true, EntropyType::None)
    } else {
        let stages = build_chain(&params.transform_chain);
        let num_stages = stages.len();
        let mut seq = TransformSequence::new(stages);
        let (out, mask) = seq.forward(&block);
        let side_data = seq.side_data(mask);
        (out, mask, num_stages, side_data, false, params.entropy)
    };

    let mut scratch = Vec::new();
    {
        let mut ebw = BitWriter::new(&mut scratch, 1024)
            .map_err(|e| process_err(id, e))?;
        let mut coder = BlockEncoder::new(entropy_type).map_err(|e| process_err(id, e))?;
        coder
            .encode(&mut ebw, &transformed)
            .map_err(|e| process_err(id, e))?;
        ebw.close().map_err(|e| process_err(id, e))?;
    }

    let fields = FrameFields {
        copy_block,
        skip_mask,
        num_stages,
        side_data,
        transformed_length: transformed.len(),
        checksum,
        checksum_size: params.checksum,
    };
    let mut payload = build_frame_header(&fields).map_err(|e| process_err(id, e))?;
    payload.extend_from_slice(&scratch);

    if gate.wait_for(id).is_err() {
        return Err(KanziError::Cancelled);
    }

    let mut guard = sink.lock().unwrap();
    write_frame(&mut guard, &payload).map_err(|e| process_err(id, e))?;
    drop(guard);
    gate.publish(id);
    Ok(())
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

    #[test]
    fn small_input_below_threshold_is_flushed_on_close() {
        let mut enc = Encoder::new(Vec::new(), EncoderParams::new()).unwrap();
        enc.write(b"hello").unwrap();
        let out = enc.into_inner().unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn empty_input_still_writes_header_and_eos() {
        let enc = Encoder::new(Vec::new(), EncoderParams::new()).unwrap();
        let out = enc.into_inner().unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn double_close_is_a_no_op() {
        let mut enc = Encoder::new(Vec::new(), EncoderParams::new()).unwrap();
        enc.write(b"hello").unwrap();
        enc.close().unwrap();
        let out = enc.into_inner().unwrap();
        assert!(!out.is_empty());
    }
}
