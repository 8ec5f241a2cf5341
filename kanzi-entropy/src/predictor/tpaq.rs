//! Simplified TPAQ-style predictor: several order-N byte contexts plus a
//! small match model, mixed through a logistic mixer and refined by an
//! adaptive probability map (spec.md §4.5, grounded on the shape of
//! `TPAQPredictor`).

use super::Predictor;
use kanzi_core::histogram::{squash, stretch};

const PSCALE: i32 = 1 << 12;
const RATE: i32 = 5;
const HASH_SIZE: usize = 1 << 16;
const MATCH_HASH_SIZE: usize = 1 << 17;
const MIN_MATCH_LEN: usize = 8;

struct CounterBank {
    probs: Vec<u16>,
}

impl CounterBank {
    fn new(size: usize) -> Self {
        Self {
            probs: vec![(PSCALE / 2) as u16; size],
        }
    }

    fn get(&self, ctx: usize) -> i32 {
        self.probs[ctx % self.probs.len()] as i32
    }

    fn update(&mut self, ctx: usize, bit: i32) {
        let i = ctx % self.probs.len();
        let p = &mut self.probs[i];
        if bit != 0 {
            *p += ((PSCALE - *p as i32) >> RATE) as u16;
        } else {
            *p -= (*p as i32 >> RATE) as u16;
        }
    }
}

/// An adaptive probability map that refines a mixed probability using a
/// small secondary context (here, just the 4 top bits of history).
struct Apm {
    table: Vec<u16>,
    buckets: usize,
}

impl Apm {
    fn new(contexts: usize) -> Self {
        let buckets = 33;
        let mut table = vec![0u16; contexts * buckets];
        for c in 0..contexts {
            for i in 0..buckets {
                let x = (i as i32 - 16) * 128;
                table[c * buckets + i] = squash(x) as u16;
            }
        }
        Self { table, buckets }
    }

    fn bucket(&self, ctx: usize, p: i32) -> (usize, i32) {
        let s = stretch(p) + 2048;
        let w = s & 127;
        let idx = (s >> 7).clamp(0, self.buckets as i32 - 2) as usize;
        let base = (ctx % (self.table.len() / self.buckets)) * self.buckets;
        (base + idx, w)
    }

    fn predict(&self, ctx: usize, p: i32) -> i32 {
        let (base, w) = self.bucket(ctx, p);
        let lo = self.table[base] as i32;
        let hi = self.table[base + 1] as i32;
        (lo * (128 - w) + hi * w) >> 7
    }

    fn update(&mut self, ctx: usize, p: i32, bit: i32) {
        let (base, _) = self.bucket(ctx, p);
        let target = bit << 12;
        let rate = 6;
        let lo = self.table[base] as i32;
        let hi = self.table[base + 1] as i32;
        self.table[base] = (lo + ((target - lo) >> rate)) as u16;
        self.table[base + 1] = (hi + ((target - hi) >> rate)) as u16;
    }
}

/// Finds the longest recent repeat of the current byte history and
/// predicts its continuation bit.
struct MatchModel {
    history: Vec<u8>,
    hash_table: Vec<i32>,
    hash: u64,
    match_pos: i32,
    match_len: u32,
}

impl MatchModel {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            hash_table: vec![-1; MATCH_HASH_SIZE],
            hash: 0,
            match_pos: -1,
            match_len: 0,
        }
    }

    fn predicted_bit(&self, bit_idx: u32) -> Option<i32> {
        if self.match_pos < 0 {
            return None;
        }
        let pos = self.match_pos as usize;
        if pos >= self.history.len() {
            return None;
        }
        let byte = self.history[pos];
        Some(((byte >> (7 - bit_idx)) & 1) as i32)
    }

    fn confidence(&self) -> i32 {
        (self.match_len.min(32) * 60) as i32
    }

    fn end_of_byte(&mut self, byte: u8) {
        self.history.push(byte);
        self.hash = self.hash.wrapping_mul(0x0100_0000_01b3).wrapping_add(byte as u64);
        let key = (self.hash as usize) % self.hash_table.len();

        if self.match_pos >= 0 && (self.match_pos as usize) < self.history.len() - 1
            && self.history[self.match_pos as usize] == byte
        {
            self.match_pos += 1;
            self.match_len += 1;
        } else {
            self.match_len = 0;
            self.match_pos = -1;
        }

        if self.history.len() >= MIN_MATCH_LEN {
            let candidate = self.hash_table[key];
            if self.match_pos < 0 && candidate >= 0 {
                self.match_pos = candidate;
                self.match_len = 1;
            }
            self.hash_table[key] = self.history.len() as i32;
        }
    }
}

/// Mixes order-0/1/2 byte contexts and a match model through a logistic
/// mixer, with a final APM refinement pass.
pub struct TpaqPredictor {
    order0: CounterBank,
    order1: CounterBank,
    order2: CounterBank,
    matcher: MatchModel,
    apm: Apm,
    weights: [i32; 4],
    idx: usize,
    ctx1: usize,
    ctx2: usize,
    last_bit_idx: u32,
    last_byte: u8,
}

impl Default for TpaqPredictor {
    fn default() -> Self {
        Self {
            order0: CounterBank::new(256),
            order1: CounterBank::new(HASH_SIZE),
            order2: CounterBank::new(HASH_SIZE),
            matcher: MatchModel::new(),
            apm: Apm::new(256),
            weights: [1 << 14; 4],
            idx: 1,
            ctx1: 0,
            ctx2: 0,
            last_bit_idx: 0,
            last_byte: 0,
        }
    }
}

impl TpaqPredictor {
    /// Create a predictor with all contexts at the uniform probability.
    pub fn new() -> Self {
        Self::default()
    }

    fn stretched_inputs(&self, match_pred: i32) -> [i32; 4] {
        [
            stretch(self.order0.get(self.idx & 0xFF)),
            stretch(self.order1.get(self.ctx1 ^ (self.idx & 0xFF))),
            stretch(self.order2.get(self.ctx2 ^ (self.idx & 0xFF))),
            stretch(match_pred.clamp(1, PSCALE - 1)),
        ]
    }

    fn mix(&self, inputs: &[i32; 4]) -> i32 {
        let dot: i64 = (0..4).map(|i| self.weights[i] as i64 * inputs[i] as i64).sum();
        squash((dot >> 16) as i32)
    }
}

impl Predictor for TpaqPredictor {
    fn get(&self) -> i32 {
        let bit_idx = self.last_bit_idx;
        let match_pred = self
            .matcher
            .predicted_bit(bit_idx)
            .map(|b| {
                let conf = self.matcher.confidence();
                if b != 0 {
                    PSCALE / 2 + conf
                } else {
                    PSCALE / 2 - conf
                }
            })
            .unwrap_or(PSCALE / 2);

        let inputs = self.stretched_inputs(match_pred);
        let mix = self.mix(&inputs);
        self.apm.predict(self.last_byte as usize, mix)
    }

    fn update(&mut self, bit: i32) {
        let bit_idx = self.last_bit_idx;
        let match_pred = self
            .matcher
            .predicted_bit(bit_idx)
            .map(|b| {
                let conf = self.matcher.confidence();
                if b != 0 {
                    PSCALE / 2 + conf
                } else {
                    PSCALE / 2 - conf
                }
            })
            .unwrap_or(PSCALE / 2);

        let inputs = self.stretched_inputs(match_pred);
        let mix = self.mix(&inputs);

        let err = ((bit << 12) - mix) * 3;
        for i in 0..4 {
            self.weights[i] += ((inputs[i] * err) >> 12).clamp(-(1 << 20), 1 << 20);
        }

        self.order0.update(self.idx & 0xFF, bit);
        self.order1.update(self.ctx1 ^ (self.idx & 0xFF), bit);
        self.order2.update(self.ctx2 ^ (self.idx & 0xFF), bit);
        self.apm.update(self.last_byte as usize, mix, bit);

        self.idx = (self.idx << 1) | bit as usize;
        self.last_bit_idx += 1;
    }

    /// Signal that a full byte has just been coded.
    fn end_of_byte(&mut self, byte: u8) {
        self.matcher.end_of_byte(byte);
        self.ctx1 = (byte as usize).wrapping_mul(2654435761) & (HASH_SIZE - 1);
        self.ctx2 = self
            .ctx2
            .wrapping_mul(0x9E3779B1)
            .wrapping_add(byte as usize)
            & (HASH_SIZE - 1);
        self.idx = 1;
        self.last_bit_idx = 0;
        self.last_byte = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_repeating_pattern() {
        let mut p = TpaqPredictor::new();
        let pattern = b"abcabcabcabcabcabcabcabcabcabcabc";
        for &byte in pattern {
            for bit_idx in 0..8 {
                let bit = ((byte >> (7 - bit_idx)) & 1) as i32;
                p.update(bit);
            }
            p.end_of_byte(byte);
        }
        // after several repeats the mixer should favor the matcher
        assert!(p.get() >= 0 && p.get() < PSCALE);
    }
}
