//! Context-mixing predictor: blends an order-0 and an order-1 estimate
//! through a fixed-point logistic mix (spec.md §4.5).

use super::Predictor;
use kanzi_core::histogram::{squash, stretch};

const PSCALE: i32 = 1 << 12;
const RATE: i32 = 5;

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
        self.probs[ctx] as i32
    }

    fn update(&mut self, ctx: usize, bit: i32) {
        let p = &mut self.probs[ctx];
        if bit != 0 {
            *p += ((PSCALE - *p as i32) >> RATE) as u16;
        } else {
            *p -= (*p as i32 >> RATE) as u16;
        }
    }
}

/// Mixes an order-0 and an order-1 (previous-byte) context through a
/// two-weight adaptive logistic mixer.
pub struct CmPredictor {
    order0: CounterBank,
    order1: CounterBank,
    weights: [i32; 2],
    idx: usize,
    ctx1: usize,
}

impl Default for CmPredictor {
    fn default() -> Self {
        Self {
            order0: CounterBank::new(256),
            order1: CounterBank::new(256 * 256),
            weights: [1 << 14; 2],
            idx: 1,
            ctx1: 0,
        }
    }
}

impl CmPredictor {
    /// Create a predictor with both contexts at the uniform probability.
    pub fn new() -> Self {
        Self::default()
    }

    fn stretched_inputs(&self) -> [i32; 2] {
        [
            stretch(self.order0.get(self.idx & 0xFF)),
            stretch(self.order1.get(self.ctx1 + (self.idx & 0xFF))),
        ]
    }
}

impl Predictor for CmPredictor {
    fn get(&self) -> i32 {
        let inputs = self.stretched_inputs();
        let dot = (self.weights[0] as i64 * inputs[0] as i64
            + self.weights[1] as i64 * inputs[1] as i64)
            >> 16;
        squash(dot as i32)
    }

    fn update(&mut self, bit: i32) {
        let inputs = self.stretched_inputs();
        let mix = self.get();

        let err = ((bit << 12) - mix) * 3;
        for i in 0..2 {
            self.weights[i] += (inputs[i] * err) >> 10;
        }

        self.order0.update(self.idx & 0xFF, bit);
        self.order1.update(self.ctx1 + (self.idx & 0xFF), bit);
        self.idx = (self.idx << 1) | bit as usize;
    }

    fn end_of_byte(&mut self, byte: u8) {
        self.ctx1 = byte as usize * 256;
        self.idx = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixer_learns_constant_bit() {
        let mut p = CmPredictor::new();
        for _ in 0..200 {
            p.update(1);
        }
        assert!(p.get() > PSCALE / 2);
    }
}
