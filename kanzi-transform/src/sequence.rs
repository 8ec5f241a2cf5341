//! Transform sequence compositor (spec.md §4.6, §190): up to 8 stages
//! run in order; any stage that refuses (or whose output would not fit
//! the `skip` mask's bookkeeping) is bypassed with an identity copy and
//! its bit set in the mask. Decode walks the same stage list in reverse,
//! skipping whichever stages the mask marks as bypassed.

use crate::traits::ByteTransform;

pub const MAX_STAGES: usize = 8;

/// An ordered, owned list of up to [`MAX_STAGES`] boxed transforms, applied
/// forward in order and inverse in reverse order.
pub struct TransformSequence {
    stages: Vec<Box<dyn ByteTransform>>,
}

impl TransformSequence {
    pub fn new(stages: Vec<Box<dyn ByteTransform>>) -> Self {
        assert!(
            stages.len() <= MAX_STAGES,
            "transform sequence supports at most {MAX_STAGES} stages"
        );
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage forward, returning the final bytes and an 8-bit
    /// mask whose bit `k` is set when stage `k` was skipped (refused).
    pub fn forward(&mut self, src: &[u8]) -> (Vec<u8>, u8) {
        let mut mask = 0u8;
        let mut current = src.to_vec();
        for (k, stage) in self.stages.iter_mut().enumerate() {
            let mut out = Vec::with_capacity(stage.max_encoded_length(current.len()));
            match stage.forward(&current, &mut out) {
                Some(()) => current = out,
                None => mask |= 1 << k,
            }
        }
        (current, mask)
    }

    /// Concatenates the [`side_data`](ByteTransform::side_data) of every
    /// active (non-skipped) stage, in stage order, for carrying alongside
    /// the transformed bytes in the frame.
    pub fn side_data(&self, mask: u8) -> Vec<u8> {
        let mut out = Vec::new();
        for (k, stage) in self.stages.iter().enumerate() {
            if mask & (1 << k) == 0 {
                out.extend(stage.side_data());
            }
        }
        out
    }

    /// Splits `data` back out across the active stages (by their fixed
    /// [`side_data_len`](ByteTransform::side_data_len)) and installs each
    /// chunk before [`inverse`](Self::inverse) is called.
    pub fn set_side_data(&mut self, mask: u8, data: &[u8]) -> Option<()> {
        let mut pos = 0usize;
        for (k, stage) in self.stages.iter_mut().enumerate() {
            if mask & (1 << k) == 0 {
                let len = stage.side_data_len();
                let chunk = data.get(pos..pos + len)?;
                stage.set_side_data(chunk);
                pos += len;
            }
        }
        Some(())
    }

    /// Runs every stage inverse in reverse order, honoring `mask`: a set
    /// bit means that stage was skipped on encode and its bytes pass
    /// through unchanged.
    pub fn inverse(&mut self, src: &[u8], mask: u8) -> Option<Vec<u8>> {
        let mut current = src.to_vec();
        for (k, stage) in self.stages.iter_mut().enumerate().rev() {
            if mask & (1 << k) != 0 {
                continue;
            }
            let mut out = Vec::with_capacity(current.len() * 2 + 64);
            stage.inverse(&current, &mut out)?;
            current = out;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtft::Mtft;
    use crate::rlt::Rlt;
    use crate::zrlt::Zrlt;

    #[test]
    fn roundtrips_through_all_stages() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbbbbbbbbbbbcccccccccccc"
            .repeat(4);
        let mut seq = TransformSequence::new(vec![
            Box::new(Rlt::new()),
            Box::new(Mtft::new()),
            Box::new(Zrlt::new()),
        ]);
        let (encoded, mask) = seq.forward(&data);
        let decoded = seq.inverse(&encoded, mask).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn skip_mask_is_honored_when_a_stage_refuses() {
        // Too small for Rlt's minimum block length: that stage must be
        // skipped and its bit set, while the rest of the chain still runs.
        let data = b"abcdefgh";
        let mut seq = TransformSequence::new(vec![Box::new(Rlt::new()), Box::new(Mtft::new())]);
        let (encoded, mask) = seq.forward(data);
        assert_eq!(mask & 1, 1);
        let decoded = seq.inverse(&encoded, mask).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn side_data_carries_bwt_primary_index_through_a_chain() {
        use crate::bwt::Bwt;

        let data = b"mississippi river mississippi river mississippi".to_vec();
        let mut seq = TransformSequence::new(vec![Box::new(Bwt::new()), Box::new(Zrlt::new())]);
        let (encoded, mask) = seq.forward(&data);
        let side = seq.side_data(mask);
        assert_eq!(side.len(), 4); // one active BWT stage, no skips expected here

        let mut seq2 = TransformSequence::new(vec![Box::new(Bwt::new()), Box::new(Zrlt::new())]);
        seq2.set_side_data(mask, &side).unwrap();
        let decoded = seq2.inverse(&encoded, mask).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn empty_sequence_is_identity() {
        let data = b"passthrough";
        let mut seq = TransformSequence::new(vec![]);
        let (encoded, mask) = seq.forward(data);
        assert_eq!(mask, 0);
        assert_eq!(encoded, data);
        let decoded = seq.inverse(&encoded, mask).unwrap();
        assert_eq!(decoded, data);
    }
}
