//! Burrows-Wheeler transform (spec.md §4.6), grounded on the primary-index
//! + cyclic-rotation design of `BWT.cpp`/`DivSufSort.hpp`.
//!
//! Forward uses a prefix-doubling suffix array over the cyclic rotations of
//! the block (rather than porting DivSufSort's induced-sorting algorithm
//! verbatim); inverse uses the textbook LF-mapping walk. Both run in a
//! single chunk — kanzi's parallel `BiPSIv2` multi-chunk inverse is a
//! performance feature of the original's multi-threaded inverse, not
//! needed for correctness here.

use crate::traits::ByteTransform;

/// `MAX_BWT_BLOCK_SIZE`, chosen to leave headroom below 1 GiB.
pub const MAX_BWT_BLOCK_SIZE: usize = (1 << 30) - (1 << 16);

/// Number of BWT chunks used for `n` bytes. Always 1: the multi-chunk
/// scheme in the original exists solely to parallelize the inverse.
pub fn get_bwt_chunks(_n: usize) -> usize {
    1
}

fn suffix_array_cyclic(data: &[u8]) -> Vec<u32> {
    let n = data.len();
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<i64> = data.iter().map(|&b| b as i64).collect();
    let mut tmp = vec![0i64; n];

    let mut k = 1usize;
    while k < n {
        let rank_at = |i: usize| -> (i64, i64) { (rank[i], rank[(i + k) % n]) };
        sa.sort_unstable_by(|&a, &b| rank_at(a as usize).cmp(&rank_at(b as usize)));

        tmp[sa[0] as usize] = 0;
        for i in 1..n {
            let prev = rank_at(sa[i - 1] as usize);
            let cur = rank_at(sa[i] as usize);
            tmp[sa[i] as usize] = tmp[sa[i - 1] as usize] + if cur == prev { 0 } else { 1 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1] as usize] as usize == n - 1 {
            break;
        }
        k *= 2;
    }
    sa
}

/// Burrows-Wheeler forward/inverse transform with a single primary index.
#[derive(Debug, Default)]
pub struct Bwt {
    primary_index: u32,
}

impl Bwt {
    /// Create a transform with no primary index set yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary index recorded by the last [`forward`](Self::forward)
    /// call, to be carried in the frame.
    pub fn primary_index(&self) -> u32 {
        self.primary_index
    }

    /// Set the primary index read back from the frame, before calling
    /// [`inverse`](Self::inverse).
    pub fn set_primary_index(&mut self, index: u32) {
        self.primary_index = index;
    }
}

impl ByteTransform for Bwt {
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        let n = src.len();
        if n == 0 || n > MAX_BWT_BLOCK_SIZE {
            return None;
        }
        if n == 1 {
            dst.push(src[0]);
            self.primary_index = 0;
            return Some(());
        }

        let sa = suffix_array_cyclic(src);
        let mut primary = 0u32;
        dst.reserve(n);
        for (i, &s) in sa.iter().enumerate() {
            if s == 0 {
                primary = i as u32;
            }
            let prev = (s as usize + n - 1) % n;
            dst.push(src[prev]);
        }
        self.primary_index = primary;
        Some(())
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        let n = src.len();
        if n == 0 {
            return Some(());
        }
        if n == 1 {
            dst.push(src[0]);
            return Some(());
        }
        if self.primary_index as usize >= n {
            return None;
        }

        let mut count = [0u32; 256];
        for &b in src {
            count[b as usize] += 1;
        }
        let mut base = [0u32; 256];
        let mut sum = 0u32;
        for c in 0..256 {
            base[c] = sum;
            sum += count[c];
        }

        let mut next = vec![0u32; n];
        let mut seen = [0u32; 256];
        for (i, &b) in src.iter().enumerate() {
            next[i] = base[b as usize] + seen[b as usize];
            seen[b as usize] += 1;
        }

        dst.reserve(n);
        let mut row = self.primary_index;
        for _ in 0..n {
            dst.push(src[row as usize]);
            row = next[row as usize];
        }
        Some(())
    }

    fn max_encoded_length(&self, n: usize) -> usize {
        n
    }

    fn side_data_len(&self) -> usize {
        4
    }

    fn side_data(&self) -> Vec<u8> {
        self.primary_index.to_be_bytes().to_vec()
    }

    fn set_side_data(&mut self, data: &[u8]) {
        if let Ok(bytes) = data.try_into() {
            self.primary_index = u32::from_be_bytes(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut bwt = Bwt::new();
        let mut encoded = Vec::new();
        bwt.forward(data, &mut encoded).unwrap();
        let idx = bwt.primary_index();

        let mut bwt2 = Bwt::new();
        bwt2.set_primary_index(idx);
        let mut decoded = Vec::new();
        bwt2.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn side_data_roundtrips_primary_index() {
        let mut bwt = Bwt::new();
        let mut encoded = Vec::new();
        bwt.forward(b"mississippi", &mut encoded).unwrap();
        let blob = bwt.side_data();
        assert_eq!(blob.len(), bwt.side_data_len());

        let mut bwt2 = Bwt::new();
        bwt2.set_side_data(&blob);
        assert_eq!(bwt2.primary_index(), bwt.primary_index());
    }

    #[test]
    fn mississippi_roundtrip() {
        roundtrip(b"mississippi");
    }

    #[test]
    fn single_byte() {
        roundtrip(b"x");
    }

    #[test]
    fn repeated_bytes() {
        roundtrip(&[b'a'; 100]);
    }

    #[test]
    fn random_like_text() {
        roundtrip(b"the quick brown fox jumps over the lazy dog, again and again");
    }
}
