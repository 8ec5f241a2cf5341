//! XXHash32/XXHash64 checksums.
//!
//! Kanzi computes a checksum over the pre-transform bytes of a block (when
//! enabled) and verifies it against the post-inverse bytes on decode
//! (spec.md §3 invariants). Both widths share the xxHash family algorithm;
//! this module is a direct, seed-0 port.

const PRIME32_1: u32 = 0x9E37_79B1;
const PRIME32_2: u32 = 0x85EB_CA77;
const PRIME32_3: u32 = 0xC2B2_AE3D;
const PRIME32_4: u32 = 0x27D4_EB2F;
const PRIME32_5: u32 = 0x1656_67B1;

/// Compute the XXH32 checksum of `data` with seed 0.
pub fn xxhash32(data: &[u8]) -> u32 {
    let len = data.len();

    let mut h32 = if len >= 16 {
        let mut v1 = PRIME32_1.wrapping_add(PRIME32_2);
        let mut v2 = PRIME32_2;
        let mut v3 = 0u32;
        let mut v4 = 0u32.wrapping_sub(PRIME32_1);

        let mut pos = 0;
        while pos + 16 <= len {
            v1 = round32(v1, read_u32_le(&data[pos..]));
            v2 = round32(v2, read_u32_le(&data[pos + 4..]));
            v3 = round32(v3, read_u32_le(&data[pos + 8..]));
            v4 = round32(v4, read_u32_le(&data[pos + 12..]));
            pos += 16;
        }

        v1.rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18))
    } else {
        PRIME32_5
    };

    h32 = h32.wrapping_add(len as u32);

    let remaining_start = len - (len % 16);
    let remaining = &data[remaining_start..];
    let mut pos = 0;

    while pos + 4 <= remaining.len() {
        h32 = h32.wrapping_add(read_u32_le(&remaining[pos..]).wrapping_mul(PRIME32_3));
        h32 = h32.rotate_left(17).wrapping_mul(PRIME32_4);
        pos += 4;
    }

    while pos < remaining.len() {
        h32 = h32.wrapping_add((remaining[pos] as u32).wrapping_mul(PRIME32_5));
        h32 = h32.rotate_left(11).wrapping_mul(PRIME32_1);
        pos += 1;
    }

    h32 ^= h32 >> 15;
    h32 = h32.wrapping_mul(PRIME32_2);
    h32 ^= h32 >> 13;
    h32 = h32.wrapping_mul(PRIME32_3);
    h32 ^= h32 >> 16;

    h32
}

#[inline]
fn round32(acc: u32, input: u32) -> u32 {
    acc.wrapping_add(input.wrapping_mul(PRIME32_2))
        .rotate_left(13)
        .wrapping_mul(PRIME32_1)
}

#[inline]
fn read_u32_le(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

const PRIME64_1: u64 = 0x9E37_79B1_85EB_CA87;
const PRIME64_2: u64 = 0xC2B2_AE3D_27D4_EB4F;
const PRIME64_3: u64 = 0x1656_67B1_9E37_79F9;
const PRIME64_4: u64 = 0x85EB_CA77_C2B2_AE63;
const PRIME64_5: u64 = 0x27D4_EB2F_1656_67C5;

/// Compute the XXH64 checksum of `data` with seed 0.
pub fn xxhash64(data: &[u8]) -> u64 {
    let len = data.len();

    let mut hash = if len >= 32 {
        let mut v1 = PRIME64_1.wrapping_add(PRIME64_2);
        let mut v2 = PRIME64_2;
        let mut v3 = 0u64;
        let mut v4 = 0u64.wrapping_sub(PRIME64_1);

        let mut pos = 0;
        while pos + 32 <= len {
            v1 = round64(v1, read_u64_le(&data[pos..]));
            v2 = round64(v2, read_u64_le(&data[pos + 8..]));
            v3 = round64(v3, read_u64_le(&data[pos + 16..]));
            v4 = round64(v4, read_u64_le(&data[pos + 24..]));
            pos += 32;
        }

        let mut h = v1
            .rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18));

        h = merge_round64(h, v1);
        h = merge_round64(h, v2);
        h = merge_round64(h, v3);
        h = merge_round64(h, v4);
        h
    } else {
        PRIME64_5
    };

    hash = hash.wrapping_add(len as u64);

    let remaining = &data[len - (len % 32)..];
    let mut pos = 0;

    while pos + 8 <= remaining.len() {
        let k = round64(0, read_u64_le(&remaining[pos..]));
        hash ^= k;
        hash = hash
            .rotate_left(27)
            .wrapping_mul(PRIME64_1)
            .wrapping_add(PRIME64_4);
        pos += 8;
    }

    if pos + 4 <= remaining.len() {
        let k = (read_u32_le(&remaining[pos..]) as u64).wrapping_mul(PRIME64_1);
        hash ^= k;
        hash = hash
            .rotate_left(23)
            .wrapping_mul(PRIME64_2)
            .wrapping_add(PRIME64_3);
        pos += 4;
    }

    while pos < remaining.len() {
        hash ^= (remaining[pos] as u64).wrapping_mul(PRIME64_5);
        hash = hash.rotate_left(11).wrapping_mul(PRIME64_1);
        pos += 1;
    }

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(PRIME64_2);
    hash ^= hash >> 29;
    hash = hash.wrapping_mul(PRIME64_3);
    hash ^= hash >> 32;

    hash
}

#[inline]
fn round64(acc: u64, input: u64) -> u64 {
    acc.wrapping_add(input.wrapping_mul(PRIME64_2))
        .rotate_left(31)
        .wrapping_mul(PRIME64_1)
}

#[inline]
fn merge_round64(mut acc: u64, val: u64) -> u64 {
    let val = round64(0, val);
    acc ^= val;
    acc.wrapping_mul(PRIME64_1).wrapping_add(PRIME64_4)
}

#[inline]
fn read_u64_le(data: &[u8]) -> u64 {
    u64::from_le_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxhash32_empty() {
        assert_eq!(xxhash32(&[]), 0x02CC_5D05);
    }

    #[test]
    fn xxhash64_empty() {
        assert_eq!(xxhash64(&[]), 0xEF46_DB37_51D8_E999);
    }

    #[test]
    fn xxhash_deterministic() {
        let data = b"The quick brown fox jumps over the lazy dog";
        assert_eq!(xxhash32(data), xxhash32(data));
        assert_eq!(xxhash64(data), xxhash64(data));
    }

    #[test]
    fn xxhash_sensitive_to_single_byte_flip() {
        let mut data = b"mississippi mississippi mississippi".to_vec();
        let h1 = xxhash64(&data);
        data[3] ^= 0x01;
        let h2 = xxhash64(&data);
        assert_ne!(h1, h2);
    }
}
