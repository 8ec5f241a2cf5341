//! TEXT codec (spec.md §4.6), grounded on `TextCodec.hpp`'s dictionary
//! substitution design: a small static dictionary of common English
//! words seeds a dynamic dictionary (capped at `MAX_DICT_SIZE`) built up
//! as the block is scanned; recognized words are replaced by an escape
//! byte and a varint dictionary index.
//!
//! Simplification: the original ships a 1024-word static dictionary and
//! normalizes CRLF line endings; here the static list is a few dozen
//! common words (still demonstrating the same substitution mechanism)
//! and CRLF bytes pass through untouched. See DESIGN.md.

use crate::lz_common::{read_varint, write_varint};
use crate::traits::ByteTransform;

pub const MAX_DICT_SIZE: usize = 1 << 19;

const STATIC_WORDS: &[&str] = &[
    "the", "of", "and", "a", "to", "in", "is", "you", "that", "it", "he", "was", "for", "on",
    "are", "as", "with", "his", "they", "i", "at", "be", "this", "have", "from", "or", "one",
    "had", "by", "word", "but", "not", "what", "all", "were", "we", "when", "your", "can", "said",
    "there", "use", "an", "each", "which", "she", "do", "how", "their", "if", "will", "up",
    "other", "about", "out", "many", "then", "them", "these", "so", "some", "her", "would",
    "make", "like", "him", "into", "time", "has", "look", "two", "more", "write", "go", "see",
    "number", "no", "way", "could", "people", "my", "than", "first", "water", "been", "call",
    "who", "its", "now", "find", "long", "down", "day", "did", "get", "come", "made", "may",
    "part",
];

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

struct Dictionary {
    words: Vec<Vec<u8>>,
    index: std::collections::HashMap<Vec<u8>, u32>,
}

impl Dictionary {
    fn new() -> Self {
        let mut d = Self {
            words: Vec::with_capacity(STATIC_WORDS.len()),
            index: std::collections::HashMap::new(),
        };
        for w in STATIC_WORDS {
            d.insert(w.as_bytes());
        }
        d
    }

    fn insert(&mut self, word: &[u8]) -> u32 {
        if let Some(&idx) = self.index.get(word) {
            return idx;
        }
        let idx = self.words.len() as u32;
        self.words.push(word.to_vec());
        self.index.insert(word.to_vec(), idx);
        idx
    }

    fn lookup(&self, word: &[u8]) -> Option<u32> {
        self.index.get(word).copied()
    }

    fn get(&self, idx: u32) -> Option<&[u8]> {
        self.words.get(idx as usize).map(|v| v.as_slice())
    }

    fn len(&self) -> usize {
        self.words.len()
    }
}

fn lowercase(word: &[u8]) -> Vec<u8> {
    word.iter().map(|b| b.to_ascii_lowercase()).collect()
}

/// Case pattern of `word` relative to its lowercase form `lower`:
/// `0` = exact match, `1` = all-uppercase, `2` = leading capital only.
/// `None` if the casing doesn't fit one of those three shapes, in which
/// case the word can't be represented by a dictionary index alone.
fn case_pattern(word: &[u8], lower: &[u8]) -> Option<u8> {
    if word == lower {
        return Some(0);
    }
    if word.iter().zip(lower).all(|(&w, &l)| w == l.to_ascii_uppercase()) {
        return Some(1);
    }
    if !word.is_empty()
        && word[0] == lower[0].to_ascii_uppercase()
        && word[1..] == lower[1..]
    {
        return Some(2);
    }
    None
}

fn apply_case(word: &[u8], pattern: u8) -> Option<Vec<u8>> {
    match pattern {
        0 => Some(word.to_vec()),
        1 => Some(word.iter().map(|b| b.to_ascii_uppercase()).collect()),
        2 => {
            let mut out = word.to_vec();
            if let Some(first) = out.first_mut() {
                *first = first.to_ascii_uppercase();
            }
            Some(out)
        }
        _ => None,
    }
}

fn choose_escapes(src: &[u8]) -> Option<(u8, u8)> {
    let mut seen = [false; 256];
    for &b in src {
        seen[b as usize] = true;
    }
    let mut free = (0..256u32).filter(|&c| !seen[c as usize]);
    let e1 = free.next()? as u8;
    let e2 = free.next()? as u8;
    Some((e1, e2))
}

/// Word-dictionary substitution transform.
#[derive(Debug, Default)]
pub struct Text;

impl Text {
    pub fn new() -> Self {
        Self
    }
}

impl ByteTransform for Text {
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        if src.is_empty() {
            return Some(());
        }
        let (escape_word, escape_literal) = choose_escapes(src)?;
        dst.push(escape_word);
        dst.push(escape_literal);

        let mut dict = Dictionary::new();
        let mut i = 0usize;
        while i < src.len() {
            if is_word_byte(src[i]) {
                let start = i;
                while i < src.len() && is_word_byte(src[i]) {
                    i += 1;
                }
                let word = &src[start..i];
                let lower = lowercase(word);
                let known = dict.lookup(&lower);
                let pattern = known.and_then(|_| case_pattern(word, &lower));

                if let (Some(idx), Some(flag)) = (known, pattern) {
                    dst.push(escape_word);
                    dst.push(flag);
                    write_varint(dst, idx as u64);
                } else {
                    if known.is_none() && dict.len() < MAX_DICT_SIZE {
                        dict.insert(&lower);
                    }
                    for &b in word {
                        if b == escape_word || b == escape_literal {
                            dst.push(escape_literal);
                        }
                        dst.push(b);
                    }
                }
            } else {
                let b = src[i];
                if b == escape_word || b == escape_literal {
                    dst.push(escape_literal);
                }
                dst.push(b);
                i += 1;
            }
        }
        Some(())
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        if src.is_empty() {
            return Some(());
        }
        let escape_word = *src.first()?;
        let escape_literal = *src.get(1)?;
        let mut dict = Dictionary::new();
        let mut pos = 2usize;

        while pos < src.len() {
            let b = *src.get(pos)?;
            pos += 1;

            if b == escape_literal {
                dst.push(*src.get(pos)?);
                pos += 1;
                continue;
            }
            if b == escape_word {
                let case_flag = *src.get(pos)?;
                pos += 1;
                let idx = read_varint(src, &mut pos)? as u32;
                let word = dict.get(idx)?.to_vec();
                dst.extend_from_slice(&apply_case(&word, case_flag)?);
                continue;
            }

            // Plain byte outside a word (word bytes reaching here were
            // already literal-escaped above if they collided with a
            // marker); accumulate a run to feed the dictionary.
            if is_word_byte(b) {
                let start = dst.len();
                dst.push(b);
                while pos < src.len() {
                    let nb = *src.get(pos)?;
                    if nb == escape_literal {
                        let real = *src.get(pos + 1)?;
                        if !is_word_byte(real) {
                            break;
                        }
                        dst.push(real);
                        pos += 2;
                        continue;
                    }
                    if !is_word_byte(nb) {
                        break;
                    }
                    dst.push(nb);
                    pos += 1;
                }
                let lower = lowercase(&dst[start..]);
                if dict.len() < MAX_DICT_SIZE {
                    dict.insert(&lower);
                }
            } else {
                dst.push(b);
            }
        }
        Some(())
    }

    fn max_encoded_length(&self, n: usize) -> usize {
        n * 2 + 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut text = Text::new();
        let mut encoded = Vec::new();
        text.forward(data, &mut encoded).unwrap();
        let mut decoded = Vec::new();
        text.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrip_common_words() {
        roundtrip(b"the quick brown fox and the lazy dog");
    }

    #[test]
    fn roundtrip_repeated_custom_word() {
        roundtrip(b"xylophone xylophone xylophone music");
    }

    #[test]
    fn roundtrip_mixed_case() {
        roundtrip(b"The THE the");
    }

    #[test]
    fn roundtrip_empty() {
        roundtrip(b"");
    }

    #[test]
    fn dictionary_shrinks_repeated_common_words() {
        let mut text = Text::new();
        let mut encoded = Vec::new();
        let data = b"the the the the the the the the".repeat(4);
        text.forward(&data, &mut encoded).unwrap();
        assert!(encoded.len() < data.len());
    }
}
