//! Name and id resolution for entropy coders and transforms (spec.md §6).
//!
//! The container header stores a transform chain as an ordered list of
//! 6-bit transform ids plus a single 5-bit entropy id; front ends (and
//! tests) work with short names instead, so this module is the single
//! place both directions are defined.

use crate::error::KanziError;

/// One of the entropy coders a block's payload may be encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntropyType {
    /// No entropy coding; raw bytes.
    None,
    /// Canonical Huffman.
    Huffman,
    /// Order-0 range asymmetric numeral system.
    Ans0,
    /// Order-1 range asymmetric numeral system.
    Ans1,
    /// Binary range coder with a static order-0 model.
    Range,
    /// Binary arithmetic coder, FPAQ-style single-context predictor.
    Fpaq,
    /// Binary arithmetic coder, TPAQ context-mixing predictor.
    Tpaq,
    /// Binary arithmetic coder, extended TPAQ predictor.
    TpaqExtra,
    /// Binary arithmetic coder, generic context-mixing predictor.
    Cm,
}

impl EntropyType {
    /// The 5-bit id stored in the bitstream header.
    pub fn id(self) -> u8 {
        match self {
            EntropyType::None => 0,
            EntropyType::Huffman => 1,
            EntropyType::Ans0 => 2,
            EntropyType::Ans1 => 3,
            EntropyType::Range => 4,
            EntropyType::Fpaq => 5,
            EntropyType::Tpaq => 6,
            EntropyType::TpaqExtra => 7,
            EntropyType::Cm => 8,
        }
    }

    /// Resolve a registry id back to an [`EntropyType`].
    pub fn from_id(id: u8) -> crate::error::Result<Self> {
        Ok(match id {
            0 => EntropyType::None,
            1 => EntropyType::Huffman,
            2 => EntropyType::Ans0,
            3 => EntropyType::Ans1,
            4 => EntropyType::Range,
            5 => EntropyType::Fpaq,
            6 => EntropyType::Tpaq,
            7 => EntropyType::TpaqExtra,
            8 => EntropyType::Cm,
            other => {
                return Err(KanziError::UnknownCodec {
                    name: format!("entropy id {other}"),
                })
            }
        })
    }

    /// Short canonical name, as accepted by [`EntropyType::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            EntropyType::None => "NONE",
            EntropyType::Huffman => "HUFFMAN",
            EntropyType::Ans0 => "ANS0",
            EntropyType::Ans1 => "ANS1",
            EntropyType::Range => "RANGE",
            EntropyType::Fpaq => "FPAQ",
            EntropyType::Cm => "CM",
            EntropyType::Tpaq => "TPAQ",
            EntropyType::TpaqExtra => "TPAQX",
        }
    }

    /// Resolve a codec name (case-insensitive) to an [`EntropyType`].
    pub fn from_name(name: &str) -> crate::error::Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Ok(EntropyType::None),
            "HUFFMAN" => Ok(EntropyType::Huffman),
            "ANS0" => Ok(EntropyType::Ans0),
            "ANS1" => Ok(EntropyType::Ans1),
            "RANGE" => Ok(EntropyType::Range),
            "FPAQ" => Ok(EntropyType::Fpaq),
            "CM" => Ok(EntropyType::Cm),
            "TPAQ" => Ok(EntropyType::Tpaq),
            "TPAQX" => Ok(EntropyType::TpaqExtra),
            other => Err(KanziError::UnknownCodec {
                name: other.to_string(),
            }),
        }
    }
}

/// One stage of a block's reversible transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformType {
    /// No-op stage (chain padding).
    None,
    /// 2-byte-to-1-byte alias packing.
    Pack,
    /// Burrows-Wheeler transform.
    Bwt,
    /// Burrows-Wheeler transform, scanless variant.
    Bwts,
    /// LZ77-style match/literal coding.
    Lz,
    /// LZ with an extended match-length encoding.
    LzX,
    /// LZ with predictive (single-candidate) matching.
    LzP,
    /// Reduced-offset LZ.
    Rolz,
    /// Reduced-offset LZ, extended variant.
    RolzX,
    /// Run-length transform.
    Rlt,
    /// Zero run-length transform.
    ZRlt,
    /// Move-to-front transform.
    Mtft,
    /// Rank transform.
    Rank,
    /// Sorted rank transform.
    Srt,
    /// Dictionary-based text transform.
    Text,
    /// Fixed-step delta transform for multimedia payloads.
    Fsd,
    /// Relative-to-absolute call/jump rewriting for executables.
    Exe,
    /// UTF-8 codepoint alias transform.
    Utf,
    /// 4-letter DNA alphabet packing.
    Dna,
}

impl TransformType {
    /// The 6-bit id stored in the bitstream header.
    pub fn id(self) -> u8 {
        match self {
            TransformType::None => 0,
            TransformType::Pack => 1,
            TransformType::Bwt => 2,
            TransformType::Bwts => 3,
            TransformType::Lz => 4,
            TransformType::LzX => 5,
            TransformType::LzP => 6,
            TransformType::Rolz => 7,
            TransformType::RolzX => 8,
            TransformType::Rlt => 9,
            TransformType::ZRlt => 10,
            TransformType::Mtft => 11,
            TransformType::Rank => 12,
            TransformType::Srt => 13,
            TransformType::Text => 14,
            TransformType::Fsd => 15,
            TransformType::Exe => 16,
            TransformType::Utf => 17,
            TransformType::Dna => 18,
        }
    }

    /// Resolve a registry id back to a [`TransformType`].
    pub fn from_id(id: u8) -> crate::error::Result<Self> {
        Ok(match id {
            0 => TransformType::None,
            1 => TransformType::Pack,
            2 => TransformType::Bwt,
            3 => TransformType::Bwts,
            4 => TransformType::Lz,
            5 => TransformType::LzX,
            6 => TransformType::LzP,
            7 => TransformType::Rolz,
            8 => TransformType::RolzX,
            9 => TransformType::Rlt,
            10 => TransformType::ZRlt,
            11 => TransformType::Mtft,
            12 => TransformType::Rank,
            13 => TransformType::Srt,
            14 => TransformType::Text,
            15 => TransformType::Fsd,
            16 => TransformType::Exe,
            17 => TransformType::Utf,
            18 => TransformType::Dna,
            other => {
                return Err(KanziError::UnknownCodec {
                    name: format!("transform id {other}"),
                })
            }
        })
    }

    /// Short canonical name, as accepted by [`TransformType::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            TransformType::None => "NONE",
            TransformType::Pack => "PACK",
            TransformType::Bwt => "BWT",
            TransformType::Bwts => "BWTS",
            TransformType::Lz => "LZ",
            TransformType::LzX => "LZX",
            TransformType::LzP => "LZP",
            TransformType::Rolz => "ROLZ",
            TransformType::RolzX => "ROLZX",
            TransformType::Rlt => "RLT",
            TransformType::ZRlt => "ZRLT",
            TransformType::Mtft => "MTFT",
            TransformType::Rank => "RANK",
            TransformType::Srt => "SRT",
            TransformType::Text => "TEXT",
            TransformType::Fsd => "MM-FSD",
            TransformType::Exe => "EXE",
            TransformType::Utf => "UTF",
            TransformType::Dna => "DNA",
        }
    }

    /// Resolve a transform name (case-insensitive). A chain of several
    /// transforms is written as a `+`-separated name list at the API
    /// boundary; this resolves one element of that list.
    pub fn from_name(name: &str) -> crate::error::Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Ok(TransformType::None),
            "PACK" => Ok(TransformType::Pack),
            "BWT" => Ok(TransformType::Bwt),
            "BWTS" => Ok(TransformType::Bwts),
            "LZ" => Ok(TransformType::Lz),
            "LZX" => Ok(TransformType::LzX),
            "LZP" => Ok(TransformType::LzP),
            "ROLZ" => Ok(TransformType::Rolz),
            "ROLZX" => Ok(TransformType::RolzX),
            "RLT" => Ok(TransformType::Rlt),
            "ZRLT" => Ok(TransformType::ZRlt),
            "MTFT" => Ok(TransformType::Mtft),
            "RANK" => Ok(TransformType::Rank),
            "SRT" => Ok(TransformType::Srt),
            "TEXT" => Ok(TransformType::Text),
            "MM-FSD" | "FSD" => Ok(TransformType::Fsd),
            "EXE" => Ok(TransformType::Exe),
            "UTF" => Ok(TransformType::Utf),
            "DNA" => Ok(TransformType::Dna),
            other => Err(KanziError::UnknownCodec {
                name: other.to_string(),
            }),
        }
    }

    /// Parse a `+`-separated transform chain name (e.g. `"BWT+RANK+ZRLT"`)
    /// into an ordered list, at most 8 stages (spec.md §4.2).
    pub fn parse_chain(spec: &str) -> crate::error::Result<Vec<TransformType>> {
        if spec.is_empty() || spec.eq_ignore_ascii_case("NONE") {
            return Ok(Vec::new());
        }
        let stages: Vec<TransformType> = spec
            .split('+')
            .map(TransformType::from_name)
            .collect::<crate::error::Result<_>>()?;
        if stages.len() > 8 {
            return Err(KanziError::invalid_param(
                "transform chain",
                "at most 8 stages are supported",
            ));
        }
        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_name_roundtrip() {
        for &ty in &[
            EntropyType::None,
            EntropyType::Huffman,
            EntropyType::Ans0,
            EntropyType::Ans1,
            EntropyType::Range,
            EntropyType::Fpaq,
            EntropyType::Cm,
            EntropyType::Tpaq,
            EntropyType::TpaqExtra,
        ] {
            assert_eq!(EntropyType::from_name(ty.name()).unwrap(), ty);
            assert_eq!(EntropyType::from_id(ty.id()).unwrap(), ty);
        }
    }

    #[test]
    fn transform_name_roundtrip() {
        for &ty in &[
            TransformType::None,
            TransformType::Pack,
            TransformType::Bwt,
            TransformType::Bwts,
            TransformType::Lz,
            TransformType::LzX,
            TransformType::LzP,
            TransformType::Rolz,
            TransformType::RolzX,
            TransformType::Rlt,
            TransformType::ZRlt,
            TransformType::Mtft,
            TransformType::Rank,
            TransformType::Srt,
            TransformType::Text,
            TransformType::Fsd,
            TransformType::Exe,
            TransformType::Utf,
            TransformType::Dna,
        ] {
            assert_eq!(TransformType::from_name(ty.name()).unwrap(), ty);
            assert_eq!(TransformType::from_id(ty.id()).unwrap(), ty);
        }
    }

    #[test]
    fn parse_chain_splits_on_plus() {
        let chain = TransformType::parse_chain("BWT+RANK+ZRLT").unwrap();
        assert_eq!(
            chain,
            vec![TransformType::Bwt, TransformType::Rank, TransformType::ZRlt]
        );
    }

    #[test]
    fn parse_chain_rejects_too_many_stages() {
        let err = TransformType::parse_chain("BWT+BWT+BWT+BWT+BWT+BWT+BWT+BWT+BWT");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_name_is_error() {
        assert!(EntropyType::from_name("NOPE").is_err());
        assert!(TransformType::from_name("NOPE").is_err());
    }
}
