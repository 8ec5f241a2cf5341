//! The reversible byte transform contract (spec.md §4.6).

/// A reversible, block-local byte transform.
///
/// Implementations may refuse (return `None`) when the input is not
/// amenable; the caller then sets the skip bit and passes the block through
/// verbatim. `inverse` is only ever called on output `forward` actually
/// produced, never on a skipped stage.
pub trait ByteTransform {
    /// Transform `src`, appending the result to `dst`. Returns `None` if
    /// the transform refuses this input; `dst` is left untouched in that
    /// case.
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()>;

    /// Reverse a `forward` call; must succeed for any `src` that `forward`
    /// actually produced.
    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()>;

    /// Upper bound on encoded length for an input of `n` bytes, used to
    /// size output buffers and to trigger early refusal.
    fn max_encoded_length(&self, n: usize) -> usize;

    /// Extra bytes the decoder must feed back via [`set_side_data`] before
    /// calling `inverse` (BWT's primary index; most transforms carry none).
    /// Fixed per transform, independent of whether `forward` has run.
    fn side_data_len(&self) -> usize {
        0
    }

    /// Side data produced by the last `forward` call, to be carried in the
    /// frame alongside the transformed bytes.
    fn side_data(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Install side data read back from the frame, before `inverse`.
    fn set_side_data(&mut self, _data: &[u8]) {}
}
