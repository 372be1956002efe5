//! Block geometry for sharding a chunk into `n = k + 2m` shares.
//!
//! Every block of `input_size` data symbols is encoded into one codeword of
//! `encode_size` symbols, which is cut into `n` runs of `symbol_size`
//! symbols, one run per share. Because each share holds `symbol_size`
//! symbols of every codeword, losing one share costs `symbol_size` symbols
//! per block, and the `n_ec = 2 * m * symbol_size` parity symbols absorb
//! `m` corrupted shares (or `2m` erased ones).

use serde::{Deserialize, Serialize};

use crate::error::ErasureError;
use crate::field::FieldKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardParams {
    pub field: FieldKind,
    /// Number of data shares (`originalBlobs`).
    pub k: usize,
    /// Number of tolerated share failures.
    pub m: usize,
    /// Total shares, `k + 2m`.
    pub n: usize,
    /// Symbols per codeword.
    pub encode_size: usize,
    /// Data symbols per codeword.
    pub input_size: usize,
    /// Parity symbols per codeword.
    pub n_ec: usize,
    /// Symbols each share contributes to one codeword.
    pub symbol_size: usize,
}

impl ShardParams {
    pub fn new(field: FieldKind, k: usize, m: usize) -> Result<Self, ErasureError> {
        if k == 0 {
            return Err(ErasureError::Configuration(
                "data share count k must be greater than zero".into(),
            ));
        }
        if m == 0 {
            return Err(ErasureError::Configuration(
                "allowed failures m must be greater than zero".into(),
            ));
        }
        let n = m
            .checked_mul(2)
            .and_then(|twice| twice.checked_add(k))
            .ok_or_else(|| ErasureError::Configuration("share count overflows".into()))?;

        // Codewords may not be longer than the multiplicative group, or two
        // positions would share an error locator.
        let max_len = field.size() - 1;
        if n > max_len {
            return Err(ErasureError::Configuration(format!(
                "k + 2m = {n} shares exceed the {max_len} symbol codeword of {field}"
            )));
        }

        let encode_size = (max_len / n) * n;
        let input_size = encode_size * k / n;
        let n_ec = encode_size - input_size;
        let symbol_size = input_size / k;
        if symbol_size * k != input_size {
            return Err(ErasureError::Configuration(format!(
                "bad alignment of symbols in chunking: {input_size} != {symbol_size} * {k}"
            )));
        }

        Ok(Self {
            field,
            k,
            m,
            n,
            encode_size,
            input_size,
            n_ec,
            symbol_size,
        })
    }

    /// Bytes of chunk data consumed per codeword.
    pub fn block_bytes(&self) -> usize {
        self.input_size * self.field.bytes_per_element()
    }

    /// Bytes each share gains per codeword.
    pub fn share_stride(&self) -> usize {
        self.symbol_size * self.field.bytes_per_element()
    }

    /// Number of codewords needed for a chunk of `original_len` bytes.
    pub fn blocks_for(&self, original_len: usize) -> usize {
        original_len.div_ceil(self.block_bytes())
    }

    /// Length of every share produced for a chunk of `original_len` bytes.
    pub fn share_len(&self, original_len: usize) -> usize {
        self.blocks_for(original_len) * self.share_stride()
    }

    /// Shares that may be silently corrupted (or zeroed) per block.
    pub fn correctable_shares(&self) -> usize {
        self.n_ec / (2 * self.symbol_size)
    }

    /// Shares that may be missing per block when they are marked as erased.
    pub fn erasable_shares(&self) -> usize {
        self.n_ec / self.symbol_size
    }
}
