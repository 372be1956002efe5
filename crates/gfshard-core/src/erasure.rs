//! Chunk-to-shares splitting and recombination.
//!
//! A chunk is read as a stream of field symbols and cut into blocks of
//! `input_size` symbols (the last block zero padded). Each block is encoded
//! into one codeword and the codeword is dealt out to the `n` shares in
//! contiguous runs of `symbol_size` symbols, so share `j` carries positions
//! `j*symbol_size..(j+1)*symbol_size` of every codeword.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ErasureError;
use crate::field::FieldKind;
use crate::params::ShardParams;
use crate::reed_solomon::{ReedSolomon, Received};

/// Metadata describing a share set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardMetadata {
    pub field: FieldKind,
    pub data_shares: usize,
    pub allowed_failures: usize,
    pub share_len: usize,
    pub original_len: usize,
}

impl ShardMetadata {
    pub fn total_shares(&self) -> usize {
        self.data_shares + 2 * self.allowed_failures
    }

    pub fn params(&self) -> Result<ShardParams, ErasureError> {
        ShardParams::new(self.field, self.data_shares, self.allowed_failures)
    }
}

/// A complete erasure coded chunk (metadata + shares).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardedChunk {
    pub meta: ShardMetadata,
    pub shares: Vec<Vec<u8>>,
}

impl ShardedChunk {
    pub fn new(meta: ShardMetadata, shares: Vec<Vec<u8>>) -> Self {
        Self { meta, shares }
    }
}

/// Splits chunks into shares and recombines them for one parameter set.
///
/// Cheap to share across threads; build once per `(field, k, m)`.
#[derive(Clone, Debug)]
pub struct Sharder {
    params: ShardParams,
    codec: ReedSolomon,
}

impl Sharder {
    pub fn new(params: ShardParams) -> Result<Self, ErasureError> {
        let codec = ReedSolomon::new(params.field.field()?, params.n_ec)?;
        Ok(Self { params, codec })
    }

    /// Shorthand for `Sharder::new(ShardParams::new(field, k, m)?)`.
    pub fn with_field(field: FieldKind, k: usize, m: usize) -> Result<Self, ErasureError> {
        Self::new(ShardParams::new(field, k, m)?)
    }

    pub fn params(&self) -> &ShardParams {
        &self.params
    }

    pub fn codec(&self) -> &ReedSolomon {
        &self.codec
    }

    /// Split `input` into `n` equal length shares.
    pub fn split(&self, input: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        let start = Instant::now();
        let p = &self.params;
        let kind = p.field;
        let blocks = p.blocks_for(input.len());
        let share_len = p.share_len(input.len());

        debug!(
            field = %kind,
            k = p.k,
            m = p.m,
            n = p.n,
            blocks,
            share_len,
            "splitting chunk into shares"
        );

        let codewords: Vec<Vec<u16>> = input
            .par_chunks(p.block_bytes())
            .map(|block| {
                let mut symbols = Vec::with_capacity(p.input_size);
                kind.extend_elements(block, &mut symbols);
                symbols.resize(p.input_size, 0);
                self.codec.encode(&symbols)
            })
            .collect::<Result<_, _>>()?;

        let mut shares: Vec<Vec<u8>> = (0..p.n).map(|_| Vec::with_capacity(share_len)).collect();
        for codeword in &codewords {
            for (run, share) in codeword.chunks_exact(p.symbol_size).zip(shares.iter_mut()) {
                kind.extend_bytes(run, share);
            }
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            input_len = input.len(),
            "erasure encoding finished"
        );
        Ok(shares)
    }

    /// Recombine `n` shares into the original chunk of `truncate_to` bytes.
    ///
    /// Missing shares must be passed as zero-filled placeholders; they are
    /// treated as silently corrupted data, so at most
    /// [`ShardParams::correctable_shares`] of them (`m` in practice) may be
    /// damaged per block.
    pub fn recombine<S>(&self, shares: &[S], truncate_to: usize) -> Result<Vec<u8>, ErasureError>
    where
        S: AsRef<[u8]> + Sync,
    {
        let slots: Vec<Option<&[u8]>> = shares.iter().map(|s| Some(s.as_ref())).collect();
        self.recombine_slots(&slots, truncate_to)
    }

    /// Recombine shares where missing ones are known and passed as `None`.
    ///
    /// Every symbol of a missing share is decoded as an erasure, which
    /// tolerates up to [`ShardParams::erasable_shares`] (`2m`) missing shares
    /// per block, or any mix with `2 * corrupted + missing <= 2m`.
    pub fn recombine_with_erasures(
        &self,
        shares: &[Option<&[u8]>],
        truncate_to: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        self.recombine_slots(shares, truncate_to)
    }

    fn recombine_slots(
        &self,
        shares: &[Option<&[u8]>],
        truncate_to: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        let start = Instant::now();
        let p = &self.params;
        let kind = p.field;
        let share_len = self.check_shares(shares)?;
        let stride = p.share_stride();
        let blocks = share_len / stride;
        let missing = shares.iter().filter(|s| s.is_none()).count();

        debug!(
            field = %kind,
            k = p.k,
            m = p.m,
            blocks,
            missing,
            truncate_to,
            "recombining shares"
        );

        let decoded: Vec<Vec<u8>> = (0..blocks)
            .into_par_iter()
            .map(|block| {
                let offset = block * stride;
                let codeword = if missing == 0 {
                    let mut received = Vec::with_capacity(p.encode_size);
                    for share in shares.iter().flatten() {
                        kind.extend_elements(&share[offset..offset + stride], &mut received);
                    }
                    self.codec.correct(&received)
                } else {
                    let mut received = Vec::with_capacity(p.encode_size);
                    for share in shares {
                        match share {
                            Some(bytes) => received.extend(
                                kind.bytes_to_elements(&bytes[offset..offset + stride])
                                    .into_iter()
                                    .map(Received::Present),
                            ),
                            None => received
                                .extend(std::iter::repeat(Received::Erased).take(p.symbol_size)),
                        }
                    }
                    self.codec.decode(&received)
                };
                let codeword = codeword.map_err(|source| ErasureError::BlockDecode {
                    block,
                    source: Box::new(source),
                })?;
                Ok(kind.elements_to_bytes(&codeword[..p.input_size]))
            })
            .collect::<Result<_, ErasureError>>()?;

        let mut out = decoded.concat();
        if truncate_to > out.len() {
            return Err(ErasureError::Truncation {
                requested: truncate_to,
                available: out.len(),
            });
        }
        out.truncate(truncate_to);

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            output_len = out.len(),
            "erasure decoding finished"
        );
        Ok(out)
    }

    /// Validate share count and lengths, returning the common share length.
    fn check_shares(&self, shares: &[Option<&[u8]>]) -> Result<usize, ErasureError> {
        let p = &self.params;
        if shares.len() != p.n {
            return Err(ErasureError::ShareCount {
                expected: p.n,
                got: shares.len(),
            });
        }
        let Some(share_len) = shares.iter().flatten().map(|s| s.len()).next() else {
            return Err(ErasureError::ShareCount {
                expected: p.n,
                got: 0,
            });
        };
        let stride = p.share_stride();
        for (index, share) in shares.iter().enumerate() {
            if let Some(share) = share {
                if share.len() != share_len || share.len() % stride != 0 {
                    return Err(ErasureError::ShareLength {
                        index,
                        len: share.len(),
                        expected: share_len - share_len % stride,
                    });
                }
            }
        }
        Ok(share_len)
    }
}

/// Split `input` into `k + 2m` shares over GF(2^8).
pub fn split(input: &[u8], k: usize, m: usize) -> Result<Vec<Vec<u8>>, ErasureError> {
    Sharder::with_field(FieldKind::Gf256, k, m)?.split(input)
}

/// Recombine shares produced by [`split`], truncating to `truncate_to` bytes.
pub fn recombine<S>(
    shares: &[S],
    truncate_to: usize,
    k: usize,
    m: usize,
) -> Result<Vec<u8>, ErasureError>
where
    S: AsRef<[u8]> + Sync,
{
    Sharder::with_field(FieldKind::Gf256, k, m)?.recombine(shares, truncate_to)
}

/// Split a chunk and wrap the shares with the metadata needed to rebuild it.
pub fn encode_chunk(
    data: &[u8],
    field: FieldKind,
    k: usize,
    m: usize,
) -> Result<ShardedChunk, ErasureError> {
    let sharder = Sharder::with_field(field, k, m)?;
    let shares = sharder.split(data)?;
    let meta = ShardMetadata {
        field,
        data_shares: k,
        allowed_failures: m,
        share_len: sharder.params().share_len(data.len()),
        original_len: data.len(),
    };
    Ok(ShardedChunk::new(meta, shares))
}

/// Rebuild a chunk from its metadata and the shares that could be fetched.
///
/// Missing shares (`None`) are replaced with zero-filled placeholders and
/// left to the error-correcting decoder, so at most `allowed_failures` of
/// them can be absent. More than that fails up front with
/// [`ErasureError::TooManyErasures`]; past that point the zero placeholders
/// can decode to a wrong but valid codeword.
pub fn decode_chunk(
    meta: &ShardMetadata,
    shares: Vec<Option<Vec<u8>>>,
) -> Result<Vec<u8>, ErasureError> {
    if shares.len() != meta.total_shares() {
        return Err(ErasureError::ShareCount {
            expected: meta.total_shares(),
            got: shares.len(),
        });
    }
    let missing = shares.iter().filter(|s| s.is_none()).count();
    if missing > meta.allowed_failures {
        return Err(ErasureError::TooManyErasures {
            erasures: missing,
            capacity: meta.allowed_failures,
        });
    }
    if meta.original_len == 0 {
        return Ok(Vec::new());
    }
    let sharder = Sharder::new(meta.params()?)?;
    let filled: Vec<Vec<u8>> = shares
        .into_iter()
        .map(|share| share.unwrap_or_else(|| vec![0u8; meta.share_len]))
        .collect();
    sharder.recombine(&filled, meta.original_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);
        data
    }

    #[test]
    fn round_trip_varied_lengths() {
        let sharder = Sharder::with_field(FieldKind::Gf256, 10, 3).expect("sharder");
        let p = *sharder.params();
        for len in [
            0,
            1,
            p.symbol_size - 1,
            p.symbol_size,
            p.block_bytes() - 1,
            p.block_bytes(),
            p.block_bytes() + 1,
            10_000,
        ] {
            let data = random_bytes(len as u64, len);
            let shares = sharder.split(&data).expect("split");
            assert_eq!(shares.len(), p.n);
            for share in &shares {
                assert_eq!(share.len(), p.share_len(len));
            }
            let recovered = sharder.recombine(&shares, len).expect("recombine");
            assert_eq!(recovered, data, "len={len}");
        }
    }

    #[test]
    fn data_shares_hold_the_plain_chunk() {
        // systematic code: the first k shares of a single block are the input
        let data: Vec<u8> = (1..=160).map(|b| b as u8).collect();
        let shares = split(&data, 40, 10).expect("split");
        let joined: Vec<u8> = shares[..40].concat();
        assert_eq!(joined, data);
    }

    #[test]
    fn split_is_deterministic() {
        let data = random_bytes(11, 4096);
        let a = split(&data, 6, 2).expect("split");
        let b = split(&data, 6, 2).expect("split");
        assert_eq!(a, b);
    }

    #[test]
    fn survives_m_zeroed_shares() {
        let (k, m) = (6, 2);
        let data = random_bytes(12, 5000);
        let mut shares = split(&data, k, m).expect("split");

        let mut rng = StdRng::seed_from_u64(12);
        let mut indices: Vec<usize> = (0..shares.len()).collect();
        indices.shuffle(&mut rng);
        for &idx in indices.iter().take(m) {
            shares[idx] = vec![0u8; shares[idx].len()];
        }

        let recovered = recombine(&shares, data.len(), k, m).expect("recombine");
        assert_eq!(recovered, data);
    }

    #[test]
    fn reports_failure_past_m_zeroed_shares() {
        let (k, m) = (4, 2);
        let data = random_bytes(13, 3000);
        let mut shares = split(&data, k, m).expect("split");
        for share in shares.iter_mut().take(m + 1) {
            share.iter_mut().for_each(|b| *b = 0);
        }

        let err = recombine(&shares, data.len(), k, m).expect_err("must fail");
        assert!(matches!(err, ErasureError::BlockDecode { .. }));
        assert!(matches!(
            err.root_cause(),
            ErasureError::TooManyErrors { .. } | ErasureError::ErrorLocationMismatch { .. }
        ));
    }

    #[test]
    fn erasure_aware_recombine_tolerates_2m_missing() {
        let (k, m) = (5, 2);
        let sharder = Sharder::with_field(FieldKind::Gf256, k, m).expect("sharder");
        let data = random_bytes(14, 2500);
        let shares = sharder.split(&data).expect("split");

        let mut slots: Vec<Option<&[u8]>> = shares.iter().map(|s| Some(s.as_slice())).collect();
        for slot in slots.iter_mut().take(2 * m) {
            *slot = None;
        }
        let recovered = sharder
            .recombine_with_erasures(&slots, data.len())
            .expect("recombine");
        assert_eq!(recovered, data);

        slots[2 * m] = None;
        let err = sharder
            .recombine_with_erasures(&slots, data.len())
            .expect_err("too many missing");
        assert!(matches!(
            err.root_cause(),
            ErasureError::TooManyErasures { .. }
        ));
    }

    #[test]
    fn erasure_aware_recombine_mixes_missing_and_corrupted() {
        let (k, m) = (5, 2);
        let sharder = Sharder::with_field(FieldKind::Gf256, k, m).expect("sharder");
        let data = random_bytes(15, 2500);
        let mut shares = sharder.split(&data).expect("split");
        // one corrupted share + two missing ones: 2 * 1 + 2 <= 2m
        shares[7].iter_mut().for_each(|b| *b ^= 0x5a);

        let mut slots: Vec<Option<&[u8]>> = shares.iter().map(|s| Some(s.as_slice())).collect();
        slots[0] = None;
        slots[3] = None;
        let recovered = sharder
            .recombine_with_erasures(&slots, data.len())
            .expect("recombine");
        assert_eq!(recovered, data);
    }

    #[test]
    fn small_chunk_below_one_block() {
        let data = b"abc".to_vec();
        let shares = split(&data, 40, 10).expect("split");
        assert!(shares.iter().all(|s| s.len() == 4));
        assert_eq!(recombine(&shares, 3, 40, 10).expect("recombine"), data);
    }

    #[test]
    fn wide_field_round_trip_with_corruption() {
        // many shares keep the GF(2^16) parity budget small enough to test
        let (k, m) = (1000, 1);
        let sharder = Sharder::with_field(FieldKind::Gf65536, k, m).expect("sharder");
        let p = *sharder.params();
        assert_eq!(p.n, 1002);
        assert_eq!(p.symbol_size, 65);

        let data = random_bytes(16, p.block_bytes() + 777);
        let mut shares = sharder.split(&data).expect("split");
        assert!(shares.iter().all(|s| s.len() == 2 * p.share_stride()));

        shares[123].iter_mut().for_each(|b| *b = 0);
        let recovered = sharder.recombine(&shares, data.len()).expect("recombine");
        assert_eq!(recovered, data);
    }

    #[test]
    fn rejects_wrong_share_count_and_length() {
        let sharder = Sharder::with_field(FieldKind::Gf256, 4, 1).expect("sharder");
        let data = random_bytes(17, 700);
        let mut shares = sharder.split(&data).expect("split");

        assert_eq!(
            sharder.recombine(&shares[..5], data.len()),
            Err(ErasureError::ShareCount {
                expected: 6,
                got: 5
            })
        );

        shares[2].pop();
        assert!(matches!(
            sharder.recombine(&shares, data.len()),
            Err(ErasureError::ShareLength { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_truncation_past_decoded_data() {
        let sharder = Sharder::with_field(FieldKind::Gf256, 4, 1).expect("sharder");
        let data = random_bytes(18, 10);
        let shares = sharder.split(&data).expect("split");
        let available = sharder.params().block_bytes();
        assert_eq!(
            sharder.recombine(&shares, available + 1),
            Err(ErasureError::Truncation {
                requested: available + 1,
                available
            })
        );
    }

    #[test]
    fn sharded_chunk_round_trip_with_missing_share() {
        let data = random_bytes(19, 1234);
        let chunk = encode_chunk(&data, FieldKind::Gf256, 4, 2).expect("encode");
        assert_eq!(chunk.meta.total_shares(), 8);
        assert_eq!(chunk.meta.original_len, 1234);

        let json = serde_json::to_string(&chunk.meta).expect("json");
        let meta: ShardMetadata = serde_json::from_str(&json).expect("parse");

        let mut shares: Vec<Option<Vec<u8>>> = chunk.shares.into_iter().map(Some).collect();
        shares[1] = None;
        shares[6] = None;
        assert_eq!(decode_chunk(&meta, shares).expect("decode"), data);
    }

    #[test]
    fn decode_chunk_rejects_more_missing_than_allowed() {
        let (k, m) = (4, 2);
        let data = random_bytes(20, 1000);
        let chunk = encode_chunk(&data, FieldKind::Gf256, k, m).expect("encode");

        let mut shares: Vec<Option<Vec<u8>>> = chunk.shares.iter().cloned().map(Some).collect();
        for share in shares.iter_mut().take(m + 1) {
            *share = None;
        }
        assert_eq!(
            decode_chunk(&chunk.meta, shares),
            Err(ErasureError::TooManyErasures {
                erasures: m + 1,
                capacity: m
            })
        );

        // only k - 2 shares left: zero fill would decode to the all-zero chunk
        let mut shares: Vec<Option<Vec<u8>>> = chunk.shares.iter().cloned().map(Some).collect();
        for share in shares.iter_mut().skip(2) {
            *share = None;
        }
        assert!(matches!(
            decode_chunk(&chunk.meta, shares),
            Err(ErasureError::TooManyErasures { erasures: 6, .. })
        ));

        let none = vec![None; chunk.meta.total_shares()];
        assert!(matches!(
            decode_chunk(&chunk.meta, none),
            Err(ErasureError::TooManyErasures { erasures: 8, .. })
        ));
    }

    #[test]
    fn empty_chunk_round_trips_through_metadata() {
        let chunk = encode_chunk(&[], FieldKind::Gf256, 3, 1).expect("encode");
        assert!(chunk.shares.iter().all(Vec::is_empty));
        let shares = chunk.shares.into_iter().map(Some).collect();
        assert_eq!(decode_chunk(&chunk.meta, shares).expect("decode"), Vec::<u8>::new());
    }
}
