//! Reed-Solomon durability layer for encrypted chunks.
//!
//! A chunk is split into `n = k + 2m` equal length shares so that it can be
//! rebuilt even when `m` of them come back corrupted or missing. The crate is
//! layered bottom-up:
//!
//! * [`field`]: table driven arithmetic over GF(2^8) and GF(2^16).
//! * [`polynomial`]: polynomials over those fields, highest degree first.
//! * [`reed_solomon`]: systematic encoding and erasure/error decoding of a
//!   single codeword (Berlekamp-Massey, Chien search, Forney).
//! * [`params`]: block geometry derived from `(field, k, m)`.
//! * [`erasure`]: splitting a chunk into shares and recombining them.
//!
//! ```
//! use gfshard_core::{recombine, split};
//!
//! let chunk = b"hello, durable world".to_vec();
//! let mut shares = split(&chunk, 4, 1).unwrap();
//! shares[2].iter_mut().for_each(|b| *b = 0);
//! assert_eq!(recombine(&shares, chunk.len(), 4, 1).unwrap(), chunk);
//! ```

pub mod erasure;
pub mod field;
pub mod params;
pub mod polynomial;
pub mod reed_solomon;

mod error;

pub use erasure::{
    decode_chunk, encode_chunk, recombine, split, ShardMetadata, ShardedChunk, Sharder,
};
pub use error::ErasureError;
pub use field::{FieldKind, GaloisField};
pub use params::ShardParams;
pub use polynomial::Polynomial;
pub use reed_solomon::{Received, ReedSolomon};
