//! Table driven arithmetic over GF(2^8) and GF(2^16).
//!
//! Each field is built once from a fixed primitive polynomial into a pair of
//! lookup tables: `exp[i] = α^i` and `log[α^i] = i`. The `exp` table is
//! doubled (`2 * size - 2` entries) so that a sum of two discrete logs can
//! index it directly without reducing modulo the group order.
//!
//! Addition in characteristic 2 is XOR, so only multiplication and division
//! go through the tables.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ErasureError;

/// The two supported field widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// GF(2^8), one element per byte.
    Gf256,
    /// GF(2^16), one element per two bytes (low byte first).
    Gf65536,
}

impl FieldKind {
    pub fn bits(self) -> u32 {
        match self {
            FieldKind::Gf256 => 8,
            FieldKind::Gf65536 => 16,
        }
    }

    /// Number of elements in the field.
    pub fn size(self) -> usize {
        1 << self.bits()
    }

    /// Primitive polynomial used to generate the field, including the
    /// leading `x^bits` term.
    pub fn primitive_polynomial(self) -> u32 {
        match self {
            FieldKind::Gf256 => 0x11D,
            FieldKind::Gf65536 => 0x1100B,
        }
    }

    pub fn bytes_per_element(self) -> usize {
        match self {
            FieldKind::Gf256 => 1,
            FieldKind::Gf65536 => 2,
        }
    }

    /// Shared, lazily built table instance for this field.
    pub fn field(self) -> Result<&'static GaloisField, ErasureError> {
        GaloisField::shared(self)
    }

    /// Unpack a byte stream into field elements.
    ///
    /// GF(2^16) consumes two bytes per element, the first byte being the
    /// low-order half. A trailing odd byte is zero-extended.
    pub fn bytes_to_elements(self, bytes: &[u8]) -> Vec<u16> {
        let mut out = Vec::with_capacity(bytes.len().div_ceil(self.bytes_per_element()));
        self.extend_elements(bytes, &mut out);
        out
    }

    pub(crate) fn extend_elements(self, bytes: &[u8], out: &mut Vec<u16>) {
        match self {
            FieldKind::Gf256 => out.extend(bytes.iter().map(|&b| u16::from(b))),
            FieldKind::Gf65536 => out.extend(
                bytes
                    .chunks(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)])),
            ),
        }
    }

    /// Pack field elements back into bytes, the inverse of
    /// [`FieldKind::bytes_to_elements`].
    pub fn elements_to_bytes(self, elements: &[u16]) -> Vec<u8> {
        let mut out = Vec::with_capacity(elements.len() * self.bytes_per_element());
        self.extend_bytes(elements, &mut out);
        out
    }

    pub(crate) fn extend_bytes(self, elements: &[u16], out: &mut Vec<u8>) {
        match self {
            FieldKind::Gf256 => out.extend(elements.iter().map(|&e| e as u8)),
            FieldKind::Gf65536 => {
                for &e in elements {
                    out.extend_from_slice(&e.to_le_bytes());
                }
            }
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GF({})", self.size())
    }
}

impl std::str::FromStr for FieldKind {
    type Err = ErasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gf256" | "256" | "8" => Ok(FieldKind::Gf256),
            "gf65536" | "65536" | "16" => Ok(FieldKind::Gf65536),
            other => Err(ErasureError::Configuration(format!(
                "unknown galois field {other:?} (expected gf256 or gf65536)"
            ))),
        }
    }
}

/// Exponential/logarithm tables for one field instance.
///
/// Immutable after construction and safe to share between threads.
#[derive(Clone)]
pub struct GaloisField {
    kind: FieldKind,
    exp: Vec<u16>,
    log: Vec<u16>,
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaloisField")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

static GF256: OnceLock<Result<GaloisField, ErasureError>> = OnceLock::new();
static GF65536: OnceLock<Result<GaloisField, ErasureError>> = OnceLock::new();

impl GaloisField {
    /// Build the tables for `kind` and check that they are mutual inverses.
    pub fn new(kind: FieldKind) -> Result<Self, ErasureError> {
        let size = kind.size();
        let order = size - 1;
        let prim = kind.primitive_polynomial();

        let mut exp = vec![0u16; 2 * size - 2];
        let mut log = vec![0u16; size];

        let mut x: u32 = 1;
        for i in 0..order {
            exp[i] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x & size as u32 != 0 {
                x ^= prim;
            }
        }
        for i in order..exp.len() {
            exp[i] = exp[i - order];
        }

        let field = Self { kind, exp, log };
        field.verify_tables()?;
        Ok(field)
    }

    /// Process-wide instance for `kind`, built on first use.
    pub fn shared(kind: FieldKind) -> Result<&'static GaloisField, ErasureError> {
        let cell = match kind {
            FieldKind::Gf256 => &GF256,
            FieldKind::Gf65536 => &GF65536,
        };
        cell.get_or_init(|| GaloisField::new(kind))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Shared GF(2^8) instance.
    pub fn gf256() -> Result<&'static GaloisField, ErasureError> {
        Self::shared(FieldKind::Gf256)
    }

    /// Shared GF(2^16) instance.
    pub fn gf65536() -> Result<&'static GaloisField, ErasureError> {
        Self::shared(FieldKind::Gf65536)
    }

    fn verify_tables(&self) -> Result<(), ErasureError> {
        if self.exp[0] != 1 {
            return Err(ErasureError::Configuration(format!(
                "{}: exp[0] must be 1",
                self.kind
            )));
        }
        for x in 1..self.size() {
            if self.exp[self.log[x] as usize] as usize != x {
                return Err(ErasureError::Configuration(format!(
                    "{}: primitive polynomial {:#x} does not generate element {x}",
                    self.kind,
                    self.kind.primitive_polynomial()
                )));
            }
        }
        for i in 0..self.size() - 1 {
            if self.log[self.exp[i] as usize] as usize != i {
                return Err(ErasureError::Configuration(format!(
                    "{}: log/exp tables disagree at {i}",
                    self.kind
                )));
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.kind.size()
    }

    /// Order of the multiplicative group, `size - 1`.
    pub fn order(&self) -> usize {
        self.size() - 1
    }

    /// `α^i`, for any non-negative exponent.
    #[inline]
    pub fn exp(&self, i: usize) -> u16 {
        if i < self.exp.len() {
            self.exp[i]
        } else {
            self.exp[i % self.order()]
        }
    }

    /// Discrete logarithm of a non-zero element.
    pub fn log(&self, x: u16) -> Result<u16, ErasureError> {
        if x == 0 {
            return Err(ErasureError::DivideByZero);
        }
        if !self.contains(x) {
            return Err(ErasureError::Configuration(format!(
                "{x} is not an element of {}",
                self.kind
            )));
        }
        Ok(self.log[x as usize])
    }

    /// Bit mask covering every element, `size - 1`.
    pub fn mask(&self) -> u16 {
        self.order() as u16
    }

    /// Field addition (and subtraction).
    #[inline]
    pub fn add(&self, x: u16, y: u16) -> u16 {
        x ^ y
    }

    #[inline]
    pub fn mul(&self, x: u16, y: u16) -> u16 {
        if x == 0 || y == 0 {
            return 0;
        }
        self.exp[self.log[x as usize] as usize + self.log[y as usize] as usize]
    }

    #[inline]
    pub fn div(&self, x: u16, y: u16) -> Result<u16, ErasureError> {
        if y == 0 {
            return Err(ErasureError::DivideByZero);
        }
        if x == 0 {
            return Ok(0);
        }
        Ok(self.exp[self.log[x as usize] as usize + self.order() - self.log[y as usize] as usize])
    }

    pub fn inverse(&self, x: u16) -> Result<u16, ErasureError> {
        self.div(1, x)
    }

    /// Whether `x` is a member of this field.
    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        (x as usize) < self.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gf256() -> &'static GaloisField {
        GaloisField::shared(FieldKind::Gf256).expect("gf256")
    }

    fn gf65536() -> &'static GaloisField {
        GaloisField::shared(FieldKind::Gf65536).expect("gf65536")
    }

    #[test]
    fn tables_are_mutually_inverse() {
        for f in [gf256(), gf65536()] {
            assert_eq!(f.exp(0), 1);
            for x in 1..f.size() {
                assert_eq!(f.exp(f.log[x] as usize) as usize, x);
            }
            assert_eq!(f.exp.len(), 2 * f.size() - 2);
        }
    }

    #[test]
    fn known_gf256_values() {
        let f = gf256();
        assert_eq!(f.exp(1), 2);
        // α^8 reduces by 0x11D to x^4 + x^3 + x^2 + 1.
        assert_eq!(f.exp(8), 0x1D);
        assert_eq!(f.mul(0x80, 2), 0x1D);
        assert_eq!(f.exp(255), 1);
        assert_eq!(f.exp(600), f.exp(600 % 255));
    }

    #[test]
    fn gf256_multiplication_is_commutative_and_invertible() {
        let f = gf256();
        for x in 0..256u16 {
            assert_eq!(f.mul(x, 0), 0);
            assert_eq!(f.mul(0, x), 0);
            assert_eq!(f.mul(x, 1), x);
            for y in 0..256u16 {
                assert_eq!(f.mul(x, y), f.mul(y, x));
                if y != 0 {
                    let q = f.div(x, y).expect("div");
                    assert_eq!(f.mul(q, y), x);
                }
            }
        }
    }

    #[test]
    fn gf65536_sampled_identities() {
        let f = gf65536();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20_000 {
            let x: u16 = rng.gen();
            let y: u16 = rng.gen();
            let z: u16 = rng.gen();
            assert_eq!(f.mul(x, y), f.mul(y, x));
            // distributivity over XOR
            assert_eq!(f.mul(x, y ^ z), f.mul(x, y) ^ f.mul(x, z));
            if y != 0 {
                assert_eq!(f.mul(f.div(x, y).expect("div"), y), x);
            }
        }
    }

    #[test]
    fn division_by_zero_fails() {
        for f in [gf256(), gf65536()] {
            assert_eq!(f.div(5, 0), Err(ErasureError::DivideByZero));
            assert_eq!(f.div(0, 0), Err(ErasureError::DivideByZero));
            assert_eq!(f.inverse(0), Err(ErasureError::DivideByZero));
            assert_eq!(f.div(0, 9), Ok(0));
        }
    }

    #[test]
    fn inverse_round_trips() {
        let f = gf256();
        for x in 1..256u16 {
            let inv = f.inverse(x).expect("inverse");
            assert_eq!(f.mul(x, inv), 1);
        }
    }

    #[test]
    fn shared_instances_are_reused() {
        let a = GaloisField::shared(FieldKind::Gf256).expect("gf256");
        let b = FieldKind::Gf256.field().expect("gf256");
        assert!(std::ptr::eq(a, b));
        assert!(std::ptr::eq(gf65536(), GaloisField::gf65536().expect("gf65536")));
    }

    #[test]
    fn debug_omits_tables() {
        let out = format!("{:?}", gf65536());
        assert_eq!(out, "GaloisField { kind: Gf65536, .. }");
    }

    #[test]
    fn log_and_mask() {
        let f = gf256();
        assert_eq!(f.log(1), Ok(0));
        assert_eq!(f.log(2), Ok(1));
        assert_eq!(f.log(0x1D), Ok(8));
        assert_eq!(f.log(0), Err(ErasureError::DivideByZero));
        assert!(f.log(256).is_err());
        assert_eq!(f.mask(), 0xFF);
        assert_eq!(gf65536().mask(), 0xFFFF);
    }

    #[test]
    fn gf65536_packs_low_byte_first() {
        let kind = FieldKind::Gf65536;
        assert_eq!(kind.bytes_to_elements(&[0x34, 0x12, 0xff]), vec![0x1234, 0x00ff]);
        assert_eq!(kind.elements_to_bytes(&[0x1234, 0x00ff]), vec![0x34, 0x12, 0xff, 0x00]);
    }

    #[test]
    fn gf256_packs_one_byte_per_element() {
        let kind = FieldKind::Gf256;
        let bytes = [0u8, 1, 127, 255];
        let elements = kind.bytes_to_elements(&bytes);
        assert_eq!(elements, vec![0, 1, 127, 255]);
        assert_eq!(kind.elements_to_bytes(&elements), bytes);
    }

    #[test]
    fn parses_field_names() {
        assert_eq!("gf256".parse::<FieldKind>(), Ok(FieldKind::Gf256));
        assert_eq!("GF65536".parse::<FieldKind>(), Ok(FieldKind::Gf65536));
        assert!("gf16".parse::<FieldKind>().is_err());
    }
}
