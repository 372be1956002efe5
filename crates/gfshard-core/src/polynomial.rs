//! Polynomials with coefficients in a [`GaloisField`].
//!
//! Coefficients are stored most-significant first: index 0 holds the
//! highest-degree term and the last index the constant term. The number of
//! coefficients is the polynomial's *order*. Every operation returns a new
//! polynomial; none mutate their receiver.

use crate::error::ErasureError;
use crate::field::GaloisField;

#[derive(Clone, Debug)]
pub struct Polynomial<'f> {
    coefficients: Vec<u16>,
    field: &'f GaloisField,
}

impl<'f> Polynomial<'f> {
    /// Build a polynomial from coefficients, highest degree first.
    ///
    /// The order must be between 1 and the field size.
    pub fn new(field: &'f GaloisField, coefficients: Vec<u16>) -> Result<Self, ErasureError> {
        if coefficients.is_empty() || coefficients.len() > field.size() {
            return Err(ErasureError::PolynomialOrder {
                order: coefficients.len(),
                field_size: field.size(),
            });
        }
        Ok(Self::from_vec(field, coefficients))
    }

    /// Unchecked constructor for intermediates produced inside the codec.
    pub(crate) fn from_vec(field: &'f GaloisField, coefficients: Vec<u16>) -> Self {
        debug_assert!(!coefficients.is_empty());
        Self {
            coefficients,
            field,
        }
    }

    /// The constant polynomial `1`.
    pub fn one(field: &'f GaloisField) -> Self {
        Self::from_vec(field, vec![1])
    }

    /// `∏ (x - α^i)` for `i` in `0..n_ec`: the generator of a code with
    /// `n_ec` parity symbols.
    pub fn generator(field: &'f GaloisField, n_ec: usize) -> Self {
        (0..n_ec).fold(Self::one(field), |g, i| {
            g.mul(&Self::from_vec(field, vec![1, field.exp(i)]))
        })
    }

    pub fn order(&self) -> usize {
        self.coefficients.len()
    }

    pub fn degree(&self) -> usize {
        self.order() - 1
    }

    pub fn coefficients(&self) -> &[u16] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<u16> {
        self.coefficients
    }

    pub fn field(&self) -> &'f GaloisField {
        self.field
    }

    /// Horner evaluation at `x`.
    pub fn eval(&self, x: u16) -> u16 {
        let f = self.field;
        self.coefficients[1..]
            .iter()
            .fold(self.coefficients[0], |acc, &c| f.mul(acc, x) ^ c)
    }

    pub fn scale(&self, x: u16) -> Self {
        let f = self.field;
        let coefficients = self.coefficients.iter().map(|&c| f.mul(c, x)).collect();
        Self::from_vec(f, coefficients)
    }

    /// Sum of two polynomials, aligned at the constant term.
    pub fn add(&self, other: &Self) -> Self {
        let len = self.order().max(other.order());
        let mut res = vec![0u16; len];
        for (dst, &c) in res[len - self.order()..].iter_mut().zip(&self.coefficients) {
            *dst = c;
        }
        for (dst, &c) in res[len - other.order()..].iter_mut().zip(&other.coefficients) {
            *dst ^= c;
        }
        Self::from_vec(self.field, res)
    }

    /// Product of two polynomials, of order `self.order() + other.order() - 1`.
    pub fn mul(&self, other: &Self) -> Self {
        let f = self.field;
        let mut res = vec![0u16; self.order() + other.order() - 1];
        for (i, &a) in self.coefficients.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in other.coefficients.iter().enumerate() {
                res[i + j] ^= f.mul(a, b);
            }
        }
        Self::from_vec(f, res)
    }

    /// Copy with `x` appended as the new constant term, i.e. `p(X)·X + x`.
    pub fn append(&self, x: u16) -> Self {
        let mut res = Vec::with_capacity(self.order() + 1);
        res.extend_from_slice(&self.coefficients);
        res.push(x);
        Self::from_vec(self.field, res)
    }

    /// The lowest `len` coefficients, i.e. the polynomial reduced modulo
    /// `X^len`.
    pub(crate) fn low_terms(&self, len: usize) -> Self {
        let start = self.order().saturating_sub(len);
        Self::from_vec(self.field, self.coefficients[start..].to_vec())
    }

    /// The odd-degree terms, compacted so that evaluating the result at
    /// `x²` and multiplying by `x` gives the formal derivative at `x`
    /// (characteristic 2 drops every even-degree term).
    pub(crate) fn odd_degree_terms(&self) -> Self {
        let start = self.order() & 1;
        let odd: Vec<u16> = self.coefficients[start..].iter().step_by(2).copied().collect();
        if odd.is_empty() {
            return Self::from_vec(self.field, vec![0]);
        }
        Self::from_vec(self.field, odd)
    }
}

impl PartialEq for Polynomial<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.field.kind() == other.field.kind() && self.coefficients == other.coefficients
    }
}

impl Eq for Polynomial<'_> {}
