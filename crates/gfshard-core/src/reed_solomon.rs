//! Systematic Reed-Solomon codec operating on one codeword at a time.
//!
//! A codeword of length `n` is `k` data symbols followed by `n_ec` parity
//! symbols, read as a polynomial with position 0 as the highest-degree
//! coefficient. Position `p` therefore has error locator `α^(n-1-p)`.
//!
//! Decoding handles both erasures (known positions, [`Received::Erased`])
//! and errors (unknown positions) as long as
//! `2 * errors + erasures <= n_ec`:
//!
//! 1. syndromes `S_i = r(α^i)`; all zero means nothing to do,
//! 2. Forney syndromes factor out the erasure locators,
//! 3. Berlekamp-Massey over the Forney syndromes yields the error locator,
//! 4. Chien search turns the locator into positions,
//! 5. Forney's algorithm computes the magnitude at every erasure and error.

use tracing::trace;

use crate::error::ErasureError;
use crate::field::GaloisField;
use crate::polynomial::Polynomial;

/// One symbol of a received codeword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    Present(u16),
    /// Value unknown, position known.
    Erased,
}

impl From<u16> for Received {
    fn from(value: u16) -> Self {
        Received::Present(value)
    }
}

impl From<Option<u16>> for Received {
    fn from(value: Option<u16>) -> Self {
        value.map_or(Received::Erased, Received::Present)
    }
}

/// Encoder/decoder for a fixed number of parity symbols.
#[derive(Clone, Debug)]
pub struct ReedSolomon {
    field: &'static GaloisField,
    n_ec: usize,
    generator: Polynomial<'static>,
}

impl ReedSolomon {
    /// Create a codec producing `n_ec` parity symbols per codeword.
    pub fn new(field: &'static GaloisField, n_ec: usize) -> Result<Self, ErasureError> {
        if n_ec == 0 || n_ec >= field.order() {
            return Err(ErasureError::Configuration(format!(
                "parity symbol count {n_ec} must be in 1..{} for {}",
                field.order(),
                field.kind()
            )));
        }
        Ok(Self {
            field,
            n_ec,
            generator: Polynomial::generator(field, n_ec),
        })
    }

    pub fn field(&self) -> &'static GaloisField {
        self.field
    }

    /// Number of parity symbols appended to every codeword.
    pub fn parity_len(&self) -> usize {
        self.n_ec
    }

    pub fn generator(&self) -> &Polynomial<'static> {
        &self.generator
    }

    /// Systematically encode `data`, returning `data ++ parity`.
    pub fn encode(&self, data: &[u16]) -> Result<Vec<u16>, ErasureError> {
        self.check_length(data.len() + self.n_ec)?;
        self.check_elements(data)?;

        let f = self.field;
        let k = data.len();
        let gen = self.generator.coefficients();

        let mut res = vec![0u16; k + self.n_ec];
        res[..k].copy_from_slice(data);
        for i in 0..k {
            let c = res[i];
            if c != 0 {
                for (j, &g) in gen.iter().enumerate() {
                    res[i + j] ^= f.mul(g, c);
                }
            }
        }
        // the division clobbered the message; restore it in front of the
        // remainder
        res[..k].copy_from_slice(data);
        Ok(res)
    }

    /// Evaluate `codeword` at each generator root `α^0 .. α^(n_ec-1)`.
    pub fn syndromes(&self, codeword: &[u16]) -> Vec<u16> {
        if codeword.is_empty() {
            return vec![0; self.n_ec];
        }
        let poly = Polynomial::from_vec(self.field, codeword.to_vec());
        (0..self.n_ec).map(|i| poly.eval(self.field.exp(i))).collect()
    }

    /// Whether `codeword` is a valid codeword (all syndromes zero).
    pub fn is_codeword(&self, codeword: &[u16]) -> bool {
        self.syndromes(codeword).iter().all(|&s| s == 0)
    }

    /// Decode a received codeword that may contain erasures and errors.
    pub fn decode(&self, received: &[Received]) -> Result<Vec<u16>, ErasureError> {
        self.check_length(received.len())?;

        let mut message = Vec::with_capacity(received.len());
        let mut erasures = Vec::new();
        for (pos, symbol) in received.iter().enumerate() {
            match *symbol {
                Received::Present(value) => {
                    self.check_element(value)?;
                    message.push(value);
                }
                Received::Erased => {
                    message.push(0);
                    erasures.push(pos);
                }
            }
        }
        self.decode_inner(message, erasures)
    }

    /// Decode a received codeword with no known erasures.
    pub fn correct(&self, received: &[u16]) -> Result<Vec<u16>, ErasureError> {
        self.check_length(received.len())?;
        self.check_elements(received)?;
        self.decode_inner(received.to_vec(), Vec::new())
    }

    fn decode_inner(
        &self,
        mut message: Vec<u16>,
        erasures: Vec<usize>,
    ) -> Result<Vec<u16>, ErasureError> {
        if erasures.len() > self.n_ec {
            return Err(ErasureError::TooManyErasures {
                erasures: erasures.len(),
                capacity: self.n_ec,
            });
        }

        let synd = self.syndromes(&message);
        if synd.iter().all(|&s| s == 0) {
            return Ok(message);
        }

        let n = message.len();
        let forney = self.forney_syndromes(&synd, &erasures, n);
        let errors = self.find_errors(&forney, n)?;
        // a locator root on an erased position means the corruption is not
        // what the locator assumed
        let fresh = errors.iter().filter(|&p| !erasures.contains(p)).count();
        if fresh != errors.len() {
            return Err(ErasureError::ErrorLocationMismatch {
                found: fresh,
                expected: errors.len(),
            });
        }

        trace!(
            erasures = erasures.len(),
            errors = errors.len(),
            "correcting codeword"
        );

        let mut positions = erasures;
        positions.extend_from_slice(&errors);
        self.correct_errata(&mut message, &synd, &positions)?;
        Ok(message)
    }

    /// Strip the known erasure locators out of the syndromes, one trailing
    /// element per erasure, leaving `n_ec - erasures` syndromes that only
    /// see the unknown errors.
    fn forney_syndromes(&self, synd: &[u16], erasures: &[usize], n: usize) -> Vec<u16> {
        let f = self.field;
        let mut fsynd = synd.to_vec();
        for &pos in erasures {
            let x = f.exp(n - 1 - pos);
            for j in 0..fsynd.len().saturating_sub(1) {
                fsynd[j] = f.mul(fsynd[j], x) ^ fsynd[j + 1];
            }
            fsynd.pop();
        }
        fsynd
    }

    /// Berlekamp-Massey followed by a Chien search over all `n` positions.
    fn find_errors(&self, synd: &[u16], n: usize) -> Result<Vec<usize>, ErasureError> {
        let f = self.field;
        let mut err_poly = Polynomial::one(f);
        let mut old_poly = Polynomial::one(f);

        for i in 0..synd.len() {
            old_poly = old_poly.append(0);
            let coeffs = err_poly.coefficients();
            let mut delta = synd[i];
            for j in 1..coeffs.len() {
                delta ^= f.mul(coeffs[coeffs.len() - 1 - j], synd[i - j]);
            }
            if delta != 0 {
                if old_poly.order() > err_poly.order() {
                    let new_poly = old_poly.scale(delta);
                    old_poly = err_poly.scale(f.inverse(delta)?);
                    err_poly = new_poly;
                }
                err_poly = err_poly.add(&old_poly.scale(delta));
            }
        }

        let errs = err_poly.degree();
        if 2 * errs > synd.len() {
            return Err(ErasureError::TooManyErrors {
                errors: errs,
                capacity: synd.len() / 2,
            });
        }

        let positions: Vec<usize> = (0..n)
            .filter(|&i| err_poly.eval(f.exp(f.order() - i)) == 0)
            .map(|i| n - 1 - i)
            .collect();
        if positions.len() != errs {
            return Err(ErasureError::ErrorLocationMismatch {
                found: positions.len(),
                expected: errs,
            });
        }
        Ok(positions)
    }

    /// Forney's algorithm over the combined erasure and error positions.
    fn correct_errata(
        &self,
        message: &mut [u16],
        synd: &[u16],
        positions: &[usize],
    ) -> Result<(), ErasureError> {
        if positions.is_empty() {
            return Ok(());
        }
        let f = self.field;
        let n = message.len();

        let locator = positions.iter().fold(Polynomial::one(f), |q, &p| {
            q.mul(&Polynomial::from_vec(f, vec![f.exp(n - 1 - p), 1]))
        });

        let reversed: Vec<u16> = synd[..positions.len()].iter().rev().copied().collect();
        let evaluator = Polynomial::from_vec(f, reversed)
            .mul(&locator)
            .low_terms(positions.len());
        let derivative = locator.odd_degree_terms();

        let mut magnitudes = Vec::with_capacity(positions.len());
        for &p in positions {
            // inverse of the locator α^(n-1-p)
            let x = f.exp(f.order() - (n - 1 - p));
            let denominator = f.mul(x, derivative.eval(f.mul(x, x)));
            // a vanishing derivative means a repeated locator root: the
            // corruption does not match the located positions
            if denominator == 0 {
                continue;
            }
            magnitudes.push((p, f.div(evaluator.eval(x), denominator)?));
        }
        if magnitudes.len() != positions.len() {
            return Err(ErasureError::ErrorLocationMismatch {
                found: magnitudes.len(),
                expected: positions.len(),
            });
        }
        for (p, magnitude) in magnitudes {
            message[p] ^= magnitude;
        }
        Ok(())
    }

    fn check_length(&self, len: usize) -> Result<(), ErasureError> {
        let (min, max) = (self.n_ec + 1, self.field.order());
        if len < min || len > max {
            return Err(ErasureError::CodewordLength { len, min, max });
        }
        Ok(())
    }

    fn check_element(&self, value: u16) -> Result<(), ErasureError> {
        if !self.field.contains(value) {
            return Err(ErasureError::Configuration(format!(
                "symbol {value} is not an element of {}",
                self.field.kind()
            )));
        }
        Ok(())
    }

    fn check_elements(&self, values: &[u16]) -> Result<(), ErasureError> {
        values.iter().try_for_each(|&v| self.check_element(v))
    }
}
