//! Fast summation of 2-D polynomials `Σ wᵢ x^aᵢ y^bᵢ` over a [Grid](crate::grid::Grid).
//!
//! A monomial `x^a y^b` is identified by its power pair `(a, b)` or, equivalently, by its
//! [Cantor index](cantor_pairing). Summation keeps a single running monomial per pixel and
//! extends it by multiplication only, so the terms are visited along *paths* on which both
//! powers never decrease. [term_pathing] arranges the terms to minimise the number of such
//! multiplications.

use std::borrow::Cow;

use thiserror::Error;

use crate::grid::AsGrid;
use crate::linear::Matrix;

#[derive(Debug, Error, PartialEq)]
pub enum PolynomialError {
    #[error("{weights} weights supplied for {terms} terms")]
    TermCount { weights: usize, terms: usize },

    #[error("output is {actual:?} but the grid is {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid pathing: {0}")]
    InvalidPathing(String),
}

/// Converts a power pair to a unique 1-D index using the
/// [Cantor pairing function](https://en.wikipedia.org/wiki/Pairing_function).
#[inline]
pub fn cantor_pairing(a: u32, b: u32) -> usize {
    let s = a as usize + b as usize;
    s * (s + 1) / 2 + b as usize
}

/// Inverse of [cantor_pairing].
pub fn inverse_cantor_pairing(z: usize) -> (u32, u32) {
    let mut w = ((((8 * z + 1) as f64).sqrt() - 1.0) / 2.0).floor() as usize;
    // correct any floating-point rounding at large indices
    while w * (w + 1) / 2 > z {
        w -= 1;
    }
    while (w + 1) * (w + 2) / 2 <= z {
        w += 1;
    }
    let t = w * (w + 1) / 2;
    let b = z - t;
    let a = w - b;
    (a as u32, b as u32)
}

#[inline]
fn degree(term: (u32, u32)) -> u32 {
    term.0 + term.1
}

#[inline]
fn dominates(next: (u32, u32), prev: (u32, u32)) -> bool {
    next.0 >= prev.0 && next.1 >= prev.1
}

/// Orders `terms` into chains where every term dominates its predecessor in both powers. Each
/// chain starts from the lowest-degree remaining term and is greedily extended by the
/// dominating term of smallest added degree (ties broken by Cantor index).
pub fn term_pathing(terms: &[(u32, u32)]) -> Vec<usize> {
    let key = |index: usize| {
        let term = terms[index];
        (degree(term), cantor_pairing(term.0, term.1))
    };
    let mut order: Vec<_> = (0..terms.len()).collect();
    order.sort_by_key(|&index| key(index));

    let mut used = vec![false; terms.len()];
    let mut path = Vec::with_capacity(terms.len());
    for &start in &order {
        if used[start] {
            continue;
        }
        used[start] = true;
        path.push(start);

        let mut current = start;
        loop {
            let next = order
                .iter()
                .copied()
                .filter(|&index| !used[index] && dominates(terms[index], terms[current]))
                .min_by_key(|&index| {
                    let (next_degree, cantor) = key(index);
                    (next_degree - degree(terms[current]), cantor)
                });
            match next {
                None => break,
                Some(index) => {
                    used[index] = true;
                    path.push(index);
                    current = index;
                }
            }
        }
    }
    path
}

/// Number of per-pixel multiplications needed to build every monomial when `terms` are visited
/// in the order given by `pathing`.
pub fn multiplications(terms: &[(u32, u32)], pathing: &[usize]) -> usize {
    let mut prev = (0, 0);
    let mut count = 0;
    for &index in pathing {
        let term = terms[index];
        if !dominates(term, prev) {
            prev = (0, 0);
        }
        count += (degree(term) - degree(prev)) as usize;
        prev = term;
    }
    count
}

/// How the monomial powers of each weight are specified.
#[derive(Debug, Clone, Copy)]
pub enum Terms<'a> {
    /// Weight `i` belongs to the monomial with Cantor index `i`.
    Implicit,
    Cantor(&'a [usize]),
    Powers(&'a [(u32, u32)]),
}
impl<'a> Terms<'a> {
    fn resolve(&self, len: usize) -> Cow<'a, [(u32, u32)]> {
        match self {
            Terms::Implicit => Cow::Owned((0..len).map(inverse_cantor_pairing).collect()),
            Terms::Cantor(indices) => {
                Cow::Owned(indices.iter().map(|&z| inverse_cantor_pairing(z)).collect())
            }
            Terms::Powers(powers) => Cow::Borrowed(*powers),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Pathing<'a> {
    /// Computed by [term_pathing].
    Optimal,
    /// Terms in the order given.
    Sequential,
    /// A caller-supplied permutation of the term indices.
    Custom(&'a [usize]),
}

/// Sums the polynomial on the grid, returning a freshly allocated matrix.
pub fn polynomial_sum(
    grid: &impl AsGrid,
    weights: &[f64],
    terms: Terms,
) -> Result<Matrix<f64>, PolynomialError> {
    let (rows, cols) = grid.grid().shape();
    let mut out = Matrix::allocate(rows, cols);
    polynomial_sum_into(grid, weights, terms, Pathing::Optimal, &mut out)?;
    Ok(out)
}

/// Sums the polynomial on the grid into `out`, overwriting its contents.
pub fn polynomial_sum_into(
    grid: &impl AsGrid,
    weights: &[f64],
    terms: Terms,
    pathing: Pathing,
    out: &mut Matrix<f64>,
) -> Result<(), PolynomialError> {
    let grid = grid.grid();
    let terms = terms.resolve(weights.len());
    if terms.len() != weights.len() {
        return Err(PolynomialError::TermCount {
            weights: weights.len(),
            terms: terms.len(),
        });
    }
    if out.shape() != grid.shape() {
        return Err(PolynomialError::ShapeMismatch {
            expected: grid.shape(),
            actual: out.shape(),
        });
    }
    let pathing: Cow<[usize]> = match pathing {
        Pathing::Optimal => Cow::Owned(term_pathing(&terms)),
        Pathing::Sequential => Cow::Owned((0..terms.len()).collect()),
        Pathing::Custom(custom) => {
            validate_permutation(custom, terms.len())?;
            Cow::Borrowed(custom)
        }
    };

    let (x, y) = (grid.x().flatten(), grid.y().flatten());
    let out = out.flatten_mut();
    out.fill(0.0);
    let mut monomial = vec![1.0; out.len()];
    let mut prev = (0, 0);
    for &index in pathing.iter() {
        let weight = weights[index];
        if weight == 0.0 {
            continue;
        }
        let term = terms[index];

        // start a new path if the monomial cannot be reached by multiplication
        if !dominates(term, prev) {
            prev = (0, 0);
            monomial.fill(1.0);
        }
        for _ in prev.0..term.0 {
            for (m, &x_value) in monomial.iter_mut().zip(x) {
                *m *= x_value;
            }
        }
        for _ in prev.1..term.1 {
            for (m, &y_value) in monomial.iter_mut().zip(y) {
                *m *= y_value;
            }
        }
        prev = term;

        for (o, &m) in out.iter_mut().zip(&monomial) {
            *o += weight * m;
        }
    }
    Ok(())
}

fn validate_permutation(pathing: &[usize], len: usize) -> Result<(), PolynomialError> {
    if pathing.len() != len {
        return Err(PolynomialError::InvalidPathing(format!(
            "{} entries supplied for {len} terms",
            pathing.len()
        )));
    }
    let mut seen = vec![false; len];
    for &index in pathing {
        if index >= len {
            return Err(PolynomialError::InvalidPathing(format!(
                "index {index} out of range for {len} terms"
            )));
        }
        if seen[index] {
            return Err(PolynomialError::InvalidPathing(format!(
                "index {index} repeated"
            )));
        }
        seen[index] = true;
    }
    Ok(())
}
