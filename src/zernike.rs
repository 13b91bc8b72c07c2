//! Real [Zernike polynomials](https://en.wikipedia.org/wiki/Zernike_polynomials): index schemes,
//! cartesian coefficients and summation over an aperture.
//!
//! The canonical index is [Polar] `(n, l)`. The cartesian index `(n, m)` used throughout the
//! coefficient algorithm of [Lakshminarayanan & Fleck](https://doi.org/10.1080/09500340.2011.554896)
//! satisfies `l = 2m − n`. Single-integer schemes (ANSI, Noll, Fringe, Wyant) all convert through
//! [Polar].
//!
//! Zernike polynomials are defined on a circular pupil. Evaluating them on a cropped or
//! elliptical [Aperture] breaks orthonormality; no attempt is made to restore it.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use anyhow::bail;
use rustc_hash::FxHashMap;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::display::DisplaySlice;
use crate::factorial::{FACTORIALS, MAX_FACTORIAL};
use crate::grid::AsGrid;
use crate::linear::Matrix;
use crate::polynomial::{
    cantor_pairing, inverse_cantor_pairing, polynomial_sum, PolynomialError, Terms,
};

#[derive(Debug, Error)]
pub enum ZernikeError {
    #[error("invalid Zernike index: {0}")]
    InvalidIndex(String),

    #[error("{indexing} indices have {expected} component(s), got {actual}")]
    DimensionMismatch {
        indexing: ZernikeIndexing,
        expected: usize,
        actual: usize,
    },

    #[error("index '{0}' not recognized; options: {1}")]
    UnknownIndexing(String, String),

    #[error("radial order {0} exceeds the maximum of {max}", max = MAX_FACTORIAL)]
    OrderTooHigh(u32),

    #[error("{0}")]
    Polynomial(#[from] PolynomialError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ZernikeIndexing {
    Polar,
    Cartesian,
    Ansi,
    Noll,
    Fringe,
    Wyant,
}
impl ZernikeIndexing {
    /// Number of integers making up an index in this scheme.
    pub fn dimension(&self) -> usize {
        match self {
            ZernikeIndexing::Polar | ZernikeIndexing::Cartesian => 2,
            _ => 1,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ZernikeError> {
        ZernikeIndexing::from_str(s).map_err(|_| {
            let options: Vec<_> = ZernikeIndexing::iter().collect();
            ZernikeError::UnknownIndexing(s.to_string(), DisplaySlice::from(&*options).to_string())
        })
    }
}

/// Largest radial degree accepted by the index conversions. Every single-integer index of a
/// polynomial up to this order fits in a [u32].
pub const MAX_ORDER: u32 = 4096;

/// Radial degree `n` and azimuthal frequency `l`, with `|l| ≤ n ≤` [MAX_ORDER] and `n − |l|`
/// even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Polar {
    n: u32,
    l: i32,
}
impl Polar {
    pub fn new(n: u32, l: i32) -> Result<Self, ZernikeError> {
        check_order(n)?;
        let abs_l = l.unsigned_abs();
        if abs_l > n || (n - abs_l) % 2 != 0 {
            return Err(ZernikeError::InvalidIndex(format!("polar ({n}, {l})")));
        }
        Ok(Self { n, l })
    }

    pub fn from_cartesian(n: u32, m: u32) -> Result<Self, ZernikeError> {
        check_order(n)?;
        if m > n {
            return Err(ZernikeError::InvalidIndex(format!("cartesian ({n}, {m})")));
        }
        Ok(Self {
            n,
            l: 2 * m as i32 - n as i32,
        })
    }

    pub fn from_ansi(j: u32) -> Result<Self, ZernikeError> {
        let (a, b) = inverse_cantor_pairing(j as usize);
        Self::from_cartesian(a + b, b)
            .map_err(|_| ZernikeError::InvalidIndex(format!("ANSI {j} exceeds order {MAX_ORDER}")))
    }

    pub fn from_noll(j: u32) -> Result<Self, ZernikeError> {
        if j == 0 {
            return Err(ZernikeError::InvalidIndex("Noll indices start at 1".into()));
        }
        let mut n = 0;
        while (n + 1) * (n + 2) / 2 < j {
            n += 1;
            if n > MAX_ORDER {
                return Err(ZernikeError::InvalidIndex(format!(
                    "Noll {j} exceeds order {MAX_ORDER}"
                )));
            }
        }
        Self::search(n, |polar| polar.noll() == j)
            .ok_or_else(|| ZernikeError::InvalidIndex(format!("Noll {j}")))
    }

    pub fn from_fringe(j: u32) -> Result<Self, ZernikeError> {
        if j == 0 {
            return Err(ZernikeError::InvalidIndex("Fringe indices start at 1".into()));
        }
        // fringe group d spans indices d² + 1 ..= (d + 1)², with n + |l| = 2d
        let mut d = 0;
        while (d + 1) * (d + 1) < j {
            d += 1;
            if d > MAX_ORDER {
                return Err(ZernikeError::InvalidIndex(format!(
                    "Fringe {j} exceeds order {MAX_ORDER}"
                )));
            }
        }
        (0..=d)
            .flat_map(|abs_l| {
                let n = 2 * d - abs_l;
                [abs_l as i32, -(abs_l as i32)].map(move |l| Polar::new(n, l))
            })
            .filter_map(Result::ok)
            .find(|polar| polar.fringe() == j)
            .ok_or_else(|| ZernikeError::InvalidIndex(format!("Fringe {j}")))
    }

    pub fn from_wyant(j: u32) -> Result<Self, ZernikeError> {
        let fringe = j
            .checked_add(1)
            .ok_or_else(|| ZernikeError::InvalidIndex(format!("Wyant {j}")))?;
        Self::from_fringe(fringe)
    }

    fn search(n: u32, mut predicate: impl FnMut(&Polar) -> bool) -> Option<Polar> {
        (0..=n)
            .map(|step| Polar {
                n,
                l: 2 * step as i32 - n as i32,
            })
            .find(|polar| predicate(polar))
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn l(&self) -> i32 {
        self.l
    }

    /// Cartesian `(n, m)`.
    pub fn cartesian(&self) -> (u32, u32) {
        (self.n, ((self.n as i32 + self.l) / 2) as u32)
    }

    pub fn ansi(&self) -> u32 {
        ((self.n as i32 * (self.n as i32 + 2) + self.l) / 2) as u32
    }

    pub fn noll(&self) -> u32 {
        let n = self.n;
        let offset = if (self.l >= 0 && n % 4 >= 2) || (self.l <= 0 && n % 4 <= 1) {
            1
        } else {
            0
        };
        n * (n + 1) / 2 + self.l.unsigned_abs() + offset
    }

    pub fn fringe(&self) -> u32 {
        let abs_l = self.l.unsigned_abs();
        let d = (self.n + abs_l) / 2;
        (1 + d).pow(2) - 2 * abs_l + u32::from(self.l < 0)
    }

    pub fn wyant(&self) -> u32 {
        self.fringe() - 1
    }

    /// Classical name of the aberration, for orders up to 5.
    pub fn name(&self) -> Option<&'static str> {
        ZERNIKE_NAMES.get(self.ansi() as usize).copied()
    }
}

fn check_order(n: u32) -> Result<(), ZernikeError> {
    if n > MAX_ORDER {
        return Err(ZernikeError::InvalidIndex(format!(
            "radial order {n} exceeds {MAX_ORDER}"
        )));
    }
    Ok(())
}

impl fmt::Display for Polar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z({}, {})", self.n, self.l)
    }
}

pub const ZERNIKE_NAMES: [&str; 21] = [
    "Piston",
    "Vertical tilt",
    "Horizontal tilt",
    "Oblique astigmatism",
    "Defocus",
    "Vertical astigmatism",
    "Vertical trefoil",
    "Vertical coma",
    "Horizontal coma",
    "Oblique trefoil",
    "Oblique quadrafoil",
    "Oblique secondary astigmatism",
    "Primary spherical aberration",
    "Vertical secondary astigmatism",
    "Vertical quadrafoil",
    "Vertical pentafoil",
    "Vertical secondary trefoil",
    "Vertical secondary coma",
    "Horizontal secondary coma",
    "Oblique secondary trefoil",
    "Oblique pentafoil",
];

/// A Zernike index expressed in one of the [ZernikeIndexing] schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZernikeIndex {
    Polar { n: u32, l: i32 },
    Cartesian { n: u32, m: u32 },
    Ansi(u32),
    Noll(u32),
    Fringe(u32),
    Wyant(u32),
}
impl ZernikeIndex {
    /// Interprets raw integers under the given scheme.
    pub fn from_values(indexing: ZernikeIndexing, values: &[i64]) -> Result<Self, ZernikeError> {
        if values.len() != indexing.dimension() {
            return Err(ZernikeError::DimensionMismatch {
                indexing,
                expected: indexing.dimension(),
                actual: values.len(),
            });
        }
        let unsigned = |value: i64| {
            u32::try_from(value).map_err(|_| {
                ZernikeError::InvalidIndex(format!("{indexing} component {value} is out of range"))
            })
        };
        let index = match indexing {
            ZernikeIndexing::Polar => ZernikeIndex::Polar {
                n: unsigned(values[0])?,
                l: i32::try_from(values[1]).map_err(|_| {
                    ZernikeError::InvalidIndex(format!("polar component {} is out of range", values[1]))
                })?,
            },
            ZernikeIndexing::Cartesian => ZernikeIndex::Cartesian {
                n: unsigned(values[0])?,
                m: unsigned(values[1])?,
            },
            ZernikeIndexing::Ansi => ZernikeIndex::Ansi(unsigned(values[0])?),
            ZernikeIndexing::Noll => ZernikeIndex::Noll(unsigned(values[0])?),
            ZernikeIndexing::Fringe => ZernikeIndex::Fringe(unsigned(values[0])?),
            ZernikeIndexing::Wyant => ZernikeIndex::Wyant(unsigned(values[0])?),
        };
        index.to_polar()?;
        Ok(index)
    }

    pub fn indexing(&self) -> ZernikeIndexing {
        match self {
            ZernikeIndex::Polar { .. } => ZernikeIndexing::Polar,
            ZernikeIndex::Cartesian { .. } => ZernikeIndexing::Cartesian,
            ZernikeIndex::Ansi(_) => ZernikeIndexing::Ansi,
            ZernikeIndex::Noll(_) => ZernikeIndexing::Noll,
            ZernikeIndex::Fringe(_) => ZernikeIndexing::Fringe,
            ZernikeIndex::Wyant(_) => ZernikeIndexing::Wyant,
        }
    }

    pub fn to_polar(&self) -> Result<Polar, ZernikeError> {
        match *self {
            ZernikeIndex::Polar { n, l } => Polar::new(n, l),
            ZernikeIndex::Cartesian { n, m } => Polar::from_cartesian(n, m),
            ZernikeIndex::Ansi(j) => Polar::from_ansi(j),
            ZernikeIndex::Noll(j) => Polar::from_noll(j),
            ZernikeIndex::Fringe(j) => Polar::from_fringe(j),
            ZernikeIndex::Wyant(j) => Polar::from_wyant(j),
        }
    }

    pub fn from_polar(polar: Polar, indexing: ZernikeIndexing) -> Self {
        match indexing {
            ZernikeIndexing::Polar => ZernikeIndex::Polar {
                n: polar.n,
                l: polar.l,
            },
            ZernikeIndexing::Cartesian => {
                let (n, m) = polar.cartesian();
                ZernikeIndex::Cartesian { n, m }
            }
            ZernikeIndexing::Ansi => ZernikeIndex::Ansi(polar.ansi()),
            ZernikeIndexing::Noll => ZernikeIndex::Noll(polar.noll()),
            ZernikeIndexing::Fringe => ZernikeIndex::Fringe(polar.fringe()),
            ZernikeIndexing::Wyant => ZernikeIndex::Wyant(polar.wyant()),
        }
    }

    /// Re-expresses this index in another scheme.
    pub fn convert(&self, to: ZernikeIndexing) -> Result<Self, ZernikeError> {
        Ok(Self::from_polar(self.to_polar()?, to))
    }
}

impl fmt::Display for ZernikeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZernikeIndex::Polar { n, l } => write!(f, "polar ({n}, {l})"),
            ZernikeIndex::Cartesian { n, m } => write!(f, "cartesian ({n}, {m})"),
            ZernikeIndex::Ansi(j) => write!(f, "ansi {j}"),
            ZernikeIndex::Noll(j) => write!(f, "noll {j}"),
            ZernikeIndex::Fringe(j) => write!(f, "fringe {j}"),
            ZernikeIndex::Wyant(j) => write!(f, "wyant {j}"),
        }
    }
}

/// Converts `index` to the `to` scheme.
pub fn convert_zernike_index(
    index: ZernikeIndex,
    to: ZernikeIndexing,
) -> Result<ZernikeIndex, ZernikeError> {
    index.convert(to)
}

/// Coefficients `c` of the monomials `x^a y^b`, keyed by `(a, b)` and ordered by Cantor index.
pub type Coefficients = Arc<[((u32, u32), f64)]>;

type CoefficientCache = RwLock<FxHashMap<(u32, u32), Coefficients>>;

fn coefficient_cache() -> &'static CoefficientCache {
    static CACHE: OnceLock<CoefficientCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Cartesian coefficients of the (unnormalized) real Zernike polynomial with cartesian index
/// `(n, m)`. Results are cached for the life of the process.
pub fn coefficients(n: u32, m: u32) -> Result<Coefficients, ZernikeError> {
    if m > n {
        return Err(ZernikeError::InvalidIndex(format!("cartesian ({n}, {m})")));
    }
    if n > MAX_FACTORIAL as u32 {
        return Err(ZernikeError::OrderTooHigh(n));
    }
    if let Some(cached) = coefficient_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(n, m))
    {
        return Ok(cached.clone());
    }

    let computed = compute_coefficients(n as u8, m as u8);
    coefficient_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert((n, m), computed.clone());
    Ok(computed)
}

fn compute_coefficients(n: u8, m: u8) -> Coefficients {
    let l = n as i32 - 2 * m as i32;
    let abs_l = l.unsigned_abs() as u8;
    let q = if abs_l % 2 == 1 {
        (abs_l - 1) / 2
    } else if l > 0 {
        abs_l / 2 - 1
    } else {
        abs_l / 2
    };
    let p = u8::from(l > 0);
    let radial = (n - abs_l) / 2;

    let mut terms = FxHashMap::<(u32, u32), i128>::default();
    for i in 0..=q {
        for j in 0..=radial {
            let weight = FACTORIALS.quotient(n - j, &[j, radial - j, n - radial - j]);
            for k in 0..=(radial - j) {
                let magnitude = FACTORIALS.combinations(abs_l, 2 * i + p)
                    * FACTORIALS.combinations(radial - j, k)
                    * weight;
                let sign = if (i + j) % 2 == 1 { -1 } else { 1 };
                let power = (
                    (n - 2 * (i + j + k) - p) as u32,
                    (2 * (i + k) + p) as u32,
                );
                *terms.entry(power).or_default() += sign * magnitude as i128;
            }
        }
    }

    let mut terms: Vec<_> = terms
        .into_iter()
        .filter(|&(_, coefficient)| coefficient != 0)
        .map(|(power, coefficient)| (power, coefficient as f64))
        .collect();
    terms.sort_by_key(|&((a, b), _)| cantor_pairing(a, b));
    terms.into()
}

/// Dense coefficient table: row `j` holds the ANSI-`j` polynomial, column `c` the monomial with
/// Cantor index `c`.
pub fn coefficient_matrix(max_ansi: u32) -> Result<Matrix<f64>, ZernikeError> {
    let max_n = Polar::from_ansi(max_ansi)?.n;
    let cols = cantor_pairing(0, max_n) + 1;
    let mut matrix = Matrix::allocate(max_ansi as usize + 1, cols);
    for ansi in 0..=max_ansi {
        let (n, m) = Polar::from_ansi(ansi)?.cartesian();
        for &((a, b), coefficient) in coefficients(n, m)?.iter() {
            matrix[(ansi as usize, cantor_pairing(a, b))] = coefficient;
        }
    }
    Ok(matrix)
}

/// How the unit Zernike pupil is scaled relative to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Aperture {
    /// Scaled isotropically until the pupil edge touches the nearest grid edge.
    #[default]
    Circular,
    /// Scaled anisotropically until the pupil touches every grid edge.
    Elliptical,
    /// Scaled isotropically until the pupil circumscribes the grid.
    Cropped,
    /// Factors applied to `x` and `y` directly; the pupil edge is where `x² + y² = 1`.
    Custom(f64, f64),
}
impl Aperture {
    pub fn scale(&self, grid: &impl AsGrid) -> (f64, f64) {
        let grid = grid.grid();
        match *self {
            Aperture::Circular => {
                let scale = 1.0 / f64::min(grid.max_x(), grid.max_y());
                (scale, scale)
            }
            Aperture::Elliptical => (1.0 / grid.max_x(), 1.0 / grid.max_y()),
            Aperture::Cropped => {
                let scale = 1.0 / grid.map(|x, y| x * x + y * y).nan_max().sqrt();
                (scale, scale)
            }
            Aperture::Custom(x_scale, y_scale) => (x_scale, y_scale),
        }
    }
}

impl FromStr for Aperture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circular" => Ok(Aperture::Circular),
            "elliptical" => Ok(Aperture::Elliptical),
            "cropped" => Ok(Aperture::Cropped),
            _ => {
                let frags: Vec<_> = s.split(',').collect();
                if frags.len() != 2 {
                    bail!("aperture must be circular, elliptical, cropped or '<x_scale>,<y_scale>'");
                }
                Ok(Aperture::Custom(frags[0].trim().parse()?, frags[1].trim().parse()?))
            }
        }
    }
}

/// Pixels lying inside the scaled pupil.
pub fn zernike_mask(grid: &impl AsGrid, aperture: Aperture) -> Matrix<bool> {
    let (x_scale, y_scale) = aperture.scale(grid);
    grid.grid()
        .x()
        .zip_map(grid.grid().y(), |&x, &y| {
            (x * x_scale).powi(2) + (y * y_scale).powi(2) <= 1.0
        })
}

/// A single Zernike polynomial; zero outside the pupil.
pub fn zernike(
    grid: &impl AsGrid,
    index: ZernikeIndex,
    aperture: Aperture,
) -> Result<Matrix<f64>, ZernikeError> {
    zernike_sum(grid, &[(index, 1.0)], aperture)
}

/// Weighted sum of Zernike polynomials; zero outside the pupil.
///
/// The coefficients of every weighted polynomial are merged per monomial first, so each
/// `x^a y^b` is evaluated over the grid once regardless of how many polynomials share it.
pub fn zernike_sum(
    grid: &impl AsGrid,
    weights: &[(ZernikeIndex, f64)],
    aperture: Aperture,
) -> Result<Matrix<f64>, ZernikeError> {
    let mut summed = FxHashMap::<(u32, u32), f64>::default();
    for &(index, weight) in weights {
        let (n, m) = index.to_polar()?.cartesian();
        for &(power, coefficient) in coefficients(n, m)?.iter() {
            *summed.entry(power).or_default() += coefficient * weight;
        }
    }
    let mut summed: Vec<_> = summed.into_iter().filter(|&(_, w)| w != 0.0).collect();
    summed.sort_by_key(|&((a, b), _)| cantor_pairing(a, b));
    let (powers, factors): (Vec<_>, Vec<_>) = summed.into_iter().unzip();

    let (x_scale, y_scale) = aperture.scale(grid);
    let scaled = grid.grid().scaled(x_scale, y_scale);
    let mut canvas = polynomial_sum(&scaled, &factors, Terms::Powers(&powers))?;

    let mask = zernike_mask(grid, aperture);
    for (value, &inside) in canvas.flatten_mut().iter_mut().zip(mask.iter()) {
        if !inside {
            *value = 0.0;
        }
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests;
