//! Orthogonal polynomials used by the structured-light modes.

/// Physicists' Hermite polynomial `H_n(x)`, evaluated by the three-term recurrence.
pub fn hermite(n: u32, x: f64) -> f64 {
    let (mut prev, mut curr) = (1.0, 2.0 * x);
    if n == 0 {
        return prev;
    }
    for k in 1..n {
        let next = 2.0 * x * curr - 2.0 * k as f64 * prev;
        prev = curr;
        curr = next;
    }
    curr
}

/// Generalized Laguerre polynomial `L_p^α(x)`.
pub fn genlaguerre(p: u32, alpha: f64, x: f64) -> f64 {
    let (mut prev, mut curr) = (1.0, 1.0 + alpha - x);
    if p == 0 {
        return prev;
    }
    for k in 1..p {
        let k = k as f64;
        let next = ((2.0 * k + 1.0 + alpha - x) * curr - (k + alpha) * prev) / (k + 1.0);
        prev = curr;
        curr = next;
    }
    curr
}

/// Heaviside step function, taking the value `at_zero` at the origin.
#[inline]
pub fn heaviside(x: f64, at_zero: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        0.0
    } else {
        at_zero
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;
    use crate::testing::assert_slice_f64_relative;

    #[test]
    fn hermite_closed_forms() {
        for x in [-2.0, -0.5, 0.0, 0.3, 1.7] {
            assert_eq!(1.0, hermite(0, x));
            assert_float_absolute_eq!(2.0 * x, hermite(1, x), 1e-12);
            assert_float_absolute_eq!(4.0 * x * x - 2.0, hermite(2, x), 1e-12);
            assert_float_absolute_eq!(8.0 * x.powi(3) - 12.0 * x, hermite(3, x), 1e-12);
            assert_float_absolute_eq!(
                16.0 * x.powi(4) - 48.0 * x * x + 12.0,
                hermite(4, x),
                1e-9
            );
        }
    }

    #[test]
    fn genlaguerre_closed_forms() {
        for x in [0.0, 0.5, 1.0, 3.2] {
            assert_eq!(1.0, genlaguerre(0, 2.0, x));
            assert_float_absolute_eq!(1.0 + 2.0 - x, genlaguerre(1, 2.0, x), 1e-12);
            assert_float_absolute_eq!(
                (x * x - 4.0 * x + 2.0) / 2.0,
                genlaguerre(2, 0.0, x),
                1e-12
            );
            // L_2^1(x) = (x^2 - 6x + 6) / 2
            assert_float_absolute_eq!(
                (x * x - 6.0 * x + 6.0) / 2.0,
                genlaguerre(2, 1.0, x),
                1e-12
            );
        }
    }

    #[test]
    fn hermite_high_order() {
        // H_10 at a handful of points, from the explicit polynomial
        let h10 = |x: f64| {
            1024.0 * x.powi(10) - 23040.0 * x.powi(8) + 161280.0 * x.powi(6)
                - 403200.0 * x.powi(4)
                + 302400.0 * x.powi(2)
                - 30240.0
        };
        let xs = [-1.5, -0.2, 0.7, 2.5];
        let expected: Vec<_> = xs.iter().map(|&x| h10(x)).collect();
        let actual: Vec<_> = xs.iter().map(|&x| hermite(10, x)).collect();
        assert_slice_f64_relative(&expected, &actual, 1e-9);
    }

    #[test]
    fn heaviside_steps() {
        assert_eq!(0.0, heaviside(-1e-9, 0.5));
        assert_eq!(0.5, heaviside(0.0, 0.5));
        assert_eq!(1.0, heaviside(2.0, 0.5));
    }
}
