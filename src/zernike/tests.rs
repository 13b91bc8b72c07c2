use super::*;
use crate::grid::Grid;
use crate::testing::assert_slice_f64_absolute;
use assert_float_eq::*;

const NOLL: [u32; 15] = [1, 3, 2, 5, 4, 6, 9, 7, 8, 10, 15, 13, 11, 12, 14];
const FRINGE: [u32; 15] = [1, 3, 2, 6, 4, 5, 11, 8, 7, 10, 18, 13, 9, 12, 17];

fn unit_grid() -> Grid {
    let axis: Vec<_> = (0..21).map(|i| -1.0 + i as f64 * 0.1).collect();
    Grid::from_axes(&axis, &axis)
}

#[test]
fn ansi_to_polar() {
    assert_eq!(Polar { n: 0, l: 0 }, Polar::from_ansi(0).unwrap());
    assert_eq!(Polar { n: 1, l: -1 }, Polar::from_ansi(1).unwrap());
    assert_eq!(Polar { n: 1, l: 1 }, Polar::from_ansi(2).unwrap());
    assert_eq!(Polar { n: 2, l: 0 }, Polar::from_ansi(4).unwrap());
    assert_eq!(Polar { n: 4, l: 0 }, Polar::from_ansi(12).unwrap());
}

#[test]
fn known_single_indices() {
    for ansi in 0..15 {
        let polar = Polar::from_ansi(ansi).unwrap();
        assert_eq!(ansi, polar.ansi());
        assert_eq!(NOLL[ansi as usize], polar.noll(), "noll of {polar}");
        assert_eq!(FRINGE[ansi as usize], polar.fringe(), "fringe of {polar}");
        assert_eq!(FRINGE[ansi as usize] - 1, polar.wyant(), "wyant of {polar}");
    }
}

#[test]
fn round_trip_every_scheme() {
    for ansi in 0..300 {
        let index = ZernikeIndex::Ansi(ansi);
        for indexing in ZernikeIndexing::iter() {
            let converted = index.convert(indexing).unwrap();
            assert_eq!(indexing, converted.indexing());
            assert_eq!(index, converted.convert(ZernikeIndexing::Ansi).unwrap(), "via {converted}");
        }
    }
}

#[test]
fn cartesian_convention() {
    // l = 2m - n
    assert_eq!(
        ZernikeIndex::Polar { n: 3, l: 1 },
        convert_zernike_index(ZernikeIndex::Cartesian { n: 3, m: 2 }, ZernikeIndexing::Polar).unwrap()
    );
    assert_eq!(
        ZernikeIndex::Cartesian { n: 1, m: 0 },
        convert_zernike_index(ZernikeIndex::Ansi(1), ZernikeIndexing::Cartesian).unwrap()
    );
}

#[test]
fn invalid_indices() {
    assert!(Polar::new(3, 2).is_err());
    assert!(Polar::new(1, -3).is_err());
    assert!(Polar::from_cartesian(2, 3).is_err());
    assert!(Polar::from_noll(0).is_err());
    assert!(Polar::from_fringe(0).is_err());
    assert!(Polar::from_wyant(u32::MAX).is_err());
    assert!(Polar::new(MAX_ORDER + 2, 0).is_err());
    assert_eq!(
        "invalid Zernike index: polar (2, 1)",
        ZernikeIndex::Polar { n: 2, l: 1 }
            .convert(ZernikeIndexing::Ansi)
            .unwrap_err()
            .to_string()
    );
}

#[test]
fn out_of_range_orders() {
    assert_eq!(
        "invalid Zernike index: Fringe 4294967295 exceeds order 4096",
        Polar::from_fringe(u32::MAX).unwrap_err().to_string()
    );
    assert_eq!(
        "invalid Zernike index: Noll 4294967295 exceeds order 4096",
        Polar::from_noll(u32::MAX).unwrap_err().to_string()
    );
    assert_eq!(
        "invalid Zernike index: ANSI 4294967295 exceeds order 4096",
        Polar::from_ansi(u32::MAX).unwrap_err().to_string()
    );
    assert!(ZernikeIndex::Fringe(u32::MAX)
        .convert(ZernikeIndexing::Ansi)
        .is_err());
    assert_eq!(
        "invalid Zernike index: radial order 100000 exceeds 4096",
        ZernikeIndex::from_values(ZernikeIndexing::Polar, &[100_000, 0])
            .unwrap_err()
            .to_string()
    );
    assert!(ZernikeIndex::Cartesian { n: 100_000, m: 0 }
        .convert(ZernikeIndexing::Noll)
        .is_err());

    // the largest order still converts through every scheme
    let top = ZernikeIndex::Polar {
        n: MAX_ORDER,
        l: -(MAX_ORDER as i32),
    };
    for indexing in ZernikeIndexing::iter() {
        let converted = top.convert(indexing).unwrap();
        assert_eq!(top, converted.convert(ZernikeIndexing::Polar).unwrap(), "via {converted}");
    }
}

#[test]
fn from_values() {
    assert_eq!(
        ZernikeIndex::Noll(4),
        ZernikeIndex::from_values(ZernikeIndexing::Noll, &[4]).unwrap()
    );
    assert_eq!(
        ZernikeIndex::Polar { n: 2, l: -2 },
        ZernikeIndex::from_values(ZernikeIndexing::Polar, &[2, -2]).unwrap()
    );
    assert_eq!(
        "cartesian indices have 2 component(s), got 1",
        ZernikeIndex::from_values(ZernikeIndexing::Cartesian, &[2])
            .unwrap_err()
            .to_string()
    );
    assert!(ZernikeIndex::from_values(ZernikeIndexing::Ansi, &[-1]).is_err());
    assert!(ZernikeIndex::from_values(ZernikeIndexing::Noll, &[0]).is_err());
}

#[test]
fn parse_indexing() {
    assert_eq!(ZernikeIndexing::Fringe, ZernikeIndexing::parse("fringe").unwrap());
    assert_eq!(2, ZernikeIndexing::parse("polar").unwrap().dimension());
    assert_eq!(1, ZernikeIndexing::parse("wyant").unwrap().dimension());
    assert_eq!(
        "index 'zemax' not recognized; options: [polar, cartesian, ansi, noll, fringe, wyant]",
        ZernikeIndexing::parse("zemax").unwrap_err().to_string()
    );
}

#[test]
fn names() {
    assert_eq!(Some("Piston"), Polar::from_ansi(0).unwrap().name());
    assert_eq!(Some("Defocus"), Polar::new(2, 0).unwrap().name());
    assert_eq!(Some("Primary spherical aberration"), Polar::new(4, 0).unwrap().name());
    assert_eq!(Some("Oblique pentafoil"), Polar::new(5, 5).unwrap().name());
    assert_eq!(None, Polar::new(6, 0).unwrap().name());
}

#[test]
fn low_order_coefficients() {
    let expect = |n, m, expected: &[((u32, u32), f64)]| {
        assert_eq!(expected, &*coefficients(n, m).unwrap(), "cartesian ({n}, {m})");
    };
    expect(0, 0, &[((0, 0), 1.0)]);
    expect(1, 0, &[((0, 1), 1.0)]);
    expect(1, 1, &[((1, 0), 1.0)]);
    expect(2, 0, &[((1, 1), 2.0)]);
    expect(2, 1, &[((0, 0), -1.0), ((2, 0), 2.0), ((0, 2), 2.0)]);
    expect(2, 2, &[((2, 0), 1.0), ((0, 2), -1.0)]);
    expect(3, 2, &[((1, 0), -2.0), ((3, 0), 3.0), ((1, 2), 3.0)]);
    expect(3, 3, &[((3, 0), 1.0), ((1, 2), -3.0)]);
    expect(4, 0, &[((3, 1), 4.0), ((1, 3), -4.0)]);
    expect(4, 4, &[((4, 0), 1.0), ((2, 2), -6.0), ((0, 4), 1.0)]);
}

#[test]
fn spherical_coefficients() {
    // 6ρ⁴ − 6ρ² + 1
    let coefficients = coefficients(4, 2).unwrap();
    let evaluate = |x: f64, y: f64| -> f64 {
        coefficients
            .iter()
            .map(|&((a, b), c)| c * x.powi(a as i32) * y.powi(b as i32))
            .sum()
    };
    for (x, y) in [(0.0, 0.0), (0.3, 0.4), (-0.6, 0.1), (0.7, -0.7)] {
        let rho2: f64 = x * x + y * y;
        assert_float_absolute_eq!(6.0 * rho2 * rho2 - 6.0 * rho2 + 1.0, evaluate(x, y), 1e-12);
    }
}

#[test]
fn coefficient_errors() {
    assert!(matches!(coefficients(2, 3), Err(ZernikeError::InvalidIndex(_))));
    assert!(matches!(coefficients(35, 1), Err(ZernikeError::OrderTooHigh(35))));
}

#[test]
fn high_order_coefficients_are_cached() {
    let first = coefficients(20, 7).unwrap();
    let second = coefficients(20, 7).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn coefficient_matrix_rows() {
    let matrix = coefficient_matrix(5).unwrap();
    assert_eq!(6, matrix.rows());
    assert_eq!(cantor_pairing(0, 2) + 1, matrix.cols());
    // defocus: 2x² + 2y² − 1
    assert_eq!(-1.0, matrix[(4, cantor_pairing(0, 0))]);
    assert_eq!(2.0, matrix[(4, cantor_pairing(2, 0))]);
    assert_eq!(2.0, matrix[(4, cantor_pairing(0, 2))]);
    assert_eq!(0.0, matrix[(4, cantor_pairing(1, 1))]);
}

#[test]
fn aperture_scales() {
    let grid = Grid::from_axes(&[-2.0, 0.0, 2.0], &[-1.0, 0.0, 1.0]);
    assert_eq!((1.0, 1.0), Aperture::Circular.scale(&grid));
    assert_eq!((0.5, 1.0), Aperture::Elliptical.scale(&grid));
    let (x_scale, y_scale) = Aperture::Cropped.scale(&grid);
    assert_float_absolute_eq!(1.0 / 5f64.sqrt(), x_scale, 1e-15);
    assert_eq!(x_scale, y_scale);
    assert_eq!((3.0, 4.0), Aperture::Custom(3.0, 4.0).scale(&grid));
}

#[test]
fn parse_aperture() {
    assert_eq!(Aperture::Circular, "circular".parse::<Aperture>().unwrap());
    assert_eq!(Aperture::Cropped, "cropped".parse::<Aperture>().unwrap());
    assert_eq!(Aperture::Custom(0.5, 2.0), "0.5, 2".parse::<Aperture>().unwrap());
    assert!("square".parse::<Aperture>().is_err());
}

#[test]
fn mask_is_inscribed_circle() {
    let grid = unit_grid();
    let mask = zernike_mask(&grid, Aperture::Circular);
    assert!(mask[(10, 10)]);
    assert!(mask[(10, 0)]);
    assert!(!mask[(0, 0)]);
    assert!(!mask[(20, 20)]);

    let cropped = zernike_mask(&grid, Aperture::Cropped);
    assert!(cropped.iter().all(|&inside| inside));
}

#[test]
fn defocus_on_unit_disk() {
    let grid = unit_grid();
    let defocus = zernike(&grid, ZernikeIndex::Noll(4), Aperture::Circular).unwrap();
    let mask = zernike_mask(&grid, Aperture::Circular);
    let expected: Vec<_> = grid
        .map(|x, y| 2.0 * (x * x + y * y) - 1.0)
        .flatten()
        .iter()
        .zip(mask.iter())
        .map(|(&value, &inside)| if inside { value } else { 0.0 })
        .collect();
    assert_slice_f64_absolute(&expected, defocus.flatten(), 1e-12);
}

#[test]
fn sum_is_linear() {
    let grid = Grid::from_axes(&[-3.0, -1.0, 0.5, 2.0, 3.0], &[-2.0, 0.0, 1.5]);
    let aperture = Aperture::Elliptical;
    let tilt = zernike(&grid, ZernikeIndex::Ansi(2), aperture).unwrap();
    let coma = zernike(&grid, ZernikeIndex::Cartesian { n: 3, m: 1 }, aperture).unwrap();
    let sum = zernike_sum(
        &grid,
        &[
            (ZernikeIndex::Ansi(2), 2.0),
            (ZernikeIndex::Cartesian { n: 3, m: 1 }, -0.5),
        ],
        aperture,
    )
    .unwrap();
    let expected = tilt.zip_map(&coma, |t, c| 2.0 * t - 0.5 * c);
    assert_slice_f64_absolute(expected.flatten(), sum.flatten(), 1e-12);
}

#[test]
fn cancelling_weights_give_zero() {
    let grid = unit_grid();
    let sum = zernike_sum(
        &grid,
        &[(ZernikeIndex::Ansi(7), 1.5), (ZernikeIndex::Noll(7), -1.5)],
        Aperture::Circular,
    )
    .unwrap();
    assert!(sum.iter().all(|&value| value == 0.0));
}
