use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Rand, StdRand};

use slmsuite::grid::Grid;
use slmsuite::linear::Matrix;
use slmsuite::polynomial::{polynomial_sum_into, Pathing, Terms};

fn criterion_benchmark(c: &mut Criterion) {
    fn fixtures(terms: usize) -> (Grid, Vec<f64>) {
        let grid = Grid::centered(512, 512, (8.0, 8.0), 1.0);
        let mut rand = StdRand::default();
        let weights = (0..terms)
            .map(|_| rand.next_u32() as f64 / u32::MAX as f64 - 0.5)
            .collect();
        (grid, weights)
    }

    // sanity check
    let (grid, weights) = fixtures(28);
    let mut optimal = Matrix::allocate(512, 512);
    let mut sequential = Matrix::allocate(512, 512);
    polynomial_sum_into(&grid, &weights, Terms::Implicit, Pathing::Optimal, &mut optimal).unwrap();
    polynomial_sum_into(&grid, &weights, Terms::Implicit, Pathing::Sequential, &mut sequential)
        .unwrap();
    for (&lhs, &rhs) in optimal.iter().zip(sequential.iter()) {
        assert!((lhs - rhs).abs() <= 1e-9 * f64::max(1.0, lhs.abs()));
    }

    fn bench(c: &mut Criterion, terms: usize, pathing: Pathing, label: &str) {
        let (grid, weights) = fixtures(terms);
        let mut out = Matrix::allocate(512, 512);
        c.bench_function(&format!("cri_polynomial_{terms}t_{label}"), |b| {
            b.iter(|| {
                polynomial_sum_into(&grid, &weights, Terms::Implicit, pathing, &mut out).unwrap();
            });
        });
    }
    bench(c, 10, Pathing::Optimal, "optimal");
    bench(c, 10, Pathing::Sequential, "sequential");
    bench(c, 28, Pathing::Optimal, "optimal");
    bench(c, 28, Pathing::Sequential, "sequential");
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
