use cartamg::amgx::{reorder_csr, CommPattern, Renumbering};
use cartamg::comm::ThreadComm;
use cartamg::map::{cartesian_2d, CartesianPartition, HashedMapFactory};
use cartamg::sparse::{laplace_2d, DistributedCsrMatrix};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// The matrix held by rank 0 when the Laplacian is split over a 2 by 2 processor grid
fn corner_block(n: usize) -> DistributedCsrMatrix<f64> {
    std::thread::scope(|s| {
        let handles = ThreadComm::world(4)
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let partition = CartesianPartition::new(n, n, 2, 2).unwrap();
                    let map = cartesian_2d(&comm, n, n, 2, 2, &HashedMapFactory).unwrap();
                    laplace_2d::<_, f64>(&comm, &partition, map, &HashedMapFactory).unwrap()
                })
            })
            .collect::<Vec<_>>();
        let mut blocks = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();
        blocks.swap_remove(0)
    })
}

pub fn reorder_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");
    group.sample_size(20);

    for n in [64, 256] {
        let a = corner_block(n);
        let import = a.import().unwrap();
        let neighbors = import.send_ranks().to_vec();

        group.bench_function(format!("Renumbering of a {n}x{n} grid block"), |b| {
            b.iter(|| {
                let r = Renumbering::new(a.local_rows(), import, &neighbors).unwrap();
                black_box(CommPattern::new(import, &neighbors, &r).unwrap())
            })
        });

        let renumbering = Renumbering::new(a.local_rows(), import, &neighbors).unwrap();
        group.bench_function(format!("Reordering CSR of a {n}x{n} grid block"), |b| {
            b.iter(|| {
                black_box(reorder_csr(
                    a.row_ptr(),
                    a.col_indices(),
                    a.values(),
                    &renumbering,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, reorder_benchmark);
criterion_main!(benches);
