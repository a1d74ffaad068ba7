//? mpirun -n {{NPROCESSES}} --features "mpi"

#[cfg(feature = "mpi")]
fn test_parallel_cartesian() {
    use cartamg::map::{cartesian_2d, CartesianPartition, HashedMapFactory};
    use cartamg::sparse::laplace_2d;
    use cartamg::traits::Comm;
    use mpi::{environment::Universe, traits::Communicator};

    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();

    let size = Communicator::size(&world) as usize;
    let rank = Communicator::rank(&world) as usize;

    // Use the most square processor grid
    let mx = (1..=size)
        .filter(|m| size % m == 0 && m * m <= size)
        .max()
        .unwrap_or(1);
    let my = size / mx;
    let (nx, ny) = (10 * mx, 10 * my);

    let partition = CartesianPartition::new(nx, ny, mx, my).unwrap();
    let map = cartesian_2d(&world, nx, ny, mx, my, &HashedMapFactory).unwrap();
    let (xs, ys) = partition.ranges(rank).unwrap();
    println!(
        "[{rank}]: x in {xs:?}, y in {ys:?}, {} of {} points",
        map.local_size(),
        map.global_size()
    );

    let a = laplace_2d::<_, f64>(&world, &partition, map.clone(), &HashedMapFactory).unwrap();
    let ones = vec![1.0; map.local_size()];
    let mut y = vec![0.0; map.local_size()];
    a.multiply(&world, &ones, &mut y).unwrap();

    // Each boundary point loses one coupling per missing neighbour
    let total = world.all_reduce_sum(y.iter().sum());
    let expected = (2 * (nx + ny)) as f64;
    assert!((total - expected).abs() < 1e-12);
    if rank == 0 {
        println!("Row sums of the Laplacian add up to {total}");
    }

    if let Some(import) = a.import() {
        let halo = world.all_reduce_sum_count(import.num_remotes());
        if rank == 0 {
            println!("{halo} halo entries in total");
        }
    }
}

#[cfg(feature = "mpi")]
fn main() {
    test_parallel_cartesian()
}
#[cfg(not(feature = "mpi"))]
fn main() {}
