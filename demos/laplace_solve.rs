//? cargo run --example laplace_solve

use cartamg::amgx::{AmgxOperator, HostLibrary, PARAMS_SUBLIST};
use cartamg::comm::ThreadComm;
use cartamg::map::{cartesian_2d, CartesianPartition, MapBackend};
use cartamg::params::ParameterList;
use cartamg::sparse::{laplace_2d, MultiVector};
use cartamg::traits::{Comm, Operator};
use cartamg::types::Transpose;

/// Solve the 2D Laplacian with each rank of a 2 by 2 processor grid running in its own thread
fn main() {
    let (nx, ny, mx, my) = (40, 30, 2, 2);

    let mut params = ParameterList::new("MueLu");
    params.set(MapBackend::PARAMETER, "compact");
    params
        .sublist_mut(PARAMS_SUBLIST)
        .set("config_version", 2)
        .set("solver", "PCG")
        .set("max_iters", 200)
        .set("tolerance", 1e-10);
    let params = &params;

    std::thread::scope(|s| {
        for comm in ThreadComm::world(mx * my) {
            s.spawn(move || {
                let backend = MapBackend::from_parameters(params).unwrap();
                let factory = backend.factory();
                let partition = CartesianPartition::new(nx, ny, mx, my).unwrap();
                let map = cartesian_2d(&comm, nx, ny, mx, my, factory.as_ref()).unwrap();
                let a =
                    laplace_2d::<_, f64>(&comm, &partition, map.clone(), factory.as_ref()).unwrap();

                let library = HostLibrary::new(&comm);
                let op = AmgxOperator::new(&comm, &a, params, &library).unwrap();

                let b = MultiVector::from_columns(map.clone(), vec![vec![1.0; map.local_size()]])
                    .unwrap();
                let mut x = MultiVector::new(map, 1);
                op.apply(&b, &mut x, Transpose::NoTrans, 1.0, 0.0).unwrap();

                let local_max = x.column(0).iter().fold(0.0_f64, |m, v| m.max(*v));
                let total = comm.all_reduce_sum(x.column(0).iter().sum());
                if comm.rank() == 0 {
                    println!(
                        "{:?} after {} iterations",
                        op.status().unwrap(),
                        op.iterations().unwrap()
                    );
                    println!("Sum of the solution: {total}");
                }
                println!("[{}]: largest local value {local_max}", comm.rank());
            });
        }
    });
}
