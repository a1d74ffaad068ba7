use approx::assert_relative_eq;
use cartamg::amgx::{AmgxOperator, HostLibrary, PARAMS_SUBLIST};
use cartamg::comm::{SelfComm, ThreadComm};
use cartamg::map::{cartesian_2d, CartesianPartition, HashedMapFactory};
use cartamg::params::ParameterList;
use cartamg::sparse::{laplace_2d, DistributedCsrMatrix, MultiVector};
use cartamg::traits::{Comm, MapFactory, Operator};
use cartamg::types::{SolveStatus, Transpose};
use cartamg::Error;

fn solver_params(solver: &str) -> ParameterList {
    let mut params = ParameterList::new("MueLu");
    params
        .sublist_mut(PARAMS_SUBLIST)
        .set("config_version", 2)
        .set("solver", solver)
        .set("max_iters", 500)
        .set("tolerance", 1e-12);
    params
}

/// Solve the 2D Laplacian for a known solution on every rank of `comm`
fn solve_laplace<C: Comm>(comm: &C, nx: usize, ny: usize, mx: usize, my: usize, solver: &str) {
    let partition = CartesianPartition::new(nx, ny, mx, my).unwrap();
    let map = cartesian_2d(comm, nx, ny, mx, my, &HashedMapFactory).unwrap();
    let a = laplace_2d::<_, f64>(comm, &partition, map.clone(), &HashedMapFactory).unwrap();

    let expected = map
        .global_indices()
        .iter()
        .map(|gid| (*gid as f64 * 0.37).sin())
        .collect::<Vec<_>>();
    let mut b = vec![0.0; expected.len()];
    a.multiply(comm, &expected, &mut b).unwrap();

    let library = HostLibrary::new(comm);
    let op = AmgxOperator::new(comm, &a, &solver_params(solver), &library).unwrap();
    assert_eq!(op.size().unwrap(), map.local_size());
    assert_eq!(comm.size() > 1, op.comm_pattern().is_some());

    let b = MultiVector::from_columns(map.clone(), vec![b.clone(), b]).unwrap();
    let mut x = MultiVector::new(map, 2);
    op.apply(&b, &mut x, Transpose::NoTrans, 1.0, 0.0).unwrap();
    assert_eq!(op.status().unwrap(), SolveStatus::Success);
    for column in 0..2 {
        for (xi, ei) in x.column(column).iter().zip(&expected) {
            assert_relative_eq!(*xi, *ei, epsilon = 1e-8);
        }
    }
}

fn on_threads(size: usize, f: impl Fn(&ThreadComm) + Sync) {
    std::thread::scope(|s| {
        for comm in ThreadComm::world(size) {
            let f = &f;
            s.spawn(move || f(&comm));
        }
    });
}

#[test]
fn test_laplace_one_rank() {
    solve_laplace(&SelfComm, 8, 6, 1, 1, "PCG");
}

#[test]
fn test_laplace_two_ranks() {
    on_threads(2, |comm| solve_laplace(comm, 8, 6, 2, 1, "PCG"));
}

#[test]
fn test_laplace_four_ranks() {
    on_threads(4, |comm| solve_laplace(comm, 9, 7, 2, 2, "PCG"));
}

#[test]
fn test_laplace_four_ranks_jacobi() {
    on_threads(4, |comm| {
        let partition = CartesianPartition::new(6, 6, 2, 2).unwrap();
        let map = cartesian_2d(comm, 6, 6, 2, 2, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(comm, &partition, map.clone(), &HashedMapFactory).unwrap();
        let library = HostLibrary::new(comm);
        let mut params = solver_params("JACOBI");
        params
            .sublist_mut(PARAMS_SUBLIST)
            .set("max_iters", 5000)
            .set("tolerance", 1e-10);
        let op = AmgxOperator::new(comm, &a, &params, &library).unwrap();

        let ones =
            MultiVector::from_columns(map.clone(), vec![vec![1.0; map.local_size()]]).unwrap();
        let mut b = MultiVector::new(map.clone(), 1);
        a.multiply(comm, ones.column(0), b.column_mut(0)).unwrap();
        let mut x = MultiVector::new(map, 1);
        op.apply(&b, &mut x, Transpose::NoTrans, 1.0, 0.0).unwrap();
        assert_eq!(op.status().unwrap(), SolveStatus::Success);
        for xi in x.column(0) {
            assert_relative_eq!(*xi, 1.0, epsilon = 1e-7);
        }
    });
}

#[test]
fn test_renumbering_places_halo_last() {
    on_threads(2, |comm| {
        let partition = CartesianPartition::new(4, 2, 2, 1).unwrap();
        let map = cartesian_2d(comm, 4, 2, 2, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::new(comm);
        let op = AmgxOperator::new(comm, &a, &solver_params("PCG"), &library).unwrap();

        let pattern = op.comm_pattern().unwrap();
        let other = 1 - comm.rank();
        assert_eq!(pattern.neighbors(), &[other]);
        // Two grid columns of two points each meet at the block boundary
        assert_eq!(pattern.send_maps()[0].len(), 2);
        assert_eq!(pattern.recv_maps(), &[vec![4, 5]]);
        // Exported rows are numbered after the interior rows
        for row in &pattern.send_maps()[0] {
            assert!((2..4).contains(row));
        }
        let renumbering = op.renumbering();
        for lid in 0..renumbering.len() {
            assert_eq!(renumbering.from_solver(renumbering.to_solver(lid)), lid);
        }
    });
}

#[test]
fn test_asymmetric_neighbors() {
    on_threads(2, |comm| {
        let map = HashedMapFactory
            .build(Some(2), &[comm.rank()], 0, comm)
            .unwrap();
        // Rank 0 reads column 1, rank 1 reads nothing from rank 0
        let rows = if comm.rank() == 0 {
            vec![vec![(0, 2.0), (1, -1.0)]]
        } else {
            vec![vec![(1, 2.0)]]
        };
        let a = DistributedCsrMatrix::from_global_rows(comm, map, rows, Some, &HashedMapFactory)
            .unwrap();
        let library = HostLibrary::new(comm);
        match AmgxOperator::new(comm, &a, &solver_params("PCG"), &library) {
            Err(Error::AsymmetricNeighbors { send, recv }) => {
                if comm.rank() == 0 {
                    assert_eq!((send, recv), (vec![], vec![1]));
                } else {
                    assert_eq!((send, recv), (vec![0], vec![]));
                }
            }
            Err(e) => panic!("expected AsymmetricNeighbors, got {e}"),
            Ok(_) => panic!("expected AsymmetricNeighbors"),
        }
        assert_eq!(library.live_handles(), 0);
    });
}

#[test]
fn test_missing_import() {
    on_threads(2, |comm| {
        let map = HashedMapFactory
            .build(Some(2), &[comm.rank()], 0, comm)
            .unwrap();
        let a = DistributedCsrMatrix::new(map.clone(), map, vec![0, 1], vec![0], vec![1.0], None)
            .unwrap();
        let library = HostLibrary::new(comm);
        assert!(matches!(
            AmgxOperator::new(comm, &a, &solver_params("PCG"), &library),
            Err(Error::MissingImport)
        ));
    });
}

#[test]
fn test_single_precision_is_unsupported() {
    let partition = CartesianPartition::new(3, 3, 1, 1).unwrap();
    let map = cartesian_2d(&SelfComm, 3, 3, 1, 1, &HashedMapFactory).unwrap();
    let a = laplace_2d::<_, f32>(&SelfComm, &partition, map, &HashedMapFactory).unwrap();
    let library = HostLibrary::new(&SelfComm);
    assert!(matches!(
        AmgxOperator::new(&SelfComm, &a, &solver_params("PCG"), &library),
        Err(Error::Unsupported(_))
    ));
    assert!(!library.is_initialized());
}

#[test]
fn test_config_file() {
    let path = std::env::temp_dir().join(format!("cartamg-config-{}.txt", std::process::id()));
    std::fs::write(&path, "# host solver\nsolver=JACOBI\nmax_iters=3\n").unwrap();

    let partition = CartesianPartition::new(5, 5, 1, 1).unwrap();
    let map = cartesian_2d(&SelfComm, 5, 5, 1, 1, &HashedMapFactory).unwrap();
    let a = laplace_2d::<_, f64>(&SelfComm, &partition, map.clone(), &HashedMapFactory).unwrap();
    let mut params = ParameterList::new("MueLu");
    params
        .sublist_mut(PARAMS_SUBLIST)
        .set("json file", path.to_str().unwrap())
        .set("solver", "PCG");
    let library = HostLibrary::new(&SelfComm);
    let op = AmgxOperator::new(&SelfComm, &a, &params, &library).unwrap();

    let b = MultiVector::from_columns(map.clone(), vec![vec![1.0; 25]]).unwrap();
    let mut x = MultiVector::new(map, 1);
    op.apply(&b, &mut x, Transpose::NoTrans, 1.0, 0.0).unwrap();
    // The file selects a Jacobi solver that stops after three iterations
    assert_eq!(op.status().unwrap(), SolveStatus::NotConverged);
    assert_eq!(op.iterations().unwrap(), 3);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_no_devices() {
    on_threads(2, |comm| {
        let partition = CartesianPartition::new(4, 2, 2, 1).unwrap();
        let map = cartesian_2d(comm, 4, 2, 2, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::with_devices(comm, 0);
        assert!(matches!(
            AmgxOperator::new(comm, &a, &solver_params("PCG"), &library),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(library.live_handles(), 0);
        assert!(!library.is_initialized());
    });
}

#[test]
fn test_device_per_rank() {
    on_threads(4, |comm| {
        let partition = CartesianPartition::new(6, 6, 2, 2).unwrap();
        let map = cartesian_2d(comm, 6, 6, 2, 2, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::with_devices(comm, 2);
        let op = AmgxOperator::new(comm, &a, &solver_params("PCG"), &library).unwrap();
        assert_eq!(op.resources().device(), Some(comm.rank() % 2));
        assert_eq!(op.resources().option("communicator"), Some("MPI"));
        assert_eq!(op.resources().option("solver"), Some("PCG"));
    });
}

#[test]
fn test_single_rank_resources() {
    let partition = CartesianPartition::new(3, 3, 1, 1).unwrap();
    let map = cartesian_2d(&SelfComm, 3, 3, 1, 1, &HashedMapFactory).unwrap();
    let a = laplace_2d::<_, f64>(&SelfComm, &partition, map, &HashedMapFactory).unwrap();
    // Single-process resources do not ask for a device
    let library = HostLibrary::with_devices(&SelfComm, 0);
    let op = AmgxOperator::new(&SelfComm, &a, &solver_params("PCG"), &library).unwrap();
    assert_eq!(op.resources().device(), None);
    assert_eq!(op.resources().option("communicator"), None);
}
