//! Solver library as an operator
use crate::amgx::handles::{
    ScopedConfig, ScopedMatrix, ScopedResources, ScopedSolver, ScopedVector, Session,
};
use crate::amgx::{neighbor_ranks, reorder_csr, CommPattern, Renumbering};
use crate::params::ParameterList;
use crate::sparse::{DistributedCsrMatrix, MultiVector};
use crate::traits::{Comm, DistributedMap, Operator, SolverLibrary, SolverScalar};
use crate::types::{Error, Mode, Result, SolveStatus, Transpose};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Name of the sublist holding the solver configuration
pub const PARAMS_SUBLIST: &str = "amgx:params";

/// Parameter naming a configuration file; other parameters are then ignored
pub const CONFIG_FILE: &str = "json file";

/// The largest index the library's 32-bit ordinals can hold
const MAX_ORDINAL: usize = i32::MAX as usize;

/// An operator that applies an iterative solver of a [SolverLibrary].
///
/// Applying the operator to `x` solves `A y = x`. The matrix is copied into
/// the library on construction; every handle is released when the operator
/// is dropped.
pub struct AmgxOperator<'a, L: SolverLibrary> {
    // Fields drop in declaration order, which releases handles in reverse
    // order of creation
    y: ScopedVector<'a, L>,
    x: ScopedVector<'a, L>,
    matrix: ScopedMatrix<'a, L>,
    solver: ScopedSolver<'a, L>,
    resources: ScopedResources<'a, L>,
    _config: ScopedConfig<'a, L>,
    _session: Session<'a, L>,
    library: &'a L,
    n: usize,
    renumbering: Renumbering,
    pattern: Option<CommPattern>,
    domain_map: Arc<dyn DistributedMap>,
    range_map: Arc<dyn DistributedMap>,
}

impl<'a, L: SolverLibrary> AmgxOperator<'a, L> {
    /// Upload `matrix` and set up the solver configured by the
    /// [PARAMS_SUBLIST] sublist of `params`.
    ///
    /// This is collective over `comm`.
    pub fn new<C: Comm, T: SolverScalar>(
        comm: &C,
        matrix: &DistributedCsrMatrix<T>,
        params: &ParameterList,
        library: &'a L,
    ) -> Result<Self> {
        let values = T::as_f64_slice(matrix.values())?;
        if matrix.global_rows() > MAX_ORDINAL || matrix.local_nnz() > MAX_ORDINAL {
            return Err(Error::Unsupported(format!(
                "a matrix with {} rows and {} local entries exceeds 32-bit ordinals",
                matrix.global_rows(),
                matrix.local_nnz()
            )));
        }
        let configs = params.sublist(PARAMS_SUBLIST).ok_or_else(|| {
            Error::Parameter(format!("missing required sublist \"{PARAMS_SUBLIST}\""))
        })?;

        let session = Session::new(library)?;

        let mut config = match configs.get(CONFIG_FILE) {
            Some(path) => {
                let path = path.as_str().ok_or_else(|| {
                    Error::Parameter(format!("\"{CONFIG_FILE}\" must be a string"))
                })?;
                info!("Reading solver configuration from {path}");
                ScopedConfig::new(library, library.config_create_from_file(Path::new(path))?)
            }
            None => {
                let options = configs.to_options_string();
                debug!("Solver configuration: {options}");
                ScopedConfig::new(library, library.config_create(&options)?)
            }
        };

        let resources = if comm.size() == 1 {
            library.resources_create_simple(config.handle())?
        } else {
            library.config_add_parameters(config.handle_mut(), "communicator=MPI")?;
            let devices = library.device_count()?;
            if devices == 0 {
                return Err(Error::Unsupported(format!(
                    "rank {} sees no device to run the solver on",
                    comm.rank()
                )));
            }
            let device = comm.rank() % devices;
            debug!("[{}]: using device {device} of {devices}", comm.rank());
            library.resources_create(config.handle(), device)?
        };
        let resources = ScopedResources::new(library, resources);

        let mode = Mode::DeviceDDI;
        let solver = ScopedSolver::new(
            library,
            library.solver_create(resources.handle(), mode, config.handle())?,
        );
        let device_matrix =
            ScopedMatrix::new(library, library.matrix_create(resources.handle(), mode)?);
        let x = ScopedVector::new(library, library.vector_create(resources.handle(), mode)?);
        let y = ScopedVector::new(library, library.vector_create(resources.handle(), mode)?);

        let n = matrix.local_rows();
        let (renumbering, pattern) = if comm.size() == 1 {
            if matrix.local_cols() != n {
                return Err(Error::InvalidMatrix(format!(
                    "{} columns for {n} rows on a single rank",
                    matrix.local_cols()
                )));
            }
            (Renumbering::identity(n), None)
        } else {
            let import = matrix.import().ok_or(Error::MissingImport)?;
            let neighbors = neighbor_ranks(import)?;
            let renumbering = Renumbering::new(n, import, &neighbors)?;
            let pattern = CommPattern::new(import, &neighbors, &renumbering)?;
            debug!(
                "[{}]: neighbours {:?}, send maps {:?}, receive maps {:?}",
                comm.rank(),
                pattern.neighbors(),
                pattern.send_maps(),
                pattern.recv_maps()
            );
            library.matrix_comm_from_maps_one_ring(device_matrix.handle(), &pattern)?;
            library.vector_bind(x.handle(), device_matrix.handle())?;
            library.vector_bind(y.handle(), device_matrix.handle())?;
            (renumbering, Some(pattern))
        };

        let csr = reorder_csr(
            matrix.row_ptr(),
            matrix.col_indices(),
            values,
            &renumbering,
        );
        debug!(
            "[{}]: uploading {n} rows with {} entries",
            comm.rank(),
            csr.values.len()
        );
        library.matrix_upload_all(
            device_matrix.handle(),
            &csr.row_ptr,
            &csr.col_indices,
            &csr.values,
        )?;
        library.solver_setup(solver.handle(), device_matrix.handle())?;

        Ok(Self {
            y,
            x,
            matrix: device_matrix,
            solver,
            resources,
            _config: config,
            _session: session,
            library,
            n,
            renumbering,
            pattern,
            domain_map: matrix.domain_map().clone(),
            range_map: matrix.range_map().clone(),
        })
    }

    /// The number of iterations of the last solve
    pub fn iterations(&self) -> Result<usize> {
        self.library.solver_iterations(self.solver.handle())
    }

    /// The status of the last solve
    pub fn status(&self) -> Result<SolveStatus> {
        self.library.solver_status(self.solver.handle())
    }

    /// The number of local rows held by the library
    pub fn size(&self) -> Result<usize> {
        let (n, _, _) = self.library.matrix_get_size(self.matrix.handle())?;
        Ok(n)
    }

    /// The resources handle the solver runs on
    pub fn resources(&self) -> &L::Resources {
        self.resources.handle()
    }

    /// Map from local column indices to the library's indices
    pub fn renumbering(&self) -> &Renumbering {
        &self.renumbering
    }

    /// Neighbour communication maps, if the matrix is distributed
    pub fn comm_pattern(&self) -> Option<&CommPattern> {
        self.pattern.as_ref()
    }
}

impl<L: SolverLibrary> Operator<f64> for AmgxOperator<'_, L> {
    fn domain_map(&self) -> &Arc<dyn DistributedMap> {
        &self.domain_map
    }

    fn range_map(&self) -> &Arc<dyn DistributedMap> {
        &self.range_map
    }

    /// Solve with right-hand sides `x` and set `y = alpha * solution + beta * y`.
    ///
    /// The entries of `y` are the initial guess.
    fn apply(
        &self,
        x: &MultiVector<f64>,
        y: &mut MultiVector<f64>,
        mode: Transpose,
        alpha: f64,
        beta: f64,
    ) -> Result<()> {
        if mode != Transpose::NoTrans {
            return Err(Error::Unsupported(format!(
                "AmgxOperator cannot be applied with mode {mode:?}"
            )));
        }
        if x.num_vectors() != y.num_vectors()
            || x.local_length() != self.n
            || y.local_length() != self.n
        {
            return Err(Error::InvalidMatrix(format!(
                "vectors of {}x{} and {}x{} entries for an operator with {} rows",
                x.local_length(),
                x.num_vectors(),
                y.local_length(),
                y.num_vectors(),
                self.n
            )));
        }

        let mut rhs = vec![0.0; self.n];
        let mut solution = vec![0.0; self.n];
        for i in 0..x.num_vectors() {
            self.renumbering.to_solver_order(x.column(i), &mut rhs);
            self.renumbering.to_solver_order(y.column(i), &mut solution);
            self.library.vector_upload(self.x.handle(), &rhs)?;
            self.library.vector_upload(self.y.handle(), &solution)?;
            self.library
                .solver_solve(self.solver.handle(), self.x.handle(), self.y.handle())?;
            self.library
                .vector_download(self.y.handle(), &mut solution)?;

            let column = y.column_mut(i);
            for (local, value) in column.iter_mut().enumerate() {
                let s = solution[self.renumbering.to_solver(local)];
                *value = if beta == 0.0 {
                    alpha * s
                } else {
                    alpha * s + beta * *value
                };
            }
        }
        Ok(())
    }

    fn has_transpose_apply(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::{AmgxOperator, PARAMS_SUBLIST};
    use crate::amgx::HostLibrary;
    use crate::comm::SelfComm;
    use crate::map::{cartesian_2d, CartesianPartition, HashedMapFactory};
    use crate::params::ParameterList;
    use crate::sparse::{laplace_2d, MultiVector};
    use crate::traits::Operator;
    use crate::types::{Error, SolveStatus, Transpose};
    use approx::assert_relative_eq;

    fn params(options: &[(&str, &str)]) -> ParameterList {
        let mut params = ParameterList::new("MueLu");
        let sublist = params.sublist_mut(PARAMS_SUBLIST);
        for (name, value) in options {
            sublist.set(name, *value);
        }
        params
    }

    #[test]
    fn test_serial_solve() {
        let comm = SelfComm;
        let partition = CartesianPartition::new(4, 3, 1, 1).unwrap();
        let map = cartesian_2d(&comm, 4, 3, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&comm, &partition, map.clone(), &HashedMapFactory).unwrap();
        let library = HostLibrary::new(&comm);
        let op = AmgxOperator::new(&comm, &a, &params(&[("solver", "PCG")]), &library).unwrap();
        assert_eq!(op.size().unwrap(), 12);
        assert!(op.comm_pattern().is_none());
        assert!(!op.has_transpose_apply());

        let expected = (0..12).map(|i| i as f64).collect::<Vec<_>>();
        let mut b = vec![0.0; 12];
        a.multiply(&comm, &expected, &mut b).unwrap();
        let b = MultiVector::from_columns(map.clone(), vec![b]).unwrap();
        let mut x = MultiVector::new(map, 1);
        op.apply(&b, &mut x, Transpose::NoTrans, 1.0, 0.0).unwrap();

        assert_eq!(op.status().unwrap(), SolveStatus::Success);
        assert!(op.iterations().unwrap() > 0);
        for (xi, ei) in x.column(0).iter().zip(&expected) {
            assert_relative_eq!(*xi, *ei, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_alpha_beta() {
        let comm = SelfComm;
        let partition = CartesianPartition::new(2, 2, 1, 1).unwrap();
        let map = cartesian_2d(&comm, 2, 2, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&comm, &partition, map.clone(), &HashedMapFactory).unwrap();
        let library = HostLibrary::new(&comm);
        let op = AmgxOperator::new(&comm, &a, &params(&[]), &library).unwrap();

        // A has row sums 2, so the solution for b = 2 is 1 everywhere
        let b = MultiVector::from_columns(map.clone(), vec![vec![2.0; 4]]).unwrap();
        let mut y = MultiVector::from_columns(map, vec![vec![10.0; 4]]).unwrap();
        op.apply(&b, &mut y, Transpose::NoTrans, 2.0, 0.5).unwrap();
        for yi in y.column(0) {
            assert_relative_eq!(*yi, 7.0, epsilon = 1e-8);
        }
        assert!(matches!(
            op.apply(&b, &mut y, Transpose::Trans, 1.0, 0.0),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_missing_sublist() {
        let comm = SelfComm;
        let partition = CartesianPartition::new(2, 2, 1, 1).unwrap();
        let map = cartesian_2d(&comm, 2, 2, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::new(&comm);
        let result = AmgxOperator::new(&comm, &a, &ParameterList::new("MueLu"), &library);
        assert!(matches!(result, Err(Error::Parameter(_))));
        assert_eq!(library.live_handles(), 0);
        assert!(!library.is_initialized());
    }

    #[test]
    fn test_failed_construction_releases_handles() {
        let comm = SelfComm;
        let partition = CartesianPartition::new(2, 2, 1, 1).unwrap();
        let map = cartesian_2d(&comm, 2, 2, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::new(&comm);
        let result = AmgxOperator::new(&comm, &a, &params(&[("solver", "GMRES")]), &library);
        assert!(matches!(result, Err(Error::Library { .. })));
        assert_eq!(library.live_handles(), 0);
        assert!(!library.is_initialized());
    }

    #[test]
    fn test_drop_releases_handles() {
        let comm = SelfComm;
        let partition = CartesianPartition::new(2, 2, 1, 1).unwrap();
        let map = cartesian_2d(&comm, 2, 2, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&comm, &partition, map, &HashedMapFactory).unwrap();
        let library = HostLibrary::new(&comm);
        {
            let _op = AmgxOperator::new(&comm, &a, &params(&[]), &library).unwrap();
            assert_eq!(library.live_handles(), 6);
        }
        assert_eq!(library.live_handles(), 0);
        assert!(!library.is_initialized());
    }
}
