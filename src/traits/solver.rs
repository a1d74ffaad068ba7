//! External solver libraries
use crate::amgx::CommPattern;
use crate::types::{Error, Mode, Result, SolveStatus};
use num::complex::Complex;
use std::path::Path;

/// The handle-based API of an iterative solver library.
///
/// Handles are created and destroyed explicitly; [crate::amgx::handles] wraps
/// them in owners that release them on drop.
pub trait SolverLibrary {
    /// Configuration handle
    type Config;
    /// Resources handle
    type Resources;
    /// Solver handle
    type Solver;
    /// Matrix handle
    type Matrix;
    /// Vector handle
    type Vector;

    /// Initialise the library and its plugins
    fn initialize(&self) -> Result<()>;

    /// Finalise the library and its plugins
    fn finalize(&self) -> Result<()>;

    /// Create a configuration from a `name=value, ...` string
    fn config_create(&self, options: &str) -> Result<Self::Config>;

    /// Create a configuration from a file
    fn config_create_from_file(&self, path: &Path) -> Result<Self::Config>;

    /// Add `name=value, ...` options to a configuration
    fn config_add_parameters(&self, config: &mut Self::Config, options: &str) -> Result<()>;

    /// Destroy a configuration
    fn config_destroy(&self, config: Self::Config) -> Result<()>;

    /// The number of devices visible to this process
    fn device_count(&self) -> Result<usize>;

    /// Create single-process resources
    fn resources_create_simple(&self, config: &Self::Config) -> Result<Self::Resources>;

    /// Create resources that span the communicator, using one device
    fn resources_create(&self, config: &Self::Config, device: usize) -> Result<Self::Resources>;

    /// Destroy resources
    fn resources_destroy(&self, resources: Self::Resources) -> Result<()>;

    /// Create a solver
    fn solver_create(
        &self,
        resources: &Self::Resources,
        mode: Mode,
        config: &Self::Config,
    ) -> Result<Self::Solver>;

    /// Destroy a solver
    fn solver_destroy(&self, solver: Self::Solver) -> Result<()>;

    /// Create a matrix
    fn matrix_create(&self, resources: &Self::Resources, mode: Mode) -> Result<Self::Matrix>;

    /// Destroy a matrix
    fn matrix_destroy(&self, matrix: Self::Matrix) -> Result<()>;

    /// Create a vector
    fn vector_create(&self, resources: &Self::Resources, mode: Mode) -> Result<Self::Vector>;

    /// Destroy a vector
    fn vector_destroy(&self, vector: Self::Vector) -> Result<()>;

    /// Register the neighbour communication maps of a matrix with a halo of depth one
    fn matrix_comm_from_maps_one_ring(
        &self,
        matrix: &Self::Matrix,
        pattern: &CommPattern,
    ) -> Result<()>;

    /// Upload a CSR matrix with scalar blocks
    fn matrix_upload_all(
        &self,
        matrix: &Self::Matrix,
        row_ptr: &[usize],
        col_indices: &[usize],
        values: &[f64],
    ) -> Result<()>;

    /// The number of block rows of a matrix and the block dimensions
    fn matrix_get_size(&self, matrix: &Self::Matrix) -> Result<(usize, usize, usize)>;

    /// Bind a vector to the communication maps of a matrix
    fn vector_bind(&self, vector: &Self::Vector, matrix: &Self::Matrix) -> Result<()>;

    /// Upload vector data
    fn vector_upload(&self, vector: &Self::Vector, data: &[f64]) -> Result<()>;

    /// Download vector data
    fn vector_download(&self, vector: &Self::Vector, data: &mut [f64]) -> Result<()>;

    /// Set up the solver for a matrix
    fn solver_setup(&self, solver: &Self::Solver, matrix: &Self::Matrix) -> Result<()>;

    /// Solve with right-hand side `rhs`; `solution` holds the initial guess on entry
    fn solver_solve(
        &self,
        solver: &Self::Solver,
        rhs: &Self::Vector,
        solution: &Self::Vector,
    ) -> Result<()>;

    /// The number of iterations of the last solve
    fn solver_iterations(&self, solver: &Self::Solver) -> Result<usize>;

    /// The status of the last solve
    fn solver_status(&self, solver: &Self::Solver) -> Result<SolveStatus>;
}

/// Scalar types that may be handed to a solver library.
pub trait SolverScalar: Copy + Send + Sync + 'static {
    /// View values in the precision the library is bound in.
    ///
    /// Fails for types the library cannot use.
    fn as_f64_slice(values: &[Self]) -> Result<&[f64]>;
}

impl SolverScalar for f64 {
    fn as_f64_slice(values: &[Self]) -> Result<&[f64]> {
        Ok(values)
    }
}

macro_rules! unsupported_scalar {
    ($($dtype:ty),*) => {
        $(
            impl SolverScalar for $dtype {
                fn as_f64_slice(_values: &[Self]) -> Result<&[f64]> {
                    Err(Error::Unsupported(format!(
                        "Cannot use AmgxOperator with scalar {} (only f64 is supported)",
                        stringify!($dtype)
                    )))
                }
            }
        )*
    };
}

unsupported_scalar!(f32, Complex<f32>, Complex<f64>);

#[cfg(test)]
mod test {
    use super::SolverScalar;
    use crate::types::Error;
    use num::complex::Complex;

    #[test]
    fn test_f64_is_supported() {
        let v = [1.0, 2.0];
        assert_eq!(f64::as_f64_slice(&v).unwrap(), &v);
    }

    #[test]
    fn test_other_scalars_are_unsupported() {
        assert!(matches!(
            f32::as_f64_slice(&[1.0]),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            Complex::<f64>::as_f64_slice(&[Complex::new(1.0, 0.0)]),
            Err(Error::Unsupported(_))
        ));
    }
}
