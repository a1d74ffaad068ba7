//! Binding to the native AMGX library
use crate::amgx::ffi;
use crate::amgx::CommPattern;
use crate::traits::SolverLibrary;
use crate::types::{Error, Mode, Result, SolveStatus};
use libc::{c_char, c_int, c_void};
use log::debug;
use mpi::ffi::MPI_Comm;
use mpi::raw::AsRaw;
use mpi::topology::{Communicator, SimpleCommunicator};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

fn error_string(rc: ffi::AMGX_RC) -> String {
    let mut buf = [0 as c_char; 256];
    let status =
        unsafe { ffi::AMGX_get_error_string(rc, buf.as_mut_ptr(), buf.len() as c_int) };
    if status != ffi::AMGX_RC_OK {
        return format!("unknown AMGX error {rc}");
    }
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn check(rc: ffi::AMGX_RC) -> Result<()> {
    if rc == ffi::AMGX_RC_OK {
        Ok(())
    } else {
        Err(Error::Library {
            code: rc,
            message: error_string(rc),
        })
    }
}

fn ordinal(value: usize) -> Result<c_int> {
    c_int::try_from(value)
        .map_err(|_| Error::Unsupported(format!("{value} does not fit in a 32-bit ordinal")))
}

fn ordinals(values: &[usize]) -> Result<Vec<c_int>> {
    values.iter().map(|v| ordinal(*v)).collect()
}

fn c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::Parameter(format!("\"{s}\" contains a nul byte")))
}

/// The AMGX library, distributed over an MPI communicator
pub struct AmgxLibrary<'c> {
    comm: &'c SimpleCommunicator,
    // AMGX keeps a pointer to the communicator for the lifetime of the resources
    raw_comm: Box<MPI_Comm>,
}

impl<'c> AmgxLibrary<'c> {
    /// Bind the library to `comm`
    pub fn new(comm: &'c SimpleCommunicator) -> Self {
        Self {
            comm,
            raw_comm: Box::new(comm.as_raw()),
        }
    }
}

impl SolverLibrary for AmgxLibrary<'_> {
    type Config = ffi::AMGX_config_handle;
    type Resources = ffi::AMGX_resources_handle;
    type Solver = ffi::AMGX_solver_handle;
    type Matrix = ffi::AMGX_matrix_handle;
    type Vector = ffi::AMGX_vector_handle;

    fn initialize(&self) -> Result<()> {
        check(unsafe { ffi::AMGX_initialize() })?;
        check(unsafe { ffi::AMGX_initialize_plugins() })?;
        check(unsafe { ffi::AMGX_install_signal_handler() })
    }

    fn finalize(&self) -> Result<()> {
        check(unsafe { ffi::AMGX_reset_signal_handler() })?;
        check(unsafe { ffi::AMGX_finalize_plugins() })?;
        check(unsafe { ffi::AMGX_finalize() })
    }

    fn config_create(&self, options: &str) -> Result<Self::Config> {
        let options = c_string(options)?;
        let mut cfg = ptr::null_mut();
        check(unsafe { ffi::AMGX_config_create(&mut cfg, options.as_ptr()) })?;
        Ok(cfg)
    }

    fn config_create_from_file(&self, path: &Path) -> Result<Self::Config> {
        let path = c_string(&path.to_string_lossy())?;
        let mut cfg = ptr::null_mut();
        check(unsafe { ffi::AMGX_config_create_from_file(&mut cfg, path.as_ptr()) })?;
        Ok(cfg)
    }

    fn config_add_parameters(&self, config: &mut Self::Config, options: &str) -> Result<()> {
        let options = c_string(options)?;
        check(unsafe { ffi::AMGX_config_add_parameters(config, options.as_ptr()) })
    }

    fn config_destroy(&self, config: Self::Config) -> Result<()> {
        check(unsafe { ffi::AMGX_config_destroy(config) })
    }

    fn device_count(&self) -> Result<usize> {
        let mut count: c_int = 0;
        let rc = unsafe { ffi::cudaGetDeviceCount(&mut count) };
        if rc != ffi::CUDA_SUCCESS {
            return Err(Error::Library {
                code: rc,
                message: "cudaGetDeviceCount failed".to_string(),
            });
        }
        Ok(count.max(0) as usize)
    }

    fn resources_create_simple(&self, config: &Self::Config) -> Result<Self::Resources> {
        let mut rsc = ptr::null_mut();
        check(unsafe { ffi::AMGX_resources_create_simple(&mut rsc, *config) })?;
        Ok(rsc)
    }

    fn resources_create(&self, config: &Self::Config, device: usize) -> Result<Self::Resources> {
        let devices = [ordinal(device)?];
        let comm = &*self.raw_comm as *const MPI_Comm as *mut c_void;
        debug!("[{}]: AMGX resources on device {device}", self.comm.rank());
        let mut rsc = ptr::null_mut();
        check(unsafe {
            ffi::AMGX_resources_create(&mut rsc, *config, comm, 1, devices.as_ptr())
        })?;
        Ok(rsc)
    }

    fn resources_destroy(&self, resources: Self::Resources) -> Result<()> {
        check(unsafe { ffi::AMGX_resources_destroy(resources) })
    }

    fn solver_create(
        &self,
        resources: &Self::Resources,
        mode: Mode,
        config: &Self::Config,
    ) -> Result<Self::Solver> {
        let mut slv = ptr::null_mut();
        check(unsafe { ffi::AMGX_solver_create(&mut slv, *resources, mode.as_raw(), *config) })?;
        Ok(slv)
    }

    fn solver_destroy(&self, solver: Self::Solver) -> Result<()> {
        check(unsafe { ffi::AMGX_solver_destroy(solver) })
    }

    fn matrix_create(&self, resources: &Self::Resources, mode: Mode) -> Result<Self::Matrix> {
        let mut mtx = ptr::null_mut();
        check(unsafe { ffi::AMGX_matrix_create(&mut mtx, *resources, mode.as_raw()) })?;
        Ok(mtx)
    }

    fn matrix_destroy(&self, matrix: Self::Matrix) -> Result<()> {
        check(unsafe { ffi::AMGX_matrix_destroy(matrix) })
    }

    fn vector_create(&self, resources: &Self::Resources, mode: Mode) -> Result<Self::Vector> {
        let mut vec = ptr::null_mut();
        check(unsafe { ffi::AMGX_vector_create(&mut vec, *resources, mode.as_raw()) })?;
        Ok(vec)
    }

    fn vector_destroy(&self, vector: Self::Vector) -> Result<()> {
        check(unsafe { ffi::AMGX_vector_destroy(vector) })
    }

    fn matrix_comm_from_maps_one_ring(
        &self,
        matrix: &Self::Matrix,
        pattern: &CommPattern,
    ) -> Result<()> {
        let neighbors = ordinals(pattern.neighbors())?;
        let send_maps = pattern
            .send_maps()
            .iter()
            .map(|m| ordinals(m))
            .collect::<Result<Vec<_>>>()?;
        let recv_maps = pattern
            .recv_maps()
            .iter()
            .map(|m| ordinals(m))
            .collect::<Result<Vec<_>>>()?;
        let send_sizes = send_maps
            .iter()
            .map(|m| ordinal(m.len()))
            .collect::<Result<Vec<_>>>()?;
        let recv_sizes = recv_maps
            .iter()
            .map(|m| ordinal(m.len()))
            .collect::<Result<Vec<_>>>()?;
        let send_ptrs = send_maps.iter().map(|m| m.as_ptr()).collect::<Vec<_>>();
        let recv_ptrs = recv_maps.iter().map(|m| m.as_ptr()).collect::<Vec<_>>();
        check(unsafe {
            ffi::AMGX_matrix_comm_from_maps_one_ring(
                *matrix,
                1,
                ordinal(neighbors.len())?,
                neighbors.as_ptr(),
                send_sizes.as_ptr(),
                send_ptrs.as_ptr(),
                recv_sizes.as_ptr(),
                recv_ptrs.as_ptr(),
            )
        })
    }

    fn matrix_upload_all(
        &self,
        matrix: &Self::Matrix,
        row_ptr: &[usize],
        col_indices: &[usize],
        values: &[f64],
    ) -> Result<()> {
        let n = ordinal(row_ptr.len().saturating_sub(1))?;
        let nnz = ordinal(values.len())?;
        let row_ptr = ordinals(row_ptr)?;
        let col_indices = ordinals(col_indices)?;
        check(unsafe {
            ffi::AMGX_matrix_upload_all(
                *matrix,
                n,
                nnz,
                1,
                1,
                row_ptr.as_ptr(),
                col_indices.as_ptr(),
                values.as_ptr() as *const c_void,
                ptr::null(),
            )
        })
    }

    fn matrix_get_size(&self, matrix: &Self::Matrix) -> Result<(usize, usize, usize)> {
        let (mut n, mut bx, mut by): (c_int, c_int, c_int) = (0, 0, 0);
        check(unsafe { ffi::AMGX_matrix_get_size(*matrix, &mut n, &mut bx, &mut by) })?;
        Ok((n as usize, bx as usize, by as usize))
    }

    fn vector_bind(&self, vector: &Self::Vector, matrix: &Self::Matrix) -> Result<()> {
        check(unsafe { ffi::AMGX_vector_bind(*vector, *matrix) })
    }

    fn vector_upload(&self, vector: &Self::Vector, data: &[f64]) -> Result<()> {
        let n = ordinal(data.len())?;
        check(unsafe { ffi::AMGX_vector_upload(*vector, n, 1, data.as_ptr() as *const c_void) })
    }

    fn vector_download(&self, vector: &Self::Vector, data: &mut [f64]) -> Result<()> {
        let (mut n, mut block_dim): (c_int, c_int) = (0, 0);
        check(unsafe { ffi::AMGX_vector_get_size(*vector, &mut n, &mut block_dim) })?;
        let len = n as usize * block_dim as usize;
        if len != data.len() {
            return Err(Error::InvalidMatrix(format!(
                "vector of length {len} downloaded into {} entries",
                data.len()
            )));
        }
        check(unsafe { ffi::AMGX_vector_download(*vector, data.as_mut_ptr() as *mut c_void) })
    }

    fn solver_setup(&self, solver: &Self::Solver, matrix: &Self::Matrix) -> Result<()> {
        check(unsafe { ffi::AMGX_solver_setup(*solver, *matrix) })
    }

    fn solver_solve(
        &self,
        solver: &Self::Solver,
        rhs: &Self::Vector,
        solution: &Self::Vector,
    ) -> Result<()> {
        check(unsafe { ffi::AMGX_solver_solve(*solver, *rhs, *solution) })
    }

    fn solver_iterations(&self, solver: &Self::Solver) -> Result<usize> {
        let mut n: c_int = 0;
        check(unsafe { ffi::AMGX_solver_get_iterations_number(*solver, &mut n) })?;
        Ok(n.max(0) as usize)
    }

    fn solver_status(&self, solver: &Self::Solver) -> Result<SolveStatus> {
        let mut status: ffi::AMGX_SOLVE_STATUS = 0;
        check(unsafe { ffi::AMGX_solver_get_status(*solver, &mut status) })?;
        SolveStatus::from_raw(status)
    }
}
