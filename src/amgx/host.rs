//! A solver library running on the host
use crate::amgx::CommPattern;
use crate::traits::{Comm, SolverLibrary};
use crate::types::{Error, Mode, Result, SolveStatus};
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// Return codes shared with AMGX
const RC_BAD_PARAMETERS: i32 = 1;
const RC_BAD_MODE: i32 = 9;
const RC_BAD_CONFIGURATION: i32 = 12;

fn library_error(code: i32, message: impl Into<String>) -> Error {
    Error::Library {
        code,
        message: message.into(),
    }
}

/// Iterative method of the host solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMethod {
    /// Conjugate gradients preconditioned with the inverse diagonal
    Pcg,
    /// Damped Jacobi iteration
    Jacobi,
}

/// Settings read from a configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HostSettings {
    /// Iterative method (`solver`)
    pub method: HostMethod,
    /// Iteration limit (`max_iters`)
    pub max_iters: usize,
    /// Residual reduction relative to the right-hand side (`tolerance`)
    pub tolerance: f64,
    /// Damping of the Jacobi iteration (`relaxation_factor`)
    pub relaxation_factor: f64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            method: HostMethod::Pcg,
            max_iters: 100,
            tolerance: 1e-10,
            relaxation_factor: 0.9,
        }
    }
}

impl HostSettings {
    fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        let mut settings = Self::default();
        for (key, value) in options {
            let invalid = || library_error(RC_BAD_CONFIGURATION, format!("invalid value {key}={value}"));
            match key.as_str() {
                "solver" => {
                    settings.method = match value.to_ascii_uppercase().as_str() {
                        "PCG" | "CG" => HostMethod::Pcg,
                        "JACOBI" | "BLOCK_JACOBI" | "JACOBI_L1" => HostMethod::Jacobi,
                        _ => {
                            return Err(library_error(
                                RC_BAD_CONFIGURATION,
                                format!("unsupported solver {value}"),
                            ))
                        }
                    }
                }
                "max_iters" => settings.max_iters = value.parse().map_err(|_| invalid())?,
                "tolerance" => settings.tolerance = value.parse().map_err(|_| invalid())?,
                "relaxation_factor" => {
                    settings.relaxation_factor = value.parse().map_err(|_| invalid())?
                }
                _ => debug!("Host solver ignores option {key}={value}"),
            }
        }
        Ok(settings)
    }
}

/// Parse `name=value` pairs separated by commas or new lines; `#` starts a comment
fn parse_options(text: &str, options: &mut BTreeMap<String, String>) -> Result<()> {
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default();
        for item in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((key, value)) => {
                    options.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    return Err(library_error(
                        RC_BAD_CONFIGURATION,
                        format!("expected name=value, found \"{item}\""),
                    ))
                }
            }
        }
    }
    Ok(())
}

fn check_mode(mode: Mode) -> Result<()> {
    match mode {
        Mode::HostDDI | Mode::DeviceDDI => Ok(()),
        _ => Err(library_error(
            RC_BAD_MODE,
            format!("the host solver only supports double precision, not {mode:?}"),
        )),
    }
}

/// Configuration handle
#[derive(Debug)]
pub struct HostConfig {
    options: BTreeMap<String, String>,
}

/// Resources handle
#[derive(Debug)]
pub struct HostResources {
    device: Option<usize>,
    options: BTreeMap<String, String>,
}

impl HostResources {
    /// The device the resources were created on; `None` for single-process resources
    pub fn device(&self) -> Option<usize> {
        self.device
    }

    /// The value of a configuration option when the resources were created
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
struct MatrixData {
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
    pattern: Option<CommPattern>,
    uploaded: bool,
}

impl MatrixData {
    fn n_rows(&self) -> usize {
        self.row_ptr.len().saturating_sub(1)
    }
}

/// Matrix handle
#[derive(Debug)]
pub struct HostMatrix {
    data: RefCell<MatrixData>,
}

/// Vector handle
#[derive(Debug)]
pub struct HostVector {
    values: RefCell<Vec<f64>>,
    bound: Cell<bool>,
}

struct SetupData {
    matrix: MatrixData,
    inverse_diagonal: Vec<f64>,
}

/// Solver handle
pub struct HostSolver {
    settings: HostSettings,
    setup: RefCell<Option<SetupData>>,
    iterations: Cell<usize>,
    status: Cell<Option<SolveStatus>>,
}

/// A [SolverLibrary] that solves on the CPU.
///
/// Distributed solves exchange halo values through the communication maps
/// registered with the matrix, using the communicator the library was created
/// with.
pub struct HostLibrary<'c, C: Comm> {
    comm: &'c C,
    devices: usize,
    live: Cell<usize>,
    sessions: Cell<usize>,
}

impl<'c, C: Comm> HostLibrary<'c, C> {
    /// Create a library that solves over `comm` and reports one device
    pub fn new(comm: &'c C) -> Self {
        Self::with_devices(comm, 1)
    }

    /// Create a library that reports `devices` devices to each rank
    pub fn with_devices(comm: &'c C, devices: usize) -> Self {
        Self {
            comm,
            devices,
            live: Cell::new(0),
            sessions: Cell::new(0),
        }
    }

    /// The number of handles that have been created and not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.live.get()
    }

    /// Check if the library is initialised
    pub fn is_initialized(&self) -> bool {
        self.sessions.get() > 0
    }

    fn created<H>(&self, handle: H) -> Result<H> {
        self.live.set(self.live.get() + 1);
        Ok(handle)
    }

    fn destroyed(&self) -> Result<()> {
        match self.live.get() {
            0 => Err(library_error(RC_BAD_PARAMETERS, "no live handle to destroy")),
            n => {
                self.live.set(n - 1);
                Ok(())
            }
        }
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        self.comm
            .all_reduce_sum(a.iter().zip(b).map(|(x, y)| x * y).sum())
    }

    fn norm(&self, a: &[f64]) -> f64 {
        self.dot(a, a).sqrt()
    }

    /// Fill the halo part of `full` from the neighbours
    fn exchange_halo(&self, pattern: &CommPattern, full: &mut [f64]) {
        let outgoing = pattern
            .neighbors()
            .iter()
            .zip(pattern.send_maps())
            .map(|(p, map)| (*p, map.iter().map(|i| full[*i]).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        let received = self.comm.neighbor_exchange(&outgoing, pattern.neighbors());
        for (values, map) in received.iter().zip(pattern.recv_maps()) {
            for (v, i) in values.iter().zip(map) {
                full[*i] = *v;
            }
        }
    }

    /// Compute `out = A x` for the owned part `x`
    fn spmv(&self, matrix: &MatrixData, x: &[f64], out: &mut [f64]) {
        let mut full = x.to_vec();
        full.resize(matrix.n_cols, 0.0);
        if let Some(pattern) = &matrix.pattern {
            self.exchange_halo(pattern, &mut full);
        }
        for (row, value) in out.iter_mut().enumerate() {
            let range = matrix.row_ptr[row]..matrix.row_ptr[row + 1];
            *value = matrix.col_indices[range.clone()]
                .iter()
                .zip(&matrix.values[range])
                .map(|(c, v)| v * full[*c])
                .sum();
        }
    }

    fn residual(&self, matrix: &MatrixData, b: &[f64], x: &[f64], r: &mut [f64]) {
        self.spmv(matrix, x, r);
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
    }

    fn pcg(
        &self,
        settings: &HostSettings,
        setup: &SetupData,
        b: &[f64],
        x: &mut [f64],
        b_norm: f64,
    ) -> (usize, SolveStatus) {
        let n = x.len();
        let mut r = vec![0.0; n];
        self.residual(&setup.matrix, b, x, &mut r);
        if self.norm(&r) <= settings.tolerance * b_norm {
            return (0, SolveStatus::Success);
        }
        let mut z = r
            .iter()
            .zip(&setup.inverse_diagonal)
            .map(|(ri, d)| ri * d)
            .collect::<Vec<_>>();
        let mut p = z.clone();
        let mut q = vec![0.0; n];
        let mut rz = self.dot(&r, &z);
        for it in 1..=settings.max_iters {
            self.spmv(&setup.matrix, &p, &mut q);
            let pq = self.dot(&p, &q);
            if !pq.is_finite() {
                return (it, SolveStatus::Diverged);
            }
            if pq <= 0.0 {
                return (it, SolveStatus::Failed);
            }
            let alpha = rz / pq;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * q[i];
            }
            let r_norm = self.norm(&r);
            if !r_norm.is_finite() {
                return (it, SolveStatus::Diverged);
            }
            if r_norm <= settings.tolerance * b_norm {
                return (it, SolveStatus::Success);
            }
            for i in 0..n {
                z[i] = r[i] * setup.inverse_diagonal[i];
            }
            let rz_next = self.dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }
        (settings.max_iters, SolveStatus::NotConverged)
    }

    fn jacobi(
        &self,
        settings: &HostSettings,
        setup: &SetupData,
        b: &[f64],
        x: &mut [f64],
        b_norm: f64,
    ) -> (usize, SolveStatus) {
        let mut r = vec![0.0; x.len()];
        for it in 0..=settings.max_iters {
            self.residual(&setup.matrix, b, x, &mut r);
            let r_norm = self.norm(&r);
            if !r_norm.is_finite() {
                return (it, SolveStatus::Diverged);
            }
            if r_norm <= settings.tolerance * b_norm {
                return (it, SolveStatus::Success);
            }
            if it == settings.max_iters {
                break;
            }
            for ((xi, ri), d) in x.iter_mut().zip(&r).zip(&setup.inverse_diagonal) {
                *xi += settings.relaxation_factor * d * ri;
            }
        }
        (settings.max_iters, SolveStatus::NotConverged)
    }
}

impl<C: Comm> SolverLibrary for HostLibrary<'_, C> {
    type Config = HostConfig;
    type Resources = HostResources;
    type Solver = HostSolver;
    type Matrix = HostMatrix;
    type Vector = HostVector;

    fn initialize(&self) -> Result<()> {
        self.sessions.set(self.sessions.get() + 1);
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        match self.sessions.get() {
            0 => Err(library_error(RC_BAD_PARAMETERS, "library is not initialized")),
            n => {
                self.sessions.set(n - 1);
                Ok(())
            }
        }
    }

    fn config_create(&self, options: &str) -> Result<HostConfig> {
        let mut parsed = BTreeMap::new();
        parse_options(options, &mut parsed)?;
        self.created(HostConfig { options: parsed })
    }

    fn config_create_from_file(&self, path: &Path) -> Result<HostConfig> {
        let text = fs::read_to_string(path)?;
        info!("Reading host solver configuration from {}", path.display());
        self.config_create(&text)
    }

    fn config_add_parameters(&self, config: &mut HostConfig, options: &str) -> Result<()> {
        parse_options(options, &mut config.options)
    }

    fn config_destroy(&self, _config: HostConfig) -> Result<()> {
        self.destroyed()
    }

    fn device_count(&self) -> Result<usize> {
        Ok(self.devices)
    }

    fn resources_create_simple(&self, config: &HostConfig) -> Result<HostResources> {
        self.created(HostResources {
            device: None,
            options: config.options.clone(),
        })
    }

    fn resources_create(&self, config: &HostConfig, device: usize) -> Result<HostResources> {
        if device >= self.device_count()? {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                format!("device {device} does not exist"),
            ));
        }
        self.created(HostResources {
            device: Some(device),
            options: config.options.clone(),
        })
    }

    fn resources_destroy(&self, resources: HostResources) -> Result<()> {
        debug!("Releasing host resources on device {:?}", resources.device);
        self.destroyed()
    }

    fn solver_create(
        &self,
        _resources: &HostResources,
        mode: Mode,
        config: &HostConfig,
    ) -> Result<HostSolver> {
        check_mode(mode)?;
        let settings = HostSettings::from_options(&config.options)?;
        self.created(HostSolver {
            settings,
            setup: RefCell::new(None),
            iterations: Cell::new(0),
            status: Cell::new(None),
        })
    }

    fn solver_destroy(&self, _solver: HostSolver) -> Result<()> {
        self.destroyed()
    }

    fn matrix_create(&self, _resources: &HostResources, mode: Mode) -> Result<HostMatrix> {
        check_mode(mode)?;
        self.created(HostMatrix {
            data: RefCell::new(MatrixData::default()),
        })
    }

    fn matrix_destroy(&self, _matrix: HostMatrix) -> Result<()> {
        self.destroyed()
    }

    fn vector_create(&self, _resources: &HostResources, mode: Mode) -> Result<HostVector> {
        check_mode(mode)?;
        self.created(HostVector {
            values: RefCell::new(vec![]),
            bound: Cell::new(false),
        })
    }

    fn vector_destroy(&self, _vector: HostVector) -> Result<()> {
        self.destroyed()
    }

    fn matrix_comm_from_maps_one_ring(
        &self,
        matrix: &HostMatrix,
        pattern: &CommPattern,
    ) -> Result<()> {
        if pattern.send_maps().len() != pattern.num_neighbors()
            || pattern.recv_maps().len() != pattern.num_neighbors()
        {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                "one send and one receive map per neighbour are required",
            ));
        }
        matrix.data.borrow_mut().pattern = Some(pattern.clone());
        Ok(())
    }

    fn matrix_upload_all(
        &self,
        matrix: &HostMatrix,
        row_ptr: &[usize],
        col_indices: &[usize],
        values: &[f64],
    ) -> Result<()> {
        let mut data = matrix.data.borrow_mut();
        let n = row_ptr.len().saturating_sub(1);
        let n_cols = n + data.pattern.as_ref().map_or(0, CommPattern::halo_size);
        if row_ptr.is_empty()
            || row_ptr[n] != col_indices.len()
            || col_indices.len() != values.len()
        {
            return Err(library_error(RC_BAD_PARAMETERS, "inconsistent CSR arrays"));
        }
        if let Some(c) = col_indices.iter().find(|c| **c >= n_cols) {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                format!("column {c} is outside the {n_cols} columns of the matrix and its halo"),
            ));
        }
        data.n_cols = n_cols;
        data.row_ptr = row_ptr.to_vec();
        data.col_indices = col_indices.to_vec();
        data.values = values.to_vec();
        data.uploaded = true;
        Ok(())
    }

    fn matrix_get_size(&self, matrix: &HostMatrix) -> Result<(usize, usize, usize)> {
        Ok((matrix.data.borrow().n_rows(), 1, 1))
    }

    fn vector_bind(&self, vector: &HostVector, _matrix: &HostMatrix) -> Result<()> {
        vector.bound.set(true);
        Ok(())
    }

    fn vector_upload(&self, vector: &HostVector, data: &[f64]) -> Result<()> {
        *vector.values.borrow_mut() = data.to_vec();
        Ok(())
    }

    fn vector_download(&self, vector: &HostVector, data: &mut [f64]) -> Result<()> {
        let values = vector.values.borrow();
        if values.len() != data.len() {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                format!(
                    "vector of length {} downloaded into {} entries",
                    values.len(),
                    data.len()
                ),
            ));
        }
        data.copy_from_slice(&values);
        Ok(())
    }

    fn solver_setup(&self, solver: &HostSolver, matrix: &HostMatrix) -> Result<()> {
        let data = matrix.data.borrow();
        if !data.uploaded {
            return Err(library_error(RC_BAD_PARAMETERS, "the matrix has not been uploaded"));
        }
        let inverse_diagonal = (0..data.n_rows())
            .map(|row| {
                let range = data.row_ptr[row]..data.row_ptr[row + 1];
                let diagonal = data.col_indices[range.clone()]
                    .iter()
                    .zip(&data.values[range])
                    .filter(|(c, _)| **c == row)
                    .map(|(_, v)| *v)
                    .sum::<f64>();
                if diagonal == 0.0 {
                    Err(library_error(
                        RC_BAD_PARAMETERS,
                        format!("zero diagonal in row {row}"),
                    ))
                } else {
                    Ok(1.0 / diagonal)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        *solver.setup.borrow_mut() = Some(SetupData {
            matrix: data.clone(),
            inverse_diagonal,
        });
        Ok(())
    }

    fn solver_solve(
        &self,
        solver: &HostSolver,
        rhs: &HostVector,
        solution: &HostVector,
    ) -> Result<()> {
        let setup = solver.setup.borrow();
        let setup = setup
            .as_ref()
            .ok_or_else(|| library_error(RC_BAD_PARAMETERS, "the solver has not been set up"))?;
        if setup.matrix.pattern.is_some() && !(rhs.bound.get() && solution.bound.get()) {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                "vectors must be bound to a distributed matrix before solving",
            ));
        }
        let n = setup.matrix.n_rows();
        let b = rhs.values.borrow();
        let mut x = solution.values.borrow_mut();
        if b.len() != n || x.len() != n {
            return Err(library_error(
                RC_BAD_PARAMETERS,
                format!(
                    "vectors of length {} and {} for a matrix with {n} rows",
                    b.len(),
                    x.len()
                ),
            ));
        }

        let b_norm = self.norm(&b);
        let (iterations, status) = if b_norm == 0.0 {
            x.fill(0.0);
            (0, SolveStatus::Success)
        } else {
            match solver.settings.method {
                HostMethod::Pcg => self.pcg(&solver.settings, setup, &b, &mut x, b_norm),
                HostMethod::Jacobi => self.jacobi(&solver.settings, setup, &b, &mut x, b_norm),
            }
        };
        debug!(
            "[{}]: host solve finished after {iterations} iterations: {status:?}",
            self.comm.rank()
        );
        solver.iterations.set(iterations);
        solver.status.set(Some(status));
        Ok(())
    }

    fn solver_iterations(&self, solver: &HostSolver) -> Result<usize> {
        Ok(solver.iterations.get())
    }

    fn solver_status(&self, solver: &HostSolver) -> Result<SolveStatus> {
        solver
            .status
            .get()
            .ok_or_else(|| library_error(RC_BAD_PARAMETERS, "no solve has been performed"))
    }
}
