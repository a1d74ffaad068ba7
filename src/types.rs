//! General type definitions

/// Error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Grid or processor-grid dimensions that cannot be partitioned
    #[error("Incorrect input parameter to cartesian_2d(): nx = {nx}, ny = {ny}, mx = {mx}, my = {my}")]
    InvalidGrid {
        /// Number of grid points in x, as given
        nx: String,
        /// Number of grid points in y, as given
        ny: String,
        /// Number of processors in x, as given
        mx: String,
        /// Number of processors in y, as given
        my: String,
    },
    /// A distributed map could not be built
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// Inconsistent sparse matrix data
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),
    /// A distributed matrix without an import pattern was used on more than one rank
    #[error("The matrix has no import pattern")]
    MissingImport,
    /// AMGX needs the send and receive neighbours of every rank to coincide
    #[error(
        "AMGX requires that the processors that we send to and receive from are the same. \
         This is not the case: we send to {send:?} and receive from {recv:?}"
    )]
    AsymmetricNeighbors {
        /// Ranks this rank sends to
        send: Vec<usize>,
        /// Ranks this rank receives from
        recv: Vec<usize>,
    },
    /// A numeric type or size combination the solver library cannot handle
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
    /// Error status returned by the solver library
    #[error("Solver library error {code}: {message}")]
    Library {
        /// Raw return code
        code: i32,
        /// Description provided by the library
        message: String,
    },
    /// Missing or malformed parameter
    #[error("Parameter error: {0}")]
    Parameter(String),
    /// I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    /// Apply the operator
    NoTrans,
    /// Apply the transpose
    Trans,
    /// Apply the conjugate transpose
    ConjTrans,
}

/// Outcome of the last solve.
///
/// AMGX reports divergence with the same raw value as
/// [SolveStatus::NotConverged], so [SolveStatus::from_raw] never gives
/// [SolveStatus::Diverged]; only the host library distinguishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Converged
    Success,
    /// The solver failed
    Failed,
    /// The iteration limit was reached
    NotConverged,
    /// The residual became non-finite
    Diverged,
}

impl SolveStatus {
    /// Convert from the library's raw status value
    pub fn from_raw(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Failed),
            2 => Ok(Self::NotConverged),
            _ => Err(Error::Library {
                code: value,
                message: "unknown solve status".to_string(),
            }),
        }
    }
}

/// Memory space and precision of solver objects.
///
/// The letters follow AMGX: memory space (host/device), matrix precision,
/// vector precision, index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Host memory, double matrix, double vectors, int indices
    HostDDI,
    /// Device memory, double matrix, double vectors, int indices
    DeviceDDI,
    /// Device memory, double matrix, float vectors, int indices
    DeviceDFI,
    /// Device memory, float matrix, float vectors, int indices
    DeviceFFI,
}

impl Mode {
    /// The raw AMGX mode value
    pub fn as_raw(&self) -> i32 {
        match self {
            Mode::HostDDI => 8192,
            Mode::DeviceDDI => 8193,
            Mode::DeviceDFI => 8449,
            Mode::DeviceFFI => 8465,
        }
    }
}
