//! Matrices on structured grids
use crate::map::CartesianPartition;
use crate::sparse::DistributedCsrMatrix;
use crate::traits::{Comm, DistributedMap, MapFactory};
use crate::types::{Error, Result};
use num::Float;
use std::sync::Arc;

/// Coefficients of a five point stencil
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stencil<T> {
    /// Diagonal
    pub center: T,
    /// Coupling to `(i - 1, j)`
    pub left: T,
    /// Coupling to `(i + 1, j)`
    pub right: T,
    /// Coupling to `(i, j - 1)`
    pub lower: T,
    /// Coupling to `(i, j + 1)`
    pub upper: T,
}

/// Create the matrix of a five point stencil on the grid of `partition`.
///
/// Rows follow `row_map`, which must hold global grid indices. Couplings that
/// would leave the grid are dropped. This is collective over `comm`.
pub fn cross_2d<C: Comm, T: Float + Send + Sync>(
    comm: &C,
    partition: &CartesianPartition,
    row_map: Arc<dyn DistributedMap>,
    stencil: Stencil<T>,
    factory: &dyn MapFactory,
) -> Result<DistributedCsrMatrix<T>> {
    let nx = partition.nx();
    let ny = partition.ny();
    if row_map.global_size() != partition.global_size() {
        return Err(Error::InvalidMatrix(format!(
            "a map of {} indices cannot hold a {nx}x{ny} grid",
            row_map.global_size()
        )));
    }
    let rows = row_map
        .global_indices()
        .into_iter()
        .map(|gid| {
            let i = gid % nx;
            let j = gid / nx;
            let mut row = Vec::with_capacity(5);
            if j > 0 {
                row.push((gid - nx, stencil.lower));
            }
            if i > 0 {
                row.push((gid - 1, stencil.left));
            }
            row.push((gid, stencil.center));
            if i + 1 < nx {
                row.push((gid + 1, stencil.right));
            }
            if j + 1 < ny {
                row.push((gid + nx, stencil.upper));
            }
            row
        })
        .collect();
    DistributedCsrMatrix::from_global_rows(
        comm,
        row_map,
        rows,
        |gid| partition.owner(gid),
        factory,
    )
}

/// Create the 2D Laplacian with 4 on the diagonal and -1 for each grid neighbour
pub fn laplace_2d<C: Comm, T: Float + Send + Sync>(
    comm: &C,
    partition: &CartesianPartition,
    row_map: Arc<dyn DistributedMap>,
    factory: &dyn MapFactory,
) -> Result<DistributedCsrMatrix<T>> {
    let four = T::one() + T::one() + T::one() + T::one();
    let stencil = Stencil {
        center: four,
        left: -T::one(),
        right: -T::one(),
        lower: -T::one(),
        upper: -T::one(),
    };
    cross_2d(comm, partition, row_map, stencil, factory)
}

#[cfg(test)]
mod test {
    use super::laplace_2d;
    use crate::comm::SelfComm;
    use crate::map::{cartesian_2d, CartesianPartition, HashedMapFactory};

    #[test]
    fn test_laplace_row_sums() {
        let partition = CartesianPartition::new(3, 3, 1, 1).unwrap();
        let map = cartesian_2d(&SelfComm, 3, 3, 1, 1, &HashedMapFactory).unwrap();
        let a = laplace_2d::<_, f64>(&SelfComm, &partition, map, &HashedMapFactory).unwrap();
        assert_eq!(a.local_rows(), 9);
        assert_eq!(a.local_nnz(), 9 + 2 * 12);
        let mut y = vec![0.0; 9];
        a.multiply(&SelfComm, &[1.0; 9], &mut y).unwrap();
        // Local index 4 is the centre point (1, 1)
        assert_eq!(y[4], 0.0);
        // Local index 0 is the corner (0, 0)
        assert_eq!(y[0], 2.0);
        assert_eq!(y.iter().sum::<f64>(), 12.0);
    }
}
