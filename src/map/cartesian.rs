//! Cartesian partition of a structured 2D grid
use crate::traits::{Comm, DistributedMap, MapFactory};
use crate::types::{Error, Result};
use log::debug;
use num::PrimInt;
use std::fmt::Display;
use std::ops::Range;
use std::sync::Arc;

/// Partition of an `nx` by `ny` grid over an `mx` by `my` grid of processors.
///
/// Grid point `(i, j)` has global index `i + j * nx`. Rank `r` sits at
/// processor coordinate `(r % mx, r / mx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartesianPartition {
    nx: usize,
    ny: usize,
    mx: usize,
    my: usize,
}

/// The range of points given to processor `p` when `n` points are split over `m` processors.
///
/// The first `n % m` processors get one extra point.
fn split(n: usize, m: usize, p: usize) -> Range<usize> {
    let small = n / m;
    let big = n - small * m;
    let start = if p < big {
        p * (small + 1)
    } else {
        (p - big) * small + big * (small + 1)
    };
    let end = start + small + usize::from(p < big);
    start..end
}

/// The processor that [split] gives point `i` to
fn locate(n: usize, m: usize, i: usize) -> usize {
    let small = n / m;
    let big = n - small * m;
    let boundary = big * (small + 1);
    if i < boundary {
        i / (small + 1)
    } else {
        big + (i - boundary) / small
    }
}

impl CartesianPartition {
    /// Create a partition.
    ///
    /// Fails if any dimension is not positive, or if there are more processors
    /// than points in either direction.
    pub fn new<G: PrimInt + Display>(nx: G, ny: G, mx: G, my: G) -> Result<Self> {
        let invalid = || Error::InvalidGrid {
            nx: nx.to_string(),
            ny: ny.to_string(),
            mx: mx.to_string(),
            my: my.to_string(),
        };
        let zero = G::zero();
        if nx <= zero || ny <= zero || mx <= zero || my <= zero || mx > nx || my > ny {
            return Err(invalid());
        }
        match (nx.to_usize(), ny.to_usize(), mx.to_usize(), my.to_usize()) {
            (Some(nx), Some(ny), Some(mx), Some(my)) if nx.checked_mul(ny).is_some() => {
                Ok(Self { nx, ny, mx, my })
            }
            _ => Err(invalid()),
        }
    }

    /// Number of grid points in x
    pub fn nx(&self) -> usize {
        self.nx
    }
    /// Number of grid points in y
    pub fn ny(&self) -> usize {
        self.ny
    }
    /// Number of processors in x
    pub fn mx(&self) -> usize {
        self.mx
    }
    /// Number of processors in y
    pub fn my(&self) -> usize {
        self.my
    }

    /// Total number of grid points
    pub fn global_size(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of processors the grid is split over
    pub fn processor_count(&self) -> usize {
        self.mx * self.my
    }

    /// The x and y point ranges of a rank, or `None` if the rank is outside the processor grid
    pub fn ranges(&self, rank: usize) -> Option<(Range<usize>, Range<usize>)> {
        if rank >= self.processor_count() {
            return None;
        }
        let xpid = rank % self.mx;
        let ypid = rank / self.mx;
        Some((split(self.nx, self.mx, xpid), split(self.ny, self.my, ypid)))
    }

    /// The global indices held by a rank.
    ///
    /// Indices are ordered with x outermost. Ranks outside the processor grid hold nothing.
    pub fn owned_indices(&self, rank: usize) -> Vec<usize> {
        match self.ranges(rank) {
            Some((xs, ys)) => {
                let mut indices = Vec::with_capacity(xs.len() * ys.len());
                for i in xs {
                    for j in ys.clone() {
                        indices.push(i + j * self.nx);
                    }
                }
                indices
            }
            None => vec![],
        }
    }

    /// The rank holding a global index
    pub fn owner(&self, global_index: usize) -> Option<usize> {
        if global_index >= self.global_size() {
            return None;
        }
        let i = global_index % self.nx;
        let j = global_index / self.nx;
        Some(locate(self.nx, self.mx, i) + locate(self.ny, self.my, j) * self.mx)
    }
}

/// Create a map that splits an `nx` by `ny` grid into rectangular blocks over an `mx` by `my` processor grid.
///
/// The map is built by `factory`; this is collective over `comm`.
pub fn cartesian_2d<C: Comm, G: PrimInt + Display>(
    comm: &C,
    nx: G,
    ny: G,
    mx: G,
    my: G,
    factory: &dyn MapFactory,
) -> Result<Arc<dyn DistributedMap>> {
    let partition = CartesianPartition::new(nx, ny, mx, my)?;
    let rank = comm.rank();
    let elements = partition.owned_indices(rank);
    debug!(
        "[{rank}]: {} of {} grid points in a {}x{} block partition ({} map)",
        elements.len(),
        partition.global_size(),
        partition.mx(),
        partition.my(),
        factory.name()
    );
    factory.build(Some(partition.global_size()), &elements, 0, comm)
}

#[cfg(test)]
mod test {
    use super::{cartesian_2d, locate, split, CartesianPartition};
    use crate::comm::SelfComm;
    use crate::map::HashedMapFactory;
    use crate::types::Error;

    #[test]
    fn test_split() {
        assert_eq!(split(10, 3, 0), 0..4);
        assert_eq!(split(10, 3, 1), 4..7);
        assert_eq!(split(10, 3, 2), 7..10);
        assert_eq!(split(4, 4, 3), 3..4);
    }

    #[test]
    fn test_locate_inverts_split() {
        for n in 1..20 {
            for m in 1..=n {
                for p in 0..m {
                    for i in split(n, m, p) {
                        assert_eq!(locate(n, m, i), p);
                    }
                }
            }
        }
    }

    #[test]
    fn test_example_partition() {
        let partition = CartesianPartition::new(4, 2, 2, 1).unwrap();
        let mut r0 = partition.owned_indices(0);
        let mut r1 = partition.owned_indices(1);
        assert_eq!(r0, vec![0, 4, 1, 5]);
        r0.sort();
        r1.sort();
        assert_eq!(r0, vec![0, 1, 4, 5]);
        assert_eq!(r1, vec![2, 3, 6, 7]);
        assert_eq!(partition.owner(6), Some(1));
        assert_eq!(partition.owner(8), None);
    }

    #[test]
    fn test_invalid_dimensions() {
        for (nx, ny, mx, my) in [
            (0i64, 2i64, 1i64, 1i64),
            (4, -1, 1, 1),
            (4, 2, 0, 1),
            (4, 2, 1, -3),
            (4, 2, 5, 1),
            (4, 2, 1, 3),
        ] {
            match CartesianPartition::new(nx, ny, mx, my) {
                Err(Error::InvalidGrid {
                    nx: a,
                    ny: b,
                    mx: c,
                    my: d,
                }) => assert_eq!(
                    (a, b, c, d),
                    (nx.to_string(), ny.to_string(), mx.to_string(), my.to_string())
                ),
                other => panic!("expected InvalidGrid, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_dimensions_keep_values() {
        match CartesianPartition::new(u64::MAX, 2, 1, 3) {
            Err(Error::InvalidGrid { nx, my, .. }) => {
                assert_eq!(nx, u64::MAX.to_string());
                assert_eq!(my, "3");
            }
            other => panic!("expected InvalidGrid, got {other:?}"),
        }
        let e = CartesianPartition::new(i128::MAX, 1, 1, 0).unwrap_err();
        assert!(e.to_string().contains(&i128::MAX.to_string()));
    }

    #[test]
    fn test_rank_outside_processor_grid() {
        let partition = CartesianPartition::new(4u32, 4, 2, 1).unwrap();
        assert!(partition.ranges(2).is_none());
        assert!(partition.owned_indices(5).is_empty());
    }

    #[test]
    fn test_serial_map() {
        let map = cartesian_2d(&SelfComm, 3, 2, 1, 1, &HashedMapFactory).unwrap();
        assert_eq!(map.global_size(), 6);
        assert_eq!(map.global_indices(), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_too_few_ranks() {
        assert!(matches!(
            cartesian_2d(&SelfComm, 4, 2, 2, 1, &HashedMapFactory),
            Err(Error::InvalidMap(_))
        ));
    }
}
