//! Linear operators
use crate::sparse::MultiVector;
use crate::traits::DistributedMap;
use crate::types::{Result, Transpose};
use std::sync::Arc;

/// A linear operator between distributed vector spaces
pub trait Operator<T> {
    /// The map of the input vectors
    fn domain_map(&self) -> &Arc<dyn DistributedMap>;

    /// The map of the output vectors
    fn range_map(&self) -> &Arc<dyn DistributedMap>;

    /// Compute `y = alpha * op(x) + beta * y`
    fn apply(
        &self,
        x: &MultiVector<T>,
        y: &mut MultiVector<T>,
        mode: Transpose,
        alpha: T,
        beta: T,
    ) -> Result<()>;

    /// Check if the transposed operator can be applied
    fn has_transpose_apply(&self) -> bool;
}
