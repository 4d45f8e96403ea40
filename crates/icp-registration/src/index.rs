use std::num::NonZeroUsize;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use crate::error::IcpError;

type KdTree = ImmutableKdTree<f64, u32, 3, 32>;

/// A neighbor returned by a spatial index query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the indexed point set.
    pub index: usize,
    /// Squared euclidean distance from the query to the point.
    pub distance_sq: f64,
}

/// Exact nearest neighbor search over a fixed reference point set.
///
/// The index borrows the reference points and never mutates them. A new index must be built
/// whenever the reference set changes.
pub struct SpatialIndex<'a> {
    points: &'a [[f64; 3]],
    tree: Option<KdTree>,
}

impl<'a> SpatialIndex<'a> {
    /// Wrap a reference point set. The index is not usable until [`SpatialIndex::build`].
    pub fn new(points: &'a [[f64; 3]]) -> Self {
        Self { points, tree: None }
    }

    /// Wrap and build in one step.
    pub fn from_points(points: &'a [[f64; 3]]) -> Result<Self, IcpError> {
        let mut index = Self::new(points);
        index.build()?;
        Ok(index)
    }

    /// Build the kd-tree over the reference points.
    pub fn build(&mut self) -> Result<(), IcpError> {
        if self.points.is_empty() {
            return Err(IcpError::InvalidState(
                "cannot build a spatial index from an empty point set",
            ));
        }
        self.tree = Some(ImmutableKdTree::new_from_slice(self.points));
        Ok(())
    }

    /// Whether [`SpatialIndex::build`] has completed.
    pub fn is_built(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the reference set is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The reference points, in their original order.
    pub fn points(&self) -> &'a [[f64; 3]] {
        self.points
    }

    fn tree(&self) -> Result<&KdTree, IcpError> {
        self.tree
            .as_ref()
            .ok_or(IcpError::InvalidState("spatial index queried before being built"))
    }

    /// Find the closest reference point to `query`.
    pub fn nearest(&self, query: &[f64; 3]) -> Result<Neighbor, IcpError> {
        let nn = self.tree()?.nearest_one::<SquaredEuclidean>(query);
        Ok(Neighbor {
            index: nn.item as usize,
            distance_sq: nn.distance,
        })
    }

    /// Find the `k` closest reference points to `query`, sorted by increasing distance.
    ///
    /// Returns fewer than `k` neighbors when the reference set is smaller than `k`.
    pub fn nearest_k(&self, query: &[f64; 3], k: usize) -> Result<Vec<Neighbor>, IcpError> {
        let tree = self.tree()?;
        let Some(k) = NonZeroUsize::new(k) else {
            return Ok(Vec::new());
        };

        let mut neighbors = tree
            .nearest_n::<SquaredEuclidean>(query, k)
            .into_iter()
            .map(|nn| Neighbor {
                index: nn.item as usize,
                distance_sq: nn.distance,
            })
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));

        Ok(neighbors)
    }
}
