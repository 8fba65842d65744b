//! Time → reconstruction tree lookup with memoization.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ordered_float::OrderedFloat;
use parking_lot::Mutex;

use super::graph::{PlateId, RotationGraph};
use super::tree::ReconstructionTree;

/// Default number of trees kept by [`CachedReconstructionTreeCreator`].
pub const DEFAULT_TREE_CACHE_CAPACITY: usize = 32;

/// Supplies the reconstruction tree for a time, for a fixed anchor plate.
pub trait ReconstructionTreeCreator: Send + Sync {
    fn get_reconstruction_tree(&self, time: f64) -> Arc<ReconstructionTree>;

    fn anchor_plate_id(&self) -> PlateId;
}

#[derive(Debug, Default)]
struct TreeCache {
    trees: HashMap<OrderedFloat<f64>, Arc<ReconstructionTree>>,
    /// Insertion order, oldest entry first.
    order: VecDeque<OrderedFloat<f64>>,
}

/// Builds trees on demand and keeps the most recent ones.
///
/// The cache is guarded by a mutex so one creator can be shared between
/// threads. Trees are built outside the lock; two threads racing on the same
/// time may both build it, and the first insert wins.
#[derive(Debug)]
pub struct CachedReconstructionTreeCreator {
    graph: Arc<RotationGraph>,
    anchor_plate_id: PlateId,
    capacity: usize,
    cache: Mutex<TreeCache>,
}

impl CachedReconstructionTreeCreator {
    pub fn new(graph: Arc<RotationGraph>, anchor_plate_id: PlateId) -> Self {
        Self::with_capacity(graph, anchor_plate_id, DEFAULT_TREE_CACHE_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(graph: Arc<RotationGraph>, anchor_plate_id: PlateId, capacity: usize) -> Self {
        Self {
            graph,
            anchor_plate_id,
            capacity: capacity.max(1),
            cache: Mutex::new(TreeCache::default()),
        }
    }

    pub fn graph(&self) -> &Arc<RotationGraph> {
        &self.graph
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().trees.len()
    }

    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.trees.clear();
        cache.order.clear();
    }
}

fn cache_key(time: f64) -> OrderedFloat<f64> {
    // -0.0 and 0.0 are the same reconstruction time.
    OrderedFloat(if time == 0.0 { 0.0 } else { time })
}

impl ReconstructionTreeCreator for CachedReconstructionTreeCreator {
    fn get_reconstruction_tree(&self, time: f64) -> Arc<ReconstructionTree> {
        let key = cache_key(time);
        if let Some(tree) = self.cache.lock().trees.get(&key) {
            log::trace!("Reconstruction tree cache hit at {} Ma", time);
            return Arc::clone(tree);
        }

        let tree = Arc::new(ReconstructionTree::build(
            Arc::clone(&self.graph),
            self.anchor_plate_id,
            key.into_inner(),
        ));

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.trees.get(&key) {
            return Arc::clone(existing);
        }
        while cache.trees.len() >= self.capacity {
            let Some(evicted) = cache.order.pop_front() else {
                break;
            };
            cache.trees.remove(&evicted);
            log::trace!("Evicted reconstruction tree at {} Ma", evicted.into_inner());
        }
        cache.trees.insert(key, Arc::clone(&tree));
        cache.order.push_back(key);
        tree
    }

    fn anchor_plate_id(&self) -> PlateId {
        self.anchor_plate_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::FiniteRotation;
    use crate::rotation::PoleSample;
    use glam::DVec3;

    fn creator(capacity: usize) -> CachedReconstructionTreeCreator {
        let graph = RotationGraph::from_sequences(vec![(
            0,
            1,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, 0.5)),
            ],
        )])
        .unwrap();
        CachedReconstructionTreeCreator::with_capacity(Arc::new(graph), 0, capacity)
    }

    #[test]
    fn test_same_time_returns_cached_tree() {
        let creator = creator(4);
        let a = creator.get_reconstruction_tree(10.0);
        let b = creator.get_reconstruction_tree(10.0);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(creator.cache_len(), 1);
    }

    #[test]
    fn test_negative_zero_shares_entry() {
        let creator = creator(4);
        let a = creator.get_reconstruction_tree(0.0);
        let b = creator.get_reconstruction_tree(-0.0);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let creator = creator(2);
        let first = creator.get_reconstruction_tree(1.0);
        creator.get_reconstruction_tree(2.0);
        creator.get_reconstruction_tree(3.0);
        assert_eq!(creator.cache_len(), 2);

        let again = creator.get_reconstruction_tree(1.0);
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_tree_has_creator_anchor() {
        let creator = creator(2);
        let tree = creator.get_reconstruction_tree(50.0);
        assert_eq!(tree.anchor_plate_id(), creator.anchor_plate_id());
        assert_eq!(tree.reconstruction_time().value(), 50.0);

        creator.clear_cache();
        assert_eq!(creator.cache_len(), 0);
    }
}
