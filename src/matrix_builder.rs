// Builds skims by running one path tree search per origin, spread over a worker pool.
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::cost::{TravelDisutility, TravelTime};
use super::graph::Graph;
use super::landmarks::{Landmarks, LandmarksFactory};
use super::matrix::{Matrix, NodeAndTime, SparseMatrix, SparseRow};
use super::path_tree::{PathTree, SearchBounds};
use super::worker_pool::WorkerPool;
use super::SkimError;


/// Counts finished tasks, logging at 1, 2, 4, 8... and when told the work is done.
#[derive(Debug)]
pub struct ProgressCounter {
    label: String,
    total: usize,
    count: AtomicUsize,
}

impl ProgressCounter {
    pub fn new(label: &str, total: usize) -> ProgressCounter {
        ProgressCounter {
            label: String::from(label),
            total,
            count: AtomicUsize::new(0),
        }
    }

    pub fn increment(&self) -> usize {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_power_of_two() {
            log::info!("{}: {} of {}", self.label, count, self.total);
        }
        count
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        log::info!("{}: done, {} of {}", self.label, self.count(), self.total);
    }
}


pub struct MatrixBuilder<C> {
    graph: Arc<Graph>,
    cost: C,
    num_threads: usize,
    landmarks: Option<Arc<Landmarks>>,
}

impl<C> MatrixBuilder<C>
    where C: TravelTime + TravelDisutility + Clone + Send + Sync
{
    /// `cost` is the template every worker clones its own cost model from.
    pub fn new(graph: Arc<Graph>, cost: C, num_threads: usize) -> MatrixBuilder<C> {
        MatrixBuilder {
            graph,
            cost,
            num_threads,
            landmarks: None,
        }
    }

    /// Guides point-to-point queries with landmarks, preprocessed by `factory` if it hasn't seen
    /// this graph before.
    pub fn with_landmarks(mut self, factory: &LandmarksFactory)
                          -> Result<MatrixBuilder<C>, SkimError> {
        self.landmarks = Some(factory.get_or_preprocess(&self.graph, &self.cost)?);
        Ok(self)
    }

    fn start_pool(&self) -> Result<WorkerPool<PathTree<C>>, SkimError> {
        let trees = (0..self.num_threads).map(|_| match &self.landmarks {
            Some(landmarks) => PathTree::with_landmarks(self.graph.clone(), self.cost.clone(),
                                                        landmarks.clone()),
            None => PathTree::new(self.graph.clone(), self.cost.clone()),
        }).collect();
        WorkerPool::new(trees)
    }

    /// Travel times between the central nodes of every pair of zones, departing at
    /// `departure_time`.  Fails if some central node can't reach another.
    pub fn dense_matrix<Z>(&self, central_nodes: &HashMap<Z, usize>, departure_time: f64)
                           -> Result<Matrix<Z>, SkimError>
        where Z: Eq + Hash + Ord + Clone + Debug + Send + Sync
    {
        let mut zones: Vec<Z> = central_nodes.keys().cloned().collect();
        zones.sort();
        let nodes: Vec<usize> = zones.iter().map(|zz| central_nodes[zz]).collect();
        for node in &nodes {
            self.graph.check_node(*node)?;
        }

        let matrix = Mutex::new(Matrix::new(zones.clone()));
        let progress = ProgressCounter::new("dense travel time matrix", zones.len());
        let mut pool = self.start_pool()?;
        pool.submit_and_wait((0..zones.len()).collect(), |tree, zone_idx: usize| {
            let source = nodes[zone_idx];
            tree.calculate(source, departure_time, &SearchBounds::Unbounded)?;
            let mut row = Vec::with_capacity(nodes.len());
            for dest in &nodes {
                match tree.get_time(*dest) {
                    Some(time) => row.push(time - departure_time),
                    None => return Err(SkimError::Disconnected {
                        from: self.graph.node(source).id.clone(),
                        to: self.graph.node(*dest).id.clone(),
                    }),
                }
            }
            matrix.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
                .set_row(&zones[zone_idx], &row)?;
            progress.increment();
            Ok(())
        })?;
        pool.shutdown();
        progress.finish();

        Ok(matrix.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// For every node, travel times to the nodes whose least-cost path from it is shorter than
    /// `max_distance` metres.
    pub fn sparse_matrix(&self, max_distance: f64, departure_time: f64)
                         -> Result<SparseMatrix, SkimError> {
        let num_nodes = self.graph.num_nodes();
        let matrix = Mutex::new(SparseMatrix::new(num_nodes));
        let progress = ProgressCounter::new("sparse travel time matrix", num_nodes);
        let bounds = SearchBounds::MaxDistance(max_distance);
        let mut pool = self.start_pool()?;
        pool.submit_and_wait((0..num_nodes).collect(), |tree, source: usize| {
            tree.calculate(source, departure_time, &bounds)?;
            let mut entries = vec![];
            for node in tree.reached_nodes() {
                if let Some(time) = tree.get_time(*node) {
                    entries.push(NodeAndTime {node: *node, time: time - departure_time});
                }
            }
            matrix.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
                .set_row(source, SparseRow {entries})?;
            progress.increment();
            Ok(())
        })?;
        pool.shutdown();
        progress.finish();

        Ok(matrix.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Travel times for a batch of (origin, destination) node pairs, by point-to-point search.
    /// Pairs with no connection get None.
    pub fn od_travel_times(&self, pairs: &[(usize, usize)], departure_time: f64)
                           -> Result<Vec<Option<f64>>, SkimError> {
        let times = Mutex::new(vec![None; pairs.len()]);
        let progress = ProgressCounter::new("od travel times", pairs.len());
        let mut pool = self.start_pool()?;
        pool.submit_and_wait(pairs.iter().cloned().enumerate().collect(),
                             |tree, (ii, (from, to)): (usize, (usize, usize))| {
            let path = tree.calculate_path(from, to, departure_time)?;
            times.lock().unwrap_or_else(|poisoned| poisoned.into_inner())[ii] =
                path.map(|pp| pp.travel_time);
            progress.increment();
            Ok(())
        })?;
        pool.shutdown();
        progress.finish();

        Ok(times.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

/// Computes the dense zone-to-zone travel time matrix.  `central_nodes` maps each zone to the
/// graph node its trips start and end at.
pub fn calculate_travel_time_matrix<Z, C>(graph: Arc<Graph>, central_nodes: &HashMap<Z, usize>,
                                          departure_time: f64, cost: &C, num_threads: usize)
                                          -> Result<Matrix<Z>, SkimError>
    where Z: Eq + Hash + Ord + Clone + Debug + Send + Sync,
          C: TravelTime + TravelDisutility + Clone + Send + Sync
{
    MatrixBuilder::new(graph, cost.clone(), num_threads)
        .dense_matrix(central_nodes, departure_time)
}

/// Computes travel times from every node to all nodes within `max_distance` of it.
pub fn calculate_travel_time_sparse_matrix<C>(graph: Arc<Graph>, max_distance: f64,
                                              departure_time: f64, cost: &C, num_threads: usize)
                                              -> Result<SparseMatrix, SkimError>
    where C: TravelTime + TravelDisutility + Clone + Send + Sync
{
    MatrixBuilder::new(graph, cost.clone(), num_threads)
        .sparse_matrix(max_distance, departure_time)
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use itertools::iproduct;
    use super::super::cost::FreeSpeedTravelCost;
    use super::super::geometry::Point2d;
    use super::super::landmarks::LandmarkSelection;
    use super::super::network::{Network, NetworkLink};
    use super::super::test_utils::{grid_graph, one_way_ring_graph};

    fn all_nodes_as_zones(graph: &Graph) -> HashMap<String, usize> {
        graph.nodes().iter().map(|nn| (nn.id.clone(), nn.index)).collect()
    }

    #[test]
    fn test_dense_grid_matrix() {
        let graph = Arc::new(grid_graph(4, 4));
        let zones = all_nodes_as_zones(&graph);
        let matrix = calculate_travel_time_matrix(graph.clone(), &zones, 3600.,
                                                  &FreeSpeedTravelCost, 3).unwrap();
        assert_eq!(matrix.len(), 16 * 16);
        assert!(matrix.is_complete());
        for (from, to) in iproduct!(graph.nodes(), graph.nodes()) {
            let (fx, fy) = (from.index % 4, from.index / 4);
            let (tx, ty) = (to.index % 4, to.index / 4);
            let manhattan = (fx as i64 - tx as i64).abs() + (fy as i64 - ty as i64).abs();
            assert_relative_eq!(matrix.get(&from.id, &to.id).unwrap(), 10. * manhattan as f64);
        }
    }

    #[test]
    fn test_dense_is_deterministic_and_asymmetric() {
        let graph = Arc::new(one_way_ring_graph(6));
        let zones = all_nodes_as_zones(&graph);
        let first = calculate_travel_time_matrix(graph.clone(), &zones, 0., &FreeSpeedTravelCost,
                                                 4).unwrap();
        let second = calculate_travel_time_matrix(graph.clone(), &zones, 0.,
                                                  &FreeSpeedTravelCost, 2).unwrap();
        assert_eq!(first.zones(), second.zones());
        for (from, to) in iproduct!(first.zones(), first.zones()) {
            assert_eq!(first.get(from, to), second.get(from, to));
        }
        // 0 -> 1 is one link, 1 -> 0 goes all the way round
        let zero = String::from("0");
        let one = String::from("1");
        assert_relative_eq!(first.get(&zero, &one).unwrap(), 1.);
        assert_relative_eq!(first.get(&one, &zero).unwrap(), 2. + 3. + 4. + 5. + 6.);
    }

    #[test]
    fn test_disconnected_zones_fail() {
        let mut network = Network::grid(2, 2, 100., 10.);
        network.add_node("island", Point2d::new(1000., 1000.));
        network.add_link(NetworkLink::new("to-island", "3", "island", 10., 1.)).unwrap();
        let graph = Arc::new(Graph::from_network(&network).unwrap());
        let zones = all_nodes_as_zones(&graph);
        let result = calculate_travel_time_matrix(graph, &zones, 0., &FreeSpeedTravelCost, 2);
        match result {
            Err(SkimError::Disconnected {from, to}) => {
                // everything reaches the island, but nothing leaves it
                assert_eq!(from, "island");
                assert_eq!(to, "0");
            }
            other => panic!("expected a disconnection error, got {:?}", other.map(|mm| mm.len())),
        }
    }

    #[test]
    fn test_sparse_bound() {
        let graph = Arc::new(grid_graph(5, 5));
        let sparse = calculate_travel_time_sparse_matrix(graph.clone(), 250., 100.,
                                                         &FreeSpeedTravelCost, 3).unwrap();
        for node in graph.nodes() {
            let row = sparse.get_row(node.index).unwrap();
            for entry in &row.entries {
                // 10 s per 100 m block
                assert!(entry.time * 10. < 250.);
            }
            assert_eq!(row.get(node.index), Some(0.));
        }
        // two blocks away is just inside the bound, three is outside
        assert_eq!(sparse.get(12, 14), Some(20.));
        assert_eq!(sparse.get(12, 2), Some(20.));
        assert_eq!(sparse.get(12, 15), None);
        // the centre node reaches itself, 4 neighbours at one block and 8 nodes at two
        assert_eq!(sparse.get_row(12).unwrap().len(), 13);
    }

    #[test]
    fn test_od_travel_times_with_landmarks() {
        let graph = Arc::new(one_way_ring_graph(7));
        let factory = LandmarksFactory::new(2, LandmarkSelection::PieSlices, 2);
        let builder = MatrixBuilder::new(graph.clone(), FreeSpeedTravelCost, 2)
            .with_landmarks(&factory).unwrap();
        assert_eq!(factory.num_cached(), 1);
        let pairs: Vec<(usize, usize)> = iproduct!(0..7, 0..7).collect();
        let times = builder.od_travel_times(&pairs, 0.).unwrap();

        let zones = all_nodes_as_zones(&graph);
        let matrix = builder.dense_matrix(&zones, 0.).unwrap();
        for ((from, to), time) in pairs.iter().zip(times) {
            let expected = matrix.get(&from.to_string(), &to.to_string());
            assert_eq!(time, expected);
        }

        // a second builder on the same graph reuses the landmarks
        MatrixBuilder::new(graph, FreeSpeedTravelCost, 1).with_landmarks(&factory).unwrap();
        assert_eq!(factory.num_cached(), 1);
    }

    #[test]
    fn test_progress_counter() {
        let counter = ProgressCounter::new("test", 5);
        for ii in 1..=5 {
            assert_eq!(counter.increment(), ii);
        }
        assert_eq!(counter.count(), 5);
        counter.finish();
    }
}
