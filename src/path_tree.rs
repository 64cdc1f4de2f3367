// Single-source least-cost search with time-dependent link weights.  A PathTree owns its
// scratch labels and frontier, and reuses them for every query; it answers one query at a time.
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use priority_queue::PriorityQueue;

use super::cost::{TravelDisutility, TravelTime};
use super::graph::Graph;
use super::landmarks::Landmarks;
use super::timestamped_vector::TimestampedVector;
use super::SkimError;


/// Limits on a search.  Target sets stop the search early; the distance and travel time bounds
/// prune nodes whose least-cost label reaches the bound, so they are neither expanded nor
/// reported.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchBounds {
    Unbounded,
    /// Stop as soon as all of these nodes are settled.
    StopAtTargets(Vec<usize>),
    /// Prune nodes whose distance from the source is at least this many metres.
    MaxDistance(f64),
    /// Prune nodes reached this many seconds or more after the start time.
    MaxTravelTime(f64),
}

impl SearchBounds {
    fn prunes(&self, elapsed_time: f64, distance: f64) -> bool {
        match self {
            SearchBounds::MaxDistance(max_distance) => distance >= *max_distance,
            SearchBounds::MaxTravelTime(max_time) => elapsed_time >= *max_time,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// Node indices from the source to the destination, both included.
    pub nodes: Vec<usize>,
    /// Indices of the links between consecutive nodes.
    pub links: Vec<usize>,
    pub travel_time: f64,
    pub cost: f64,
    pub distance: f64,
}

/// Frontier priority: the smallest key comes out first, with ties going to the smaller node.
#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    key: f64,
    node: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &FrontierEntry) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &FrontierEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &FrontierEntry) -> Ordering {
        other.key.partial_cmp(&self.key).unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}


pub struct PathTree<C> {
    graph: Arc<Graph>,
    cost: C,
    landmarks: Option<Arc<Landmarks>>,

    costs: TimestampedVector<f64>,
    times: TimestampedVector<f64>,
    distances: TimestampedVector<f64>,
    pred_links: TimestampedVector<Option<usize>>,
    settled: TimestampedVector<bool>,
    pruned: TimestampedVector<bool>,
    frontier: PriorityQueue<usize, FrontierEntry>,
    settle_order: Vec<usize>,

    source: Option<usize>,
    start_time: f64,
}

impl<C> PathTree<C>
    where C: TravelTime + TravelDisutility
{
    pub fn new(graph: Arc<Graph>, cost: C) -> PathTree<C> {
        let num_nodes = graph.num_nodes();
        PathTree {
            graph,
            cost,
            landmarks: None,
            costs: TimestampedVector::new(num_nodes, f64::INFINITY),
            times: TimestampedVector::new(num_nodes, f64::INFINITY),
            distances: TimestampedVector::new(num_nodes, f64::INFINITY),
            pred_links: TimestampedVector::new(num_nodes, None),
            settled: TimestampedVector::new(num_nodes, false),
            pruned: TimestampedVector::new(num_nodes, false),
            frontier: PriorityQueue::new(),
            settle_order: vec![],
            source: None,
            start_time: 0.,
        }
    }

    /// A path tree whose point-to-point queries are guided by `landmarks`, which must have been
    /// preprocessed on `graph`.
    pub fn with_landmarks(graph: Arc<Graph>, cost: C, landmarks: Arc<Landmarks>) -> PathTree<C> {
        let mut tree = PathTree::new(graph, cost);
        tree.landmarks = Some(landmarks);
        tree
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn source(&self) -> Option<usize> {
        self.source
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Computes least-cost labels from `source`, departing at `start_time`, to every node the
    /// bounds allow.  All labels of the previous query are discarded.
    pub fn calculate(&mut self, source: usize, start_time: f64, bounds: &SearchBounds)
                     -> Result<(), SkimError> {
        self.graph.check_node(source)?;
        if let SearchBounds::StopAtTargets(targets) = bounds {
            for target in targets {
                self.graph.check_node(*target)?;
            }
        }
        self.search(source, start_time, bounds, None);
        Ok(())
    }

    /// The least-cost path from `from` to `to`, or None if `to` can't be reached.  Uses A* with
    /// the landmark bound as potential if this tree has landmarks, plain Dijkstra otherwise.
    pub fn calculate_path(&mut self, from: usize, to: usize, start_time: f64)
                          -> Result<Option<Path>, SkimError> {
        self.graph.check_node(from)?;
        self.graph.check_node(to)?;
        if self.landmarks.is_some() {
            self.search(from, start_time, &SearchBounds::Unbounded, Some(to));
        } else {
            self.search(from, start_time, &SearchBounds::StopAtTargets(vec![to]), None);
        }
        Ok(self.get_path(to))
    }

    fn reset(&mut self, source: usize, start_time: f64) {
        self.costs.reset();
        self.times.reset();
        self.distances.reset();
        self.pred_links.reset();
        self.settled.reset();
        self.pruned.reset();
        self.frontier.clear();
        self.settle_order.clear();
        self.source = Some(source);
        self.start_time = start_time;
    }

    fn potential(&self, node: usize, goal: Option<usize>) -> f64 {
        match (goal, &self.landmarks) {
            (Some(goal), Some(landmarks)) => landmarks.lower_bound(node, goal),
            _ => 0.,
        }
    }

    /// With a goal this is A*, which reopens settled nodes whose cost improves, so a potential
    /// that is admissible but not consistent still gives the least-cost path.
    fn search(&mut self, source: usize, start_time: f64, bounds: &SearchBounds,
              goal: Option<usize>) {
        self.reset(source, start_time);
        self.costs.set(source, 0.);
        self.times.set(source, start_time);
        self.distances.set(source, 0.);
        let key = self.potential(source, goal);
        self.frontier.push(source, FrontierEntry {key, node: source});

        let mut remaining_targets: Option<HashSet<usize>> = match bounds {
            SearchBounds::StopAtTargets(targets) => Some(targets.iter().cloned().collect()),
            _ => None,
        };
        let reopen = goal.is_some();

        while let Some((node, _)) = self.frontier.pop() {
            let node_cost = self.costs[node];
            let node_time = self.times[node];
            let node_dist = self.distances[node];
            if bounds.prunes(node_time - start_time, node_dist) {
                self.pruned.set(node, true);
                continue;
            }
            self.settled.set(node, true);
            if ! reopen {
                self.settle_order.push(node);
            }

            if goal == Some(node) {
                break;
            }
            if let Some(targets) = remaining_targets.as_mut() {
                targets.remove(&node);
                if targets.is_empty() {
                    break;
                }
            }

            for link in self.graph.out_links(node) {
                let next = link.to;
                if self.pruned[next] || (self.settled[next] && ! reopen) {
                    continue;
                }
                let travel_time = self.cost.travel_time(link, node_time);
                if ! travel_time.is_finite() {
                    continue;
                }
                let next_cost = node_cost + self.cost.travel_disutility(link, node_time);
                if next_cost < self.costs[next] {
                    self.costs.set(next, next_cost);
                    self.times.set(next, node_time + travel_time);
                    self.distances.set(next, node_dist + link.length);
                    self.pred_links.set(next, Some(link.index));
                    self.settled.set(next, false);
                    let key = next_cost + self.potential(next, goal);
                    self.frontier.push(next, FrontierEntry {key, node: next});
                }
            }
        }
    }

    /// The nodes the last `calculate` settled, in the order it settled them.  Pruned nodes are
    /// left out.
    pub fn reached_nodes(&self) -> &Vec<usize> {
        &self.settle_order
    }

    fn is_reached(&self, node: usize) -> bool {
        node < self.graph.num_nodes() && self.settled[node] && ! self.pruned[node]
    }

    /// Arrival time at `node`, if the last query settled it.
    pub fn get_time(&self, node: usize) -> Option<f64> {
        if self.is_reached(node) {
            return Some(self.times[node]);
        }
        None
    }

    pub fn get_cost(&self, node: usize) -> Option<f64> {
        if self.is_reached(node) {
            return Some(self.costs[node]);
        }
        None
    }

    pub fn get_distance(&self, node: usize) -> Option<f64> {
        if self.is_reached(node) {
            return Some(self.distances[node]);
        }
        None
    }

    /// Follows predecessor links back from `node` to the source of the last query.
    pub fn get_path(&self, node: usize) -> Option<Path> {
        let travel_time = self.get_time(node)? - self.start_time;
        let mut nodes = vec![node];
        let mut links = vec![];
        let mut curr = node;
        while let Some(link_idx) = self.pred_links[curr] {
            links.push(link_idx);
            curr = self.graph.link(link_idx).from;
            nodes.push(curr);
        }
        nodes.reverse();
        links.reverse();
        Some(Path {
            nodes,
            links,
            travel_time,
            cost: self.costs[node],
            distance: self.distances[node],
        })
    }
}
