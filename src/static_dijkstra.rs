use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::Direction;

use super::cost::TravelDisutility;
use super::graph::Graph;


/// A time-independent one-to-all Dijkstra sweep, weighted by each link's minimum disutility.
/// Based on the implementation in the petgraph library.
///
/// With `Direction::Outgoing` this computes the cost from `root` to every node; with
/// `Direction::Incoming` it follows links backwards, giving the cost from every node to `root`.
/// Unreachable nodes get an infinite cost.
pub fn static_sweep<C>(graph: &Graph, root: usize, direction: Direction, cost: &mut C) -> Vec<f64>
    where C: TravelDisutility
{
    let mut scores = vec![f64::INFINITY; graph.num_nodes()];
    let mut visited = vec![false; graph.num_nodes()];
    scores[root] = 0.;

    let mut visit_next = BinaryHeap::new();
    visit_next.push(MinScored(0., root));
    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        for link in graph.links_directed(node, direction) {
            let next = match direction {
                Direction::Outgoing => link.to,
                Direction::Incoming => link.from,
            };
            if visited[next] {
                continue;
            }
            let next_score = node_score + cost.link_minimum_travel_disutility(link);
            if next_score < scores[next] {
                scores[next] = next_score;
                visit_next.push(MinScored(next_score, next));
            }
        }
    }
    scores
}


/// Orders by score, smallest first, so that a max-heap pops the minimum.
#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}
