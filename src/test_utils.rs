use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Debug;

use super::geometry::Point2d;
use super::graph::Graph;
use super::network::{Network, NetworkLink};


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// A grid city with 100 m blocks and 10 m/s links, so every link takes 10 s.
pub fn grid_graph(num_x_nodes: usize, num_y_nodes: usize) -> Graph {
    let network = Network::grid(num_x_nodes, num_y_nodes, 100., 10.);
    Graph::from_network(&network).unwrap()
}

/// `num_nodes` nodes on a circle of radius 100, linked one way round it.  Link k goes from node
/// k to node k + 1 and takes k + 1 seconds.
pub fn one_way_ring_graph(num_nodes: usize) -> Graph {
    let mut network = Network::new();
    for ii in 0..num_nodes {
        let angle = 2. * PI * ii as f64 / num_nodes as f64;
        network.add_node(&ii.to_string(), Point2d::new(100. * angle.cos(), 100. * angle.sin()));
    }
    for ii in 0..num_nodes {
        let next = (ii + 1) % num_nodes;
        let link = NetworkLink::new(&format!("{}-{}", ii, next), &ii.to_string(),
                                    &next.to_string(), (ii + 1) as f64, 1.);
        network.add_link(link).unwrap();
    }
    Graph::from_network(&network).unwrap()
}
