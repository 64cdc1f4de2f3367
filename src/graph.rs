// An immutable, index-addressed routing graph.  Links are stored in compressed first-out form,
// in both directions, so the searches never hash anything.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::geometry::Point2d;
use super::network::{Network, RouteLinkRef};
use super::SkimError;


static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a Graph, used to cache per-graph preprocessing.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct GraphId(usize);

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub index: usize,
    pub id: String,
    pub coord: Point2d,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Link {
    pub index: usize,
    pub id: String,
    pub from: usize,
    pub to: usize,
    pub length: f64,
    pub freespeed: f64,
    /// Only set for timetable links; None means a walk or transfer link, or a plain road link.
    pub route: Option<RouteLinkRef>,
}

#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_idxs_by_id: HashMap<String, usize>,
    // links leaving node n are out_links[out_first[n]..out_first[n + 1]]
    out_first: Vec<usize>,
    out_links: Vec<usize>,
    in_first: Vec<usize>,
    in_links: Vec<usize>,
}

impl Graph {
    /// Builds the graph.  Nodes get dense indices in the order they appear in the network, and
    /// links likewise.
    pub fn from_network(network: &Network) -> Result<Graph, SkimError> {
        let mut nodes = vec![];
        let mut node_idxs_by_id = HashMap::new();
        for (index, node) in network.nodes().iter().enumerate() {
            node_idxs_by_id.insert(node.id.clone(), index);
            nodes.push(Node {index, id: node.id.clone(), coord: node.coord});
        }

        let mut links = vec![];
        for (index, link) in network.links().iter().enumerate() {
            let from = *node_idxs_by_id.get(&link.from_node)
                .ok_or_else(|| SkimError::UnknownNode(link.from_node.clone()))?;
            let to = *node_idxs_by_id.get(&link.to_node)
                .ok_or_else(|| SkimError::UnknownNode(link.to_node.clone()))?;
            links.push(Link {
                index,
                id: link.id.clone(),
                from,
                to,
                length: link.length,
                freespeed: link.freespeed,
                route: link.route,
            });
        }

        let (out_first, out_links) = build_first_out(nodes.len(), &links, |ll| ll.from);
        let (in_first, in_links) = build_first_out(nodes.len(), &links, |ll| ll.to);
        let id = GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed));
        log::debug!("built graph {:?} with {} nodes and {} links", id, nodes.len(), links.len());

        Ok(Graph {
            id,
            nodes,
            links,
            node_idxs_by_id,
            out_first,
            out_links,
            in_first,
            in_links,
        })
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &Vec<Node> {
        &self.nodes
    }

    pub fn link(&self, index: usize) -> &Link {
        &self.links[index]
    }

    pub fn links(&self) -> &Vec<Link> {
        &self.links
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_idxs_by_id.get(id).copied()
    }

    pub fn check_node(&self, index: usize) -> Result<(), SkimError> {
        if index < self.nodes.len() {
            return Ok(());
        }
        Err(SkimError::NodeOutOfRange(index))
    }

    pub fn out_links(&self, node: usize) -> impl Iterator<Item = &Link> + '_ {
        self.links_directed(node, Direction::Outgoing)
    }

    pub fn in_links(&self, node: usize) -> impl Iterator<Item = &Link> + '_ {
        self.links_directed(node, Direction::Incoming)
    }

    pub fn links_directed(&self, node: usize, direction: Direction)
                          -> impl Iterator<Item = &Link> + '_ {
        let (first, idxs) = match direction {
            Direction::Outgoing => (&self.out_first, &self.out_links),
            Direction::Incoming => (&self.in_first, &self.in_links),
        };
        idxs[first[node]..first[node + 1]].iter().map(move |li| &self.links[*li])
    }

    /// Strongly connected components, as lists of node indices.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let mut graph = DiGraph::<(), ()>::with_capacity(self.nodes.len(), self.links.len());
        for _ in &self.nodes {
            graph.add_node(());
        }
        for link in &self.links {
            graph.add_edge(NodeIndex::new(link.from), NodeIndex::new(link.to), ());
        }
        kosaraju_scc(&graph).into_iter()
            .map(|comp| comp.into_iter().map(|ni| ni.index()).collect())
            .collect()
    }

    pub fn is_strongly_connected(&self) -> bool {
        self.strongly_connected_components().len() <= 1
    }
}

/// Counting sort of link indices by `key`.
fn build_first_out<F>(num_nodes: usize, links: &Vec<Link>, key: F) -> (Vec<usize>, Vec<usize>)
    where F: Fn(&Link) -> usize
{
    let mut first = vec![0; num_nodes + 1];
    for link in links {
        first[key(link) + 1] += 1;
    }
    for ii in 0..num_nodes {
        first[ii + 1] += first[ii];
    }
    let mut next = first.clone();
    let mut sorted = vec![0; links.len()];
    for link in links {
        let slot = &mut next[key(link)];
        sorted[*slot] = link.index;
        *slot += 1;
    }
    (first, sorted)
}
