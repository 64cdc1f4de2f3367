// The external network description: nodes with ids and coordinates, and directed links between
// them.  A Graph is built from this once; nothing in here is used during routing.
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use itertools::iproduct;
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use xml::reader::{EventReader, XmlEvent};

use super::config_utils;
use super::geometry::Point2d;
use super::SkimError;


/// Identifies the stretch of a transit route a link covers: the route's index in its schedule
/// and the indices of the stops at either end.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct RouteLinkRef {
    pub route: usize,
    pub from_stop: usize,
    pub to_stop: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct NetworkNode {
    pub id: String,
    pub coord: Point2d,
}

#[derive(PartialEq, Debug, Clone)]
pub struct NetworkLink {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
    pub length: f64,
    pub freespeed: f64,
    pub capacity: f64,
    pub permlanes: f64,
    pub modes: Vec<String>,
    pub route: Option<RouteLinkRef>,
}

impl NetworkLink {
    pub fn new(id: &str, from_node: &str, to_node: &str, length: f64, freespeed: f64)
               -> NetworkLink {
        NetworkLink {
            id: String::from(id),
            from_node: String::from(from_node),
            to_node: String::from(to_node),
            length,
            freespeed,
            capacity: 1000.,
            permlanes: 1.,
            modes: vec![String::from("car")],
            route: None,
        }
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.modes.iter().any(|mm| mm == mode)
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    links: Vec<NetworkLink>,
    node_idxs_by_id: HashMap<String, usize>,
}

impl Network {
    pub fn new() -> Network {
        Network::default()
    }

    /// Adds a node.  Adding a second node with an existing id replaces its coordinate.
    pub fn add_node(&mut self, id: &str, coord: Point2d) {
        match self.node_idxs_by_id.get(id) {
            Some(idx) => self.nodes[*idx].coord = coord,
            None => {
                self.node_idxs_by_id.insert(String::from(id), self.nodes.len());
                self.nodes.push(NetworkNode{id: String::from(id), coord});
            }
        }
    }

    pub fn add_link(&mut self, link: NetworkLink) -> Result<(), SkimError> {
        for end in &[&link.from_node, &link.to_node] {
            if ! self.node_idxs_by_id.contains_key(*end) {
                return Err(SkimError::UnknownNode(end.to_string()));
            }
        }
        self.links.push(link);
        Ok(())
    }

    pub fn nodes(&self) -> &Vec<NetworkNode> {
        &self.nodes
    }

    pub fn links(&self) -> &Vec<NetworkLink> {
        &self.links
    }

    pub fn get_node(&self, id: &str) -> Option<&NetworkNode> {
        self.node_idxs_by_id.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn from_xml(xml_path: &Path) -> Result<Network, SkimError> {
        let parser = config_utils::xml_parser_from_path(xml_path)?;
        Network::from_xml_events(parser)
    }

    pub fn from_xml_str(xml_str: &str) -> Result<Network, SkimError> {
        Network::from_xml_events(EventReader::new(xml_str.as_bytes()))
    }

    fn from_xml_events<RR: Read>(parser: EventReader<RR>) -> Result<Network, SkimError> {
        let mut network = Network::new();
        let mut num_self_loops = 0;
        for event in parser {
            let (name, attributes) = match event? {
                XmlEvent::EndDocument => {
                    log::info!("Reached end of network xml");
                    break;
                }
                XmlEvent::StartElement{ name, attributes, .. } => (name, attributes),
                _ => continue,
            };

            if name.local_name == "node" {
                let id = config_utils::require_xml_attribute(&attributes, "id", "node")?;
                let xpos = config_utils::require_xml_attribute(&attributes, "x", "node")?
                    .parse()?;
                let ypos = config_utils::require_xml_attribute(&attributes, "y", "node")?
                    .parse()?;
                network.add_node(&id, Point2d::new(xpos, ypos));
            } else if name.local_name == "link" {
                let id = config_utils::require_xml_attribute(&attributes, "id", "link")?;
                let from_id = config_utils::require_xml_attribute(&attributes, "from", "link")?;
                let to_id = config_utils::require_xml_attribute(&attributes, "to", "link")?;
                if to_id == from_id {
                    // ignore self-connections
                    num_self_loops += 1;
                    continue;
                }
                let length = config_utils::require_xml_attribute(&attributes, "length", "link")?
                    .parse()?;
                let freespeed = config_utils::require_xml_attribute(&attributes, "freespeed",
                                                                    "link")?;
                let freespeed = if freespeed == "Infinity" {
                    f64::INFINITY
                } else {
                    freespeed.parse()?
                };
                let mut link = NetworkLink::new(&id, &from_id, &to_id, length, freespeed);
                if let Some(capacity) = config_utils::get_xml_attribute_value(&attributes,
                                                                              "capacity") {
                    link.capacity = capacity.parse()?;
                }
                if let Some(permlanes) = config_utils::get_xml_attribute_value(&attributes,
                                                                               "permlanes") {
                    link.permlanes = permlanes.parse()?;
                }
                if let Some(modes) = config_utils::get_xml_attribute_value(&attributes, "modes") {
                    link.modes = modes.split(',').map(|ss| String::from(ss.trim())).collect();
                }
                network.add_link(link)?;
            }
        }

        if num_self_loops > 0 {
            log::warn!("ignored {} self-connected links", num_self_loops);
        }
        log::info!("read network with {} nodes and {} links", network.nodes.len(),
                   network.links.len());
        Ok(network)
    }

    /// Returns the sub-network of links that allow `mode`, and of the nodes those links touch.
    pub fn filter_by_mode(&self, mode: &str) -> Network {
        let links: Vec<&NetworkLink> = self.links.iter().filter(|ll| ll.has_mode(mode)).collect();
        let used_nodes: HashSet<&str> = links.iter()
            .flat_map(|ll| vec![ll.from_node.as_str(), ll.to_node.as_str()])
            .collect();

        let mut filtered = Network::new();
        for node in self.nodes.iter().filter(|nn| used_nodes.contains(nn.id.as_str())) {
            filtered.add_node(&node.id, node.coord);
        }
        for link in links {
            // both ends were added above, so this can't fail
            filtered.links.push(link.clone());
        }
        filtered
    }

    /// Keeps only the largest strongly connected component, so that every node can reach every
    /// other.  Dense skims over an uncleaned network usually fail with a Disconnected error.
    pub fn clean(&self) -> Network {
        let mut graph = DiGraphMap::new();
        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }
        for link in &self.links {
            graph.add_edge(self.node_idxs_by_id[&link.from_node],
                           self.node_idxs_by_id[&link.to_node], ());
        }

        let comps = kosaraju_scc(&graph);
        log::info!("there are {} strongly connected components", comps.len());
        let biggest: HashSet<usize> = match comps.into_iter().max_by_key(|comp| comp.len()) {
            Some(comp) => comp.into_iter().collect(),
            None => return Network::new(),
        };

        let mut cleaned = Network::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if biggest.contains(&idx) {
                cleaned.add_node(&node.id, node.coord);
            }
        }
        for link in &self.links {
            if cleaned.node_idxs_by_id.contains_key(&link.from_node) &&
               cleaned.node_idxs_by_id.contains_key(&link.to_node) {
                cleaned.links.push(link.clone());
            }
        }
        log::info!("removed {} nodes and {} links while cleaning the network",
                   self.nodes.len() - cleaned.nodes.len(), self.links.len() - cleaned.links.len());
        cleaned
    }

    /// Generates a grid city: `num_x_nodes` by `num_y_nodes` intersections `spacing_m` apart,
    /// with links in both directions between neighbouring intersections.  Node ids are
    /// `y_idx * num_x_nodes + x_idx`.
    pub fn grid(num_x_nodes: usize, num_y_nodes: usize, spacing_m: f64, freespeed_mps: f64)
                -> Network {
        let get_id_and_pos = |x_idx: usize, y_idx: usize| {
            let pos = Point2d::new(spacing_m * x_idx as f64, spacing_m * y_idx as f64);
            let id = y_idx * num_x_nodes + x_idx;
            return (id.to_string(), pos);
        };

        let mut network = Network::new();
        for (y_idx, x_idx) in iproduct!(0..num_y_nodes, 0..num_x_nodes) {
            let (id, pos) = get_id_and_pos(x_idx, y_idx);
            network.add_node(&id, pos);
        }

        // now that all nodes are added, iterate over them again and add links
        for (y_idx, x_idx) in iproduct!(0..num_y_nodes, 0..num_x_nodes) {
            let (this_id, _) = get_id_and_pos(x_idx, y_idx);
            let mut others = vec![];
            if 0 < x_idx {
                others.push(get_id_and_pos(x_idx - 1, y_idx).0);
            }
            if x_idx + 1 < num_x_nodes {
                others.push(get_id_and_pos(x_idx + 1, y_idx).0);
            }
            if 0 < y_idx {
                others.push(get_id_and_pos(x_idx, y_idx - 1).0);
            }
            if y_idx + 1 < num_y_nodes {
                others.push(get_id_and_pos(x_idx, y_idx + 1).0);
            }
            for other_id in others {
                let link_id = format!("{}-{}", this_id, other_id);
                network.links.push(NetworkLink::new(&link_id, &this_id, &other_id, spacing_m,
                                                    freespeed_mps));
            }
        }
        network
    }
}


#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    use super::*;

    static TEST_NETWORK_XML: &str = r###"<?xml version="1.0" encoding="utf-8"?>
    <!DOCTYPE network SYSTEM "http://matsim.org/files/dtd/network_v1.dtd">
    <network>
        <nodes>
            <node x="0.0" y="0.0" id="1" />
            <node x="1000.0" y="0.0" id="2" />
            <node x="2000.0" y="0.0" id="3" />
            <node x="20000.0" y="0.0" id="4" />
        </nodes>
        <links capperiod="10:00:00">
            <link id="1-2" modes="car" permlanes="1" capacity="2000" freespeed="22" length="1000" to="2" from="1"/>
            <link id="2-1" modes="car" permlanes="1" capacity="2000" freespeed="22" length="1000" to="1" from="2"/>
            <link id="2-3" modes="car,bus" permlanes="2" capacity="5000" freespeed="Infinity" length="1000" to="3" from="2"/>
            <link id="3-4" modes="bus" permlanes="1" capacity="2000" freespeed="29" length="18000" to="4" from="3"/>
            <link id="4-4" modes="car" permlanes="1" capacity="2000" freespeed="29" length="10" to="4" from="4"/>
        </links>
    </network>
    "###;

    #[test]
    fn test_network_parsing() {
        let network = Network::from_xml_str(TEST_NETWORK_XML).unwrap();
        assert_eq!(network.nodes().len(), 4);
        assert_eq!(network.get_node("2").unwrap().coord, Point2d::new(1000., 0.));
        // the self-loop is dropped
        assert_eq!(network.links().len(), 4);

        let link = &network.links()[2];
        assert_eq!(link.id, "2-3");
        assert_eq!(link.from_node, "2");
        assert_eq!(link.to_node, "3");
        assert_eq!(link.modes, vec![String::from("car"), String::from("bus")]);
        assert_eq!(link.freespeed, f64::INFINITY);
        assert_relative_eq!(link.permlanes, 2.);
        assert_relative_eq!(link.capacity, 5000.);
        assert!(link.route.is_none());
    }

    #[test]
    fn test_network_from_file() -> Result<(), SkimError> {
        let dir = tempdir()?;
        let file_path = dir.path().join("network.xml");
        let mut file = File::create(&file_path)?;
        file.write_all(TEST_NETWORK_XML.as_bytes())?;
        let network = Network::from_xml(&file_path)?;
        assert_eq!(network.nodes().len(), 4);
        Ok(())
    }

    #[test]
    fn test_unknown_node() {
        let xml = r#"<network><nodes><node id="a" x="0" y="0"/></nodes>
            <links><link id="l" from="a" to="b" length="1" freespeed="1"/></links></network>"#;
        match Network::from_xml_str(xml) {
            Err(SkimError::UnknownNode(id)) => assert_eq!(id, "b"),
            other => panic!("expected an unknown node error, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_and_clean() {
        let network = Network::from_xml_str(TEST_NETWORK_XML).unwrap();
        let car = network.filter_by_mode("car");
        assert_eq!(car.nodes().len(), 3);
        assert_eq!(car.links().len(), 3);
        assert!(car.get_node("4").is_none());

        // 1 <-> 2 is the only component with more than one node
        let cleaned = car.clean();
        let mut ids: Vec<&str> = cleaned.nodes().iter().map(|nn| nn.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(cleaned.links().len(), 2);
    }

    #[test]
    fn test_grid() {
        let grid = Network::grid(3, 2, 100., 10.);
        assert_eq!(grid.nodes().len(), 6);
        // 2 * (horizontal + vertical neighbour pairs)
        assert_eq!(grid.links().len(), 2 * (2 * 2 + 3));
        assert_eq!(grid.get_node("5").unwrap().coord, Point2d::new(200., 100.));
        assert_eq!(grid.clean().nodes().len(), 6);
    }
}
