// The network a transit router searches: every stop of every route is its own node, so staying
// on a route and changing between routes are different links.
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;

use super::geometry::Point2d;
use super::network::{Network, NetworkLink, RouteLinkRef};
use super::schedule::TransitSchedule;
use super::RouterConfig;
use super::SkimError;


pub const TRANSFER_MODE: &str = "walk";

struct RouteStopNode {
    id: String,
    pos: Point2d,
    route_idx: usize,
    // whether anyone can get off here (not the first stop) or on (not the last)
    can_alight: bool,
    can_board: bool,
}

/// Builds the transit router network for `schedule`.  Consecutive stops of a route are joined by
/// route links; nodes of different routes whose stops lie within the transfer radius of each
/// other are joined by walking transfer links.
pub fn build_transit_network<CC: RouterConfig>(schedule: &TransitSchedule, cfg: &CC)
                                               -> Result<Network, SkimError> {
    let mut network = Network::new();
    let mut route_stop_nodes = vec![];

    for (route_idx, route) in schedule.routes.iter().enumerate() {
        let mut prev: Option<(usize, String, Point2d)> = None;
        for (stop_idx, stop) in route.stops.iter().enumerate() {
            let facility = schedule.stop_facilities.get(&stop.facility_id)
                .ok_or_else(|| SkimError::UnknownNode(stop.facility_id.clone()))?;
            let node_id = format!("{}/{}/{}", route.line_id, route.route_id, stop_idx);
            network.add_node(&node_id, facility.pos);
            route_stop_nodes.push(RouteStopNode {
                id: node_id.clone(),
                pos: facility.pos,
                route_idx,
                can_alight: stop_idx > 0,
                can_board: stop_idx + 1 < route.stops.len(),
            });

            if let Some((prev_idx, prev_id, prev_pos)) = prev {
                let mut link = NetworkLink::new(&format!("{}>{}", prev_id, node_id), &prev_id,
                                                &node_id, prev_pos.euclidean_distance(&facility.pos),
                                                f64::INFINITY);
                link.modes = vec![route.mode.clone()];
                link.route = Some(RouteLinkRef {
                    route: route_idx,
                    from_stop: prev_idx,
                    to_stop: stop_idx,
                });
                network.add_link(link)?;
            }
            prev = Some((stop_idx, node_id, facility.pos));
        }
    }
    let num_route_links = network.links().len();

    let mut kdtree = KdTree::new(2);
    for (ii, rsn) in route_stop_nodes.iter().enumerate() {
        if rsn.can_board {
            kdtree.add(rsn.pos.as_array(), ii)?;
        }
    }
    let radius = cfg.get_transfer_radius_m();
    for from in route_stop_nodes.iter().filter(|rsn| rsn.can_alight) {
        let mut nearby: Vec<usize> = kdtree
            .within(&from.pos.as_array(), radius.powi(2), &squared_euclidean)?
            .into_iter()
            .map(|(_, ii)| *ii)
            .filter(|ii| route_stop_nodes[*ii].route_idx != from.route_idx)
            .collect();
        nearby.sort();
        for ii in nearby {
            let to = &route_stop_nodes[ii];
            let mut link = NetworkLink::new(&format!("{}>{}", from.id, to.id), &from.id, &to.id,
                                            from.pos.euclidean_distance(&to.pos),
                                            cfg.get_walk_speed_mps());
            link.modes = vec![String::from(TRANSFER_MODE)];
            network.add_link(link)?;
        }
    }

    log::info!("built a transit router network with {} nodes, {} route links and {} transfer \
                links", network.nodes().len(), num_route_links,
               network.links().len() - num_route_links);
    Ok(network)
}
