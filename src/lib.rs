// imports of other modules from this crate
mod error;
pub use error::SkimError;

mod geometry;
pub use geometry::Point2d;

mod config_utils;

mod config;
pub use config::{NetworkSource, SkimConfig, TransitRouterParams};

mod network;
pub use network::{Network, NetworkLink, NetworkNode, RouteLinkRef};

mod schedule;
pub use schedule::{Departure, RouteStop, StopFacility, TransitRoute, TransitSchedule};

mod transit_network;
pub use transit_network::build_transit_network;

mod graph;
pub use graph::{Graph, GraphId, Link, Node};

mod cost;
pub use cost::{FreeSpeedTravelCost, ScheduleCostModel, TravelDisutility, TravelTime,
               departure_warning_count};

mod timestamped_vector;

mod static_dijkstra;

mod landmarks;
pub use landmarks::{LandmarkSelection, Landmarks, LandmarksFactory};

mod path_tree;
pub use path_tree::{Path, PathTree, SearchBounds};

mod worker_pool;
pub use worker_pool::{Lease, WorkerPool};

mod matrix;
pub use matrix::{Matrix, NodeAndTime, SparseMatrix, SparseRow};

mod matrix_builder;
pub use matrix_builder::{calculate_travel_time_matrix, calculate_travel_time_sparse_matrix,
                         MatrixBuilder, ProgressCounter};

mod zones;
pub use zones::{central_nodes, Zone};

mod skims;
pub use skims::{run, SkimResults, DENSE_MATRIX_FILE, OD_TIMES_FILE, SPARSE_MATRIX_FILE};

#[cfg(test)]
mod test_utils;


/// Defines the walking and transfer parameters every transit router config must provide.
pub trait RouterConfig {
    fn get_walk_speed_mps(&self) -> f64;
    fn get_beeline_dist_factor(&self) -> f64;
    fn get_transfer_radius_m(&self) -> f64;
    fn get_additional_transfer_time_s(&self) -> f64;

    /// Walking speed along the straight line between two points.
    fn get_beeline_walk_speed_mps(&self) -> f64 {
        return self.get_walk_speed_mps() / self.get_beeline_dist_factor();
    }

    fn dist_to_walk_time(&self, distance: f64) -> f64 {
        return distance / self.get_beeline_walk_speed_mps();
    }

    fn get_walk_time(&self, pos1: &Point2d, pos2: &Point2d) -> f64 {
        let distance = pos1.euclidean_distance(pos2);
        return self.dist_to_walk_time(distance);
    }
}
