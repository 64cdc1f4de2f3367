// Time-dependent link weights.  Travel time and disutility are separate capabilities, so a
// search that only needs one of them can say so; both cost models here implement both.
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use super::config::TransitRouterParams;
use super::graph::Link;
use super::schedule::TransitSchedule;
use super::RouterConfig;


pub const DAY_S: f64 = 24. * 3600.;

/// Link travel times.  Takes `&mut self` so that implementations may memoise; an instance must
/// therefore not be shared between threads, each worker gets its own clone.
pub trait TravelTime {
    /// Seconds needed to traverse `link` when entering it at `time`.  Never negative.
    fn travel_time(&mut self, link: &Link, time: f64) -> f64;
}

/// Link disutilities (generalized costs; lower is better).
pub trait TravelDisutility {
    fn travel_disutility(&mut self, link: &Link, time: f64) -> f64;

    /// A lower bound on the disutility of `link` over all entry times, used to precompute
    /// landmark distances.
    fn link_minimum_travel_disutility(&mut self, link: &Link) -> f64 {
        self.travel_disutility(link, 0.)
    }
}


/// Free-flow driving: time is length over free speed, and the disutility is the time.
#[derive(Clone, Debug, Default)]
pub struct FreeSpeedTravelCost;

impl TravelTime for FreeSpeedTravelCost {
    fn travel_time(&mut self, link: &Link, _time: f64) -> f64 {
        link.length / link.freespeed
    }
}

impl TravelDisutility for FreeSpeedTravelCost {
    fn travel_disutility(&mut self, link: &Link, time: f64) -> f64 {
        self.travel_time(link, time)
    }
}


static DEPARTURE_WARNINGS: AtomicUsize = AtomicUsize::new(0);

/// The number of times the departure-before-midnight warning has been logged in this process.
/// This is never more than one.
pub fn departure_warning_count() -> usize {
    DEPARTURE_WARNINGS.load(Ordering::SeqCst)
}

/// Sorted departure times per route, built on first use.  Shared by all clones of a cost model.
#[derive(Debug)]
struct DepartureCache {
    sorted_by_route: Vec<OnceLock<Vec<f64>>>,
}

impl DepartureCache {
    fn new(num_routes: usize) -> DepartureCache {
        DepartureCache {
            sorted_by_route: (0..num_routes).map(|_| OnceLock::new()).collect(),
        }
    }
}

/// Costs on a transit router network.  Route links are priced from the timetable: waiting for
/// the next departure plus the in-vehicle time to the next stop.  Links without a route are
/// walking transfers.
#[derive(Clone, Debug)]
pub struct ScheduleCostModel {
    schedule: Arc<TransitSchedule>,
    params: TransitRouterParams,
    departure_cache: Arc<DepartureCache>,
    // (link index, entry time, travel time) of the most recent lookup
    last_lookup: Option<(usize, f64, f64)>,
}

impl ScheduleCostModel {
    pub fn new(schedule: Arc<TransitSchedule>, params: TransitRouterParams) -> ScheduleCostModel {
        let departure_cache = Arc::new(DepartureCache::new(schedule.routes.len()));
        ScheduleCostModel {
            schedule,
            params,
            departure_cache,
            last_lookup: None,
        }
    }

    pub fn params(&self) -> &TransitRouterParams {
        &self.params
    }

    /// Drops all sorted departure arrays.  Only this instance sees the fresh cache; clones made
    /// earlier keep the old one.
    pub fn clear_departure_cache(&mut self) {
        self.departure_cache = Arc::new(DepartureCache::new(self.schedule.routes.len()));
        self.last_lookup = None;
    }

    /// How many routes have their departures sorted and cached.
    pub fn num_cached_routes(&self) -> usize {
        self.departure_cache.sorted_by_route.iter().filter(|cc| cc.get().is_some()).count()
    }

    fn sorted_departures(&self, route_idx: usize) -> &Vec<f64> {
        let schedule = &self.schedule;
        self.departure_cache.sorted_by_route[route_idx].get_or_init(|| {
            let mut departures: Vec<f64> = schedule.routes[route_idx].departures.iter()
                .map(|dd| dd.departure_time_s)
                .collect();
            departures.sort_by(|aa, bb| aa.partial_cmp(bb).unwrap_or(CmpOrdering::Equal));
            departures
        })
    }

    /// The first departure of `route_idx` from its stop `stop_idx` at or after `time`.  Departures
    /// repeat every day, so this wraps around midnight.  Infinite if the route never departs.
    pub fn get_next_departure_time(&self, route_idx: usize, stop_idx: usize, time: f64) -> f64 {
        let stop_offset = self.schedule.routes[route_idx].stops[stop_idx].get_departure_offset_s();
        let mut earliest_at_terminus = time - stop_offset;
        if earliest_at_terminus >= DAY_S {
            earliest_at_terminus = earliest_at_terminus % DAY_S;
        }
        if earliest_at_terminus < 0. &&
           DEPARTURE_WARNINGS.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            log::warn!("departure at terminus is before midnight; taking the first departure \
                        after midnight instead. This warning is only given once.");
        }

        let departures = self.sorted_departures(route_idx);
        if departures.is_empty() {
            return f64::INFINITY;
        }
        let mut pos = departures.partition_point(|dd| *dd < earliest_at_terminus);
        if pos >= departures.len() {
            // no later departure today, so take the first one tomorrow
            pos = 0;
        }
        let mut best_departure = departures[pos] + stop_offset;
        while best_departure < time {
            best_departure += DAY_S;
        }
        best_departure
    }

    fn transfer_time(&self, link: &Link) -> f64 {
        self.params.dist_to_walk_time(link.length) + self.params.additional_transfer_time_s
    }

    fn transfer_disutility(&self, transfer_time: f64) -> f64 {
        let wait_time = self.params.additional_transfer_time_s;
        let walk_time = transfer_time - wait_time;
        -walk_time * self.params.marginal_utility_travel_time_walk_utl_s
            - wait_time * self.params.marginal_utility_waiting_utl_s
            - self.params.utility_of_line_switch_utl
    }

    fn in_vehicle_disutility(&self, link: &Link, travel_time: f64) -> f64 {
        -travel_time * self.params.marginal_utility_travel_time_pt_utl_s
            - link.length * self.params.marginal_utility_travel_distance_pt_utl_m
    }
}

impl TravelTime for ScheduleCostModel {
    fn travel_time(&mut self, link: &Link, time: f64) -> f64 {
        if let Some((link_idx, last_time, travel_time)) = self.last_lookup {
            if link_idx == link.index && last_time == time {
                return travel_time;
            }
        }

        let travel_time = match link.route {
            Some(rlr) => {
                let route = &self.schedule.routes[rlr.route];
                let from_offset = route.stops[rlr.from_stop].get_departure_offset_s();
                let to_offset = route.stops[rlr.to_stop].get_arrival_offset_s();
                let departure = self.get_next_departure_time(rlr.route, rlr.from_stop, time);
                let mut travel_time = (departure - time) + (to_offset - from_offset);
                if travel_time < 0. {
                    // the departure is after midnight but the query time was before
                    travel_time += DAY_S;
                }
                travel_time
            }
            None => self.transfer_time(link),
        };
        self.last_lookup = Some((link.index, time, travel_time));
        travel_time
    }
}

impl TravelDisutility for ScheduleCostModel {
    fn travel_disutility(&mut self, link: &Link, time: f64) -> f64 {
        let travel_time = self.travel_time(link, time);
        match link.route {
            Some(_) => self.in_vehicle_disutility(link, travel_time),
            None => self.transfer_disutility(travel_time),
        }
    }

    /// Waiting is left out, so this never exceeds the disutility at any entry time.
    fn link_minimum_travel_disutility(&mut self, link: &Link) -> f64 {
        match link.route {
            Some(rlr) => {
                let route = &self.schedule.routes[rlr.route];
                let in_vehicle_time = route.stops[rlr.to_stop].get_arrival_offset_s() -
                    route.stops[rlr.from_stop].get_departure_offset_s();
                self.in_vehicle_disutility(link, in_vehicle_time.max(0.))
            }
            None => {
                let transfer_time = self.transfer_time(link);
                self.transfer_disutility(transfer_time)
            }
        }
    }
}
