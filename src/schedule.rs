use std::collections::HashMap;
use std::path::Path;

use xml::reader::{EventReader, XmlEvent};

use super::config_utils;
use super::geometry::Point2d;
use super::SkimError;


#[derive(PartialEq, Debug, Clone)]
pub struct StopFacility {
    pub id: String,
    pub link: Option<String>,
    pub pos: Point2d,
}

/// A stop along a route.  Offsets are relative to the route's departure from its terminus.
#[derive(PartialEq, Debug, Clone)]
pub struct RouteStop {
    pub facility_id: String,
    arrival_offset_s: Option<f64>,
    departure_offset_s: Option<f64>,
}

impl RouteStop {
    pub fn new(facility_id: &str, arrival_offset_s: Option<f64>, departure_offset_s: Option<f64>)
               -> Result<RouteStop, SkimError> {
        if arrival_offset_s.is_none() && departure_offset_s.is_none() {
            return Err(SkimError::Parse(format!(
                "stop at {} has neither an arrival nor a departure offset", facility_id)));
        }
        Ok(RouteStop {
            facility_id: String::from(facility_id),
            arrival_offset_s,
            departure_offset_s,
        })
    }

    pub fn get_arrival_offset_s(&self) -> f64 {
        match self.arrival_offset_s {
            Some(aos) => aos,
            // the constructor guarantees one of the two is set
            None => self.departure_offset_s.unwrap_or(0.),
        }
    }

    pub fn get_departure_offset_s(&self) -> f64 {
        match self.departure_offset_s {
            Some(dos) => dos,
            None => self.arrival_offset_s.unwrap_or(0.),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Departure {
    pub id: String,
    pub departure_time_s: f64,
    pub vehicle_id: Option<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TransitRoute {
    pub line_id: String,
    pub route_id: String,
    pub mode: String,
    pub stops: Vec<RouteStop>,
    pub departures: Vec<Departure>,
}

impl TransitRoute {
    pub fn new(line_id: &str, route_id: &str, mode: &str) -> TransitRoute {
        TransitRoute {
            line_id: String::from(line_id),
            route_id: String::from(route_id),
            mode: String::from(mode),
            stops: vec![],
            departures: vec![],
        }
    }

    pub fn add_departure(&mut self, id: &str, departure_time_s: f64) {
        self.departures.push(Departure {
            id: String::from(id),
            departure_time_s,
            vehicle_id: None,
        });
    }
}

/// Stop facilities and the routes serving them.  Routes are kept in file order, and that order
/// is what route indices (as in `RouteLinkRef`) refer to.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TransitSchedule {
    pub stop_facilities: HashMap<String, StopFacility>,
    pub routes: Vec<TransitRoute>,
}

impl TransitSchedule {
    pub fn new() -> TransitSchedule {
        TransitSchedule::default()
    }

    pub fn add_stop_facility(&mut self, id: &str, pos: Point2d) {
        self.stop_facilities.insert(String::from(id), StopFacility {
            id: String::from(id),
            link: None,
            pos,
        });
    }

    /// Adds a route, returning its index.
    pub fn add_route(&mut self, route: TransitRoute) -> Result<usize, SkimError> {
        for stop in &route.stops {
            if ! self.stop_facilities.contains_key(&stop.facility_id) {
                return Err(SkimError::UnknownNode(stop.facility_id.clone()));
            }
        }
        self.routes.push(route);
        Ok(self.routes.len() - 1)
    }

    pub fn get_route(&self, route_idx: usize) -> Option<&TransitRoute> {
        self.routes.get(route_idx)
    }

    pub fn from_xml_file(schedule_xml_path: &Path) -> Result<TransitSchedule, SkimError> {
        let xml_str = std::fs::read_to_string(schedule_xml_path)?;
        TransitSchedule::from_xml(&xml_str)
    }

    pub fn from_xml(xml_string: &str) -> Result<TransitSchedule, SkimError> {
        let mut schedule = TransitSchedule::new();
        let mut parser = EventReader::new(xml_string.as_bytes());

        let mut line_id = String::new();
        let mut curr_route: Option<TransitRoute> = None;

        loop { match parser.next()? {
            XmlEvent::EndDocument => {
                log::info!("Reached end of schedule xml");
                break;
            }
            XmlEvent::EndElement {name} => {
                // add curr_route to the collection
                if name.local_name == "transitRoute" {
                    if let Some(route) = curr_route.take() {
                        schedule.add_route(route)?;
                    }
                }
            }
            XmlEvent::StartElement {name, attributes, ..} => { match name.local_name.as_str() {
                "stopFacility" => {
                    let xx = config_utils::require_xml_attribute(&attributes, "x",
                                                                 "stopFacility")?.parse()?;
                    let yy = config_utils::require_xml_attribute(&attributes, "y",
                                                                 "stopFacility")?.parse()?;
                    let id = config_utils::require_xml_attribute(&attributes, "id",
                                                                 "stopFacility")?;
                    let link = config_utils::get_xml_attribute_value(&attributes, "linkRefId");
                    schedule.stop_facilities.insert(id.clone(), StopFacility {
                        id,
                        link,
                        pos: Point2d::new(xx, yy),
                    });
                }

                "transitLine" => {
                    line_id = config_utils::require_xml_attribute(&attributes, "id",
                                                                  "transitLine")?;
                }

                "transitRoute" => {
                    let route_id = config_utils::require_xml_attribute(&attributes, "id",
                                                                       "transitRoute")?;
                    curr_route = Some(TransitRoute::new(&line_id, &route_id, ""));
                }

                "transportMode" => {
                    // the next event should contain the text.
                    match parser.next()? {
                        XmlEvent::Characters(content) => {
                            if let Some(route) = curr_route.as_mut() {
                                route.mode = content.trim().to_string();
                            }
                        }
                        _ => return Err(SkimError::Parse(
                            String::from("transportMode element contained no text"))),
                    }
                }

                "stop" => {
                    if let Some(route) = curr_route.as_mut() {
                        let arr_offset = match config_utils::get_xml_attribute_value(
                            &attributes, "arrivalOffset") {
                            Some(val) => Some(config_utils::get_num_seconds_from_time_str(&val)?),
                            None => None,
                        };
                        let dep_offset = match config_utils::get_xml_attribute_value(
                            &attributes, "departureOffset") {
                            Some(val) => Some(config_utils::get_num_seconds_from_time_str(&val)?),
                            None => None,
                        };
                        let facility_id = config_utils::require_xml_attribute(&attributes,
                                                                              "refId", "stop")?;
                        route.stops.push(RouteStop::new(&facility_id, arr_offset, dep_offset)?);
                    }
                }

                "departure" => {
                    if let Some(route) = curr_route.as_mut() {
                        let id = config_utils::require_xml_attribute(&attributes, "id",
                                                                     "departure")?;
                        let dt = config_utils::require_xml_attribute(&attributes,
                                                                     "departureTime",
                                                                     "departure")?;
                        route.departures.push(Departure {
                            id,
                            departure_time_s: config_utils::get_num_seconds_from_time_str(&dt)?,
                            vehicle_id: config_utils::get_xml_attribute_value(&attributes,
                                                                              "vehicleRefId"),
                        });
                    }
                }
                _ => {}
            }}
            _ => {}
        }}

        log::info!("read schedule with {} stop facilities and {} routes",
                   schedule.stop_facilities.len(), schedule.routes.len());
        Ok(schedule)
    }
}
