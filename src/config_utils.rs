use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use xml::reader::EventReader;
use xml::attribute::OwnedAttribute;

use super::SkimError;


pub fn xml_parser_from_path(path: &Path) -> Result<EventReader<BufReader<File>>, SkimError> {
    let file = File::open(path)?;
    let file = BufReader::new(file);
    Ok(EventReader::new(file))
}

pub fn get_xml_attribute_value(attributes: &Vec<OwnedAttribute>, attr_name: &str)
                               -> Option<String> {
    match attributes.iter().find(|attr| attr.name.local_name == attr_name) {
        Some(attr) => Some(attr.value.clone()),
        None => None,
    }
}

/// Like `get_xml_attribute_value`, but a missing attribute is a parse error.
pub fn require_xml_attribute(attributes: &Vec<OwnedAttribute>, attr_name: &str, element: &str)
                             -> Result<String, SkimError> {
    get_xml_attribute_value(attributes, attr_name).ok_or_else(
        || SkimError::Parse(format!("<{}> element has no {:?} attribute", element, attr_name)))
}

pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

/// Parses "HH:MM:SS" (or "HH:MM") into seconds since midnight.  Hours may exceed 23, since
/// schedules regularly run past midnight.
pub fn get_num_seconds_from_time_str(timestr: &str) -> Result<f64, SkimError> {
    let parts: Vec<&str> = timestr.trim().split(":").collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(SkimError::Parse(format!("{:?} is not a HH:MM:SS time", timestr)));
    }
    let hours: u32 = parts[0].parse()?;
    let minutes: u32 = parts[1].parse()?;
    let seconds: f64 = match parts.get(2) {
        Some(secstr) => secstr.parse()?,
        None => 0.,
    };
    Ok((hours * 3600 + minutes * 60) as f64 + seconds)
}
