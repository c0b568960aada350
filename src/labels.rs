use once_cell::sync::Lazy;
use regex::Regex;

static DISTANCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*km\b").expect("valid distance regex")
});
static RADIUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:within\s+)?(\d+(?:\.\d+)?)\s*(?:km)?\s*$").expect("valid radius regex")
});

/// "1.5km away" -> 1.5
pub fn parse_distance_label(label: &str) -> Option<f64> {
    DISTANCE_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Distance selector option, e.g. "Within 10km" or a bare "5".
pub fn parse_radius_option(label: &str) -> Option<f64> {
    RADIUS_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub fn format_distance(distance_km: f64) -> String {
    format!("{distance_km:.1}km away")
}

pub fn format_radius_option(radius_km: f64) -> String {
    if radius_km.fract() == 0.0 {
        format!("Within {radius_km:.0}km")
    } else {
        format!("Within {radius_km}km")
    }
}
