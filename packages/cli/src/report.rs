//! Plain-text rendering of ranked zones.

use std::fmt::Write as _;

use civic_pulse_zones::dominant_category;
use civic_pulse_zones_models::Zone;

/// Renders zones as a fixed-width table, one row per zone, in the order
/// given.
#[must_use]
pub fn render_table(zones: &[Zone]) -> String {
    if zones.is_empty() {
        return "No reports yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>7} {:>7} {:>6} {:>6} {:>5}  TOP CATEGORY",
        "ZONE", "REPORTS", "AVG SEV", "VOTES", "CONF", "ALERT"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));

    for zone in zones {
        let _ = writeln!(
            out,
            "{:<20} {:>7} {:>7.2} {:>6} {:>6.1} {:>5}  {}",
            zone.key.as_str(),
            zone.total,
            zone.avg_severity,
            zone.votes,
            zone.confidence,
            if zone.alert { "yes" } else { "-" },
            dominant_category(zone).unwrap_or("Mixed"),
        );
    }

    out
}
