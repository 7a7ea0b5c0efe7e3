//! ISO 8601 duration strings used for relative span offsets (e.g. `PT1.5S`).

use std::time::Duration;

/// Parse an ISO 8601 duration such as `PT3H30M15S`, `P1DT2H` or `PT0.25S`.
///
/// Only day and time components are supported; years, months and weeks have
/// no fixed length and are rejected. Returns `None` on malformed input.
pub fn parse_iso_duration(s: &str) -> Option<Duration> {
    let rest = s.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return None;
            }
            (d, Some(t))
        }
        None => (rest, None),
    };

    let mut total = 0f64;
    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D')?;
        total += parse_component(days)? * 86_400.0;
    }
    if let Some(time) = time_part {
        let mut number = String::new();
        let mut last_unit = 0u8;
        for c in time.chars() {
            let (unit, scale) = match c {
                'H' => (1, 3_600.0),
                'M' => (2, 60.0),
                'S' => (3, 1.0),
                _ => {
                    number.push(c);
                    continue;
                }
            };
            // Units must appear once each, in H, M, S order.
            if unit <= last_unit {
                return None;
            }
            last_unit = unit;
            total += parse_component(&number)? * scale;
            number.clear();
        }
        if !number.is_empty() {
            return None;
        }
    }
    Duration::try_from_secs_f64(total).ok()
}

fn parse_component(s: &str) -> Option<f64> {
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a duration as an ISO 8601 time duration (`PT1H2M3.5S`).
///
/// Zero formats as `PT0S`. Sub-second precision is kept to the millisecond.
pub fn format_iso_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let millis = total_ms % 60_000;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if millis > 0 || (hours == 0 && minutes == 0) {
        let secs = millis / 1000;
        let frac = millis % 1000;
        if frac == 0 {
            out.push_str(&format!("{secs}S"));
        } else {
            let frac = format!("{frac:03}");
            out.push_str(&format!("{secs}.{}S", frac.trim_end_matches('0')));
        }
    }
    out
}
