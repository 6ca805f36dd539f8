/// Formats seconds as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Parses catalog labels like `5:45` or `1:02:03` into seconds.
pub fn parse_duration_label(label: &str) -> Option<f64> {
    let parts = label
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let seconds = match parts.as_slice() {
        [s] => *s,
        [m, s] if *s < 60 => m.checked_mul(60)?.checked_add(*s)?,
        [h, m, s] if *m < 60 && *s < 60 => h
            .checked_mul(3600)?
            .checked_add(m * 60 + s)?,
        _ => return None,
    };
    Some(seconds as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(42.9), "0:42");
        assert_eq!(format_timestamp(615.0), "10:15");
        assert_eq!(format_timestamp(3_723.0), "1:02:03");
    }

    #[test]
    fn garbage_formats_as_zero() {
        assert_eq!(format_timestamp(f64::NAN), "0:00");
        assert_eq!(format_timestamp(-12.0), "0:00");
    }

    #[test]
    fn parses_catalog_labels() {
        assert_eq!(parse_duration_label("2:30"), Some(150.0));
        assert_eq!(parse_duration_label(" 15:30 "), Some(930.0));
        assert_eq!(parse_duration_label("1:02:03"), Some(3_723.0));
        assert_eq!(parse_duration_label("45"), Some(45.0));
        assert_eq!(parse_duration_label("2:75"), None);
        assert_eq!(parse_duration_label("soon"), None);
        assert_eq!(parse_duration_label(""), None);
    }

    #[test]
    fn oversized_labels_are_rejected() {
        assert_eq!(parse_duration_label(&format!("{}:00", u64::MAX)), None);
        assert_eq!(parse_duration_label(&format!("{}:00:00", u64::MAX)), None);
        assert_eq!(parse_duration_label(&format!("{}:59:59", u64::MAX / 3600)), None);
    }
}
