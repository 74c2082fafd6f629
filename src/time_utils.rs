use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Clone, Copy)]
enum ParsedTimezone {
    Named(Tz),
    Fixed(FixedOffset),
}

fn parse_fixed_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    if !rest.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() > 2 {
        let (h, m) = rest.split_at(rest.len() - 2);
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_timezone(raw: &str) -> Option<ParsedTimezone> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if upper.starts_with("UTC") || upper.starts_with("GMT") {
        let offset = trimmed.get(3..).unwrap_or("");
        if offset.trim().is_empty() {
            return FixedOffset::east_opt(0).map(ParsedTimezone::Fixed);
        }
        return parse_fixed_offset(offset).map(ParsedTimezone::Fixed);
    }

    trimmed.parse::<Tz>().ok().map(ParsedTimezone::Named)
}

pub fn is_valid_timezone(raw: &str) -> bool {
    parse_timezone(raw).is_some()
}

/// Remote log rows carry a `dd/mm/yyyy` date and an `HH:MM` wall-clock time
/// in the operator's zone. Returns the matching UTC instant.
pub fn remote_timestamp(raw_tz: &str, date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .ok()?;
    let naive = NaiveDateTime::new(date, time);

    match parse_timezone(raw_tz) {
        Some(ParsedTimezone::Named(tz)) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(ParsedTimezone::Fixed(offset)) => offset
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_timestamp_in_named_zone() {
        let ts = remote_timestamp("America/Sao_Paulo", "05/03/2024", "14:30").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-05T17:30:00+00:00");
    }

    #[test]
    fn test_remote_timestamp_fixed_and_fallback() {
        let ts = remote_timestamp("UTC+02:00", "31/12/2023", "23:59").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-12-31T21:59:00+00:00");

        let utc = remote_timestamp("not/a-zone", "01/01/2024", "00:00").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_remote_timestamp_rejects_garbage() {
        assert!(remote_timestamp("UTC", "2024-01-01", "10:00").is_none());
        assert!(remote_timestamp("UTC", "01/01/2024", "").is_none());
    }

    #[test]
    fn test_timezone_validation() {
        assert!(is_valid_timezone("America/Sao_Paulo"));
        assert!(is_valid_timezone("gmt-3"));
        assert!(!is_valid_timezone(""));
        assert!(!is_valid_timezone("Mars/Olympus"));
    }

    #[test]
    fn test_offsets_with_non_ascii_are_rejected() {
        assert!(is_valid_timezone("UTC-0300"));
        assert!(!is_valid_timezone("UTC+1é"));
        assert!(!is_valid_timezone("UTC+é1"));
        assert!(!is_valid_timezone("GMT+٣"));
    }
}
