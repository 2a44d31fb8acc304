//! Date and UTC-offset formatting for the ephemeris request.

use chrono::{DateTime, Offset, Utc};
use chrono_tz::Tz;

/// Format an offset in seconds as `±HH:MM`.
pub fn format_utc_offset(offset_seconds: i32) -> String {
    let sign = if offset_seconds >= 0 { '+' } else { '-' };
    let minutes = offset_seconds.unsigned_abs() / 60;
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// Offset of `tz` from UTC at `instant`, in seconds. DST is taken into account.
pub fn utc_offset_seconds(tz: Tz, instant: DateTime<Utc>) -> i32 {
    instant.with_timezone(&tz).offset().fix().local_minus_utc()
}

/// `±HH:MM` offset of `tz` at `instant`.
pub fn utc_offset_at(tz: Tz, instant: DateTime<Utc>) -> String {
    format_utc_offset(utc_offset_seconds(tz, instant))
}

/// Calendar date of `instant` in `tz`, as `YYYY-MM-DD`.
pub fn local_date_string(tz: Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_format_offsets() {
        assert_eq!(format_utc_offset(5 * 3600 + 30 * 60), "+05:30");
        assert_eq!(format_utc_offset(-8 * 3600), "-08:00");
        assert_eq!(format_utc_offset(0), "+00:00");
        assert_eq!(format_utc_offset(-(3 * 3600 + 30 * 60)), "-03:30");
        assert_eq!(format_utc_offset(14 * 3600), "+14:00");
    }

    #[test]
    fn test_half_and_quarter_hour_zones() {
        let now = at(2024, 6, 1, 12);
        assert_eq!(utc_offset_at(chrono_tz::Asia::Kolkata, now), "+05:30");
        assert_eq!(utc_offset_at(chrono_tz::Asia::Kathmandu, now), "+05:45");
    }

    #[test]
    fn test_dst_is_applied() {
        let tz = chrono_tz::America::Los_Angeles;
        assert_eq!(utc_offset_at(tz, at(2024, 1, 15, 12)), "-08:00");
        assert_eq!(utc_offset_at(tz, at(2024, 7, 15, 12)), "-07:00");

        let tz = chrono_tz::Europe::Oslo;
        assert_eq!(utc_offset_at(tz, at(2024, 1, 15, 12)), "+01:00");
        assert_eq!(utc_offset_at(tz, at(2024, 7, 15, 12)), "+02:00");
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let instant = at(2024, 1, 1, 2);
        assert_eq!(local_date_string(chrono_tz::UTC, instant), "2024-01-01");
        assert_eq!(
            local_date_string(chrono_tz::America::Los_Angeles, instant),
            "2023-12-31"
        );

        let instant = at(2024, 3, 9, 23);
        assert_eq!(
            local_date_string(chrono_tz::Pacific::Auckland, instant),
            "2024-03-10"
        );
    }
}
