//! Zone activation policy.
//!
//! `on` zones are always active and `off` zones never are. A `schedule`
//! zone is active while the zone-local time of day falls inside its
//! `[schedule_start, schedule_stop]` window, both ends inclusive. A window
//! whose start is later than its stop spans midnight. A schedule missing
//! either bound is always active.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use geowatch_zone_models::{Zone, ZoneStatus};

/// Converts an instant to the wall-clock time of day in `timezone`,
/// applying whatever UTC offset (including DST) is in effect then.
#[must_use]
pub fn local_time_of_day(instant: DateTime<Utc>, timezone: Tz) -> NaiveTime {
    instant.with_timezone(&timezone).time()
}

/// Returns `true` if `t` lies in the inclusive window from `start` to
/// `stop`, wrapping past midnight when `start > stop`.
#[must_use]
pub fn window_contains(start: NaiveTime, stop: NaiveTime, t: NaiveTime) -> bool {
    if start <= stop {
        start <= t && t <= stop
    } else {
        t >= start || t <= stop
    }
}

/// Returns `true` if `zone` counts at `instant`.
#[must_use]
pub fn is_active(zone: &Zone, instant: DateTime<Utc>) -> bool {
    match zone.status {
        ZoneStatus::Off => false,
        ZoneStatus::On => true,
        ZoneStatus::Schedule => {
            let (Some(start), Some(stop)) = (zone.schedule_start, zone.schedule_stop) else {
                return true;
            };
            window_contains(start, stop, local_time_of_day(instant, zone.timezone))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use geo::MultiPolygon;

    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn zone(status: ZoneStatus, start: Option<NaiveTime>, stop: Option<NaiveTime>) -> Zone {
        Zone {
            id: "z".to_string(),
            status,
            schedule_start: start,
            schedule_stop: stop,
            timezone: chrono_tz::UTC,
            geometry: MultiPolygon(vec![]),
            description: String::new(),
            extra: BTreeMap::new(),
        }
    }

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn off_is_never_active() {
        let z = zone(ZoneStatus::Off, Some(hms(0, 0, 0)), Some(hms(23, 59, 59)));
        assert!(!is_active(&z, utc(12, 0, 0)));
    }

    #[test]
    fn on_is_always_active() {
        let z = zone(ZoneStatus::On, Some(hms(9, 0, 0)), Some(hms(10, 0, 0)));
        assert!(is_active(&z, utc(3, 0, 0)));
    }

    #[test]
    fn incomplete_schedule_is_always_active() {
        for (start, stop) in [(None, Some(hms(6, 0, 0))), (Some(hms(22, 0, 0)), None), (None, None)] {
            let z = zone(ZoneStatus::Schedule, start, stop);
            assert!(is_active(&z, utc(0, 0, 0)));
            assert!(is_active(&z, utc(12, 0, 0)));
            assert!(is_active(&z, utc(23, 59, 59)));
        }
    }

    #[test]
    fn daytime_window() {
        let z = zone(ZoneStatus::Schedule, Some(hms(9, 0, 0)), Some(hms(17, 0, 0)));
        assert!(is_active(&z, utc(12, 0, 0)));
        assert!(is_active(&z, utc(9, 0, 0)));
        assert!(is_active(&z, utc(17, 0, 0)));
        assert!(!is_active(&z, utc(8, 59, 59)));
        assert!(!is_active(&z, utc(17, 0, 1)));
        assert!(!is_active(&z, utc(20, 0, 0)));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let z = zone(ZoneStatus::Schedule, Some(hms(22, 0, 0)), Some(hms(6, 0, 0)));
        assert!(is_active(&z, utc(23, 30, 0)));
        assert!(is_active(&z, utc(0, 0, 0)));
        assert!(is_active(&z, utc(6, 0, 0)));
        assert!(is_active(&z, utc(22, 0, 0)));
        assert!(!is_active(&z, utc(12, 0, 0)));
        assert!(!is_active(&z, utc(6, 0, 1)));
        assert!(!is_active(&z, utc(21, 59, 59)));
    }

    #[test]
    fn equal_bounds_match_a_single_instant() {
        assert!(window_contains(hms(8, 0, 0), hms(8, 0, 0), hms(8, 0, 0)));
        assert!(!window_contains(hms(8, 0, 0), hms(8, 0, 0), hms(8, 0, 1)));
    }

    #[test]
    fn schedule_uses_zone_local_time() {
        // 16:00Z is 09:00 in Denver during winter (UTC-7).
        let mut z = zone(ZoneStatus::Schedule, Some(hms(9, 0, 0)), Some(hms(17, 0, 0)));
        z.timezone = chrono_tz::America::Denver;
        assert!(is_active(&z, utc(16, 0, 0)));
        assert!(!is_active(&z, utc(15, 59, 59)));
        // 02:00Z is 19:00 the previous evening in Denver.
        assert!(!is_active(&z, utc(2, 0, 0)));
    }

    #[test]
    fn local_time_follows_daylight_saving() {
        let denver = chrono_tz::America::Denver;
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        assert_eq!(local_time_of_day(winter, denver), hms(11, 0, 0));
        assert_eq!(local_time_of_day(summer, denver), hms(12, 0, 0));
    }

    #[test]
    fn local_time_across_spring_forward() {
        // US DST began 2024-03-10 at 02:00 local (09:00Z) in Denver.
        let denver = chrono_tz::America::Denver;
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 8, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(local_time_of_day(before, denver), hms(1, 59, 0));
        assert_eq!(local_time_of_day(after, denver), hms(3, 0, 0));
    }
}
