use crate::errors::{Error, Result};
use crate::model::NewSchedule;
use chrono::NaiveTime;

const TIMER_MIN_SECS: u32 = 1;
const TIMER_MAX_SECS: u32 = 86_400;
const OCTET_MAX: u32 = 255;
const WEEKDAY_MAX: u8 = 6;

/// Validates a relay board address: four dot-separated numeric segments, each at most 255.
pub fn validate_address(address: &str) -> Result<()> {
    let segments: Vec<&str> = address.split('.').collect();
    if segments.len() != 4 {
        return Err(Error::InvalidAddress(format!(
            "{} is not a dotted-quad address",
            address
        )));
    }

    for segment in segments {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "segment '{}' of {} is not numeric",
                segment, address
            )));
        }

        // Long digit runs are out of range whatever their value
        let value: u32 = segment.parse().unwrap_or(u32::MAX);
        if value > OCTET_MAX {
            return Err(Error::InvalidAddress(format!(
                "segment {} of {} exceeds {}",
                segment, address, OCTET_MAX
            )));
        }
    }

    Ok(())
}

/// Validates a countdown duration in seconds.
pub fn validate_timer_duration(duration: u32) -> Result<()> {
    if !(TIMER_MIN_SECS..=TIMER_MAX_SECS).contains(&duration) {
        return Err(Error::InvalidTimer(format!(
            "Duration {} out of range [{}, {}]",
            duration, TIMER_MIN_SECS, TIMER_MAX_SECS
        )));
    }
    Ok(())
}

pub fn parse_schedule_time(time: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|e| Error::InvalidSchedule(format!("time '{}': {}", time, e)))
}

pub fn validate_schedule(schedule: &NewSchedule) -> Result<()> {
    parse_schedule_time(&schedule.time)?;

    if schedule.days.is_empty() {
        return Err(Error::InvalidSchedule(
            "at least one weekday is required".to_string(),
        ));
    }

    if let Some(day) = schedule.days.iter().find(|d| **d > WEEKDAY_MAX) {
        return Err(Error::InvalidSchedule(format!(
            "weekday {} out of range [0, {}]",
            day, WEEKDAY_MAX
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Action;

    #[test]
    fn test_valid_addresses() {
        assert!(validate_address("10.0.0.5").is_ok());
        assert!(validate_address("192.168.1.100").is_ok());
        assert!(validate_address("255.255.255.255").is_ok());
        assert!(validate_address("0.0.0.0").is_ok());
    }

    #[test]
    fn test_segment_out_of_range() {
        assert!(validate_address("999.1.1.1").is_err());
        assert!(validate_address("1.1.1.256").is_err());
        assert!(validate_address("1.1.1.99999999999999").is_err());
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(validate_address("").is_err());
        assert!(validate_address("10.0.0").is_err());
        assert!(validate_address("10.0.0.5.1").is_err());
        assert!(validate_address("10.0..5").is_err());
        assert!(validate_address("a.b.c.d").is_err());
        assert!(validate_address("10.0.0.-5").is_err());
        assert!(validate_address("nodemcu.local").is_err());
    }

    #[test]
    fn test_timer_bounds() {
        assert!(validate_timer_duration(0).is_err());
        assert!(validate_timer_duration(1).is_ok());
        assert!(validate_timer_duration(86_400).is_ok());
        assert!(validate_timer_duration(86_401).is_err());
    }

    #[test]
    fn test_schedule_validation() {
        let mut schedule = NewSchedule {
            enabled: true,
            time: "08:00".to_string(),
            days: vec![1, 2, 3],
            action: Action::On,
        };
        assert!(validate_schedule(&schedule).is_ok());

        schedule.time = "24:10".to_string();
        assert!(validate_schedule(&schedule).is_err());

        schedule.time = "07:30".to_string();
        schedule.days = vec![];
        assert!(validate_schedule(&schedule).is_err());

        schedule.days = vec![0, 7];
        assert!(validate_schedule(&schedule).is_err());
    }
}
