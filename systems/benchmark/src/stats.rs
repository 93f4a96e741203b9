//! Statistics report of one run.

use std::{io::Write, time::Duration};

use linksim::statistics::StatisticRecord;

use crate::worker::EVENT_COUNT;

pub const CSV_HEADER: &str = "ComponentName, StatisticName, Count.u64";

/// Writes one CSV row per statistic.
pub fn write_csv<W: Write>(mut out: W, records: &[StatisticRecord]) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for record in records {
        writeln!(out, "{}, {}, {}", record.component, record.name, record.count)?;
    }
    out.flush()
}

/// Total events of the run divided by its wall-clock duration. `None` when
/// no time passed.
pub fn events_per_second(records: &[StatisticRecord], elapsed: Duration) -> Option<f64> {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return None;
    }
    let events: u64 = records
        .iter()
        .filter(|record| record.name == EVENT_COUNT)
        .map(|record| record.count)
        .sum();
    Some(events as f64 / seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(component: &str, name: &str, count: u64) -> StatisticRecord {
        StatisticRecord {
            component: component.to_string(),
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        write_csv(
            &mut out,
            &[
                record("Worker_0", "event_count", 12),
                record("Worker_1", "event_count", 7),
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ComponentName, StatisticName, Count.u64\n\
             Worker_0, event_count, 12\n\
             Worker_1, event_count, 7\n"
        );
    }

    #[test]
    fn rate_counts_only_events() {
        let records = [
            record("Worker_0", "event_count", 30),
            record("Worker_1", "event_count", 10),
            record("Worker_1", "other", 1000),
        ];
        assert_eq!(
            events_per_second(&records, Duration::from_secs(2)),
            Some(20.0)
        );
        assert_eq!(events_per_second(&records, Duration::ZERO), None);
    }
}
