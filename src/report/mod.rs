// Turning fetched courses into something a person reads: a summary block,
// a console table and a PDF document. Both table forms share `course_row`,
// so a record renders to the same cell text everywhere.

pub mod console;
pub mod pdf;

use std::time::Duration;

use crate::courses::CourseRecord;

pub const COLUMNS: [&str; 9] = [
    "Course Code",
    "Section",
    "Faculty",
    "Capacity",
    "Taken",
    "Available",
    "Day",
    "Time",
    "Room",
];

/// Totals shown above the course table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub count: usize,
    pub fetch_time: Duration,
    pub total_capacity: i64,
    pub total_taken: i64,
    pub total_available: i64,
}

impl ReportSummary {
    pub fn from_records(records: &[CourseRecord], fetch_time: Duration) -> Self {
        let total_capacity: i64 = records.iter().map(|r| r.seat_capacity).sum();
        let total_taken: i64 = records.iter().map(|r| r.seat_taken).sum();
        ReportSummary {
            count: records.len(),
            fetch_time,
            total_capacity,
            total_taken,
            total_available: total_capacity - total_taken,
        }
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Courses:", self.count.to_string()),
            ("Fetch Time:", format!("{:.2}s", self.fetch_time.as_secs_f64())),
            ("Total Capacity:", self.total_capacity.to_string()),
            ("Total Taken:", self.total_taken.to_string()),
            ("Total Available:", self.total_available.to_string()),
        ]
    }
}

fn or_na(value: &str) -> String {
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

/// Cell text for one record, in `COLUMNS` order.
pub fn course_row(record: &CourseRecord) -> [String; 9] {
    let slot = record.slot();
    [
        or_na(&record.course_code),
        or_na(&record.section_name),
        or_na(&record.short_name),
        record.seat_capacity.to_string(),
        record.seat_taken.to_string(),
        record.available().to_string(),
        slot.days_label(),
        slot.time,
        or_na(&record.room_name),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, capacity: i64, taken: i64, slot: &str) -> CourseRecord {
        CourseRecord {
            course_code: code.into(),
            section_name: "1".into(),
            short_name: "XYZ".into(),
            seat_capacity: capacity,
            seat_taken: taken,
            time_slot_name: slot.into(),
            room_name: String::new(),
        }
    }

    #[test]
    fn test_summary_totals() {
        let records = vec![
            record("CSE110", 40, 38, "MW 10:00-11:30"),
            record("MAT101", 30, 35, "AR 02:00-03:30"),
        ];
        let summary = ReportSummary::from_records(&records, Duration::from_millis(1250));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_capacity, 70);
        assert_eq!(summary.total_taken, 73);
        assert_eq!(summary.total_available, -3);
        assert_eq!(summary.rows()[1].1, "1.25s");
    }

    #[test]
    fn test_course_row() {
        let row = course_row(&record("MAT101", 30, 35, "AR 02:00-03:30"));
        assert_eq!(row[0], "MAT101");
        assert_eq!(row[5], "-5");
        assert_eq!(row[6], "SATURDAY, THURSDAY");
        assert_eq!(row[7], "02:00-03:30");
        assert_eq!(row[8], "N/A");
    }

    #[test]
    fn test_empty_summary() {
        let summary = ReportSummary::from_records(&[], Duration::ZERO);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.total_available, 0);
    }
}
