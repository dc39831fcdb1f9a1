use crate::errors::AppError;
use crate::models::DailyRecord;
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    /// ISO dates are zero-padded, so string order is chronological order.
    fn contains(&self, date: &str) -> bool {
        let after_start = self.start.as_deref().is_none_or(|start| date >= start);
        let before_end = self.end.as_deref().is_none_or(|end| date <= end);
        after_start && before_end
    }
}

/// Month and date range are mutually exclusive; setting one clears the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    month: Option<u32>,
    range: DateRange,
}

impl RecordFilter {
    pub fn from_query(
        month: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, AppError> {
        let mut filter = Self::default();
        filter.set_range(non_empty(start), non_empty(end));

        match month.map(str::trim) {
            None | Some("") | Some("all") => {}
            Some(raw) => {
                let month = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|month| *month < 12)
                    .ok_or_else(|| AppError::bad_request("month must be between 0 and 11"))?;
                filter.select_month(month);
            }
        }

        Ok(filter)
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn select_month(&mut self, month: u32) {
        self.month = Some(month);
        self.range = DateRange::default();
    }

    pub fn set_range(&mut self, start: Option<String>, end: Option<String>) {
        self.range = DateRange { start, end };
        if self.range != DateRange::default() {
            self.month = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, record: &DailyRecord) -> bool {
        match self.month {
            Some(month) => month_index(&record.date) == Some(month),
            None => self.range.contains(&record.date),
        }
    }

    pub fn apply(&self, records: &[DailyRecord]) -> Vec<DailyRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Zero-based month of an ISO date.
fn month_index(date: &str) -> Option<u32> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|date| date.month0())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::seed_records;

    fn dates(records: &[DailyRecord]) -> Vec<&str> {
        records.iter().map(|record| record.date.as_str()).collect()
    }

    #[test]
    fn month_filter_keeps_only_that_month() {
        let mut filter = RecordFilter::default();
        filter.select_month(1);
        let filtered = filter.apply(&seed_records());
        assert_eq!(dates(&filtered), vec!["2025-02-03", "2025-02-17"]);
    }

    #[test]
    fn month_filter_ignores_stale_range() {
        let mut filter = RecordFilter {
            month: Some(0),
            range: DateRange {
                start: Some("2025-03-01".into()),
                end: None,
            },
        };
        assert_eq!(filter.apply(&seed_records()).len(), 2);

        filter.select_month(0);
        assert_eq!(filter.range(), &DateRange::default());
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let mut filter = RecordFilter::default();
        filter.set_range(Some("2025-01-13".into()), Some("2025-02-17".into()));
        let filtered = filter.apply(&seed_records());
        assert_eq!(
            dates(&filtered),
            vec!["2025-01-13", "2025-02-03", "2025-02-17"]
        );
    }

    #[test]
    fn open_bounds_impose_no_constraint() {
        let mut filter = RecordFilter::default();
        filter.set_range(None, Some("2025-01-31".into()));
        assert_eq!(filter.apply(&seed_records()).len(), 2);

        filter.set_range(Some("2025-03-01".into()), None);
        assert_eq!(filter.apply(&seed_records()).len(), 2);

        filter.clear();
        assert_eq!(filter.apply(&seed_records()).len(), seed_records().len());
    }

    #[test]
    fn setting_a_range_clears_the_month() {
        let mut filter = RecordFilter::default();
        filter.select_month(4);
        filter.set_range(Some("2025-01-01".into()), None);
        assert_eq!(filter.month(), None);
    }

    #[test]
    fn query_month_wins_over_range() {
        let filter =
            RecordFilter::from_query(Some("2"), Some("2025-01-01"), Some("2025-01-31")).unwrap();
        assert_eq!(filter.month(), Some(2));
        assert_eq!(dates(&filter.apply(&seed_records())), vec!["2025-03-03", "2025-03-24"]);
    }

    #[test]
    fn query_accepts_all_and_rejects_out_of_range_month() {
        let all = RecordFilter::from_query(Some("all"), Some(""), None).unwrap();
        assert_eq!(all, RecordFilter::default());
        assert!(RecordFilter::from_query(Some("12"), None, None).is_err());
        assert!(RecordFilter::from_query(Some("jan"), None, None).is_err());
    }
}
