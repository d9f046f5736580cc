use crate::models::{RenewalEntry, RenewalPartition, Row};
use chrono::{Months, NaiveDate};
use std::cmp::Ordering;

pub const RENEWAL_INTERVAL_MONTHS: u32 = 12;

/// Accepts the storage form `YYYY-MM-DD` and the display form `MM/DD/YYYY`.
pub fn parse_signed_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

/// Signed date plus one calendar year. Feb 29 lands on Feb 28.
pub fn next_renewal(row: &Row) -> Option<NaiveDate> {
    parse_signed_date(&row.signed_date)?.checked_add_months(Months::new(RENEWAL_INTERVAL_MONTHS))
}

/// Visible rows first, then hidden ones; inside each group dated renewals
/// ascend and undated rows trail. Ties keep collection order.
pub fn renewal_order(rows: &[Row]) -> Vec<RenewalEntry> {
    let mut entries: Vec<RenewalEntry> = rows
        .iter()
        .map(|row| RenewalEntry {
            next_renewal: next_renewal(row),
            row: row.clone(),
        })
        .collect();
    entries.sort_by(compare_entries);
    entries
}

fn compare_entries(a: &RenewalEntry, b: &RenewalEntry) -> Ordering {
    a.row
        .hide_renewal
        .cmp(&b.row.hide_renewal)
        .then_with(|| match (a.next_renewal, b.next_renewal) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

pub fn partition_renewals(rows: &[Row]) -> RenewalPartition {
    let mut partition = RenewalPartition::default();
    for entry in renewal_order(rows) {
        if entry.row.hide_renewal {
            partition.hidden.push(entry);
        } else if entry.next_renewal.is_some() {
            partition.scheduled.push(entry);
        } else {
            partition.unscheduled.push(entry);
        }
    }
    partition
}

pub fn days_until(entry: &RenewalEntry, today: NaiveDate) -> Option<i64> {
    entry
        .next_renewal
        .map(|date| date.signed_duration_since(today).num_days())
}

/// Visible rows renewing between `today` and `today + days`, inclusive.
pub fn renewals_due_within(rows: &[Row], today: NaiveDate, days: u32) -> Vec<RenewalEntry> {
    renewal_order(rows)
        .into_iter()
        .filter(|entry| !entry.row.hide_renewal)
        .filter(|entry| {
            days_until(entry, today)
                .map(|remaining| (0..=i64::from(days)).contains(&remaining))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(company: &str, date: &str) -> Row {
        let mut row = Row::create();
        row.company = company.to_string();
        row.signed_date = date.to_string();
        row
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("test date")
    }

    fn companies(entries: &[RenewalEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.row.company.as_str()).collect()
    }

    #[test]
    fn next_renewal_adds_one_calendar_year() {
        assert_eq!(next_renewal(&signed("A", "2024-01-15")), Some(date("2025-01-15")));
        assert_eq!(next_renewal(&signed("B", "06/01/2023")), Some(date("2024-06-01")));
        assert_eq!(next_renewal(&signed("C", "2024-02-29")), Some(date("2025-02-28")));
        assert_eq!(next_renewal(&signed("D", "")), None);
        assert_eq!(next_renewal(&signed("E", "sometime")), None);
        assert_eq!(next_renewal(&signed("F", "2024-13-01")), None);
    }

    #[test]
    fn orders_by_next_renewal_with_undated_last() {
        let rows = vec![
            signed("A", "2024-01-15"),
            signed("B", "2023-06-01"),
            signed("C", ""),
        ];
        let ordered = renewal_order(&rows);
        assert_eq!(companies(&ordered), vec!["B", "A", "C"]);
        assert_eq!(ordered[0].next_renewal, Some(date("2024-06-01")));
        assert_eq!(ordered[2].next_renewal, None);
    }

    #[test]
    fn hidden_rows_sink_regardless_of_date() {
        let mut rows = vec![
            signed("A", "2024-01-15"),
            signed("B", "2023-06-01"),
            signed("C", ""),
        ];
        rows[1].hide_renewal = true;
        assert_eq!(companies(&renewal_order(&rows)), vec!["A", "C", "B"]);
    }

    #[test]
    fn hidden_group_is_itself_date_ordered() {
        let mut rows = vec![
            signed("Late", "2024-09-01"),
            signed("Undated", ""),
            signed("Early", "2024-03-01"),
            signed("Shown", "2030-01-01"),
        ];
        rows[0].hide_renewal = true;
        rows[1].hide_renewal = true;
        rows[2].hide_renewal = true;
        assert_eq!(
            companies(&renewal_order(&rows)),
            vec!["Shown", "Early", "Late", "Undated"]
        );
    }

    #[test]
    fn partition_splits_scheduled_unscheduled_hidden() {
        let mut rows = vec![
            signed("A", "2024-01-15"),
            signed("B", "bad"),
            signed("C", "2023-06-01"),
        ];
        rows[2].hide_renewal = true;
        let partition = partition_renewals(&rows);
        assert_eq!(companies(&partition.scheduled), vec!["A"]);
        assert_eq!(companies(&partition.unscheduled), vec!["B"]);
        assert_eq!(companies(&partition.hidden), vec!["C"]);
    }

    #[test]
    fn due_window_excludes_hidden_past_and_far_renewals() {
        let mut rows = vec![
            signed("Soon", "2025-11-01"),
            signed("Today", "2025-10-19"),
            signed("Past", "2024-10-01"),
            signed("Far", "2026-03-01"),
            signed("Hidden", "2025-11-02"),
        ];
        rows[4].hide_renewal = true;

        let today = date("2026-10-19");
        let due = renewals_due_within(&rows, today, 60);
        assert_eq!(companies(&due), vec!["Today", "Soon"]);
        assert_eq!(days_until(&due[0], today), Some(0));
        assert_eq!(days_until(&due[1], today), Some(13));
    }
}
