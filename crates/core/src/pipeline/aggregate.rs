use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::sales::{CleanedRecord, DailySummary};

#[derive(Debug)]
struct Tally {
    weekday_rank: u8,
    month_rank: u8,
    unit_count: u64,
    total_revenue: f64,
}

/// Groups cleaned transactions into one row per `(date, item_name)`.
///
/// `unit_count` is the number of transactions in the group, not a sum of quantities. Output
/// is ordered by date, then item name. The calendar ranks of a day come from its first
/// record; later records of the same day that disagree are counted in the group but do not
/// split it.
pub fn aggregate(records: &[CleanedRecord]) -> Vec<DailySummary> {
    let mut groups: BTreeMap<(NaiveDate, &str), Tally> = BTreeMap::new();
    let mut rank_conflicts: usize = 0;
    for record in records {
        let tally = groups
            .entry((record.date, record.item_name.as_str()))
            .or_insert(Tally {
                weekday_rank: record.weekday_rank,
                month_rank: record.month_rank,
                unit_count: 0,
                total_revenue: 0.0,
            });
        if (tally.weekday_rank, tally.month_rank) != (record.weekday_rank, record.month_rank) {
            rank_conflicts += 1;
            tracing::debug!(
                date = %record.date,
                item_name = %record.item_name,
                kept = ?(tally.weekday_rank, tally.month_rank),
                seen = ?(record.weekday_rank, record.month_rank),
                "calendar ranks disagree within one day"
            );
        }
        tally.unit_count += 1;
        tally.total_revenue += record.amount;
    }

    if rank_conflicts > 0 {
        tracing::warn!(
            rank_conflicts,
            "records disagreed on weekday/month rank for their day; kept each day's first ranks"
        );
    }

    let out: Vec<DailySummary> = groups
        .into_iter()
        .map(|((date, item_name), tally)| DailySummary {
            date,
            weekday_rank: tally.weekday_rank,
            month_rank: tally.month_rank,
            item_name: item_name.to_string(),
            unit_count: tally.unit_count,
            total_revenue: tally.total_revenue,
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        daily_rows = out.len(),
        "aggregated daily summary"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rec(date: (i32, u32, u32), item: &str, amount: f64) -> CleanedRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        CleanedRecord {
            date,
            time: None,
            item_name: item.to_string(),
            amount,
            weekday_rank: crate::pipeline::clean::weekday_rank_of(date),
            month_rank: crate::pipeline::clean::month_rank_of(date),
        }
    }

    #[test]
    fn counts_transactions_and_sums_revenue() {
        let records = vec![
            rec((2024, 1, 1), "Latte", 1000.0),
            rec((2024, 1, 1), "Latte", 500.0),
            rec((2024, 1, 1), "Mocha", 80.0),
            rec((2024, 1, 8), "Latte", 300.0),
        ];
        let daily = aggregate(&records);
        assert_eq!(daily.len(), 3);

        assert_eq!(daily[0].item_name, "Latte");
        assert_eq!(daily[0].unit_count, 2);
        assert_eq!(daily[0].total_revenue, 1500.0);
        assert_eq!(daily[0].weekday_rank, 1);

        assert_eq!(daily[1].item_name, "Mocha");
        assert_eq!(daily[1].unit_count, 1);

        assert_eq!(daily[2].date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(daily[2].unit_count, 1);
        assert_eq!(daily[2].total_revenue, 300.0);
    }

    #[test]
    fn daily_key_is_unique() {
        let mut records = Vec::new();
        for day in 1..=20 {
            for item in ["Latte", "Mocha", "Americano"] {
                for n in 0..(day % 4) {
                    records.push(rec((2024, 2, day), item, f64::from(n + 1)));
                }
            }
        }
        let daily = aggregate(&records);
        let keys: HashSet<_> = daily.iter().map(|r| (r.date, r.item_name.clone())).collect();
        assert_eq!(keys.len(), daily.len());

        let total: u64 = daily.iter().map(|r| r.unit_count).sum();
        assert_eq!(total as usize, records.len());
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn conflicting_ranks_keep_the_first_record_of_the_day() {
        let a = rec((2024, 1, 1), "Latte", 1.0);
        let mut b = a.clone();
        b.weekday_rank = 3;
        b.month_rank = 9;

        let daily = aggregate(&[a.clone(), b.clone()]);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].unit_count, 2);
        assert_eq!(daily[0].total_revenue, 2.0);
        assert_eq!((daily[0].weekday_rank, daily[0].month_rank), (1, 1));

        let daily = aggregate(&[b, a]);
        assert_eq!(daily.len(), 1);
        assert_eq!((daily[0].weekday_rank, daily[0].month_rank), (3, 9));
    }
}
