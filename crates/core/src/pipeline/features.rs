use crate::domain::sales::{DailySummary, FeatureRow};

const YESTERDAY_OFFSET: usize = 1;
const LAST_WEEK_OFFSET: usize = 7;

/// Looks back `offset` rows in `sequence`, yielding `V::default()` where no such row exists.
///
/// The lag is positional: a gap in the calendar does not shift it. With daily rows
/// `[Jan 1, Jan 8]`, the offset-1 value for Jan 8 is taken from Jan 1.
pub fn positional_lag<T, V, F>(sequence: &[T], key: F, offset: usize) -> Vec<V>
where
    F: Fn(&T) -> V,
    V: Default,
{
    (0..sequence.len())
        .map(|idx| {
            idx.checked_sub(offset)
                .map(|prev| key(&sequence[prev]))
                .unwrap_or_default()
        })
        .collect()
}

pub fn is_weekend(weekday_rank: u8) -> bool {
    matches!(weekday_rank, 6 | 7)
}

/// Derives lag and calendar features from the daily summary.
///
/// Rows come back sorted by `(item_name, date)`. `day_index` is measured from the earliest
/// date in the whole table, shared by every item.
pub fn build_features(daily: &[DailySummary]) -> Vec<FeatureRow> {
    let mut sorted = daily.to_vec();
    sorted.sort_by(|a, b| {
        a.item_name
            .cmp(&b.item_name)
            .then_with(|| a.date.cmp(&b.date))
    });

    let Some(first_day) = sorted.iter().map(|r| r.date).min() else {
        return Vec::new();
    };

    let mut yesterday = Vec::with_capacity(sorted.len());
    let mut last_week = Vec::with_capacity(sorted.len());
    let mut items: usize = 0;
    for item_rows in sorted.chunk_by(|a, b| a.item_name == b.item_name) {
        items += 1;
        yesterday.extend(positional_lag(item_rows, |r| r.unit_count, YESTERDAY_OFFSET));
        last_week.extend(positional_lag(item_rows, |r| r.unit_count, LAST_WEEK_OFFSET));
    }

    let out: Vec<FeatureRow> = sorted
        .into_iter()
        .zip(yesterday)
        .zip(last_week)
        .map(|((summary, sale_yesterday), sale_last_week)| FeatureRow {
            day_index: (summary.date - first_day).num_days(),
            sale_yesterday,
            sale_last_week,
            is_weekend: is_weekend(summary.weekday_rank),
            summary,
        })
        .collect();

    tracing::debug!(rows = out.len(), items, %first_day, "built feature table");
    out
}
