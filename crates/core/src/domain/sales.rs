use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw point-of-sale row, borrowed from the uploaded table before any validation.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRecord<'a> {
    pub date: &'a str,
    pub time: Option<&'a str>,
    pub item_name: &'a str,
    pub amount: &'a str,
    pub weekday_rank: Option<&'a str>,
    pub month_rank: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub date: NaiveDate,
    pub time: Option<String>,
    pub item_name: String,
    pub amount: f64,
    /// Monday = 1 .. Sunday = 7.
    pub weekday_rank: u8,
    pub month_rank: u8,
}

/// One row per distinct `(date, item_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Weeksort")]
    pub weekday_rank: u8,
    #[serde(rename = "Monthsort")]
    pub month_rank: u8,
    #[serde(rename = "Menu_Name")]
    pub item_name: String,
    #[serde(rename = "Amount_of_Sale")]
    pub unit_count: u64,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub summary: DailySummary,
    /// Days since the earliest date in the whole table, across all items.
    #[serde(rename = "day_number")]
    pub day_index: i64,
    pub sale_yesterday: u64,
    pub sale_last_week: u64,
    pub is_weekend: bool,
}

impl From<FeatureRow> for DailySummary {
    fn from(row: FeatureRow) -> Self {
        row.summary
    }
}
