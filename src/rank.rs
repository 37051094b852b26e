use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::aggregate::AggregateRow;
use crate::error::MetricsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankMetric {
    #[default]
    Roas,
    Ctr,
    ConversionRate,
    Cpc,
    Cpa,
    Impressions,
    Clicks,
    Conversions,
    Spend,
    Revenue,
}

impl RankMetric {
    pub const ALL: [RankMetric; 10] = [
        RankMetric::Roas,
        RankMetric::Ctr,
        RankMetric::ConversionRate,
        RankMetric::Cpc,
        RankMetric::Cpa,
        RankMetric::Impressions,
        RankMetric::Clicks,
        RankMetric::Conversions,
        RankMetric::Spend,
        RankMetric::Revenue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RankMetric::Roas => "roas",
            RankMetric::Ctr => "ctr",
            RankMetric::ConversionRate => "conversion-rate",
            RankMetric::Cpc => "cpc",
            RankMetric::Cpa => "cpa",
            RankMetric::Impressions => "impressions",
            RankMetric::Clicks => "clicks",
            RankMetric::Conversions => "conversions",
            RankMetric::Spend => "spend",
            RankMetric::Revenue => "revenue",
        }
    }

    /// The row's value for this metric; `None` when undefined.
    pub fn value(self, row: &AggregateRow) -> Option<f64> {
        match self {
            RankMetric::Roas => row.roas.value(),
            RankMetric::Ctr => row.ctr.value(),
            RankMetric::ConversionRate => row.conversion_rate.value(),
            RankMetric::Cpc => row.cpc.value(),
            RankMetric::Cpa => row.cpa.value(),
            RankMetric::Impressions => Some(row.impressions as f64),
            RankMetric::Clicks => Some(row.clicks as f64),
            RankMetric::Conversions => Some(row.conversions as f64),
            RankMetric::Spend => Some(row.total_spend),
            RankMetric::Revenue => Some(row.revenue_generated),
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankMetric {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankMetric::ALL
            .into_iter()
            .find(|metric| metric.name() == s)
            .ok_or_else(|| MetricsError::Config(format!("unknown ranking metric '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Descending,
    Ascending,
}

/// Stable top-N by `metric`. Undefined values go last in either direction.
pub fn rank(
    rows: &[AggregateRow],
    metric: RankMetric,
    top_n: usize,
    direction: Direction,
) -> Vec<AggregateRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| compare(metric.value(a), metric.value(b), direction));
    ranked.truncate(top_n);
    ranked
}

fn compare(a: Option<f64>, b: Option<f64>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            Direction::Descending => b.total_cmp(&a),
            Direction::Ascending => a.total_cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keeps the `months` most recent calendar months, oldest first.
pub fn trend_window(rows: &[AggregateRow], months: usize) -> Vec<AggregateRow> {
    let mut dated: Vec<&AggregateRow> = rows
        .iter()
        .filter(|row| row.key.month().is_some())
        .collect();
    dated.sort_by_key(|row| row.key.month());

    let skip = dated.len().saturating_sub(months);
    dated.into_iter().skip(skip).cloned().collect()
}
