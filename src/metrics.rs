//! Derived ratio metrics and the undefined-value rules they follow.

use std::fmt;

use serde::Serialize;

use crate::models::Record;

/// A ratio that is undefined when its denominator is zero.
///
/// Undefined values are never coerced to zero or infinity. They serialize as
/// `null` and are skipped by [`mean`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Ratio(Option<f64>);

impl Ratio {
    pub const UNDEFINED: Ratio = Ratio(None);

    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Self::UNDEFINED;
        }
        let value = numerator / denominator;
        if value.is_finite() {
            Ratio(Some(value))
        } else {
            Self::UNDEFINED
        }
    }

    pub fn of_counts(numerator: u64, denominator: u64) -> Self {
        Self::of(numerator as f64, denominator as f64)
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_undefined(self) -> bool {
        self.0.is_none()
    }
}

impl From<f64> for Ratio {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Ratio(Some(value))
        } else {
            Self::UNDEFINED
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => match f.precision() {
                Some(precision) => write!(f, "{value:.precision$}"),
                None => write!(f, "{value}"),
            },
            None => f.write_str("n/a"),
        }
    }
}

/// Mean of the defined values; undefined inputs count as missing.
pub fn mean<I>(values: I) -> Ratio
where
    I: IntoIterator<Item = Ratio>,
{
    let (sum, count) = values
        .into_iter()
        .filter_map(Ratio::value)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        Ratio::UNDEFINED
    } else {
        Ratio::from(sum / count as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub ctr: Ratio,
    pub conversion_rate: Ratio,
    pub cpc: Ratio,
    pub cpa: Ratio,
    pub roas: Ratio,
}

impl DerivedMetrics {
    /// Computes every ratio from raw base totals.
    pub fn from_bases(
        impressions: u64,
        clicks: u64,
        conversions: u64,
        total_spend: f64,
        revenue_generated: f64,
    ) -> Self {
        DerivedMetrics {
            ctr: Ratio::of_counts(clicks, impressions),
            conversion_rate: Ratio::of_counts(conversions, clicks),
            cpc: Ratio::of(total_spend, clicks as f64),
            cpa: Ratio::of(total_spend, conversions as f64),
            roas: Ratio::of(revenue_generated, total_spend),
        }
    }
}

pub fn compute(record: &Record) -> DerivedMetrics {
    DerivedMetrics::from_bases(
        record.impressions,
        record.clicks,
        record.conversions,
        record.total_spend,
        record.revenue_generated,
    )
}

/// Returns the record with its derived metrics filled in.
pub fn with_metrics(mut record: Record) -> Record {
    record.metrics = compute(&record);
    record
}
