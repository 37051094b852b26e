use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::metrics::DerivedMetrics;

/// Label used for a missing demographic field.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub campaign_name: String,
    pub marketing_channel: String,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub month: Option<Month>,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub total_spend: f64,
    pub revenue_generated: f64,
    pub metrics: DerivedMetrics,
}

/// A calendar month; orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Campaign,
    Channel,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Campaign => f.write_str("Campaign"),
            SubjectKind::Channel => f.write_str("Channel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Strong,
    Weak,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub subject_kind: SubjectKind,
    pub subject_name: String,
    pub category: Category,
    pub roas: f64,
    pub message: String,
}
