use serde::Serialize;

use crate::aggregate::AggregateRow;
use crate::error::{MetricsError, Result};
use crate::models::{Category, Recommendation, SubjectKind};

pub const DEFAULT_HIGH_ROAS: f64 = 2.0;
pub const DEFAULT_LOW_ROAS: f64 = 1.0;

/// ROAS cut-offs: above `high` is strong, below `low` is weak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    high: f64,
    low: f64,
}

impl Thresholds {
    pub fn new(high: f64, low: f64) -> Result<Self> {
        for (name, value) in [("high", high), ("low", low)] {
            if !value.is_finite() || value < 0.0 {
                return Err(MetricsError::Config(format!(
                    "{name} ROAS threshold must be a non-negative number, got {value}"
                )));
            }
        }
        if low > high {
            return Err(MetricsError::Config(format!(
                "low ROAS threshold {low} is above high threshold {high}"
            )));
        }
        Ok(Thresholds { high, low })
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn categorize(&self, roas: f64) -> Category {
        if roas > self.high {
            Category::Strong
        } else if roas < self.low {
            Category::Weak
        } else {
            Category::Neutral
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            high: DEFAULT_HIGH_ROAS,
            low: DEFAULT_LOW_ROAS,
        }
    }
}

/// One recommendation per row with a defined ROAS, in row order.
pub fn recommend(
    rows: &[AggregateRow],
    subject_kind: SubjectKind,
    thresholds: &Thresholds,
) -> Vec<Recommendation> {
    rows.iter()
        .filter_map(|row| {
            let roas = row.roas.value()?;
            let subject_name = row.key.to_string();
            let category = thresholds.categorize(roas);
            Some(Recommendation {
                message: advice(subject_kind, &subject_name, category),
                subject_kind,
                subject_name,
                category,
                roas,
            })
        })
        .collect()
}

fn advice(kind: SubjectKind, name: &str, category: Category) -> String {
    let verdict = match (kind, category) {
        (SubjectKind::Campaign, Category::Strong) => {
            "is high-performing. Consider increasing budget."
        }
        (SubjectKind::Campaign, Category::Weak) => "is low-performing. Consider reducing budget.",
        (SubjectKind::Campaign, Category::Neutral) => {
            "is medium-performing. Monitor performance."
        }
        (SubjectKind::Channel, Category::Strong) => "is strong. Consider more investment.",
        (SubjectKind::Channel, Category::Weak) => "is weak. Consider reducing investment.",
        (SubjectKind::Channel, Category::Neutral) => {
            "is medium-performing. Monitor investment."
        }
    };
    format!("{kind} '{name}' {verdict}")
}
