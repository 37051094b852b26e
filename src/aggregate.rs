//! Grouped rollups. Ratios on a group are recomputed from its summed bases,
//! never averaged from per-record ratios.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::metrics::{self, DerivedMetrics, Ratio};
use crate::models::{Month, Record, UNKNOWN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Campaign,
    Channel,
    Demographic,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    Campaign { name: String },
    Channel { name: String },
    Demographic { age_group: String, gender: String },
    Month { month: Month },
}

impl GroupKey {
    fn for_record(record: &Record, group_by: GroupBy) -> Option<Self> {
        let key = match group_by {
            GroupBy::Campaign => GroupKey::Campaign {
                name: record.campaign_name.clone(),
            },
            GroupBy::Channel => GroupKey::Channel {
                name: record.marketing_channel.clone(),
            },
            GroupBy::Demographic => GroupKey::Demographic {
                age_group: record.age_group.as_deref().unwrap_or(UNKNOWN).to_string(),
                gender: record.gender.as_deref().unwrap_or(UNKNOWN).to_string(),
            },
            GroupBy::Month => GroupKey::Month {
                month: record.month?,
            },
        };
        Some(key)
    }

    pub fn month(&self) -> Option<Month> {
        match self {
            GroupKey::Month { month } => Some(*month),
            _ => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Campaign { name } | GroupKey::Channel { name } => f.write_str(name),
            GroupKey::Demographic { age_group, gender } => write!(f, "{age_group} / {gender}"),
            GroupKey::Month { month } => write!(f, "{month}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub records: usize,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub total_spend: f64,
    pub revenue_generated: f64,
    pub ctr: Ratio,
    pub conversion_rate: Ratio,
    pub cpc: Ratio,
    pub cpa: Ratio,
    pub roas: Ratio,
}

#[derive(Debug, Default)]
struct Totals {
    records: usize,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    total_spend: f64,
    revenue_generated: f64,
}

impl Totals {
    fn add(&mut self, record: &Record) {
        self.records += 1;
        self.impressions = self.impressions.saturating_add(record.impressions);
        self.clicks = self.clicks.saturating_add(record.clicks);
        self.conversions = self.conversions.saturating_add(record.conversions);
        self.total_spend += record.total_spend;
        self.revenue_generated += record.revenue_generated;
    }

    fn derived(&self) -> DerivedMetrics {
        DerivedMetrics::from_bases(
            self.impressions,
            self.clicks,
            self.conversions,
            self.total_spend,
            self.revenue_generated,
        )
    }

    fn into_row(self, key: GroupKey) -> AggregateRow {
        let derived = self.derived();
        AggregateRow {
            key,
            records: self.records,
            impressions: self.impressions,
            clicks: self.clicks,
            conversions: self.conversions,
            total_spend: self.total_spend,
            revenue_generated: self.revenue_generated,
            ctr: derived.ctr,
            conversion_rate: derived.conversion_rate,
            cpc: derived.cpc,
            cpa: derived.cpa,
            roas: derived.roas,
        }
    }
}

/// Groups records in order of each key's first occurrence.
pub fn aggregate(records: &[Record], group_by: GroupBy) -> Vec<AggregateRow> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Totals)> = Vec::new();

    for record in records {
        let Some(key) = GroupKey::for_record(record, group_by) else {
            continue;
        };

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Totals::default()));
            groups.len() - 1
        });
        groups[slot].1.add(record);
    }

    groups
        .into_iter()
        .map(|(key, totals)| totals.into_row(key))
        .collect()
}

/// Headline figures for the whole (filtered) dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub records: usize,
    pub undated_records: usize,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub total_spend: f64,
    pub total_revenue: f64,
    /// Mean of per-record CTR, skipping undefined values.
    pub avg_ctr: Ratio,
    /// Mean of per-record ROAS, skipping undefined values.
    pub avg_roas: Ratio,
    /// Total revenue over total spend.
    pub blended_roas: Ratio,
}

pub fn summarize(records: &[Record]) -> KpiSummary {
    let mut totals = Totals::default();
    for record in records {
        totals.add(record);
    }

    KpiSummary {
        records: totals.records,
        undated_records: records.iter().filter(|r| r.month.is_none()).count(),
        total_impressions: totals.impressions,
        total_clicks: totals.clicks,
        total_conversions: totals.conversions,
        total_spend: totals.total_spend,
        total_revenue: totals.revenue_generated,
        avg_ctr: metrics::mean(records.iter().map(|r| r.metrics.ctr)),
        avg_roas: metrics::mean(records.iter().map(|r| r.metrics.roas)),
        blended_roas: totals.derived().roas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{dated, sample_record};

    fn names(rows: &[AggregateRow]) -> Vec<String> {
        rows.iter().map(|row| row.key.to_string()).collect()
    }

    #[test]
    fn roas_is_recomputed_from_sums_not_averaged() {
        let records = vec![
            sample_record("Launch", "Search", 100, 10, 1, 10.0, 5.0),
            sample_record("Launch", "Search", 100, 10, 1, 1000.0, 2000.0),
        ];

        let rows = aggregate(&records, GroupBy::Campaign);
        assert_eq!(rows.len(), 1);
        let aggregate_roas = rows[0].roas.value().unwrap();
        assert!((aggregate_roas - 2005.0 / 1010.0).abs() < 0.0001);

        let averaged = metrics::mean(records.iter().map(|r| r.metrics.roas))
            .value()
            .unwrap();
        assert!((averaged - 1.25).abs() < 0.0001);
        assert!((aggregate_roas - averaged).abs() > 0.5);
    }

    #[test]
    fn sums_bases_per_group() {
        let records = vec![
            sample_record("A", "Email", 1000, 100, 10, 50.0, 150.0),
            sample_record("B", "Social", 500, 20, 2, 30.0, 15.0),
            sample_record("A", "Social", 2000, 50, 5, 25.0, 100.0),
        ];

        let rows = aggregate(&records, GroupBy::Campaign);
        let first = &rows[0];
        assert_eq!(first.records, 2);
        assert_eq!(first.impressions, 3000);
        assert_eq!(first.clicks, 150);
        assert_eq!(first.conversions, 15);
        assert!((first.total_spend - 75.0).abs() < 0.001);
        assert!((first.revenue_generated - 250.0).abs() < 0.001);
        assert!((first.ctr.value().unwrap() - 0.05).abs() < 0.0001);
        assert!((first.cpa.value().unwrap() - 5.0).abs() < 0.0001);
    }

    #[test]
    fn groups_follow_first_occurrence_order() {
        let records = vec![
            sample_record("Zeta", "Social", 10, 1, 0, 1.0, 1.0),
            sample_record("Alpha", "Email", 10, 1, 0, 1.0, 1.0),
            sample_record("Zeta", "Email", 10, 1, 0, 1.0, 1.0),
            sample_record("Mid", "Search", 10, 1, 0, 1.0, 1.0),
        ];

        assert_eq!(
            names(&aggregate(&records, GroupBy::Campaign)),
            vec!["Zeta", "Alpha", "Mid"]
        );
        assert_eq!(
            names(&aggregate(&records, GroupBy::Channel)),
            vec!["Social", "Email", "Search"]
        );
    }

    #[test]
    fn zero_spend_group_has_undefined_roas() {
        let records = vec![
            sample_record("Organic", "SEO", 100, 5, 1, 0.0, 40.0),
            sample_record("Organic", "SEO", 100, 5, 1, 0.0, 10.0),
        ];

        let rows = aggregate(&records, GroupBy::Channel);
        assert!(rows[0].roas.is_undefined());
        assert!(rows[0].cpc.value().is_some());
    }

    #[test]
    fn month_grouping_drops_undated_records() {
        let records = vec![
            dated(sample_record("A", "Email", 100, 10, 3, 10.0, 30.0), 2024, 1, 5),
            sample_record("A", "Email", 100, 10, 7, 10.0, 30.0),
            dated(sample_record("B", "Social", 100, 10, 4, 10.0, 30.0), 2024, 2, 1),
            dated(sample_record("C", "Social", 100, 10, 2, 10.0, 30.0), 2024, 1, 28),
        ];

        let rows = aggregate(&records, GroupBy::Month);
        assert_eq!(names(&rows), vec!["2024-01", "2024-02"]);

        let monthly_conversions: u64 = rows.iter().map(|row| row.conversions).sum();
        let dated_conversions: u64 = records
            .iter()
            .filter(|r| r.month.is_some())
            .map(|r| r.conversions)
            .sum();
        let all_conversions: u64 = records.iter().map(|r| r.conversions).sum();
        assert_eq!(monthly_conversions, dated_conversions);
        assert_ne!(monthly_conversions, all_conversions);
    }

    #[test]
    fn missing_demographics_group_as_unknown() {
        let mut anonymous = sample_record("A", "Email", 100, 10, 1, 10.0, 30.0);
        anonymous.age_group = None;
        anonymous.gender = None;
        let mut half_known = sample_record("A", "Email", 100, 10, 1, 10.0, 30.0);
        half_known.gender = None;

        let records = vec![
            sample_record("A", "Email", 100, 10, 1, 10.0, 30.0),
            anonymous,
            half_known,
        ];

        let rows = aggregate(&records, GroupBy::Demographic);
        assert_eq!(
            names(&rows),
            vec!["25-34 / Female", "unknown / unknown", "25-34 / unknown"]
        );
        let total: usize = rows.iter().map(|row| row.records).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        assert!(aggregate(&[], GroupBy::Campaign).is_empty());
    }

    #[test]
    fn summary_reports_totals_and_means() {
        let records = vec![
            sample_record("A", "Email", 1000, 10, 1, 10.0, 5.0),
            sample_record("B", "Email", 0, 0, 0, 1000.0, 2000.0),
            dated(sample_record("C", "Email", 1000, 30, 2, 0.0, 0.0), 2024, 3, 1),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.undated_records, 2);
        assert_eq!(summary.total_impressions, 2000);
        assert_eq!(summary.total_clicks, 40);
        assert_eq!(summary.total_conversions, 3);
        assert!((summary.total_spend - 1010.0).abs() < 0.001);
        // CTR is undefined for B, so the mean covers A and C only.
        assert!((summary.avg_ctr.value().unwrap() - 0.02).abs() < 0.0001);
        // ROAS is undefined for C.
        assert!((summary.avg_roas.value().unwrap() - 1.25).abs() < 0.0001);
        assert!((summary.blended_roas.value().unwrap() - 2005.0 / 1010.0).abs() < 0.0001);
    }
}
