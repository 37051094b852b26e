//! One parameterized pass from typed records to every dashboard table.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{self, AggregateRow, GroupBy, KpiSummary};
use crate::config::PipelineConfig;
use crate::error::{MetricsError, Result};
use crate::models::{Recommendation, Record, SubjectKind};
use crate::rank;
use crate::recommend;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub channel: Option<String>,
    pub kpis: KpiSummary,
    pub campaigns: Vec<AggregateRow>,
    pub channels: Vec<AggregateRow>,
    pub demographics: Vec<AggregateRow>,
    pub monthly: Vec<AggregateRow>,
    pub top_campaigns: Vec<AggregateRow>,
    pub top_channels: Vec<AggregateRow>,
    pub recommendations: Vec<Recommendation>,
}

/// Distinct channels in sorted order, for building filter choices.
pub fn channels(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.marketing_channel.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn filter_channel<'a>(records: &'a [Record], channel: Option<&str>) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| channel.map_or(true, |name| record.marketing_channel == name))
        .collect()
}

pub fn analyze(records: &[Record], config: &PipelineConfig) -> Result<Dashboard> {
    config.validate()?;

    let selected: Vec<Record> = filter_channel(records, config.channel.as_deref())
        .into_iter()
        .cloned()
        .collect();
    debug!(
        input = records.len(),
        selected = selected.len(),
        channel = ?config.channel,
        "applied channel filter"
    );

    if selected.is_empty() {
        return Err(MetricsError::EmptyDataset {
            channel: config.channel.clone(),
        });
    }

    let campaigns = aggregate::aggregate(&selected, GroupBy::Campaign);
    let channels = aggregate::aggregate(&selected, GroupBy::Channel);
    let demographics = aggregate::aggregate(&selected, GroupBy::Demographic);
    let monthly = rank::trend_window(
        &aggregate::aggregate(&selected, GroupBy::Month),
        config.trend_months,
    );

    let top_campaigns = rank::rank(
        &campaigns,
        config.rank_metric,
        config.top_n_campaigns,
        config.rank_direction,
    );
    let top_channels = rank::rank(
        &channels,
        config.rank_metric,
        config.top_n_channels,
        config.rank_direction,
    );

    let mut recommendations =
        recommend::recommend(&campaigns, SubjectKind::Campaign, &config.thresholds);
    recommendations.extend(recommend::recommend(
        &channels,
        SubjectKind::Channel,
        &config.thresholds,
    ));

    info!(
        records = selected.len(),
        campaigns = campaigns.len(),
        channels = channels.len(),
        months = monthly.len(),
        recommendations = recommendations.len(),
        "analysis complete"
    );

    Ok(Dashboard {
        channel: config.channel.clone(),
        kpis: aggregate::summarize(&selected),
        campaigns,
        channels,
        demographics,
        monthly,
        top_campaigns,
        top_channels,
        recommendations,
    })
}
