use std::ops::RangeInclusive;

use serde::Serialize;

use crate::error::{MetricsError, Result};
use crate::rank::{Direction, RankMetric};
use crate::recommend::Thresholds;

pub const DEFAULT_TOP_CAMPAIGNS: usize = 5;
pub const DEFAULT_TOP_CHANNELS: usize = 3;
pub const DEFAULT_TREND_MONTHS: usize = 12;

/// Allowed range for every top-N and window size.
pub const WINDOW_RANGE: RangeInclusive<usize> = 1..=36;

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Only records from this channel are analyzed when set.
    pub channel: Option<String>,
    pub top_n_campaigns: usize,
    pub top_n_channels: usize,
    pub trend_months: usize,
    pub rank_metric: RankMetric,
    pub rank_direction: Direction,
    pub thresholds: Thresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            channel: None,
            top_n_campaigns: DEFAULT_TOP_CAMPAIGNS,
            top_n_channels: DEFAULT_TOP_CHANNELS,
            trend_months: DEFAULT_TREND_MONTHS,
            rank_metric: RankMetric::default(),
            rank_direction: Direction::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        check_window("top_n_campaigns", self.top_n_campaigns)?;
        check_window("top_n_channels", self.top_n_channels)?;
        check_window("trend_months", self.trend_months)?;

        if let Some(channel) = &self.channel {
            if channel.trim().is_empty() {
                return Err(MetricsError::Config(
                    "channel filter must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn check_window(name: &str, value: usize) -> Result<()> {
    if WINDOW_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(MetricsError::Config(format!(
            "{name} must be between {} and {}, got {value}",
            WINDOW_RANGE.start(),
            WINDOW_RANGE.end()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.top_n_campaigns, 5);
        assert_eq!(config.top_n_channels, 3);
        assert_eq!(config.trend_months, 12);
        assert_eq!(config.rank_metric, RankMetric::Roas);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn windows_must_stay_in_range() {
        let config = PipelineConfig {
            top_n_campaigns: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            trend_months: 37,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            top_n_channels: 36,
            trend_months: 1,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_channel_filter_is_rejected() {
        let config = PipelineConfig {
            channel: Some("  ".to_string()),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
