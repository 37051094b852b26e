use std::fmt::Write;

use crate::aggregate::AggregateRow;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::Ratio;
use crate::models::Category;
use crate::pipeline::Dashboard;

pub fn build_summary(dashboard: &Dashboard, config: &PipelineConfig) -> String {
    let mut output = String::new();
    let kpis = &dashboard.kpis;

    let _ = writeln!(output, "Key performance indicators ({}):", scope(dashboard));
    let _ = writeln!(output, "- Impressions: {}", thousands(kpis.total_impressions));
    let _ = writeln!(output, "- Clicks: {}", thousands(kpis.total_clicks));
    let _ = writeln!(output, "- Conversions: {}", thousands(kpis.total_conversions));
    let _ = writeln!(output, "- Spend: ${}", money(kpis.total_spend));
    let _ = writeln!(output, "- Revenue: ${}", money(kpis.total_revenue));
    let _ = writeln!(output, "- Avg CTR: {}", percent(kpis.avg_ctr));
    let _ = writeln!(output, "- Avg ROAS: {:.2}", kpis.avg_roas);
    let _ = writeln!(output, "- Blended ROAS: {:.2}", kpis.blended_roas);

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Top {} campaigns by {}:",
        config.top_n_campaigns, config.rank_metric
    );
    for row in dashboard.top_campaigns.iter() {
        let _ = writeln!(output, "- {}", ranked_line(row));
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Top {} channels by {}:",
        config.top_n_channels, config.rank_metric
    );
    for row in dashboard.top_channels.iter() {
        let _ = writeln!(output, "- {}", ranked_line(row));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Recommendations:");
    if dashboard.recommendations.is_empty() {
        let _ = writeln!(output, "No spend recorded to judge.");
    } else {
        for rec in dashboard.recommendations.iter() {
            let _ = writeln!(output, "- {} {}", marker(rec.category), rec.message);
        }
    }

    output
}

pub fn build_report(dashboard: &Dashboard, config: &PipelineConfig) -> String {
    let mut output = String::new();
    let kpis = &dashboard.kpis;

    let _ = writeln!(output, "# Marketing Campaign Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} records, {} without a usable start date)",
        scope(dashboard),
        kpis.records,
        kpis.undated_records
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Key Performance Indicators");
    let _ = writeln!(output, "| Metric | Value |");
    let _ = writeln!(output, "| --- | ---: |");
    let _ = writeln!(output, "| Total Impressions | {} |", thousands(kpis.total_impressions));
    let _ = writeln!(output, "| Total Clicks | {} |", thousands(kpis.total_clicks));
    let _ = writeln!(output, "| Total Conversions | {} |", thousands(kpis.total_conversions));
    let _ = writeln!(output, "| Total Spend ($) | {} |", money(kpis.total_spend));
    let _ = writeln!(output, "| Total Revenue ($) | {} |", money(kpis.total_revenue));
    let _ = writeln!(output, "| Avg CTR | {} |", percent(kpis.avg_ctr));
    let _ = writeln!(output, "| Avg ROAS | {:.2} |", kpis.avg_roas);
    let _ = writeln!(output, "| Blended ROAS | {:.2} |", kpis.blended_roas);

    write_table(&mut output, "Campaign Performance", "Campaign", &dashboard.campaigns);
    write_table(&mut output, "Channel Performance", "Channel", &dashboard.channels);
    write_table(
        &mut output,
        &format!("Top {} Campaigns by {}", config.top_n_campaigns, config.rank_metric),
        "Campaign",
        &dashboard.top_campaigns,
    );
    write_table(
        &mut output,
        &format!("Top {} Channels by {}", config.top_n_channels, config.rank_metric),
        "Channel",
        &dashboard.top_channels,
    );
    write_table(
        &mut output,
        "Demographic Insights",
        "Age group / Gender",
        &dashboard.demographics,
    );
    write_table(
        &mut output,
        &format!("Time Trends (last {} months)", config.trend_months),
        "Month",
        &dashboard.monthly,
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Budget Allocation Recommendations");
    let _ = writeln!(
        output,
        "ROAS above {:.2} is strong, below {:.2} is weak.",
        config.thresholds.high(),
        config.thresholds.low()
    );
    let _ = writeln!(output);

    if dashboard.recommendations.is_empty() {
        let _ = writeln!(output, "No campaigns or channels with spend to judge.");
    } else {
        for rec in dashboard.recommendations.iter() {
            let _ = writeln!(
                output,
                "- {} {} (ROAS {:.2})",
                marker(rec.category),
                rec.message,
                rec.roas
            );
        }
    }

    output
}

pub fn build_json(dashboard: &Dashboard) -> Result<String> {
    Ok(serde_json::to_string_pretty(dashboard)?)
}

fn write_table(output: &mut String, title: &str, label: &str, rows: &[AggregateRow]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if rows.is_empty() {
        let _ = writeln!(output, "No rows for this view.");
        return;
    }

    let _ = writeln!(
        output,
        "| {label} | Impressions | Clicks | Conversions | Spend ($) | Revenue ($) | CTR | CPA | ROAS |"
    );
    let _ = writeln!(output, "| --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: |");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {:.2} | {:.2} |",
            row.key,
            thousands(row.impressions),
            thousands(row.clicks),
            thousands(row.conversions),
            money(row.total_spend),
            money(row.revenue_generated),
            percent(row.ctr),
            row.cpa,
            row.roas
        );
    }
}

fn ranked_line(row: &AggregateRow) -> String {
    format!(
        "{}: ROAS {:.2}, {} conversions, ${} revenue",
        row.key,
        row.roas,
        thousands(row.conversions),
        money(row.revenue_generated)
    )
}

fn scope(dashboard: &Dashboard) -> String {
    match &dashboard.channel {
        Some(channel) => format!("channel {channel}"),
        None => "all channels".to_string(),
    }
}

fn marker(category: Category) -> &'static str {
    match category {
        Category::Strong => "[strong]",
        Category::Weak => "[weak]",
        Category::Neutral => "[monitor]",
    }
}

fn thousands(value: u64) -> String {
    group_digits(&value.to_string())
}

fn money(value: f64) -> String {
    let text = format!("{value:.2}");
    match text.split_once('.') {
        Some((whole, cents)) => format!("{}.{cents}", group_digits(whole)),
        None => text,
    }
}

fn percent(ratio: Ratio) -> String {
    if ratio.is_undefined() {
        return ratio.to_string();
    }
    format!("{:.2}%", ratio.value().unwrap_or_default() * 100.0)
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{dated, sample_record};
    use crate::pipeline;

    fn sample_dashboard(config: &PipelineConfig) -> Dashboard {
        let records = vec![
            dated(
                sample_record("Spring Sale", "Email", 1_250_000, 5000, 50, 1200.0, 4800.0),
                2024,
                4,
                2,
            ),
            sample_record("Brand Lift", "Social", 300, 0, 0, 0.0, 0.0),
        ];
        pipeline::analyze(&records, config).unwrap()
    }

    #[test]
    fn formats_numbers_like_the_dashboard() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_250_000), "1,250,000");
        assert_eq!(money(12345.678), "12,345.68");
        assert_eq!(percent(Ratio::from(0.0412)), "4.12%");
        assert_eq!(percent(Ratio::UNDEFINED), "n/a");
    }

    #[test]
    fn summary_lists_kpis_rankings_and_recommendations() {
        let config = PipelineConfig::default();
        let summary = build_summary(&sample_dashboard(&config), &config);

        assert!(summary.contains("Key performance indicators (all channels):"));
        assert!(summary.contains("- Impressions: 1,250,300"));
        assert!(summary.contains("Top 5 campaigns by roas:"));
        assert!(summary.contains("- Spring Sale: ROAS 4.00"));
        assert!(summary.contains("- Brand Lift: ROAS n/a"));
        assert!(summary.contains(
            "[strong] Campaign 'Spring Sale' is high-performing. Consider increasing budget."
        ));
    }

    #[test]
    fn report_renders_every_section() {
        let config = PipelineConfig::default();
        let report = build_report(&sample_dashboard(&config), &config);

        for heading in [
            "## Key Performance Indicators",
            "## Campaign Performance",
            "## Channel Performance",
            "## Top 5 Campaigns by roas",
            "## Top 3 Channels by roas",
            "## Demographic Insights",
            "## Time Trends (last 12 months)",
            "## Budget Allocation Recommendations",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
        assert!(report.contains("| 2024-04 |"));
        assert!(report.contains("1 without a usable start date"));
    }

    #[test]
    fn json_uses_null_for_undefined_metrics() {
        let config = PipelineConfig::default();
        let json = build_json(&sample_dashboard(&config)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let brand_lift = &value["campaigns"][1];
        assert_eq!(brand_lift["key"]["name"], "Brand Lift");
        assert!(brand_lift["roas"].is_null());
        assert_eq!(value["monthly"][0]["key"]["month"], "2024-04");
    }
}
