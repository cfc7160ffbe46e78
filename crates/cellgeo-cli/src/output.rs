use cellgeo_core::{LocationRecord, RecordKind};
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;
use crate::client::Lookup;

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Human label for the range field, naming the reserved values.
pub fn describe_range(range: u32) -> String {
    match LocationRecord::new(0.0, 0.0, range).kind() {
        RecordKind::Observed => format!("{range} m"),
        RecordKind::Approximated => "area centroid".to_string(),
        RecordKind::Default => "unknown (default location)".to_string(),
    }
}

pub fn print_lookup(lookup: &Lookup, format: OutputFormat) {
    let location = lookup.location;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "lat": location.lat,
            "lon": location.lon,
            "range": location.range,
        })),
        OutputFormat::Table => {
            let marker = if lookup.found {
                "✓".green()
            } else {
                "✗".yellow()
            };
            println!(
                "{} {:.6}, {:.6}  {} {}",
                marker,
                location.lat,
                location.lon,
                "range:".cyan(),
                describe_range(location.range)
            );
        }
    }
}

/// Renders the `tiers` section of a stats response as a table.
pub fn tiers_table(stats: &Value) -> Option<String> {
    let tiers = stats.get("tiers")?.as_object()?;
    let hits = stats.get("resolver").and_then(|r| r.get("tier_hits"));

    let mut builder = Builder::default();
    builder.push_record(["Tier", "Backend", "Access", "Entries", "Hits"]);
    for (name, tier) in tiers {
        let field = |key: &str| {
            tier.get(key)
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .unwrap_or_else(|| "-".to_string())
        };
        let hit_count = hits
            .and_then(|h| h.get(name))
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        builder.push_record([
            name.clone(),
            field("backend"),
            field("access"),
            field("entries"),
            hit_count,
        ]);
    }
    Some(builder.build().with(Style::rounded()).to_string())
}

pub fn print_stats(stats: &Value, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        print_json(stats);
        return;
    }

    let resolver = stats.get("resolver");
    let counter = |name: &str| {
        resolver
            .and_then(|r| r.get(name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    println!("{}: {}", "Requests".cyan(), counter("requests"));
    println!("{}: {}", "Invalid".cyan(), counter("invalid"));
    println!("{}: {}", "Approximated".cyan(), counter("approximated"));
    println!("{}: {}", "Defaulted".cyan(), counter("defaulted"));
    println!(
        "{}: {} not found, {} quota exceeded, {} errors",
        "Providers".cyan(),
        counter("provider_not_found"),
        counter("provider_quota_exceeded"),
        counter("provider_errors")
    );
    println!("{}: {}", "Storage faults".cyan(), counter("storage_faults"));

    if let Some(table) = tiers_table(stats) {
        println!("{table}");
    }
}

pub fn print_report(report: &Value, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        print_json(report);
        return;
    }
    let field = |name: &str| report.get(name).and_then(Value::as_u64).unwrap_or(0);
    let tier = report.get("tier").and_then(Value::as_str).unwrap_or("?");
    print_success(&format!(
        "Reconciled {}: {} processed, {} removed, {} failed",
        tier.cyan(),
        field("processed"),
        field("removed"),
        field("failed")
    ));
}

pub fn print_refresh(report: &Value, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        print_json(report);
        return;
    }
    println!("{}", refresh_summary(report));
    if report.get("quota_exhausted").and_then(Value::as_bool) == Some(true) {
        println!("{}", "Provider quota exhausted, run stopped early".yellow());
    }
}

fn refresh_summary(report: &Value) -> String {
    let field = |name: &str| report.get(name).and_then(Value::as_u64).unwrap_or(0);
    let tier = report.get("tier").and_then(Value::as_str).unwrap_or("?");
    format!(
        "Refreshed {}: {} of {} stale, {} unknown, {} rejected, {} failed",
        tier,
        field("refreshed"),
        field("stale"),
        field("missed"),
        field("rejected"),
        field("failed")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgeo_core::{APPROXIMATED_RANGE, DEFAULT_RANGE};
    use serde_json::json;

    #[test]
    fn range_labels() {
        assert_eq!(describe_range(1500), "1500 m");
        assert_eq!(describe_range(APPROXIMATED_RANGE), "area centroid");
        assert_eq!(describe_range(DEFAULT_RANGE), "unknown (default location)");
    }

    #[test]
    fn tiers_table_lists_each_tier() {
        let stats = json!({
            "resolver": {"tier_hits": {"glm": 4, "own": 1}},
            "tiers": {
                "glm": {"backend": "sqlite", "access": "read-write", "entries": 10},
                "own": {"backend": "sqlite", "access": "read-write", "entries": null}
            }
        });
        let table = tiers_table(&stats).unwrap();
        assert!(table.contains("glm"));
        assert!(table.contains("read-write"));
        assert!(table.contains("10"));
        assert!(table.contains("null"));
    }

    #[test]
    fn tiers_table_requires_tiers() {
        assert!(tiers_table(&json!({"resolver": {}})).is_none());
    }

    #[test]
    fn refresh_summary_counts() {
        let report = json!({
            "tier": "glm", "stale": 5, "refreshed": 3, "missed": 1,
            "rejected": 1, "failed": 0, "quota_exhausted": false
        });
        assert_eq!(
            refresh_summary(&report),
            "Refreshed glm: 3 of 5 stale, 1 unknown, 1 rejected, 0 failed"
        );
    }
}
