//! Presentation of results: summary table, CSV and JSON export

use std::error::Error;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::call::Call;
use crate::replication::ReplicationSummary;
use crate::stats::Metrics;

/// Metrics of one scenario together with what identifies it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub label: String,
    pub arrival_rate: f64,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication: Option<ReplicationSummary>,
}

const HEADERS: [&str; 8] = [
    "Scenario",
    "Agents",
    "Arrival Rate",
    "Avg Wait (min)",
    "Queue Length",
    "Utilization (%)",
    "Calls Handled",
    "Abandoned Calls",
];

fn row(result: &ScenarioResult) -> [String; 8] {
    let m = &result.metrics;
    [
        result.label.clone(),
        m.agent_count.to_string(),
        result.arrival_rate.to_string(),
        format!("{:.2}", m.avg_wait_time),
        format!("{:.2}", m.avg_queue_length),
        format!("{:.1}", m.utilization_pct),
        m.calls_served.to_string(),
        m.calls_abandoned.to_string(),
    ]
}

/// Fixed-width table, one row per scenario; text left-aligned, numbers right-aligned
pub fn summary_table(results: &[ScenarioResult]) -> String {
    let rows: Vec<[String; 8]> = results.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == 0 {
                    format!("{:<width$}", cell, width = width)
                } else {
                    format!("{:>width$}", cell, width = width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![format_line(&header[..])];
    lines.extend(rows.iter().map(|row| format_line(&row[..])));
    lines.join("\n")
}

/// One line per scenario, replication spread included when present
pub fn replication_table(results: &[ScenarioResult]) -> String {
    results
        .iter()
        .filter_map(|result| {
            let summary = result.replication.as_ref()?;
            Some(format!(
                "{}: {}/{} runs ok | wait {:.2} ± {:.2} min | abandon {:.1}% ± {:.1} | util {:.1}% ± {:.1} | queue {:.2} ± {:.2}",
                result.label,
                summary.successful,
                summary.replications,
                summary.avg_wait_time.mean,
                summary.avg_wait_time.std,
                summary.abandonment_rate.mean * 100.0,
                summary.abandonment_rate.std * 100.0,
                summary.utilization_pct.mean,
                summary.utilization_pct.std,
                summary.avg_queue_length.mean,
                summary.avg_queue_length.std,
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_csv<P: AsRef<Path>>(results: &[ScenarioResult], path: P) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "label",
        "agent_count",
        "arrival_rate",
        "calls_arrived",
        "calls_served",
        "calls_abandoned",
        "avg_wait_time",
        "max_wait_time",
        "abandonment_rate",
        "utilization_pct",
        "avg_queue_length",
    ])?;

    for result in results {
        let m = &result.metrics;
        wtr.write_record(&[
            result.label.clone(),
            m.agent_count.to_string(),
            result.arrival_rate.to_string(),
            m.calls_arrived.to_string(),
            m.calls_served.to_string(),
            m.calls_abandoned.to_string(),
            m.avg_wait_time.to_string(),
            m.max_wait_time.to_string(),
            m.abandonment_rate.to_string(),
            m.utilization_pct.to_string(),
            m.avg_queue_length.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_json<P: AsRef<Path>>(results: &[ScenarioResult], path: P) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json)?;
    Ok(())
}

/// Per-call record of a traced run
pub fn write_trace_csv<P: AsRef<Path>>(calls: &[Call], path: P) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "call_id",
        "arrival_time",
        "service_duration",
        "state",
        "agent_id",
        "service_start",
        "wait_time",
        "end_time",
    ])?;

    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    for call in calls {
        wtr.write_record(&[
            call.id.to_string(),
            call.arrival_time.to_string(),
            call.service_duration.to_string(),
            format!("{:?}", call.state),
            call.agent_id.map(|id| id.to_string()).unwrap_or_default(),
            optional(call.service_start),
            optional(call.wait_time()),
            optional(call.end_time),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
