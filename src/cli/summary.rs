//! Human-readable summary of one pipeline run.

use crate::cli::ui::{StyleType, print_separator, style_text};
use crate::pipeline::PipelineReport;

pub fn print_run_summary(report: &PipelineReport) {
    print_separator();
    println!("{}", style_text("Pipeline Execution Summary", StyleType::Title));

    let status = if report.success {
        style_text("SUCCESS", StyleType::Good)
    } else {
        style_text("FAILED", StyleType::Error)
    };
    println!("{} {status}", style_text("Status:", StyleType::Label));
    println!(
        "{} {:.2}s",
        style_text("Duration:", StyleType::Label),
        report.duration_seconds
    );

    if report.success {
        println!(
            "{} {}",
            style_text("Records processed:", StyleType::Label),
            report.records_processed
        );
        if let Some(quality) = &report.quality_metrics {
            println!(
                "{} {:.2}%",
                style_text("Data completeness:", StyleType::Label),
                quality.completeness * 100.0
            );
        }
        if let Some(load) = &report.load_metrics {
            println!(
                "{} {}",
                style_text("Records loaded:", StyleType::Label),
                load.success_count
            );
            if load.skipped {
                println!(
                    "{}",
                    style_text(
                        "note: sink not configured, load was skipped",
                        StyleType::Subtle
                    )
                );
            }
        }
    } else if let Some(error) = &report.error {
        println!(
            "{} {}",
            style_text("Error:", StyleType::Label),
            style_text(error, StyleType::Error)
        );
    }
    print_separator();
}
