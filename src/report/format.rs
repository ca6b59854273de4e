//! Formatted terminal output.
//!
//! All CLI text lives here so the page handlers stay presentation-free.

use crate::app::pages::{ExplorePage, ModelOutcome, PerformancePage, PredictionPage};
use crate::app::pipeline::TrainingSummary;
use crate::data::ColumnStats;
use crate::domain::{DemandLabel, InventoryRecord};
use crate::plot::{render_bar_chart, render_line_chart};
use crate::report::{ClassMetrics, ClassificationReport, ConfusionMatrix, EvaluationReport};

/// Row errors listed before "... and N more".
const MAX_LISTED_ROW_ERRORS: usize = 5;

pub fn format_training_summary(summary: &TrainingSummary) -> String {
    let mut out = String::new();

    out.push_str("=== demand - model training ===\n");
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        summary.rows_read,
        summary.rows_used,
        summary.row_errors.len()
    ));
    for e in summary.row_errors.iter().take(MAX_LISTED_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if summary.row_errors.len() > MAX_LISTED_ROW_ERRORS {
        out.push_str(&format!(
            "  ... and {} more\n",
            summary.row_errors.len() - MAX_LISTED_ROW_ERRORS
        ));
    }

    let counts: Vec<String> = summary
        .class_counts
        .iter()
        .map(|(label, n)| format!("{label}={n}"))
        .collect();
    out.push_str(&format!("Classes: {}\n", counts.join(" ")));
    out.push_str(&format!("Split: train={} test={}\n", summary.n_train, summary.n_test));

    out.push_str("\nHeld-out accuracy:\n");
    for (kind, report) in &summary.evaluations {
        out.push_str(&format!("- {:<28} {:.2}%\n", kind.display_name(), report.accuracy * 100.0));
    }
    out.push_str(&format!("\nArtifacts written to {}\n", summary.artifacts.dir.display()));
    out
}

pub fn format_explore_page(page: &ExplorePage, width: usize, height: usize) -> String {
    let s = &page.summary;
    let mut out = String::new();

    out.push_str("=== demand - data exploration ===\n");
    out.push_str(&format!(
        "Rows: {} | dates: {} .. {}",
        s.rows, s.date_range.0, s.date_range.1
    ));
    if page.skipped_rows > 0 {
        out.push_str(&format!(" | skipped rows: {}", page.skipped_rows));
    }
    out.push_str("\n\nFirst rows:\n");
    out.push_str(&format_records(&page.preview));

    out.push_str("\nDescriptive statistics:\n");
    out.push_str(&format_describe(&s.columns));

    out.push('\n');
    out.push_str(&render_line_chart(&s.daily_units, width, height));

    out.push_str("\nUnits sold by category:\n");
    out.push_str(&render_bar_chart(&s.units_by_category, width / 2, false));
    out.push_str("\nUnits sold by region:\n");
    out.push_str(&render_bar_chart(&s.units_by_region, width / 2, true));
    out.push_str("\nMean units sold by weather:\n");
    out.push_str(&render_bar_chart(&s.mean_units_by_weather, width / 2, false));
    out
}

fn format_records(rows: &[InventoryRecord]) -> String {
    let mut out = format!(
        "{:<10} {:<12} {:<8} {:>9} {:<10} {:>7} {:>10}\n",
        "Date", "Category", "Region", "Inventory", "Weather", "Holiday", "Units Sold"
    );
    for r in rows {
        out.push_str(&format!(
            "{:<10} {:<12} {:<8} {:>9} {:<10} {:>7} {:>10}\n",
            r.date,
            truncate(&r.category, 12),
            truncate(&r.region, 8),
            r.inventory_level,
            truncate(&r.weather_condition, 10),
            u8::from(r.holiday_or_promotion),
            r.units_sold
        ));
    }
    out
}

fn format_describe(columns: &[ColumnStats]) -> String {
    let mut out = format!("{:<6}", "");
    for c in columns {
        out.push_str(&format!(" {:>17}", c.name));
    }
    out.push('\n');

    let rows: [(&str, fn(&ColumnStats) -> f64); 8] = [
        ("count", |c| c.count as f64),
        ("mean", |c| c.mean),
        ("std", |c| c.std),
        ("min", |c| c.min),
        ("25%", |c| c.q25),
        ("50%", |c| c.median),
        ("75%", |c| c.q75),
        ("max", |c| c.max),
    ];
    for (name, pick) in rows {
        out.push_str(&format!("{name:<6}"));
        for c in columns {
            out.push_str(&format!(" {:>17.3}", pick(c)));
        }
        out.push('\n');
    }
    out
}

pub fn format_performance_page(page: &PerformancePage) -> String {
    let mut out = String::new();
    out.push_str("=== demand - model performance ===\n");
    out.push_str(&format!("Held-out rows: {}\n", page.test_rows));
    for (kind, report) in &page.reports {
        out.push_str(&format!("\n--- {} ---\n", kind.display_name()));
        out.push_str(&format_evaluation(report));
    }
    out
}

pub fn format_evaluation(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Accuracy: {:.2}%\n\n", report.accuracy * 100.0));
    out.push_str(&format_classification_report(&report.classification));
    out.push('\n');
    out.push_str(&format_confusion_matrix(&report.confusion));
    out
}

pub fn format_classification_report(report: &ClassificationReport) -> String {
    let total = report.weighted_avg.support;
    let mut out = format!(
        "{:<14} {:>9} {:>9} {:>9} {:>9}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (label, m) in &report.rows {
        out.push_str(&metrics_line(label.display_name(), m));
    }
    out.push('\n');
    out.push_str(&format!(
        "{:<14} {:>9} {:>9} {:>9.2} {:>9}\n",
        "accuracy", "", "", report.accuracy, total
    ));
    out.push_str(&metrics_line("macro avg", &report.macro_avg));
    out.push_str(&metrics_line("weighted avg", &report.weighted_avg));
    out
}

fn metrics_line(name: &str, m: &ClassMetrics) -> String {
    format!(
        "{:<14} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
        name, m.precision, m.recall, m.f1, m.support
    )
}

/// Rows are actual labels, columns predicted labels.
pub fn format_confusion_matrix(cm: &ConfusionMatrix) -> String {
    let mut out = format!("{:<16}", "actual \\ pred");
    for label in DemandLabel::ALL {
        out.push_str(&format!(" {:>8}", label.as_str()));
    }
    out.push('\n');
    for actual in DemandLabel::ALL {
        out.push_str(&format!("{:<16}", actual.as_str()));
        for predicted in DemandLabel::ALL {
            out.push_str(&format!(" {:>8}", cm.get(actual, predicted)));
        }
        out.push('\n');
    }
    out
}

pub fn format_prediction_page(page: &PredictionPage) -> String {
    let r = &page.request;
    let mut out = String::new();
    out.push_str("=== demand - prediction ===\n");
    out.push_str(&format!(
        "Input: {} | {} | inventory={} | {} | holiday/promo={} | {}\n",
        r.category,
        r.region,
        r.inventory_level,
        r.weather_condition,
        u8::from(r.holiday_or_promotion),
        r.date
    ));

    for outcome in &page.outcomes {
        out.push_str(&format!("\n{}:\n", outcome.kind().display_name()));
        match outcome {
            ModelOutcome::Predicted(p) => {
                out.push_str(&format!("  -> {}\n", p.label.display_name()));
                for (label, prob) in &p.probabilities {
                    out.push_str(&format!("     {:<8} {:>6.1}%\n", label.as_str(), prob * 100.0));
                }
            }
            ModelOutcome::Failed { message, .. } => {
                out.push_str(&format!("  error: {message}\n"));
            }
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, PredictionRequest};
    use crate::inference::ModelPrediction;
    use chrono::NaiveDate;

    #[test]
    fn confusion_matrix_layout() {
        let cm = ConfusionMatrix {
            counts: [[3, 1, 0], [1, 2, 0], [0, 1, 2]],
        };
        let txt = format_confusion_matrix(&cm);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("     Low   Medium     High"));
        assert!(lines[1].starts_with("Low "));
        assert!(lines[3].ends_with("       0        1        2"));
    }

    #[test]
    fn prediction_page_shows_failures_inline() {
        let page = PredictionPage {
            request: PredictionRequest {
                category: "Toys".to_string(),
                region: "North".to_string(),
                inventory_level: 50,
                weather_condition: "Rainy".to_string(),
                holiday_or_promotion: true,
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            },
            outcomes: vec![
                ModelOutcome::Predicted(ModelPrediction {
                    kind: ModelKind::Knn,
                    label: DemandLabel::Low,
                    probabilities: vec![(DemandLabel::Low, 0.8), (DemandLabel::High, 0.2)],
                }),
                ModelOutcome::Failed {
                    kind: ModelKind::GaussianNb,
                    message: "Artifact 'nb_model.json' not found.".to_string(),
                },
            ],
        };
        let txt = format_prediction_page(&page);
        assert!(txt.contains("-> Low demand"));
        assert!(txt.contains("Low        80.0%"));
        assert!(txt.contains("error: Artifact 'nb_model.json' not found."));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Electronics", 6), "Elect.");
        assert_eq!(truncate("Toys", 6), "Toys");
    }
}
