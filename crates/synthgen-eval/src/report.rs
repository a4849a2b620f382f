use crate::metrics::{ColumnDistribution, DetailedQualityReport};

/// Render a deterministic markdown report for a generated dataset.
pub fn render_quality_report(
    dataset: &str,
    report: &DetailedQualityReport,
    warnings: &[String],
) -> String {
    let summary = &report.summary;
    let mut lines = Vec::new();

    lines.push("# Synthgen Quality Report".to_string());
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(format!("- dataset: {dataset}"));
    lines.push(format!("- total_records: {}", summary.total_records));
    lines.push(format!("- completeness: {:.2}%", summary.completeness));
    lines.push(format!("- validity: {:.2}%", summary.validity));
    lines.push(String::new());

    lines.push("## Field statistics".to_string());
    lines.push("| field | type | filled | null | unique |".to_string());
    lines.push("| --- | --- | --- | --- | --- |".to_string());
    for (name, stats) in &summary.field_statistics {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            name, stats.data_type, stats.filled_count, stats.null_count, stats.unique_count
        ));
    }
    lines.push(String::new());

    if !report.distribution_analysis.is_empty() {
        lines.push("## Distributions".to_string());
        for (name, distribution) in &report.distribution_analysis {
            lines.push(format!("- {name}: {}", describe(distribution)));
        }
        lines.push(String::new());
    }

    if !summary.validation_errors.is_empty() {
        lines.push("## Validation errors".to_string());
        lines.push("| category | count |".to_string());
        lines.push("| --- | --- |".to_string());
        for (category, count) in &summary.validation_errors {
            lines.push(format!("| {category} | {count} |"));
        }
        lines.push(String::new());
    }

    if !warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in warnings {
            lines.push(format!("- {warning}"));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report));
    lines.join("\n")
}

fn describe(distribution: &ColumnDistribution) -> String {
    match distribution {
        ColumnDistribution::Numeric {
            mean,
            std,
            min,
            max,
        } => {
            let std = std
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "-".to_string());
            format!("mean={mean:.2} std={std} min={min} max={max}")
        }
        ColumnDistribution::Categorical {
            unique_values,
            most_common,
        } => {
            let top = most_common
                .iter()
                .map(|entry| format!("{} ({})", entry.value, entry.count))
                .collect::<Vec<_>>()
                .join(", ");
            format!("unique={unique_values} top=[{top}]")
        }
    }
}

fn recommendations(report: &DetailedQualityReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = Vec::new();
    if summary.total_records == 0 {
        lines.push("- no records were generated; check the record count and strategy.".to_string());
        return lines;
    }
    if summary.completeness < 100.0 {
        lines.push("- add default values or tighten generators for fields with nulls.".to_string());
    }
    if summary.validity < 100.0 {
        let worst = summary
            .validation_errors
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| category.as_str())
            .unwrap_or("Unknown");
        lines.push(format!(
            "- most errors come from '{worst}'; align its generator with its constraints."
        ));
    }
    if lines.is_empty() {
        lines.push("- all records are complete and valid; compare metrics across runs for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::detailed_quality_report;
    use synthgen_core::{DataType, FieldSpec, FieldValue, Record};

    #[test]
    fn renders_sections_for_invalid_data() {
        let fields = vec![FieldSpec::new("age", DataType::Integer)];
        let mut record = Record::new([("age".to_string(), FieldValue::Int(5))].into());
        record.set_validation(vec!["age: value 5 is below min_value 18".to_string()]);
        let report = detailed_quality_report(&[record], &fields);

        let markdown = render_quality_report("people", &report, &["truncated".to_string()]);
        assert!(markdown.starts_with("# Synthgen Quality Report"));
        assert!(markdown.contains("- validity: 0.00%"));
        assert!(markdown.contains("| age | integer | 1 | 0 | 1 |"));
        assert!(markdown.contains("| age | 1 |"));
        assert!(markdown.contains("## Warnings\n- truncated"));
        assert!(markdown.contains("most errors come from 'age'"));
    }

    #[test]
    fn empty_report_recommends_checking_count() {
        let report = detailed_quality_report(&[], &[]);
        let markdown = render_quality_report("empty", &report, &[]);
        assert!(markdown.contains("no records were generated"));
    }
}
