use std::collections::{BTreeMap, BTreeSet, HashMap};

use synthgen_core::{FieldSpec, FieldValue, Record};

use crate::metrics::{
    ColumnDistribution, DetailedQualityReport, FieldStatistics, QualityReport, ValueCount,
};

const MOST_COMMON_LIMIT: usize = 3;
const UNKNOWN_CATEGORY: &str = "Unknown";

/// Compute the quality report for `records` against the schema `fields`.
pub fn quality_report(records: &[Record], fields: &[FieldSpec]) -> QualityReport {
    if records.is_empty() {
        return QualityReport::empty();
    }

    let mut field_statistics = BTreeMap::new();
    for field in fields {
        let mut filled = 0u64;
        let mut distinct = BTreeSet::new();
        for record in records {
            if let Some(value) = record.present_value(&field.name) {
                filled += 1;
                distinct.insert(value.distinct_key());
            }
        }
        field_statistics.insert(
            field.name.clone(),
            FieldStatistics {
                filled_count: filled,
                null_count: records.len() as u64 - filled,
                unique_count: distinct.len() as u64,
                data_type: field.data_type,
            },
        );
    }

    QualityReport {
        total_records: records.len() as u64,
        completeness: completeness(records, fields),
        validity: validity(records),
        field_statistics,
        validation_errors: error_histogram(records),
    }
}

/// Percentage of non-null cells; 0 for empty input.
pub fn completeness(records: &[Record], fields: &[FieldSpec]) -> f64 {
    let total = records.len() * fields.len();
    if total == 0 {
        return 0.0;
    }
    let filled = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .filter(|field| record.present_value(&field.name).is_some())
                .count()
        })
        .sum::<usize>();
    filled as f64 / total as f64 * 100.0
}

/// Percentage of valid records; 0 for empty input.
pub fn validity(records: &[Record]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let valid = records.iter().filter(|record| record.is_valid).count();
    valid as f64 / records.len() as f64 * 100.0
}

/// Distinct / non-null percentage for each designated field.
pub fn uniqueness(records: &[Record], field_names: &[&str]) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    if records.is_empty() {
        return scores;
    }
    for name in field_names {
        let values: Vec<String> = records
            .iter()
            .filter_map(|record| record.present_value(name))
            .map(FieldValue::distinct_key)
            .collect();
        let score = if values.is_empty() {
            0.0
        } else {
            let distinct: BTreeSet<&String> = values.iter().collect();
            distinct.len() as f64 / values.len() as f64 * 100.0
        };
        scores.insert(name.to_string(), score);
    }
    scores
}

/// Count validation errors by their leading category token.
pub fn error_histogram(records: &[Record]) -> BTreeMap<String, u64> {
    let mut histogram = BTreeMap::new();
    for error in records.iter().flat_map(|record| &record.validation_errors) {
        let category = match error.split_once(':') {
            Some((head, _)) => head.to_string(),
            None => UNKNOWN_CATEGORY.to_string(),
        };
        *histogram.entry(category).or_insert(0) += 1;
    }
    histogram
}

/// Quality report plus per-column distribution analysis.
pub fn detailed_quality_report(records: &[Record], fields: &[FieldSpec]) -> DetailedQualityReport {
    DetailedQualityReport {
        summary: quality_report(records, fields),
        distribution_analysis: distribution_analysis(records, fields),
    }
}

/// Numeric columns get moments; every other column gets category counts.
///
/// A column is numeric only when all of its non-null values are numbers.
/// Columns with no values are omitted.
pub fn distribution_analysis(
    records: &[Record],
    fields: &[FieldSpec],
) -> BTreeMap<String, ColumnDistribution> {
    let mut analysis = BTreeMap::new();
    for field in fields {
        let values: Vec<&FieldValue> = records
            .iter()
            .filter_map(|record| record.present_value(&field.name))
            .collect();
        if values.is_empty() {
            continue;
        }
        let numbers: Option<Vec<f64>> = values.iter().map(|value| value.as_f64()).collect();
        let distribution = match numbers {
            Some(numbers) => numeric_distribution(&numbers),
            None => categorical_distribution(&values),
        };
        analysis.insert(field.name.clone(), distribution);
    }
    analysis
}

fn numeric_distribution(numbers: &[f64]) -> ColumnDistribution {
    let count = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / count;
    let std = (numbers.len() > 1).then(|| {
        let variance = numbers
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (count - 1.0);
        variance.sqrt()
    });
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ColumnDistribution::Numeric {
        mean,
        std,
        min,
        max,
    }
}

fn categorical_distribution(values: &[&FieldValue]) -> ColumnDistribution {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let unique_values = counts.len() as u64;
    let mut ranked: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked.truncate(MOST_COMMON_LIMIT);
    ColumnDistribution::Categorical {
        unique_values,
        most_common: ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::DataType;

    fn record(pairs: Vec<(&str, FieldValue)>, errors: Vec<&str>) -> Record {
        let mut record = Record::new(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        );
        record.set_validation(errors.into_iter().map(str::to_string).collect());
        record
    }

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("age", DataType::Integer),
            FieldSpec::new("city", DataType::String).required(false),
        ]
    }

    #[test]
    fn empty_input_reports_zero() {
        let report = quality_report(&[], &fields());
        assert_eq!(report.total_records, 0);
        assert_eq!(report.completeness, 0.0);
        assert_eq!(report.validity, 0.0);
        assert!(uniqueness(&[], &["age"]).is_empty());
    }

    #[test]
    fn computes_completeness_validity_and_histogram() {
        let records = vec![
            record(
                vec![("age", FieldValue::Int(30)), ("city", FieldValue::from("Lisbon"))],
                vec![],
            ),
            record(
                vec![("age", FieldValue::Int(30)), ("city", FieldValue::Null)],
                vec![],
            ),
            record(
                vec![("age", FieldValue::Int(200))],
                vec!["age: value 200 exceeds max_value 80", "malformed"],
            ),
            record(
                vec![("age", FieldValue::Int(41)), ("city", FieldValue::from("Porto"))],
                vec!["age: expected integer, got float"],
            ),
        ];
        let report = quality_report(&records, &fields());
        assert_eq!(report.total_records, 4);
        assert_eq!(report.completeness, 6.0 / 8.0 * 100.0);
        assert_eq!(report.validity, 50.0);
        assert_eq!(report.validation_errors.get("age"), Some(&2));
        assert_eq!(report.validation_errors.get("Unknown"), Some(&1));

        let age = &report.field_statistics["age"];
        assert_eq!((age.filled_count, age.null_count, age.unique_count), (4, 0, 3));
        let city = &report.field_statistics["city"];
        assert_eq!((city.filled_count, city.null_count, city.unique_count), (2, 2, 2));
    }

    #[test]
    fn uniqueness_counts_distinct_over_non_null() {
        let records = vec![
            record(vec![("age", FieldValue::Int(1))], vec![]),
            record(vec![("age", FieldValue::Int(1))], vec![]),
            record(vec![("age", FieldValue::Float(2.0))], vec![]),
            record(vec![("age", FieldValue::Null)], vec![]),
        ];
        let scores = uniqueness(&records, &["age", "missing"]);
        assert!((scores["age"] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(scores["missing"], 0.0);
    }

    #[test]
    fn distribution_splits_numeric_and_categorical() {
        let records = vec![
            record(
                vec![("age", FieldValue::Int(10)), ("city", FieldValue::from("a"))],
                vec![],
            ),
            record(
                vec![("age", FieldValue::Int(20)), ("city", FieldValue::from("b"))],
                vec![],
            ),
            record(
                vec![("age", FieldValue::Int(30)), ("city", FieldValue::from("a"))],
                vec![],
            ),
        ];
        let analysis = distribution_analysis(&records, &fields());
        match &analysis["age"] {
            ColumnDistribution::Numeric { mean, std, min, max } => {
                assert_eq!(*mean, 20.0);
                assert_eq!(*std, Some(10.0));
                assert_eq!((*min, *max), (10.0, 30.0));
            }
            other => panic!("expected numeric distribution, got {other:?}"),
        }
        match &analysis["city"] {
            ColumnDistribution::Categorical {
                unique_values,
                most_common,
            } => {
                assert_eq!(*unique_values, 2);
                assert_eq!(most_common[0], ValueCount { value: "a".into(), count: 2 });
            }
            other => panic!("expected categorical distribution, got {other:?}"),
        }
    }
}
