//! Column role classification.
//!
//! A scored dataset names its columns by convention: the predicted label lives
//! in `prediction(<class>)`, the ground truth in `<class>`, and one
//! `confidence(<value>)` column per class value carries the probabilities.
//! Everything else is a feature. Classification finds the prediction column
//! first, then assigns every column a [`Role`] and its output name.

use crate::error::{ExportError, ExportResult};
use classilist_abstraction::Column;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const PREDICTION_MARKER: &str = "prediction(";
const CONFIDENCE_MARKER: &str = "confidence(";

/// The semantic role of a column in a scored dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// The ground-truth class column.
    ClassTruth,
    /// The predicted class column.
    Prediction,
    /// Probability of the contained class value.
    ClassProbability(String),
    Feature,
}

impl Role {
    /// Output name for a column with this role.
    ///
    /// `column_name` is the original name, `class_column` the ground-truth
    /// class name parsed from the prediction column.
    pub fn output_name(&self, column_name: &str, class_column: &str) -> String {
        match self {
            Self::ClassTruth => format!("A-{class_column}"),
            Self::Prediction => "Predicted".to_string(),
            Self::ClassProbability(label) => format!("P-{label}"),
            Self::Feature => format!("F-{column_name}"),
        }
    }
}

/// A column paired with its role and output name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedColumn {
    pub column: Column,
    pub role: Role,
    pub output_name: String,
}

/// Role assignment for a whole dataset, in original column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Name of the ground-truth class column.
    pub class_column: String,
    /// Position of the prediction column.
    pub prediction_index: usize,
    pub columns: Vec<ClassifiedColumn>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.output_name.as_str())
    }

    /// Output names shared by more than one column, with the colliding
    /// original names in column order.
    ///
    /// Classification does not reject collisions; callers that care can
    /// inspect them here.
    pub fn output_name_collisions(&self) -> Vec<(String, Vec<String>)> {
        let mut by_name: HashMap<&str, Vec<String>> = HashMap::new();
        let mut order = Vec::new();
        for c in &self.columns {
            let entry = by_name.entry(c.output_name.as_str()).or_default();
            if entry.is_empty() {
                order.push(c.output_name.as_str());
            }
            entry.push(c.column.name.clone());
        }
        order
            .into_iter()
            .filter_map(|name| {
                let originals = by_name.remove(name)?;
                (originals.len() > 1).then(|| (name.to_string(), originals))
            })
            .collect()
    }
}

/// Extracts `<class>` from a name containing `prediction(<class>)`.
///
/// The class name is everything between the marker and the first `)` after it.
pub fn parse_prediction_target(name: &str) -> Option<&str> {
    let start = name.find(PREDICTION_MARKER)? + PREDICTION_MARKER.len();
    let len = name[start..].find(')')?;
    Some(&name[start..start + len])
}

/// Extracts `<value>` from a name containing `confidence(<value>)`.
///
/// Returns `None` when the marker is absent. The label runs from the first
/// `(` in the name to the first `)` after it, and is empty if no `)` follows.
pub fn parse_probability_label(name: &str) -> Option<&str> {
    if !name.contains(CONFIDENCE_MARKER) {
        return None;
    }
    let start = name.find('(')? + 1;
    let label = name[start..].find(')').map_or("", |len| &name[start..start + len]);
    Some(label)
}

/// Assigns a role and output name to every column.
///
/// # Errors
/// - `NoPredictionColumn` if no column is named `prediction(<class>)`.
/// - `MissingClassTruth`, `MissingFeatures`, `MissingProbabilities` when the
///   corresponding role was not assigned to any column, checked in that order.
pub fn classify(columns: &[Column]) -> ExportResult<Classification> {
    let Some((prediction_index, class_column)) = columns
        .iter()
        .enumerate()
        .find_map(|(idx, c)| parse_prediction_target(&c.name).map(|class| (idx, class.to_string())))
    else {
        info!("Predicted column not defined");
        return Err(ExportError::NoPredictionColumn);
    };
    debug!(prediction_index, class_column = %class_column, "located prediction column");

    let classified: Vec<ClassifiedColumn> = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let role = if column.name == class_column {
                Role::ClassTruth
            } else if idx == prediction_index {
                Role::Prediction
            } else if let Some(label) = parse_probability_label(&column.name) {
                Role::ClassProbability(label.to_string())
            } else {
                Role::Feature
            };
            let output_name = role.output_name(&column.name, &class_column);
            ClassifiedColumn { column: column.clone(), role, output_name }
        })
        .collect();

    let has = |pred: fn(&Role) -> bool| classified.iter().any(|c| pred(&c.role));
    let mut missing = Vec::new();
    if !has(|r| *r == Role::ClassTruth) {
        info!("Target class column not defined");
        missing.push(ExportError::MissingClassTruth { class_column: class_column.clone() });
    }
    if !has(|r| *r == Role::Feature) {
        info!("Features not defined");
        missing.push(ExportError::MissingFeatures);
    }
    if !has(|r| matches!(r, Role::ClassProbability(_))) {
        info!("Class probabilities not defined");
        missing.push(ExportError::MissingProbabilities);
    }
    if let Some(first) = missing.into_iter().next() {
        return Err(first);
    }

    let classification = Classification { class_column, prediction_index, columns: classified };
    for (name, originals) in classification.output_name_collisions() {
        warn!(output_name = %name, columns = ?originals, "output name shared by several columns");
    }
    info!(columns = classification.len(), "Class columns correctly defined");
    Ok(classification)
}
