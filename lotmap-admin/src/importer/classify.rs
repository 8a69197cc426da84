//! Feature classification
//!
//! Assigns each normalized feature to exactly one hierarchy level through
//! an ordered rule cascade, falling back to the legacy key set
//! (`CUADRA`/`BARRIO`/explicit lot-number keys) still found in older
//! surveyor exports. Classification is a pure read — nothing is persisted
//! here.

use super::normalize::{normalize_properties, NormalizedProps};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Canonical block name: `MZ` + space + exactly three digits
static BLOCK_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^MZ \d{3}$").unwrap());

/// Canonical neighborhood name: `UV` + space + exactly three digits
static NEIGHBORHOOD_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^UV \d{3}$").unwrap());

/// Legacy keys that carry a lot number
const LOT_NUMBER_KEYS: [&str; 5] = ["NUMERO", "LOTE", "TERRENO", "LT", "NUM"];

/// Outcome of classifying one feature
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Project {
        name: String,
    },
    Neighborhood {
        name: String,
    },
    Block {
        name: String,
        /// Neighborhood token the block belongs under; absent only in
        /// legacy-format features, where the mapping must supply the id
        neighborhood_ref: Option<String>,
    },
    Lot {
        number: String,
        /// Block token the lot belongs under; absent only in legacy format
        block_ref: Option<String>,
    },
    /// No rule matched; the message lists the feature's properties
    Unrecognized {
        message: String,
    },
}

/// Classify one feature's normalized properties
///
/// First match wins, in entry order:
/// 1. `PROYECTO` key with a non-empty value → project
/// 2. block-name key (`MZ NNN`) → lot (the value is the lot number)
/// 3. neighborhood-name key whose value is a block name → block
/// 4. neighborhood-name key otherwise → neighborhood
/// 5. legacy fallback, precedence lot > block > neighborhood
pub fn classify(props: &NormalizedProps, index: usize) -> Classified {
    for (key, value) in props.iter() {
        if key == "PROYECTO" && !value.is_empty() {
            return Classified::Project {
                name: value.to_string(),
            };
        }
    }

    for (key, value) in props.iter() {
        if BLOCK_NAME_RE.is_match(key) {
            return Classified::Lot {
                number: value.to_string(),
                block_ref: Some(key.to_string()),
            };
        }
    }

    for (key, value) in props.iter() {
        if NEIGHBORHOOD_NAME_RE.is_match(key) && BLOCK_NAME_RE.is_match(value) {
            return Classified::Block {
                name: value.to_string(),
                neighborhood_ref: Some(key.to_string()),
            };
        }
    }

    for (key, value) in props.iter() {
        if NEIGHBORHOOD_NAME_RE.is_match(key) && !BLOCK_NAME_RE.is_match(value) {
            return Classified::Neighborhood {
                name: key.to_string(),
            };
        }
    }

    classify_legacy(props, index)
}

/// Legacy format: explicit `CUADRA`/`BARRIO`/lot-number keys
fn classify_legacy(props: &NormalizedProps, index: usize) -> Classified {
    let mut block_name: Option<String> = None;
    let mut neighborhood_name: Option<String> = None;
    let mut lot_number: Option<String> = None;

    for (key, value) in props.iter() {
        if key == "CUADRA" && BLOCK_NAME_RE.is_match(value) {
            block_name = Some(value.to_string());
        }
        if key == "BARRIO" && NEIGHBORHOOD_NAME_RE.is_match(value) {
            neighborhood_name = Some(value.to_string());
        }
        if LOT_NUMBER_KEYS.contains(&key) {
            lot_number = Some(value.to_string());
        }
    }

    if let Some(number) = lot_number {
        return Classified::Lot {
            number,
            block_ref: block_name,
        };
    }

    if let Some(name) = block_name {
        return Classified::Block {
            name,
            neighborhood_ref: neighborhood_name,
        };
    }

    if let Some(name) = neighborhood_name {
        return Classified::Neighborhood { name };
    }

    Classified::Unrecognized {
        message: format!(
            "Feature #{}: no recognizable pattern. Available properties: {}",
            index,
            props.describe()
        ),
    }
}

/// Normalize and classify every feature of a collection, in order
pub fn classify_features(features: &[geojson::Feature]) -> Vec<Classified> {
    static EMPTY: Lazy<serde_json::Map<String, serde_json::Value>> =
        Lazy::new(serde_json::Map::new);

    features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let props = feature.properties.as_ref().unwrap_or(&EMPTY);
            classify(&normalize_properties(props), index)
        })
        .collect()
}

// ============================================================================
// Analysis report
// ============================================================================

/// Overall shape of an import file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    FullProject,
    Mixed,
    Neighborhoods,
    Blocks,
    Lots,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectItem {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodItem {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockItem {
    pub name: String,
    pub neighborhood_ref: Option<String>,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LotItem {
    pub number: String,
    pub block_ref: Option<String>,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAnalysis<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Default for CategoryAnalysis<T> {
    fn default() -> Self {
        Self {
            count: 0,
            items: Vec::new(),
        }
    }
}

impl<T> CategoryAnalysis<T> {
    fn push(&mut self, item: T) {
        self.count += 1;
        self.items.push(item);
    }
}

/// Pure classification pass over an import file, no writes
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub total_features: usize,
    pub project: Option<ProjectItem>,
    pub neighborhoods: CategoryAnalysis<NeighborhoodItem>,
    pub blocks: CategoryAnalysis<BlockItem>,
    pub lots: CategoryAnalysis<LotItem>,
    pub import_type: ImportType,
    pub errors: Vec<String>,
    pub valid: bool,
}

/// Classify every feature and aggregate the analysis report
pub fn analyze_features(features: &[geojson::Feature]) -> Analysis {
    let mut analysis = Analysis {
        total_features: features.len(),
        project: None,
        neighborhoods: CategoryAnalysis::default(),
        blocks: CategoryAnalysis::default(),
        lots: CategoryAnalysis::default(),
        import_type: ImportType::Unknown,
        errors: Vec::new(),
        valid: true,
    };

    for (index, classified) in classify_features(features).into_iter().enumerate() {
        match classified {
            Classified::Project { name } => {
                tracing::debug!(index, name = %name, "project feature detected");
                analysis.project = Some(ProjectItem { name, index });
            }
            Classified::Neighborhood { name } => {
                analysis.neighborhoods.push(NeighborhoodItem { name, index });
            }
            Classified::Block {
                name,
                neighborhood_ref,
            } => {
                analysis.blocks.push(BlockItem {
                    name,
                    neighborhood_ref,
                    index,
                });
            }
            Classified::Lot { number, block_ref } => {
                analysis.lots.push(LotItem {
                    number,
                    block_ref,
                    index,
                });
            }
            Classified::Unrecognized { message } => {
                tracing::warn!(index, %message, "unclassifiable feature");
                analysis.errors.push(message);
                analysis.valid = false;
            }
        }
    }

    analysis.import_type = determine_import_type(&analysis);
    analysis
}

fn determine_import_type(analysis: &Analysis) -> ImportType {
    if analysis.project.is_some() {
        return ImportType::FullProject;
    }

    let (n, b, l) = (
        analysis.neighborhoods.count,
        analysis.blocks.count,
        analysis.lots.count,
    );

    match (n > 0, b > 0, l > 0) {
        (true, true, true) => ImportType::Mixed,
        (true, _, _) => ImportType::Neighborhoods,
        (_, true, _) => ImportType::Blocks,
        (_, _, true) => ImportType::Lots,
        _ => ImportType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::normalize::normalize_properties;
    use serde_json::json;

    fn classify_json(value: serde_json::Value) -> Classified {
        let props = normalize_properties(value.as_object().unwrap());
        classify(&props, 0)
    }

    #[test]
    fn project_key_wins() {
        let classified = classify_json(json!({"PROYECTO": "Villa Sol"}));
        assert_eq!(
            classified,
            Classified::Project {
                name: "VILLA SOL".to_string()
            }
        );
    }

    #[test]
    fn empty_project_value_does_not_match() {
        let classified = classify_json(json!({"PROYECTO": ""}));
        assert!(matches!(classified, Classified::Unrecognized { .. }));
    }

    #[test]
    fn block_key_yields_lot() {
        let classified = classify_json(json!({"MZ 001": "7"}));
        assert_eq!(
            classified,
            Classified::Lot {
                number: "007".to_string(),
                block_ref: Some("MZ 001".to_string()),
            }
        );
    }

    #[test]
    fn uv_key_with_block_value_yields_block() {
        let classified = classify_json(json!({"UV001": "mz3"}));
        assert_eq!(
            classified,
            Classified::Block {
                name: "MZ 003".to_string(),
                neighborhood_ref: Some("UV 001".to_string()),
            }
        );
    }

    #[test]
    fn uv_key_without_block_value_yields_neighborhood() {
        let classified = classify_json(json!({"UV 002": "something"}));
        assert_eq!(
            classified,
            Classified::Neighborhood {
                name: "UV 002".to_string()
            }
        );
    }

    #[test]
    fn legacy_lot_takes_precedence() {
        let classified = classify_json(json!({
            "BARRIO": "UV 001",
            "CUADRA": "MZ 002",
            "LOTE": "9",
        }));
        assert_eq!(
            classified,
            Classified::Lot {
                number: "009".to_string(),
                block_ref: Some("MZ 002".to_string()),
            }
        );
    }

    #[test]
    fn legacy_block_over_neighborhood() {
        let classified = classify_json(json!({
            "BARRIO": "UV 001",
            "CUADRA": "MZ 002",
        }));
        assert_eq!(
            classified,
            Classified::Block {
                name: "MZ 002".to_string(),
                neighborhood_ref: Some("UV 001".to_string()),
            }
        );
    }

    #[test]
    fn legacy_neighborhood_alone() {
        let classified = classify_json(json!({"BARRIO": "UV 003"}));
        assert_eq!(
            classified,
            Classified::Neighborhood {
                name: "UV 003".to_string()
            }
        );
    }

    #[test]
    fn unrecognized_lists_properties() {
        let classified = classify_json(json!({"foo": "bar"}));
        match classified {
            Classified::Unrecognized { message } => {
                assert!(message.contains("FOO => BAR"), "message was: {}", message);
            }
            other => panic!("expected Unrecognized, got {:?}", other),
        }
    }

    fn feature(props: serde_json::Value) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(props.as_object().unwrap().clone()),
            foreign_members: None,
        }
    }

    #[test]
    fn analysis_aggregates_and_flags_errors() {
        let features = vec![
            feature(json!({"UV 001": "residential"})),
            feature(json!({"UV 001": "MZ 001"})),
            feature(json!({"MZ 001": "1"})),
            feature(json!({"foo": "bar"})),
        ];

        let analysis = analyze_features(&features);
        assert_eq!(analysis.total_features, 4);
        assert!(analysis.project.is_none());
        assert_eq!(analysis.neighborhoods.count, 1);
        assert_eq!(analysis.blocks.count, 1);
        assert_eq!(analysis.lots.count, 1);
        assert_eq!(analysis.import_type, ImportType::Mixed);
        assert_eq!(analysis.errors.len(), 1);
        assert!(!analysis.valid);
        assert_eq!(analysis.lots.items[0].index, 2);
    }

    #[test]
    fn import_type_prefers_project() {
        let features = vec![
            feature(json!({"PROYECTO": "Villa Sol"})),
            feature(json!({"UV 001": "x"})),
        ];
        assert_eq!(analyze_features(&features).import_type, ImportType::FullProject);
    }

    #[test]
    fn import_type_single_category() {
        let features = vec![feature(json!({"UV 001": "x"}))];
        assert_eq!(
            analyze_features(&features).import_type,
            ImportType::Neighborhoods
        );
    }
}
