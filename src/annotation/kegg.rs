/// Reference KO universe, feature ordering and group-membership tables
///
/// Everything here is loaded once per run and only read afterwards, so a
/// `KeggReference` is shared by reference across all per-genome work.
use crate::annotation::modules::{parse_module_definition, ModuleExpr};
use crate::utils::io::read_json;
use crate::BinqcError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const FEATURE_ORDERING_FILE: &str = "feature_ordering.json";
pub const GROUP_MAPPING_FILE: &str = "kegg_path_category_mapping.json";
pub const MODULE_DEFINITIONS_FILE: &str = "module_definitions.json";

/// Column names per feature category, in model order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureOrdering {
    #[serde(rename = "Metadata")]
    pub metadata: Vec<String>,
    #[serde(rename = "KO_Genes")]
    pub ko_genes: Vec<String>,
    #[serde(rename = "KO_Pathways", default)]
    pub pathways: Vec<String>,
    #[serde(rename = "KO_Modules", default)]
    pub modules: Vec<String>,
    #[serde(rename = "KO_Categories", default)]
    pub categories: Vec<String>,
}

impl FeatureOrdering {
    /// Every column name: metadata, KO genes, pathways, modules, categories
    pub fn column_names(&self) -> Vec<String> {
        self.metadata
            .iter()
            .chain(&self.ko_genes)
            .chain(&self.pathways)
            .chain(&self.modules)
            .chain(&self.categories)
            .cloned()
            .collect()
    }

    pub fn width(&self) -> usize {
        self.metadata.len()
            + self.ko_genes.len()
            + self.pathways.len()
            + self.modules.len()
            + self.categories.len()
    }
}

/// The fixed, ordered set of KO ids a run counts against
#[derive(Debug, Clone)]
pub struct KoUniverse {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl KoUniverse {
    pub fn new(ids: Vec<String>) -> Result<Self, BinqcError> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(BinqcError::Setup(format!("KO id '{}' listed twice", id)));
            }
        }
        Ok(Self { ids, index })
    }

    pub fn position(&self, ko_id: &str) -> Option<usize> {
        self.index.get(ko_id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Group members as a plain list (all weight 1) or explicit weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMembers {
    List(Vec<String>),
    Weighted(IndexMap<String, f64>),
}

impl GroupMembers {
    fn weighted(&self) -> Vec<(&str, f64)> {
        match self {
            GroupMembers::List(ids) => ids.iter().map(|id| (id.as_str(), 1.0)).collect(),
            GroupMembers::Weighted(map) => map.iter().map(|(id, w)| (id.as_str(), *w)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupTables {
    #[serde(default)]
    pub pathways: IndexMap<String, GroupMembers>,
    #[serde(default)]
    pub categories: IndexMap<String, GroupMembers>,
}

/// A group resolved against the universe. Members outside the universe can
/// never be observed but still weigh in the denominator.
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    present_candidates: Vec<(usize, f64)>,
    total_weight: f64,
}

impl CompiledGroup {
    fn compile(members: &GroupMembers, universe: &KoUniverse) -> Self {
        let mut present_candidates = Vec::new();
        let mut total_weight = 0.0;
        for (id, weight) in members.weighted() {
            total_weight += weight;
            if let Some(pos) = universe.position(id) {
                present_candidates.push((pos, weight));
            }
        }
        Self {
            present_candidates,
            total_weight,
        }
    }

    /// Weighted fraction of members with a nonzero count; 0 for empty groups
    pub fn fraction_present(&self, ko_counts: &[u32]) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let present: f64 = self
            .present_candidates
            .iter()
            .filter(|(pos, _)| ko_counts.get(*pos).copied().unwrap_or(0) > 0)
            .map(|(_, w)| w)
            .sum();
        present / self.total_weight
    }
}

/// Pathway, module and category completeness for one genome, each in the
/// order of the matching `FeatureOrdering` list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFeatures {
    pub pathways: Vec<f64>,
    pub modules: Vec<f64>,
    pub categories: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct KeggReference {
    pub ordering: FeatureOrdering,
    universe: KoUniverse,
    pathways: Vec<CompiledGroup>,
    categories: Vec<CompiledGroup>,
    modules: Vec<ModuleExpr>,
}

impl KeggReference {
    /// Load the three reference tables from `data_dir`
    pub fn load(data_dir: &Path) -> Result<Self, BinqcError> {
        let ordering: FeatureOrdering = read_json(&data_dir.join(FEATURE_ORDERING_FILE))?;
        let groups: GroupTables = read_json(&data_dir.join(GROUP_MAPPING_FILE))?;
        let modules: IndexMap<String, String> =
            read_json(&data_dir.join(MODULE_DEFINITIONS_FILE))?;

        let reference = Self::from_parts(ordering, &groups, &modules)?;
        tracing::debug!(
            "Loaded KEGG reference: {} KOs, {} pathways, {} modules, {} categories",
            reference.universe.len(),
            reference.pathways.len(),
            reference.modules.len(),
            reference.categories.len()
        );
        Ok(reference)
    }

    /// Resolve every ordered group name against its table. A name with no
    /// definition is a setup error.
    pub fn from_parts(
        ordering: FeatureOrdering,
        groups: &GroupTables,
        module_definitions: &IndexMap<String, String>,
    ) -> Result<Self, BinqcError> {
        let universe = KoUniverse::new(ordering.ko_genes.clone())?;

        let compile = |names: &[String],
                       table: &IndexMap<String, GroupMembers>,
                       kind: &str|
         -> Result<Vec<CompiledGroup>, BinqcError> {
            names
                .iter()
                .map(|name| {
                    table
                        .get(name)
                        .map(|members| CompiledGroup::compile(members, &universe))
                        .ok_or_else(|| {
                            BinqcError::Setup(format!("no {} definition for '{}'", kind, name))
                        })
                })
                .collect()
        };

        let pathways = compile(&ordering.pathways, &groups.pathways, "pathway")?;
        let categories = compile(&ordering.categories, &groups.categories, "category")?;

        let modules = ordering
            .modules
            .iter()
            .map(|name| {
                let definition = module_definitions.get(name).ok_or_else(|| {
                    BinqcError::Setup(format!("no module definition for '{}'", name))
                })?;
                parse_module_definition(definition)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ordering,
            universe,
            pathways,
            categories,
            modules,
        })
    }

    pub fn universe(&self) -> &KoUniverse {
        &self.universe
    }

    /// Derived completeness features from a KO count vector in universe order
    pub fn derive(&self, ko_counts: &[u32]) -> DerivedFeatures {
        let present = |id: &str| {
            self.universe
                .position(id)
                .and_then(|pos| ko_counts.get(pos))
                .is_some_and(|&count| count > 0)
        };

        DerivedFeatures {
            pathways: self
                .pathways
                .iter()
                .map(|g| g.fraction_present(ko_counts))
                .collect(),
            modules: self
                .modules
                .iter()
                .map(|m| m.score(&present).unwrap_or(0.0))
                .collect(),
            categories: self
                .categories
                .iter()
                .map(|g| g.fraction_present(ko_counts))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn reference() -> KeggReference {
        let ordering = FeatureOrdering {
            metadata: vec!["CDS".into()],
            ko_genes: vec!["K1".into(), "K2".into(), "K3".into(), "K4".into()],
            pathways: vec!["map1".into(), "map_empty".into()],
            modules: vec!["M1".into()],
            categories: vec!["cat".into()],
        };
        let groups: GroupTables = serde_json::from_str(
            r#"{
                "pathways": {"map1": ["K1", "K2", "K9"], "map_empty": []},
                "categories": {"cat": {"K1": 3.0, "K4": 1.0}}
            }"#,
        )
        .unwrap();
        let mut modules = IndexMap::new();
        modules.insert("M1".to_string(), "K1 (K2,K3) K4".to_string());

        KeggReference::from_parts(ordering, &groups, &modules).unwrap()
    }

    #[rstest]
    fn test_derive_from_counts(reference: KeggReference) {
        // K1 and K3 observed
        let derived = reference.derive(&[2, 0, 1, 0]);
        assert_eq!(derived.pathways, vec![1.0 / 3.0, 0.0]);
        assert_eq!(derived.modules, vec![2.0 / 3.0]);
        assert_eq!(derived.categories, vec![0.75]);
    }

    #[rstest]
    fn test_no_hits_gives_zero_features(reference: KeggReference) {
        let derived = reference.derive(&[0; 4]);
        assert!(derived
            .pathways
            .iter()
            .chain(&derived.modules)
            .chain(&derived.categories)
            .all(|&v| v == 0.0));
    }

    #[rstest]
    fn test_column_names_follow_category_order(reference: KeggReference) {
        assert_eq!(
            reference.ordering.column_names(),
            vec!["CDS", "K1", "K2", "K3", "K4", "map1", "map_empty", "M1", "cat"]
        );
        assert_eq!(reference.ordering.width(), 9);
    }

    #[test]
    fn test_missing_group_definition() {
        let ordering = FeatureOrdering {
            ko_genes: vec!["K1".into()],
            pathways: vec!["map_missing".into()],
            ..Default::default()
        };
        let err = KeggReference::from_parts(ordering, &GroupTables::default(), &IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, BinqcError::Setup(_)));
    }

    #[test]
    fn test_duplicate_universe_ids() {
        assert!(KoUniverse::new(vec!["K1".into(), "K1".into()]).is_err());
    }

    #[test]
    fn test_ordering_json_names() {
        let ordering: FeatureOrdering =
            serde_json::from_str(r#"{"Metadata": ["CDS"], "KO_Genes": ["K1"]}"#).unwrap();
        assert_eq!(ordering.ko_genes, vec!["K1"]);
        assert!(ordering.pathways.is_empty());
    }
}
