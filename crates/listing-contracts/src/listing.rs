use serde::{Deserialize, Serialize};

use crate::vocabulary::Vocabulary;

/// Upper bound on tags a marketplace listing accepts.
pub const MAX_TAGS: usize = 13;

/// Marketplace-facing metadata produced by one generation.
///
/// `description` and `materials` must be present in the payload; every other
/// field is best-effort and defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default)]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
    #[serde(default)]
    pub primary_fabric: String,
    #[serde(default)]
    pub occasion: String,
    #[serde(default)]
    pub holiday: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub materials: Vec<String>,
    #[serde(default)]
    pub price_estimate: String,
}

/// A constrained attribute whose value is outside its closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyFinding {
    pub field: &'static str,
    pub vocabulary: Vocabulary,
    pub value: String,
}

impl ListingRecord {
    pub fn materials_line(&self) -> String {
        self.materials.join(", ")
    }

    pub fn attribute_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Primary Color", self.primary_color.as_str()),
            ("Secondary Color", self.secondary_color.as_str()),
            ("Primary Fabric", self.primary_fabric.as_str()),
            ("Occasion", self.occasion.as_str()),
            ("Holiday", self.holiday.as_str()),
        ]
    }

    /// Reports constrained attributes the model filled with off-list values.
    /// The record itself is passed through untouched.
    pub fn vocabulary_findings(&self) -> Vec<VocabularyFinding> {
        let constrained = [
            ("primaryColor", Vocabulary::Color, &self.primary_color),
            ("secondaryColor", Vocabulary::Color, &self.secondary_color),
            ("primaryFabric", Vocabulary::Fabric, &self.primary_fabric),
            ("occasion", Vocabulary::Occasion, &self.occasion),
            ("holiday", Vocabulary::Holiday, &self.holiday),
        ];
        constrained
            .into_iter()
            .filter(|(_, vocabulary, value)| !vocabulary.contains(value))
            .map(|(field, vocabulary, value)| VocabularyFinding {
                field,
                vocabulary,
                value: value.clone(),
            })
            .collect()
    }
}
