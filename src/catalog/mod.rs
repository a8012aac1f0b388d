//! Topic catalog and selection reconciliation.
//!
//! The catalog is the fixed reference data: categories, each with an
//! ordered list of subcategories. Users select a flat set of subcategory
//! IDs; the backend wants those grouped per category. This module owns the
//! mapping in both directions.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A selectable topic within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    #[serde(rename = "subcategory_id")]
    pub id: String,
    pub title: String,
}

/// A top-level topic grouping.
///
/// This shape doubles as the backend's `ResponseCategoryData`: the server
/// returns the user's stored preferences as categories whose subcategory
/// lists are filtered down to the selected ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "category_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

/// One entry of the grouped submission payload: a category plus the
/// selected subcategory IDs it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub category_id: String,
    pub subcategories: Vec<String>,
}

/// Request body for the set/update preference endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesPayload {
    pub categories_data: Vec<CategorySelection>,
}

/// The static catalog of topics offered to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    /// The product's built-in topic set.
    pub fn default_catalog() -> Self {
        fn sub(id: &str, title: &str) -> Subcategory {
            Subcategory {
                id: id.to_string(),
                title: title.to_string(),
            }
        }
        fn cat(id: &str, title: &str, subcategories: Vec<Subcategory>) -> Category {
            Category {
                id: id.to_string(),
                title: title.to_string(),
                subcategories,
            }
        }

        Self {
            categories: vec![
                cat(
                    "core-ai-news",
                    "Core AI News",
                    vec![
                        sub("ai-industry", "Industry News"),
                        sub("ai-research", "Research"),
                        sub("ai-policy", "Policy & Regulation"),
                        sub("ai-safety", "AI Safety"),
                        sub("ai-product-launches", "Recent AI Products"),
                    ],
                ),
                cat(
                    "technical",
                    "Technical Part of AI",
                    vec![
                        sub("llm", "LLMs"),
                        sub("cv", "Computer Vision"),
                        sub("genai", "Generative AI"),
                    ],
                ),
                cat(
                    "general_user_usecases",
                    "AI Tools for General Users",
                    vec![
                        sub("ai-writing", "Writing Tools"),
                        sub("ai-productivity", "Productivity"),
                        sub("ai-media-tools", "Image/Video/Audio Tools"),
                    ],
                ),
                cat(
                    "developer_usecases",
                    "AI Tools for Developers",
                    vec![
                        sub("ai-coding", "Code Generation"),
                        sub("mlops", "MLOps"),
                        sub("infra", "Infrastructure"),
                    ],
                ),
                cat(
                    "sectors",
                    "Sector-Specific",
                    vec![
                        sub("ai-healthcare", "Healthcare"),
                        sub("ai-finance", "Finance"),
                        sub("ai-education", "Education"),
                    ],
                ),
            ],
        }
    }

    /// Find the category owning a subcategory ID. First match wins;
    /// subcategory IDs are globally unique across the catalog.
    pub fn owner_of(&self, subcategory_id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.subcategories.iter().any(|s| s.id == subcategory_id))
    }

    /// Title of a subcategory, for display. Falls back to the raw ID.
    pub fn subcategory_title<'a>(&'a self, subcategory_id: &'a str) -> &'a str {
        self.categories
            .iter()
            .flat_map(|category| category.subcategories.iter())
            .find(|s| s.id == subcategory_id)
            .map(|s| s.title.as_str())
            .unwrap_or(subcategory_id)
    }

    /// Forward transform: group a flat selection into the per-category
    /// submission payload.
    ///
    /// Output order is the order each category is first encountered while
    /// scanning the selection, not catalog order. IDs with no owning
    /// category are dropped; each drop is logged since it usually means a
    /// stale reference to a removed topic. Never fails; an empty selection
    /// yields an empty payload.
    pub fn group_selection<I, S>(&self, selection: I) -> Vec<CategorySelection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grouped: Vec<CategorySelection> = Vec::new();
        let mut index_by_category: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        for subcategory_id in selection {
            let subcategory_id = subcategory_id.as_ref();
            if !seen.insert(subcategory_id.to_string()) {
                continue;
            }
            let Some(category) = self.owner_of(subcategory_id) else {
                warn!(
                    subcategory_id,
                    "Dropping selected topic with no catalog entry"
                );
                continue;
            };
            match index_by_category.get(category.id.as_str()) {
                Some(&idx) => grouped[idx].subcategories.push(subcategory_id.to_string()),
                None => {
                    index_by_category.insert(category.id.clone(), grouped.len());
                    grouped.push(CategorySelection {
                        category_id: category.id.clone(),
                        subcategories: vec![subcategory_id.to_string()],
                    });
                }
            }
        }

        grouped
    }
}

/// Reverse transform: flatten the backend's per-category preference list
/// into a flat selection, used to pre-populate the picker. The result
/// replaces any current selection.
pub fn flatten_selection(categories: &[Category]) -> Vec<String> {
    categories
        .iter()
        .flat_map(|category| category.subcategories.iter())
        .map(|s| s.id.clone())
        .collect()
}
