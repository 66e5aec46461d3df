//! Category metadata.
//!
//! The catalog is loaded once and treated as configuration: which categories
//! exist, which subcategories each offers, and whether marks apply.

use crate::{error::Result, CategoryName, Error, SchemaVersion};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Metadata for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySchema {
    /// Category name
    pub name: CategoryName,
    /// Allowed subcategories, in display order
    pub sub_categories: Vec<String>,
    /// Questions in this category always carry mark 0
    #[serde(default)]
    pub marks_exempt: bool,
}

impl CategorySchema {
    /// Create a category where marks apply.
    pub fn new(name: impl Into<CategoryName>, sub_categories: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sub_categories,
            marks_exempt: false,
        }
    }

    /// Builder-style method to exempt the category from marks.
    pub fn exempt_marks(mut self) -> Self {
        self.marks_exempt = true;
        self
    }

    /// Check whether a subcategory belongs to this category.
    pub fn has_sub_category(&self, sub_category: &str) -> bool {
        self.sub_categories.iter().any(|s| s == sub_category)
    }
}

/// The full category catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Catalog version
    pub version: SchemaVersion,
    /// Categories in display order
    pub categories: Vec<CategorySchema>,
}

impl Schema {
    /// Create an empty catalog.
    pub fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            categories: Vec::new(),
        }
    }

    /// The catalog used by the assessment admin.
    pub fn assessment() -> Self {
        fn subs(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }

        Schema::new(1)
            .with_category(
                CategorySchema::new(
                    "Prerequisites",
                    subs(&["Legal", "Licensing", "Safety"]),
                )
                .exempt_marks(),
            )
            .with_category(CategorySchema::new(
                "Environment",
                subs(&["Energy", "Water", "Waste", "Emissions", "Biodiversity"]),
            ))
            .with_category(CategorySchema::new(
                "Social",
                subs(&["Community", "Labour", "Health & Safety", "Diversity"]),
            ))
            .with_category(CategorySchema::new(
                "Governance",
                subs(&["Policy", "Transparency", "Ethics", "Risk"]),
            ))
    }

    /// Add a category; replaces an existing category of the same name.
    pub fn add_category(&mut self, category: CategorySchema) -> &mut Self {
        match self.categories.iter_mut().find(|c| c.name == category.name) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
        self
    }

    /// Builder-style method to add a category.
    pub fn with_category(mut self, category: CategorySchema) -> Self {
        self.add_category(category);
        self
    }

    /// Get a category by name.
    pub fn get_category(&self, name: &str) -> Option<&CategorySchema> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Get a category by name or fail.
    pub fn require(&self, name: &str) -> Result<&CategorySchema> {
        self.get_category(name)
            .ok_or_else(|| Error::CategoryNotFound(name.to_string()))
    }

    /// Category names in display order.
    pub fn category_names(&self) -> impl Iterator<Item = &CategoryName> {
        self.categories.iter().map(|c| &c.name)
    }

    /// Check the catalog is usable.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(Error::InvalidCatalog("category name is empty".into()));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate category: {}",
                    category.name
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidCatalog(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_catalog() {
        let schema = Schema::assessment();
        let names: Vec<_> = schema.category_names().cloned().collect();
        assert_eq!(
            names,
            vec!["Prerequisites", "Environment", "Social", "Governance"]
        );

        assert!(schema.get_category("Prerequisites").unwrap().marks_exempt);
        assert!(!schema.get_category("Social").unwrap().marks_exempt);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn require_missing_category() {
        let schema = Schema::assessment();
        let result = schema.require("Finance");
        assert!(matches!(result, Err(Error::CategoryNotFound(c)) if c == "Finance"));
    }

    #[test]
    fn add_category_replaces() {
        let mut schema = Schema::new(1);
        schema.add_category(CategorySchema::new("Social", vec!["A".into()]));
        schema.add_category(CategorySchema::new("Social", vec!["B".into()]));

        assert_eq!(schema.categories.len(), 1);
        assert!(schema.get_category("Social").unwrap().has_sub_category("B"));
        assert!(!schema.get_category("Social").unwrap().has_sub_category("A"));
    }

    #[test]
    fn duplicate_categories_rejected() {
        let schema = Schema {
            version: 1,
            categories: vec![
                CategorySchema::new("Social", vec![]),
                CategorySchema::new("Social", vec![]),
            ],
        };
        assert!(matches!(schema.validate(), Err(Error::InvalidCatalog(_))));
    }

    #[test]
    fn from_json_defaults_marks_exempt() {
        let json = r#"{
            "version": 2,
            "categories": [
                {"name": "Environment", "subCategories": ["Water"]},
                {"name": "Prerequisites", "subCategories": [], "marksExempt": true}
            ]
        }"#;

        let schema = Schema::from_json(json).unwrap();
        assert_eq!(schema.version, 2);
        assert!(!schema.get_category("Environment").unwrap().marks_exempt);
        assert!(schema.get_category("Prerequisites").unwrap().marks_exempt);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            Schema::from_json("{\"version\": 1}"),
            Err(Error::InvalidCatalog(_))
        ));
    }

    #[test]
    fn schema_serialization() {
        let schema = Schema::assessment();
        let json = schema.to_json().unwrap();
        assert!(json.contains("subCategories"));
        assert_eq!(Schema::from_json(&json).unwrap(), schema);
    }
}
