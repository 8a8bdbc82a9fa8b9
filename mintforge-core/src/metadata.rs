use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::Result;

pub const RARITY_TRAIT: &str = "RARITY";

/// One `{trait_type, value}` entry of the attributes sequence. Fields
/// beyond the modeled pair round-trip through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trait_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata document for one collection item. Every field the pipeline
/// touches is modeled as explicitly present or absent; anything else a
/// template carries survives untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataRecord {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Stamp the per-item identity fields onto a template clone.
    pub fn assign_identity(&mut self, name: String, locator: String, rarity: &str) {
        self.name = Some(name);
        self.image = Some(locator);
        self.set_rarity(rarity);
    }

    /// Set `properties.RARITY` and keep the RARITY attribute in sync.
    pub fn set_rarity(&mut self, rarity: &str) {
        let props = self.properties.get_or_insert_with(Map::new);
        props.insert(RARITY_TRAIT.to_string(), Value::String(rarity.to_string()));

        if let Some(attributes) = &mut self.attributes {
            for attribute in attributes {
                if attribute.trait_type.as_deref() == Some(RARITY_TRAIT) {
                    attribute.value = Some(Value::String(rarity.to_string()));
                }
            }
        }
    }

    pub fn rarity(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(RARITY_TRAIT))
            .and_then(Value::as_str)
    }
}
