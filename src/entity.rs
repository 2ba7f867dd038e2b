use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A point entity placed in a level.
///
/// Coordinates are in 8 pixel origin units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub entity_type: u8,
    pub subtype: u8,
    pub x: i32,
    pub y: i32,
}

impl Entity {
    /// Pixels per coordinate unit
    pub const ORIGIN_SIZE: i32 = 8;

    pub fn new(entity_type: u8, subtype: u8, x: i32, y: i32) -> Self {
        Self {
            entity_type: entity_type & 0xF,
            subtype: subtype & 0xF,
            x,
            y,
        }
    }

    /// Type in the low nibble, subtype in the high nibble
    pub fn packed(&self) -> u8 {
        (self.entity_type & 0xF) | ((self.subtype & 0xF) << 4)
    }

    pub fn from_packed(value: u8, x: i32, y: i32) -> Self {
        Self::new(value & 0xF, (value >> 4) & 0xF, x, y)
    }

    pub fn key(&self) -> (u8, u8) {
        (self.entity_type, self.subtype)
    }
}

/// Display data for one `(type, subtype)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTemplate {
    pub name: String,
    pub entity_type: u8,
    pub subtype: u8,
    pub gfx: String,
    pub gfx_index: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TemplateFields {
    name: Option<String>,
    gfx: Option<String>,
    gfx_index: Option<u32>,
    offset: Option<[i32; 2]>,
}

impl TemplateFields {
    fn merged(&self, over: &TemplateFields) -> TemplateFields {
        TemplateFields {
            name: over.name.clone().or_else(|| self.name.clone()),
            gfx: over.gfx.clone().or_else(|| self.gfx.clone()),
            gfx_index: over.gfx_index.or(self.gfx_index),
            offset: over.offset.or(self.offset),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TypeEntry {
    #[serde(rename = "type", default)]
    fields: TemplateFields,
    #[serde(default)]
    subtypes: IndexMap<String, TemplateFields>,
}

/// Entity templates keyed by `(type, subtype)`, in file order
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: IndexMap<(u8, u8), EntityTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the layered template files for one level: `shared.json`, then
    /// `world{W}-shared.json`, then `world{W}-level{L}.json`. Missing layers
    /// are skipped. Indices are zero based.
    pub fn load_layers(dir: &Path, world_index: usize, level_index: usize) -> Result<Self> {
        let mut catalog = Self::new();
        let layers = [
            "shared.json".to_string(),
            format!("world{}-shared.json", world_index + 1),
            format!("world{}-level{}.json", world_index + 1, level_index + 1),
        ];
        for layer in layers {
            let path = dir.join(layer);
            if path.exists() {
                catalog.load_file(&path)?;
            }
        }
        Ok(catalog)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let entries: IndexMap<String, TypeEntry> = serde_json::from_str(&text)
            .map_err(|source| Error::Config { path: path.to_path_buf(), source })?;
        let before = self.templates.len();
        self.add_entries(entries)?;
        tracing::debug!(path = %path.display(), added = self.templates.len() - before, "loaded entity templates");
        Ok(())
    }

    pub fn load_str(&mut self, json: &str) -> Result<()> {
        let entries: IndexMap<String, TypeEntry> = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("entity templates: {e}")))?;
        self.add_entries(entries)
    }

    fn add_entries(&mut self, entries: IndexMap<String, TypeEntry>) -> Result<()> {
        for (type_key, entry) in entries {
            let entity_type = parse_key(&type_key)?;
            for (subtype_key, sub_fields) in &entry.subtypes {
                let subtype = parse_key(subtype_key)?;
                let merged = entry.fields.merged(sub_fields);
                let [offset_x, offset_y] = merged.offset.unwrap_or([0, 0]);

                let template = EntityTemplate {
                    name: display_name(entry.fields.name.as_deref(), sub_fields.name.as_deref()),
                    entity_type,
                    subtype,
                    gfx: merged.gfx.unwrap_or_else(|| "fontsmall".to_string()),
                    gfx_index: merged.gfx_index.unwrap_or(0),
                    offset_x,
                    offset_y,
                };
                self.insert(template);
            }
        }
        Ok(())
    }

    /// Adds or replaces the template for its key
    pub fn insert(&mut self, template: EntityTemplate) {
        self.templates.insert((template.entity_type, template.subtype), template);
    }

    pub fn get(&self, entity_type: u8, subtype: u8) -> Option<&EntityTemplate> {
        self.templates.get(&(entity_type, subtype))
    }

    pub fn require(&self, entity_type: u8, subtype: u8) -> Result<&EntityTemplate> {
        self.get(entity_type, subtype)
            .ok_or(Error::UnknownTemplate { entity_type, subtype })
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn parse_key(key: &str) -> Result<u8> {
    key.trim()
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= 0xF)
        .ok_or_else(|| Error::InvalidFormat(format!("entity template key {key:?} is not in 0..=15")))
}

fn display_name(type_name: Option<&str>, subtype_name: Option<&str>) -> String {
    let type_name = type_name.unwrap_or("Unnamed");
    match subtype_name {
        Some(sub) if !sub.is_empty() && !type_name.is_empty() => format!("{type_name} - {sub}"),
        Some(sub) if !sub.is_empty() => sub.to_string(),
        _ => type_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATES: &str = r#"{
        "1": {
            "type": { "name": "Walker", "gfx": "enemies", "offset": [4, -8] },
            "subtypes": {
                "0": { "name": "Slow" },
                "3": { "gfx_index": 7, "offset": [0, 0] }
            }
        },
        "15": {
            "type": { "name": "" },
            "subtypes": { "2": { "name": "Power-up" } }
        }
    }"#;

    #[test]
    fn test_packed_nibbles() {
        let entity = Entity::new(0x3, 0xA, 10, 20);
        assert_eq!(entity.packed(), 0xA3);

        let back = Entity::from_packed(0xA3, 10, 20);
        assert_eq!(back, entity);

        // Values wider than a nibble are masked.
        assert_eq!(Entity::new(0x13, 0x2B, 0, 0).packed(), 0xB3);
    }

    #[test]
    fn test_template_merge() {
        let mut catalog = TemplateCatalog::new();
        catalog.load_str(TEMPLATES).unwrap();

        assert_eq!(catalog.len(), 3);

        let slow = catalog.get(1, 0).unwrap();
        assert_eq!(slow.name, "Walker - Slow");
        assert_eq!(slow.gfx, "enemies");
        assert_eq!((slow.offset_x, slow.offset_y), (4, -8));

        let other = catalog.get(1, 3).unwrap();
        assert_eq!(other.name, "Walker");
        assert_eq!(other.gfx_index, 7);
        assert_eq!((other.offset_x, other.offset_y), (0, 0));

        let powerup = catalog.get(15, 2).unwrap();
        assert_eq!(powerup.name, "Power-up");
        assert_eq!(powerup.gfx, "fontsmall");
    }

    #[test]
    fn test_unknown_template() {
        let catalog = TemplateCatalog::new();
        assert!(catalog.get(2, 2).is_none());
        assert!(matches!(
            catalog.require(2, 2),
            Err(Error::UnknownTemplate { entity_type: 2, subtype: 2 })
        ));
    }

    #[test]
    fn test_bad_key() {
        let mut catalog = TemplateCatalog::new();
        let json = r#"{ "16": { "type": {}, "subtypes": { "0": {} } } }"#;
        assert!(matches!(catalog.load_str(json), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_layers_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("shared.json"),
            r#"{ "2": { "type": { "name": "Crate" }, "subtypes": { "0": {}, "1": {} } } }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("world3-level2.json"),
            r#"{ "2": { "type": { "name": "Barrel" }, "subtypes": { "1": {} } } }"#,
        )
        .unwrap();

        let catalog = TemplateCatalog::load_layers(dir.path(), 2, 1).unwrap();
        assert_eq!(catalog.get(2, 0).unwrap().name, "Crate");
        assert_eq!(catalog.get(2, 1).unwrap().name, "Barrel");
    }
}
