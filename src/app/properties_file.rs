// Persistent key-value properties kept in a single JSON object.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use fieldplan_analysis::{PropertyError, PropertyStore};
use log::debug;

/// The file is read again on every access so that separate runs see each other's writes.
#[derive(Debug, Clone)]
pub struct PropertiesFile {
    path: PathBuf,
}

impl PropertiesFile {
    pub fn new(path: PathBuf) -> PropertiesFile {
        PropertiesFile { path }
    }

    fn backend(&self, message: String) -> PropertyError {
        PropertyError::PropertyBackend {
            message: format!("{}: {}", self.path.display(), message),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, PropertyError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.backend(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| self.backend(e.to_string()))
    }

    fn save(&self, props: &BTreeMap<String, String>) -> Result<(), PropertyError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.backend(e.to_string()))?;
        }
        let js = serde_json::to_string_pretty(props).map_err(|e| self.backend(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, js).map_err(|e| self.backend(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.backend(e.to_string()))?;
        debug!("save: {} properties in {:?}", props.len(), self.path);
        Ok(())
    }
}

impl PropertyStore for PropertiesFile {
    fn get(&self, key: &str) -> Result<Option<String>, PropertyError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PropertyError> {
        let mut props = self.load()?;
        props.insert(key.to_string(), value.to_string());
        self.save(&props)
    }

    fn delete(&mut self, key: &str) -> Result<(), PropertyError> {
        let mut props = self.load()?;
        if props.remove(key).is_some() {
            self.save(&props)?;
        }
        Ok(())
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, PropertyError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }
}
