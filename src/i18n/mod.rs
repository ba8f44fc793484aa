use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Per-language `key -> text` dictionaries, one JSON object file each.
pub struct TextDictionaries {
    dir: PathBuf,
    writer: Mutex<()>,
}

impl TextDictionaries {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writer: Mutex::new(()),
        }
    }

    fn path_for(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{language}.json"))
    }

    /// Read a whole dictionary. A missing file is an empty dictionary.
    pub async fn load(&self, language: &str) -> Result<Map<String, Value>> {
        read_dictionary(&self.path_for(language)).await
    }

    pub async fn contains_key(&self, language: &str, key: &str) -> Result<bool> {
        Ok(self.load(language).await?.contains_key(key))
    }

    /// Insert or replace entries and rewrite the file. Existing key order is kept.
    pub async fn upsert(&self, language: &str, entries: &BTreeMap<String, String>) -> Result<()> {
        let _guard = self.writer.lock().await;
        let path = self.path_for(language);
        let mut dictionary = read_dictionary(&path).await?;
        for (key, text) in entries {
            dictionary.insert(key.clone(), Value::String(text.clone()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&dictionary)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(language, entries = entries.len(), "dictionary updated");
        Ok(())
    }
}

async fn read_dictionary(path: &Path) -> Result<Map<String, Value>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_keeps_existing_entries_in_place() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("el.json"),
            r#"{"nav_home": "Αρχική", "nav_about": "Σχετικά"}"#,
        )
        .unwrap();
        let dictionaries = TextDictionaries::new(dir.path());

        let entries = BTreeMap::from([
            ("nav_home".to_string(), "Αρχική σελίδα".to_string()),
            ("prop_a_title".to_string(), "Διαμέρισμα".to_string()),
        ]);
        dictionaries.upsert("el", &entries).await.unwrap();

        let el = dictionaries.load("el").await.unwrap();
        let keys: Vec<&String> = el.keys().collect();
        assert_eq!(keys, ["nav_home", "nav_about", "prop_a_title"]);
        assert_eq!(el["nav_home"], "Αρχική σελίδα");
    }

    #[tokio::test]
    async fn missing_language_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let dictionaries = TextDictionaries::new(dir.path().join("i18n"));
        assert!(!dictionaries.contains_key("ro", "x").await.unwrap());

        let entries = BTreeMap::from([("x".to_string(), "y".to_string())]);
        dictionaries.upsert("ro", &entries).await.unwrap();
        assert!(dictionaries.contains_key("ro", "x").await.unwrap());
    }
}
