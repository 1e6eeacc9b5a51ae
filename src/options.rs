use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::storage::{StorageKey, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" => Some(Language::Zh),
            "en" | "en-us" => Some(Language::En),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    pub language: Language,
    pub dark_theme: bool,
}

impl Options {
    pub fn load(store: &Store) -> Result<Self> {
        let language = store
            .get::<Language>(StorageKey::LocalLanguage)?
            .unwrap_or_default();
        let dark_theme = store
            .get::<bool>(StorageKey::LocalDarkTheme)?
            .unwrap_or(false);
        Ok(Self {
            language,
            dark_theme,
        })
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        store.set(StorageKey::LocalLanguage, &self.language)?;
        store.set(StorageKey::LocalDarkTheme, &self.dark_theme)?;
        Ok(())
    }
}
