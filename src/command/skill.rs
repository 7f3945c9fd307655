//! Skill descriptors and the active skill catalog

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Recognition language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "ko", alias = "korean")]
    Korean,
    #[serde(rename = "en", alias = "english")]
    English,
}

impl Language {
    /// ISO 639-1 code sent to the server
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Korean => "ko",
            Self::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" | "kr" | "korean" => Ok(Self::Korean),
            "en" | "english" => Ok(Self::English),
            other => Err(Error::Config(format!("unsupported language: {other}"))),
        }
    }
}

/// One castable skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub id: String,
    #[serde(alias = "voiceKeyword")]
    pub voice_keyword: String,
    /// Display names keyed by language code
    #[serde(default, alias = "localizedNames")]
    pub localized_names: HashMap<String, String>,
    #[serde(default, alias = "voiceAliases")]
    pub aliases: Vec<String>,
    /// Generic skills resolve to an element variant at cast time
    #[serde(default, alias = "isGenericSkill")]
    pub is_generic: bool,
    #[serde(default, alias = "elementVariants")]
    pub element_variants: HashMap<String, SkillDescriptor>,
}

impl SkillDescriptor {
    /// Minimal descriptor with an id and a voice keyword
    #[must_use]
    pub fn new(id: impl Into<String>, voice_keyword: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            voice_keyword: voice_keyword.into(),
            localized_names: HashMap::new(),
            aliases: Vec::new(),
            is_generic: false,
            element_variants: HashMap::new(),
        }
    }

    /// Add a display name for `language`
    #[must_use]
    pub fn with_name(mut self, language: Language, name: impl Into<String>) -> Self {
        self.localized_names.insert(language.code().to_string(), name.into());
        self
    }

    /// Add a spoken alias
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Register the variant cast for `element`, marking this skill generic
    #[must_use]
    pub fn with_variant(mut self, element: impl Into<String>, variant: Self) -> Self {
        self.is_generic = true;
        self.element_variants.insert(element.into(), variant);
        self
    }

    /// Name shown to the player, falling back to the voice keyword
    #[must_use]
    pub fn display_name(&self, language: Language) -> &str {
        self.localized_names
            .get(language.code())
            .map_or(self.voice_keyword.as_str(), String::as_str)
    }

    /// Variant for `element`, matched case-insensitively
    #[must_use]
    pub fn variant_for(&self, element: &str) -> Option<&Self> {
        if !self.is_generic {
            return None;
        }

        self.element_variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(element))
            .map(|(_, variant)| variant)
    }

    /// True when `label` names this skill by id, keyword or display name
    #[must_use]
    pub fn answers_to(&self, label: &str) -> bool {
        let label = label.trim();
        self.id.eq_ignore_ascii_case(label)
            || self.voice_keyword == label
            || self.localized_names.values().any(|n| n == label)
    }
}

/// Every known skill plus the subset currently usable
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: Vec<SkillDescriptor>,
    active: Vec<SkillDescriptor>,
}

impl SkillCatalog {
    /// Build a catalog; all skills start active
    ///
    /// # Errors
    ///
    /// Returns error if an id is empty or used twice
    pub fn new(skills: Vec<SkillDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for skill in &skills {
            if skill.id.trim().is_empty() {
                return Err(Error::Catalog("skill with empty id".to_string()));
            }
            if !seen.insert(skill.id.as_str()) {
                return Err(Error::Catalog(format!("duplicate skill id: {}", skill.id)));
            }
        }

        Ok(Self {
            active: skills.clone(),
            skills,
        })
    }

    /// Parse a JSON array of skills
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the catalog is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let skills: Vec<SkillDescriptor> = serde_json::from_str(json)?;
        Self::new(skills)
    }

    /// Load a JSON catalog file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), skills = catalog.skills.len(), "skill catalog loaded");
        Ok(catalog)
    }

    /// All skills in catalog order
    #[must_use]
    pub fn all(&self) -> &[SkillDescriptor] {
        &self.skills
    }

    /// Skills usable right now, in the order they were activated
    #[must_use]
    pub fn active(&self) -> &[SkillDescriptor] {
        &self.active
    }

    /// Look up a skill by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SkillDescriptor> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// Restrict the active set to `ids`, in the given order
    ///
    /// Unknown ids are skipped with a warning.
    pub fn set_active<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut active = Vec::new();
        for id in ids {
            let id = id.as_ref();
            match self.get(id) {
                Some(skill) if !active.iter().any(|s: &SkillDescriptor| s.id == id) => {
                    active.push(skill.clone());
                }
                Some(_) => {}
                None => tracing::warn!(id, "unknown skill id ignored"),
            }
        }

        tracing::debug!(active = active.len(), "active skills updated");
        self.active = active;
    }

    /// Make every skill active again
    pub fn activate_all(&mut self) {
        self.active = self.skills.clone();
    }

    /// Names of the active skills as sent to the server
    #[must_use]
    pub fn request_keywords(&self, language: Language) -> Vec<String> {
        self.active
            .iter()
            .map(|s| match language {
                Language::Korean => s.voice_keyword.clone(),
                Language::English => s.display_name(language).to_string(),
            })
            .collect()
    }
}
