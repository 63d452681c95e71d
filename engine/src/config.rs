use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::LuckPolicy;
use crate::combat::session::SessionOptions;
use crate::content::{builtin_bestiaries, DEFAULT_BESTIARY};
use crate::stats::CombatantStats;
use crate::variant::EnemyDefinition;

/// Enemy definitions keyed by id, in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bestiary {
    enemies: IndexMap<String, EnemyDefinition>,
}

impl Bestiary {
    pub fn builtin() -> Result<Self> {
        let text = builtin_bestiaries()
            .get(DEFAULT_BESTIARY)
            .copied()
            .ok_or_else(|| anyhow!("built-in bestiary '{}' missing", DEFAULT_BESTIARY))?;
        Self::from_yaml_str(text).context("failed to parse built-in bestiary")
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text_auto(path)
            .with_context(|| format!("failed to read bestiary: {}", path.display()))?;
        let parsed = if is_json(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        parsed.with_context(|| format!("failed to parse bestiary: {}", path.display()))
    }

    pub fn get(&self, id: &str) -> Option<&EnemyDefinition> {
        self.enemies.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnemyDefinition)> {
        self.enemies.iter().map(|(id, enemy)| (id.as_str(), enemy))
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}

/// A single fight described in a file, for the harness and simulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleConfig {
    pub player: CombatantStats,
    /// Looked up in `bestiary_path`, or the built-in bestiary when that is absent.
    #[serde(default)]
    pub enemy_id: Option<String>,
    /// Inline enemy; takes precedence over `enemy_id`.
    #[serde(default)]
    pub enemy: Option<EnemyDefinition>,
    #[serde(default)]
    pub bestiary_path: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub luck_policy: LuckPolicy,
    #[serde(default)]
    pub options: SessionOptions,
}

impl BattleConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text_auto(path)
            .with_context(|| format!("failed to read battle config: {}", path.display()))?;
        let parsed = if is_json(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        parsed.with_context(|| format!("failed to parse battle config: {}", path.display()))
    }

    pub fn resolve_enemy(&self) -> Result<EnemyDefinition> {
        if let Some(enemy) = &self.enemy {
            return Ok(enemy.clone());
        }
        let Some(id) = self.enemy_id.as_deref() else {
            bail!("battle config names no enemy (set `enemy` or `enemy_id`)");
        };
        let bestiary = match &self.bestiary_path {
            Some(path) => Bestiary::load(Path::new(path))?,
            None => Bestiary::builtin()?,
        };
        bestiary
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("enemy '{}' not found in bestiary", id))
    }
}

/// Read a text file, honouring a UTF-8/UTF-16 BOM if one is present.
pub fn read_text_auto(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
