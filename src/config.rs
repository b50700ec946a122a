use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Build tags matched by `#platform:` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformTags {
    pub platform: String,
    pub render_type: String,
    pub haptics: String,
    pub release_type: String,
}

impl Default for PlatformTags {
    fn default() -> Self {
        let platform = env::var("RETRO_PLATFORM").unwrap_or_else(|_| String::from("Standard"));
        PlatformTags {
            platform,
            render_type: String::from("SW_Rendering"),
            haptics: String::from("No_Haptics"),
            release_type: String::from("Use_Standalone"),
        }
    }
}

impl PlatformTags {
    pub fn matches(&self, tag: &str) -> bool {
        [
            &self.platform,
            &self.render_type,
            &self.haptics,
            &self.release_type,
        ]
        .iter()
        .any(|t| t.as_str() == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    #[serde(default)]
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub script: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scripts_dir: PathBuf,
    pub platform: PlatformTags,
    pub globals: Vec<GlobalVariable>,
    pub objects: Vec<ObjectEntry>,
    pub screen_width: i32,
    pub screen_height: i32,
    pub strict_bounds: bool,
    pub rng_seed: Option<u64>,
    pub engine_version: String,
}

impl Default for Config {
    fn default() -> Self {
        let scripts_dir = if let Ok(custom_dir) = env::var("RETRO_SCRIPTS_DIR") {
            PathBuf::from(custom_dir)
        } else {
            PathBuf::from("./Data/Scripts")
        };

        Config {
            scripts_dir,
            platform: PlatformTags::default(),
            globals: Vec::new(),
            objects: Vec::new(),
            screen_width: 424,
            screen_height: 240,
            strict_bounds: false,
            rng_seed: None,
            engine_version: String::from("1.0.0"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        if config.scripts_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.scripts_dir = parent.join(&config.scripts_dir);
            }
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.iter().map(|g| g.name.clone()).collect()
    }

    pub fn script_path(&self, script: &Path) -> PathBuf {
        self.scripts_dir.join(script)
    }
}
