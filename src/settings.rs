//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/stackfall/settings.toml (or platform equivalent)

use crate::board::Cell;
use crate::game::GameConfig;
use crate::score::ScoringRules;
use crate::tetromino::{Shape, default_shapes};
use directories::ProjectDirs;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Why a configuration cannot be used
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file exists but could not be read
    Read { path: PathBuf, source: io::Error },
    /// The settings file could not be written
    Write { path: PathBuf, source: io::Error },
    /// The settings file is not valid TOML for [`Settings`]
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    /// No platform config directory could be determined
    NoConfigDir,
    BoardTooSmall { columns: i32, rows: i32 },
    BoardTooLarge { columns: i32, rows: i32 },
    NoShapes,
    EmptyShape { index: usize },
    DuplicateCell { index: usize },
    /// The shape does not fit in the board at the spawn point
    ShapeOutOfBounds { index: usize },
    InvalidColor { index: usize, color: String },
    InvalidTiming,
    InvalidScoring(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "could not write {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "malformed settings: {}", e),
            ConfigError::Serialize(e) => write!(f, "could not serialize settings: {}", e),
            ConfigError::NoConfigDir => write!(f, "could not determine config directory"),
            ConfigError::BoardTooSmall { columns, rows } => {
                write!(f, "board {}x{} is too small to play on", columns, rows)
            }
            ConfigError::BoardTooLarge { columns, rows } => write!(
                f,
                "board {}x{} is too large, at most {} cells per side",
                columns,
                rows,
                crate::game::MAX_BOARD_SIZE
            ),
            ConfigError::NoShapes => write!(f, "shape table is empty"),
            ConfigError::EmptyShape { index } => write!(f, "shape {} has no cells", index),
            ConfigError::DuplicateCell { index } => {
                write!(f, "shape {} lists the same cell twice", index)
            }
            ConfigError::ShapeOutOfBounds { index } => {
                write!(f, "shape {} does not fit the board at the spawn point", index)
            }
            ConfigError::InvalidColor { index, color } => {
                write!(f, "shape {} has unknown color {:?}", index, color)
            }
            ConfigError::InvalidTiming => write!(f, "base_tick_ms must be greater than zero"),
            ConfigError::InvalidScoring(reason) => write!(f, "invalid scoring: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } | ConfigError::Write { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for io::Error {
    fn from(e: ConfigError) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, e)
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keybindings
    pub keys: KeyBindings,
    /// Board dimensions
    pub board: BoardSettings,
    /// Gameplay settings
    pub gameplay: GameplaySettings,
    /// Points and speed progression
    pub scoring: ScoringSettings,
    /// Visual settings
    pub visual: VisualSettings,
    /// Canonical shape table
    pub shapes: Vec<ShapeSettings>,
}

/// Key bindings (stored as strings for easy editing)
/// Each action can have one or more keys bound to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_left: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_right: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_down: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub pause: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub quit: Vec<String>,
}

/// Deserialize keys as either a single string or array of strings
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct KeysVisitor;

    impl<'de> Visitor<'de> for KeysVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(KeysVisitor)
}

/// Serialize keys: single key as string, multiple as array
fn serialize_keys<S>(keys: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    if let [key] = keys {
        serializer.serialize_str(key)
    } else {
        let mut seq = serializer.serialize_seq(Some(keys.len()))?;
        for key in keys {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

/// Board dimensions in cells
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    /// Odd widths are truncated down by one
    pub columns: u16,
    pub rows: u16,
}

/// Gameplay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    /// Fall interval at speed 1, in milliseconds
    pub base_tick_ms: u64,
    /// Fixed seed for the shape randomizer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Points per cell of a cleared line
    pub point_value: u64,
    /// Score to exceed for the first speed-up
    pub score_level: f64,
    pub score_level_ratio: f64,
    pub speed_ratio: f64,
}

/// Visual settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    /// Block style: "solid", "bracket", "round"
    pub block_style: String,
}

/// One entry of the shape table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSettings {
    /// [x, y] offsets from the anchor, y pointing down
    pub cells: Vec<[i32; 2]>,
    /// Color name ("red") or hex ("#ff4500")
    pub color: String,
    #[serde(default = "default_rotatable")]
    pub rotatable: bool,
}

fn default_rotatable() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keys: KeyBindings::default(),
            board: BoardSettings::default(),
            gameplay: GameplaySettings::default(),
            scoring: ScoringSettings::default(),
            visual: VisualSettings::default(),
            shapes: default_shapes().iter().map(ShapeSettings::from).collect(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_left: vec!["Left".to_string()],
            move_right: vec!["Right".to_string()],
            move_down: vec!["Down".to_string()],
            rotate: vec!["Space".to_string(), "Up".to_string()],
            pause: vec!["p".to_string()],
            quit: vec!["q".to_string(), "Esc".to_string()],
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            columns: 16,
            rows: 30,
        }
    }
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            base_tick_ms: 1000,
            seed: None,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        let rules = ScoringRules::default();
        Self {
            point_value: rules.point_value,
            score_level: rules.score_level,
            score_level_ratio: rules.score_level_ratio,
            speed_ratio: rules.speed_ratio,
        }
    }
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            block_style: "solid".to_string(),
        }
    }
}

impl From<&Shape> for ShapeSettings {
    fn from(shape: &Shape) -> Self {
        Self {
            cells: shape.cells.iter().map(|cell| [cell.x, cell.y]).collect(),
            color: shape.color.to_string(),
            rotatable: shape.rotatable,
        }
    }
}

impl ShapeSettings {
    fn to_shape(&self, index: usize) -> Result<Shape, ConfigError> {
        let color = Color::from_str(&self.color).map_err(|_| ConfigError::InvalidColor {
            index,
            color: self.color.clone(),
        })?;
        Ok(Shape {
            cells: self.cells.iter().map(|&[x, y]| Cell::new(x, y)).collect(),
            color,
            rotatable: self.rotatable,
        })
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "stackfall", "stackfall")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from file. A missing file gives the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::settings_path() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Parse settings from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Parse)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save settings to file, returning where they went
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let Some(dir) = Self::config_dir() else {
            return Err(ConfigError::NoConfigDir);
        };
        let path = dir.join("settings.toml");

        // Create directory if needed
        fs::create_dir_all(&dir).map_err(|source| ConfigError::Write {
            path: dir.clone(),
            source,
        })?;

        let contents = self.to_toml()?;
        fs::write(&path, contents).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Turn the file settings into a validated game configuration
    pub fn game_config(&self) -> Result<GameConfig, ConfigError> {
        let shapes = self
            .shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| shape.to_shape(index))
            .collect::<Result<Vec<_>, _>>()?;

        let config = GameConfig {
            columns: i32::from(self.board.columns),
            rows: i32::from(self.board.rows),
            base_tick: Duration::from_millis(self.gameplay.base_tick_ms),
            scoring: ScoringRules {
                point_value: self.scoring.point_value,
                score_level: self.scoring.score_level,
                score_level_ratio: self.scoring.score_level_ratio,
                speed_ratio: self.scoring.speed_ratio,
            },
            shapes,
        };
        config.validate()?;
        Ok(config)
    }
}

impl VisualSettings {
    /// Get the block characters based on style
    pub fn block_chars(&self) -> &'static str {
        match self.block_style.as_str() {
            "bracket" => "[]",
            "round" => "()",
            _ => "██", // "solid" or default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::from_toml("").unwrap();
        let config = settings.game_config().unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [board]
            columns = 11

            [keys]
            rotate = "x"
            "#,
        )
        .unwrap();
        assert_eq!(settings.board.rows, 30);
        assert_eq!(settings.keys.rotate, vec!["x".to_string()]);
        assert_eq!(settings.keys.move_left, vec!["Left".to_string()]);

        let config = settings.game_config().unwrap();
        assert_eq!(config.columns, 11);
        assert_eq!(config.playable_columns(), 10);
        assert_eq!(config.shapes.len(), 7);
    }

    #[test]
    fn test_custom_shape_table() {
        let settings = Settings::from_toml(
            r##"
            [[shapes]]
            cells = [[0, 0], [1, 0]]
            color = "#00ff00"

            [[shapes]]
            cells = [[0, 0], [0, 1], [1, 0], [1, 1]]
            color = "yellow"
            rotatable = false
            "##,
        )
        .unwrap();
        let config = settings.game_config().unwrap();
        assert_eq!(config.shapes.len(), 2);
        assert_eq!(config.shapes[0].color, Color::Rgb(0, 255, 0));
        assert!(config.shapes[0].rotatable);
        assert_eq!(config.shapes[1].color, Color::Yellow);
        assert!(!config.shapes[1].rotatable);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            Settings::from_toml("[board\ncolumns = 10"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Settings::from_toml("[board]\ncolumns = \"wide\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_shape_table_rejected() {
        let settings = Settings::from_toml("shapes = []").unwrap();
        assert!(matches!(settings.game_config(), Err(ConfigError::NoShapes)));
    }

    #[test]
    fn test_zero_board_rejected() {
        let settings = Settings::from_toml("[board]\ncolumns = 0\nrows = 0").unwrap();
        let err = settings.game_config().unwrap_err();
        assert!(matches!(err, ConfigError::BoardTooSmall { .. }));
        assert_eq!(err.to_string(), "board 0x0 is too small to play on");
    }

    #[test]
    fn test_huge_board_rejected() {
        let settings = Settings::from_toml("[board]\ncolumns = 16\nrows = 65535").unwrap();
        assert!(matches!(
            settings.game_config(),
            Err(ConfigError::BoardTooLarge { columns: 16, rows: 65535 })
        ));

        let settings = Settings::from_toml("[board]\ncolumns = 65535").unwrap();
        assert!(matches!(
            settings.game_config(),
            Err(ConfigError::BoardTooLarge { .. })
        ));
    }

    #[test]
    fn test_bad_color_rejected() {
        let settings = Settings::from_toml(
            r#"
            [[shapes]]
            cells = [[0, 0]]
            color = "not-a-colour"
            "#,
        )
        .unwrap();
        assert!(matches!(
            settings.game_config(),
            Err(ConfigError::InvalidColor { index: 0, .. })
        ));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut settings = Settings::from_toml("").unwrap();
        settings.gameplay.seed = Some(9);
        settings.keys.pause = vec!["p".to_string()];
        let text = settings.to_toml().unwrap();
        assert!(text.contains("pause = \"p\""));

        let back = Settings::from_toml(&text).unwrap();
        assert_eq!(back.keys.quit, vec!["q".to_string(), "Esc".to_string()]);
        assert_eq!(back.gameplay.seed, Some(9));
        assert_eq!(back.shapes, settings.shapes);
        assert_eq!(back.game_config().unwrap(), settings.game_config().unwrap());
    }

    #[test]
    fn test_block_chars() {
        let mut visual = VisualSettings::default();
        assert_eq!(visual.block_chars(), "██");
        visual.block_style = "bracket".to_string();
        assert_eq!(visual.block_chars(), "[]");
    }
}
