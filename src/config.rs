//! TOML 設定ファイル。全てのキーは省略可能。
//!
//! ```toml
//! [engine]
//! max_iterations = 1000000   # 0 で上限なし
//! coercion = "lenient"       # "strict" も可
//!
//! [output]
//! dir = "output"
//! save = true
//!
//! [gui]
//! dark_mode = true
//! frame_ms = 250
//! font = "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CollatzError, Result};
use crate::playback;
use crate::sequence::{SequenceOptions, DEFAULT_MAX_ITERATIONS};
use crate::validate::CoercionPolicy;

/// `--config` 未指定時に探すファイル名
pub const DEFAULT_CONFIG_FILE: &str = "collatz.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub gui: GuiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_iterations: u64,
    pub coercion: CoercionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { max_iterations: DEFAULT_MAX_ITERATIONS, coercion: CoercionPolicy::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub save: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { dir: PathBuf::from("output"), save: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuiConfig {
    pub dark_mode: bool,
    pub frame_ms: u64,
    /// 日本語フォントのパス。未指定なら OS 標準のものを探す。
    pub font: Option<PathBuf>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        GuiConfig { dark_mode: true, frame_ms: playback::DEFAULT_FRAME_MS, font: None }
    }
}

impl GuiConfig {
    /// 25〜1000ms に丸めた描画間隔
    pub fn frame_ms(&self) -> u64 {
        playback::clamp_frame_ms(self.frame_ms)
    }
}

impl Config {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| CollatzError::Config {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// 指定ファイルを読む。存在しなければエラー。
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CollatzError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text, path)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// path が Some ならそれを必須として読み、None なら既定ファイルがあれば読む。
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn sequence_options(&self) -> SequenceOptions {
        match self.engine.max_iterations {
            0 => SequenceOptions::unbounded(),
            n => SequenceOptions::with_limit(n),
        }
    }
}
