use crate::error::{GeoSnapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 並列数の上限
pub const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 並列数（0 = CPUコア数）
    pub concurrency: usize,
    /// サムネイル長辺（px）
    pub thumbnail_max_dimension: u32,
    /// サムネイルJPEG品質
    pub thumbnail_quality: u8,
    /// 対象拡張子（大文字小文字を区別しない）
    pub extensions: Vec<String>,
    /// Word写真帳も生成するか
    pub generate_word: bool,
    /// 出力先（未設定時は入力フォルダ）
    pub output_dir: Option<PathBuf>,
    pub project_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 0,
            thumbnail_max_dimension: 800,
            thumbnail_quality: 75,
            extensions: ["jpg", "jpeg", "png", "heic", "heif"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            generate_word: false,
            output_dir: None,
            project_name: "Mi_Reporte".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込む（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GeoSnapError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("geosnap").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency > MAX_CONCURRENCY {
            return Err(GeoSnapError::Config(format!(
                "並列数は{}以下にしてください: {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }
        if !(64..=4096).contains(&self.thumbnail_max_dimension) {
            return Err(GeoSnapError::Config(format!(
                "サムネイルサイズは64〜4096pxにしてください: {}",
                self.thumbnail_max_dimension
            )));
        }
        if !(1..=100).contains(&self.thumbnail_quality) {
            return Err(GeoSnapError::Config(format!(
                "JPEG品質は1〜100にしてください: {}",
                self.thumbnail_quality
            )));
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(GeoSnapError::Config("対象拡張子が空です".into()));
        }
        Ok(())
    }

    /// 実際に使う並列数
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.concurrency
        }
    }

    pub fn set_concurrency(&mut self, concurrency: usize) -> Result<()> {
        self.concurrency = concurrency;
        self.validate()?;
        self.save()
    }

    pub fn set_thumbnail_max_dimension(&mut self, px: u32) -> Result<()> {
        self.thumbnail_max_dimension = px;
        self.validate()?;
        self.save()
    }

    pub fn set_output_dir(&mut self, dir: PathBuf) -> Result<()> {
        self.output_dir = Some(dir);
        self.save()
    }

    pub fn set_project_name(&mut self, name: String) -> Result<()> {
        self.project_name = name;
        self.save()
    }

    pub fn set_generate_word(&mut self, enabled: bool) -> Result<()> {
        self.generate_word = enabled;
        self.save()
    }
}
