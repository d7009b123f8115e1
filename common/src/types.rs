//! 写真レコードの型定義
//!
//! 順方向（写真フォルダ → 出力）と逆方向（Excel → 出力）で共有される型:
//! - PhotoRecord: 1枚の写真の正規化済みメタデータ
//! - Dataset: Nº順に並んだPhotoRecordの不変コレクション
//! - ExtractionOutcome: 1ファイル分の抽出結果（成功/失敗）
//! - RunSummary: 実行ごとの集計（成功数・失敗理由・キャンセル有無）

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// レポートに出力する日時の書式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 緯度・経度（10進度、南緯・西経は負）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// (0.0, 0.0) はGPS測位エラーとして扱う
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// EXIF Orientation（1〜8）
///
/// 表示補正にのみ使用し、出力には保存しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Rotate90FlipH,
    Rotate90,
    Rotate270FlipH,
    Rotate270,
}

impl Orientation {
    /// EXIF値から変換（範囲外は補正なし）
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Rotate90FlipH,
            6 => Orientation::Rotate90,
            7 => Orientation::Rotate270FlipH,
            8 => Orientation::Rotate270,
            _ => Orientation::Normal,
        }
    }

    /// 補正後に幅と高さが入れ替わるか
    pub fn swaps_dimensions(&self) -> bool {
        matches!(
            self,
            Orientation::Rotate90FlipH
                | Orientation::Rotate90
                | Orientation::Rotate270FlipH
                | Orientation::Rotate270
        )
    }
}

/// 写真1枚分の正規化済みレコード
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    /// Nº（1始まり、Dataset内で一意）
    pub sequence_number: u32,

    /// 表示用ファイル名（Excelの「Archivo」列）
    pub file_name: String,

    /// 元画像のパス（逆モードでは見つからない場合がある）
    #[serde(default)]
    pub source_path: Option<PathBuf>,

    #[serde(default)]
    pub coordinates: Option<Coordinates>,

    /// 標高（m、海面下は負）
    #[serde(default)]
    pub altitude: Option<f64>,

    /// 撮影方位（度）
    #[serde(default)]
    pub bearing: Option<f64>,

    #[serde(default)]
    pub captured_at: Option<NaiveDateTime>,

    #[serde(skip)]
    pub orientation: Orientation,

    #[serde(default)]
    pub description: String,

    /// "Make Model"
    #[serde(default)]
    pub camera: Option<String>,

    /// コンテナヘッダから読んだピクセルサイズ
    #[serde(default)]
    pub dimensions: Option<(u32, u32)>,
}

impl PhotoRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    pub fn has_gps(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    pub fn timestamp_text(&self) -> Option<String> {
        self.captured_at
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
    }
}

/// Nº昇順の不変レコード集合
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    records: Vec<PhotoRecord>,
}

impl Dataset {
    /// 並び順どおりに1から連番を振る（順方向モード）
    pub fn from_ordered(records: Vec<PhotoRecord>) -> Self {
        let records = records
            .into_iter()
            .zip(1u32..)
            .map(|(mut record, number)| {
                record.sequence_number = number;
                record
            })
            .collect();
        Self { records }
    }

    /// 既存のNºでソートする（逆方向モード）
    ///
    /// Nºが0または重複している場合はエラー。
    pub fn from_numbered(mut records: Vec<PhotoRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.sequence_number == 0 {
                return Err(Error::InvalidSequence(0));
            }
            if !seen.insert(record.sequence_number) {
                return Err(Error::DuplicateSequence(record.sequence_number));
            }
        }
        records.sort_by_key(|r| r.sequence_number);
        Ok(Self { records })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhotoRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, sequence_number: u32) -> Option<&PhotoRecord> {
        self.records
            .binary_search_by_key(&sequence_number, |r| r.sequence_number)
            .ok()
            .map(|i| &self.records[i])
    }

    /// GPS付きレコードのみ（KMZ用）
    pub fn with_coordinates(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.records.iter().filter(|r| r.has_gps())
    }

    pub fn without_gps_count(&self) -> usize {
        self.records.iter().filter(|r| !r.has_gps()).count()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a PhotoRecord;
    type IntoIter = std::slice::Iter<'a, PhotoRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// 1ファイル分の抽出失敗理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum FailureReason {
    #[error("unreadable file: {0}")]
    Unreadable(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),
}

/// 1ファイル分の抽出結果
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Success(PhotoRecord),
    Failure { source: PathBuf, reason: FailureReason },
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    /// 進捗表示用の短い説明
    pub fn describe(&self) -> String {
        match self {
            ExtractionOutcome::Success(record) if record.has_gps() => {
                format!("{} (GPS)", record.file_name)
            }
            ExtractionOutcome::Success(record) => format!("{} (sin GPS)", record.file_name),
            ExtractionOutcome::Failure { source, reason } => {
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| source.display().to_string());
                format!("{}: {}", name, reason)
            }
        }
    }
}

/// 失敗した1項目（写真1枚またはExcel 1行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub source: String,
    pub reason: String,
}

/// 実行サマリー（完了・一部失敗・キャンセルのいずれでも作成される）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub without_gps: usize,
    pub failed: Vec<ItemFailure>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_failure(&mut self, source: impl Into<String>, reason: impl fmt::Display) {
        self.failed.push(ItemFailure {
            source: source.into(),
            reason: reason.to_string(),
        });
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total, {} ok ({} without GPS), {} failed",
            self.total,
            self.succeeded,
            self.without_gps,
            self.failed.len()
        )?;
        if self.cancelled {
            write!(f, ", cancelled")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, number: u32) -> PhotoRecord {
        PhotoRecord {
            sequence_number: number,
            ..PhotoRecord::new(name)
        }
    }

    #[test]
    fn test_from_ordered_assigns_dense_numbers() {
        let dataset = Dataset::from_ordered(vec![
            PhotoRecord::new("a.jpg"),
            PhotoRecord::new("b.jpg"),
            PhotoRecord::new("c.jpg"),
        ]);
        let numbers: Vec<u32> = dataset.iter().map(|r| r.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(dataset.get(2).map(|r| r.file_name.as_str()), Some("b.jpg"));
    }

    #[test]
    fn test_from_numbered_sorts_by_sequence() {
        let dataset = Dataset::from_numbered(vec![
            record("c.jpg", 12),
            record("a.jpg", 3),
            record("b.jpg", 7),
        ])
        .expect("Dataset作成失敗");
        let names: Vec<&str> = dataset.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert!(dataset.get(5).is_none());
    }

    #[test]
    fn test_from_numbered_rejects_duplicates() {
        let result = Dataset::from_numbered(vec![record("a.jpg", 1), record("b.jpg", 1)]);
        assert!(matches!(result, Err(Error::DuplicateSequence(1))));

        let result = Dataset::from_numbered(vec![record("a.jpg", 0)]);
        assert!(matches!(result, Err(Error::InvalidSequence(0))));
    }

    #[test]
    fn test_orientation_from_exif() {
        assert_eq!(Orientation::from_exif(1), Orientation::Normal);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotate90);
        assert_eq!(Orientation::from_exif(8), Orientation::Rotate270);
        assert_eq!(Orientation::from_exif(0), Orientation::Normal);
        assert_eq!(Orientation::from_exif(42), Orientation::Normal);
        assert_eq!(Orientation::from_exif(5), Orientation::Rotate90FlipH);
        assert!(Orientation::Rotate90.swaps_dimensions());
        assert!(!Orientation::Rotate180.swaps_dimensions());
    }

    #[test]
    fn test_gps_helpers() {
        let mut r = PhotoRecord::new("gps.jpg");
        assert!(!r.has_gps());
        assert_eq!(r.latitude(), None);

        r.coordinates = Some(Coordinates::new(40.5, -3.7));
        assert!(r.has_gps());
        assert_eq!(r.longitude(), Some(-3.7));
        assert!(Coordinates::new(0.0, 0.0).is_null_island());
    }

    #[test]
    fn test_timestamp_text() {
        let mut r = PhotoRecord::new("t.jpg");
        r.captured_at =
            NaiveDateTime::parse_from_str("2024:05:01 10:30:00", "%Y:%m:%d %H:%M:%S").ok();
        assert_eq!(r.timestamp_text().as_deref(), Some("2024-05-01 10:30:00"));
    }

    #[test]
    fn test_outcome_describe() {
        let failure = ExtractionOutcome::Failure {
            source: PathBuf::from("/fotos/roto.jpg"),
            reason: FailureReason::CorruptMetadata("truncated".into()),
        };
        assert!(!failure.is_success());
        assert_eq!(failure.describe(), "roto.jpg: corrupt metadata: truncated");
    }

    #[test]
    fn test_run_summary_serialize() {
        let mut summary = RunSummary::new(3);
        summary.succeeded = 2;
        summary.record_failure("bad.jpg", FailureReason::Unreadable("empty file".into()));

        let json = serde_json::to_string(&summary).expect("シリアライズ失敗");
        assert!(json.contains("\"withoutGps\":0"));
        assert!(json.contains("\"source\":\"bad.jpg\""));
        assert!(json.contains("unreadable file: empty file"));
        assert_eq!(summary.to_string(), "3 total, 2 ok (0 without GPS), 1 failed");
    }
}
