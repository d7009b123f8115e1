//! Excel逆インポート
//!
//! 以前に出力した（または手で編集した）Excelから Dataset を再構築する。
//! 座標・日時はExcelの値が正で、元画像からは向きだけを読む。

use crate::config::Config;
use crate::error::{GeoSnapError, Result};
use crate::scanner::{self, exif};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta};
use geosnap_common::{Coordinates, Dataset, PhotoRecord, RunSummary};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 文字列セルで受け付ける日時書式
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Excelシリアル値の有効範囲（1900-01-01 〜 9999-12-31）
const EXCEL_SERIAL_RANGE: std::ops::Range<f64> = 1.0..2_958_466.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Number,
    FileName,
    Description,
    Timestamp,
    Latitude,
    Longitude,
    Altitude,
    Bearing,
    Path,
}

impl Column {
    /// 部分一致の判定順（"ruta de archivo" を Path に寄せる）
    const ALL: [Column; 9] = [
        Column::Path,
        Column::Number,
        Column::FileName,
        Column::Description,
        Column::Timestamp,
        Column::Latitude,
        Column::Longitude,
        Column::Altitude,
        Column::Bearing,
    ];

    const REQUIRED: [Column; 6] = [
        Column::Number,
        Column::FileName,
        Column::Latitude,
        Column::Longitude,
        Column::Altitude,
        Column::Timestamp,
    ];

    /// 正規化済みの別名（スペイン語・英語）
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Number => &["no", "n", "num", "nro", "numero", "number", "id_foto", "#"],
            Column::FileName => &["archivo", "file", "filename", "file_name", "nombre", "foto"],
            Column::Description => &["descripcion", "description", "notas", "notes"],
            Column::Timestamp => &["fecha", "date", "datetime", "timestamp", "fecha_hora"],
            Column::Latitude => &["latitud", "lat", "latitude"],
            Column::Longitude => &["longitud", "lon", "long", "lng", "longitude"],
            Column::Altitude => &["altitud", "alt", "altitude", "elevacion", "elevation"],
            Column::Bearing => &["rumbo", "azimut", "azimuth", "bearing", "direccion"],
            Column::Path => &["ruta", "path", "filepath", "ruta_archivo"],
        }
    }

    /// エラー表示用の列名
    pub fn label(&self) -> &'static str {
        match self {
            Column::Number => "Nº",
            Column::FileName => "Archivo",
            Column::Description => "DESCRIPCIÓN",
            Column::Timestamp => "Fecha",
            Column::Latitude => "Latitud",
            Column::Longitude => "Longitud",
            Column::Altitude => "Altitud",
            Column::Bearing => "Rumbo",
            Column::Path => "Ruta",
        }
    }
}

/// 見出しを正規化（小文字化・アクセント除去・[単位]除去）
pub fn normalize_header(text: &str) -> String {
    let without_units: String = {
        let mut out = String::new();
        let mut depth = 0usize;
        for c in text.chars() {
            match c {
                '[' | '(' => depth += 1,
                ']' | ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 => out.push(c),
                _ => {}
            }
        }
        out
    };

    without_units
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'º' | '°' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            ' ' | '-' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '.')
        .to_string()
}

/// 見出しから列を特定（完全一致 → 4文字以上の別名の部分一致）
fn match_column(header: &str) -> Option<Column> {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return None;
    }

    Column::ALL
        .iter()
        .find(|c| c.aliases().contains(&normalized.as_str()))
        .or_else(|| {
            Column::ALL.iter().find(|c| {
                c.aliases()
                    .iter()
                    .any(|a| a.len() >= 4 && normalized.contains(a))
            })
        })
        .copied()
}

/// 見出し行から列番号を割り当てる（同じ列は先勝ち）
pub fn map_headers(header_row: &[Data]) -> Result<HashMap<Column, usize>> {
    let mut map = HashMap::new();
    for (index, cell) in header_row.iter().enumerate() {
        let text = cell_text(cell);
        if let Some(column) = match_column(&text) {
            map.entry(column).or_insert(index);
        }
    }
    debug!("見出しマップ: {:?}", map);

    let missing: Vec<String> = Column::REQUIRED
        .iter()
        .filter(|c| !map.contains_key(c))
        .map(|c| c.label().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(GeoSnapError::MissingColumns(missing));
    }

    Ok(map)
}

/// 行単位の検証エラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowIssue {
    #[error("Nºが不正です: {0:?}")]
    InvalidSequence(String),

    #[error("Nºが重複しています: {0}")]
    DuplicateSequence(u32),

    #[error("ファイル名がありません")]
    MissingFileName,

    #[error("座標が数値ではありません: {0:?}")]
    NonNumericCoordinate(String),

    #[error("緯度が範囲外です (±90): {0}")]
    LatitudeOutOfRange(f64),

    #[error("経度が範囲外です (±180): {0}")]
    LongitudeOutOfRange(f64),

    #[error("緯度と経度の片方しかありません")]
    IncompleteCoordinates,
}

/// 取り込めなかった行
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    /// Excel上の行番号（1始まり）
    pub row: u32,
    pub issue: RowIssue,
}

/// 取り込み済みの行
#[derive(Debug, Clone)]
pub struct ImportedRow {
    pub row: u32,
    pub record: PhotoRecord,
    /// 「Ruta」列の値
    pub path_hint: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ImportedRows {
    pub rows: Vec<ImportedRow>,
    pub rejected: Vec<RowRejection>,
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn is_blank(cell: Option<&Data>) -> bool {
    match cell {
        None | Some(Data::Empty) => true,
        Some(Data::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// 数式インジェクション対策（=, @, タブ, CR で始まる文字列を ' でエスケープ）
pub fn sanitize_text(value: &str) -> String {
    let trimmed = value.trim_start_matches(' ');
    if trimmed.starts_with(['=', '@', '\t', '\r']) {
        warn!("危険なセル値をエスケープ: {:?}", value.chars().take(20).collect::<String>());
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

/// 数値セル（文字列の小数点カンマも可）
fn parse_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn parse_sequence(cell: Option<&Data>) -> std::result::Result<u32, RowIssue> {
    let cell = cell.unwrap_or(&Data::Empty);
    let invalid = || RowIssue::InvalidSequence(cell_text(cell));
    let value = parse_number(cell).ok_or_else(invalid)?;
    if value < 1.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(value as u32)
}

/// Excelシリアル値 → 日時（1899-12-30 起点）
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

pub fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_timestamp(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()),
        Data::Float(f) => excel_serial_to_datetime(*f),
        Data::Int(i) => excel_serial_to_datetime(*i as f64),
        Data::DateTimeIso(s) | Data::String(s) => parse_timestamp_text(s),
        _ => None,
    }
}

/// 座標（両方空なら None、片方のみはエラー）
fn parse_coordinates(
    lat: Option<&Data>,
    lon: Option<&Data>,
) -> std::result::Result<Option<Coordinates>, RowIssue> {
    match (is_blank(lat), is_blank(lon)) {
        (true, true) => return Ok(None),
        (false, false) => {}
        _ => return Err(RowIssue::IncompleteCoordinates),
    }

    let parse = |cell: Option<&Data>| {
        let cell = cell.unwrap_or(&Data::Empty);
        parse_number(cell).ok_or_else(|| RowIssue::NonNumericCoordinate(cell_text(cell)))
    };
    let latitude = parse(lat)?;
    let longitude = parse(lon)?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(RowIssue::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(RowIssue::LongitudeOutOfRange(longitude));
    }
    Ok(Some(Coordinates::new(latitude, longitude)))
}

/// 1行をレコードに変換
fn import_row(
    row: &[Data],
    columns: &HashMap<Column, usize>,
) -> std::result::Result<(PhotoRecord, Option<PathBuf>), RowIssue> {
    let cell = |c: Column| columns.get(&c).and_then(|&i| row.get(i));
    let text = |c: Column| cell(c).map(cell_text).filter(|s| !s.is_empty());

    let sequence_number = parse_sequence(cell(Column::Number))?;
    let file_name = text(Column::FileName).ok_or(RowIssue::MissingFileName)?;
    let coordinates = parse_coordinates(cell(Column::Latitude), cell(Column::Longitude))?;

    let optional_number = |c: Column| match cell(c) {
        Some(value) if !is_blank(Some(value)) => {
            let parsed = parse_number(value);
            if parsed.is_none() {
                warn!("{}の値を無視します: {:?}", c.label(), cell_text(value));
            }
            parsed
        }
        _ => None,
    };

    let record = PhotoRecord {
        sequence_number,
        file_name: sanitize_text(&file_name),
        coordinates,
        altitude: optional_number(Column::Altitude),
        bearing: optional_number(Column::Bearing),
        captured_at: cell(Column::Timestamp).and_then(parse_timestamp),
        description: text(Column::Description)
            .map(|d| sanitize_text(&d))
            .unwrap_or_default(),
        ..PhotoRecord::default()
    };
    let path_hint = text(Column::Path).map(PathBuf::from);

    Ok((record, path_hint))
}

/// 見出し行＋データ行を取り込む
///
/// `header_row_number` は見出し行のExcel行番号（1始まり）。
/// 空行は黙って読み飛ばし、不正な行は理由付きで除外する。
pub fn import_rows<'a, I>(mut rows: I, header_row_number: u32) -> Result<ImportedRows>
where
    I: Iterator<Item = &'a [Data]>,
{
    let header = rows.next().unwrap_or(&[]);
    let columns = map_headers(header)?;

    let mut imported = ImportedRows::default();
    let mut seen = HashSet::new();

    for (offset, row) in rows.enumerate() {
        let row_number = header_row_number + 1 + offset as u32;
        if row.iter().all(|c| is_blank(Some(c))) {
            continue;
        }

        let result = import_row(row, &columns).and_then(|(record, hint)| {
            if seen.insert(record.sequence_number) {
                Ok((record, hint))
            } else {
                Err(RowIssue::DuplicateSequence(record.sequence_number))
            }
        });

        match result {
            Ok((record, path_hint)) => imported.rows.push(ImportedRow {
                row: row_number,
                record,
                path_hint,
            }),
            Err(issue) => {
                warn!("{}行目を除外: {}", row_number, issue);
                imported.rejected.push(RowRejection {
                    row: row_number,
                    issue,
                });
            }
        }
    }

    Ok(imported)
}

/// 元画像の探索先
pub struct SourceResolver {
    spreadsheet_dir: PathBuf,
    photos_dir: Option<PathBuf>,
    index: HashMap<String, PathBuf>,
}

impl SourceResolver {
    pub fn new(spreadsheet: &Path, photos_dir: Option<&Path>, config: &Config) -> Result<Self> {
        let photos_dir = match photos_dir {
            Some(dir) if !dir.is_dir() => {
                return Err(GeoSnapError::FolderNotFound(dir.display().to_string()))
            }
            Some(dir) => Some(dir.canonicalize()?),
            None => None,
        };
        let index = photos_dir
            .as_deref()
            .map(|dir| scanner::index_photos(dir, &config.extensions))
            .unwrap_or_default();
        let spreadsheet_dir = spreadsheet
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        Ok(Self {
            spreadsheet_dir,
            photos_dir,
            index,
        })
    }

    /// 「Ruta」→ 写真フォルダ索引 → Excelと同じフォルダ の順で探す
    pub fn resolve(&self, file_name: &str, path_hint: Option<&Path>) -> Option<PathBuf> {
        if let Some(hint) = path_hint {
            if hint.is_file() {
                return Some(hint.to_path_buf());
            }
        }

        // パス区切りを含む名前でもファイル名部分だけを使う
        let name = Path::new(file_name).file_name()?;

        if let Some(dir) = &self.photos_dir {
            let key = name.to_string_lossy().to_lowercase();
            if let Some(found) = self.index.get(&key) {
                match found.canonicalize() {
                    Ok(real) if real.starts_with(dir) => return Some(real),
                    Ok(real) => warn!("写真フォルダ外のパスを無視: {}", real.display()),
                    Err(e) => warn!("パスを解決できません {}: {}", found.display(), e),
                }
            }
        }

        let beside = self.spreadsheet_dir.join(name);
        if beside.is_file() {
            return Some(beside);
        }
        None
    }
}

/// 逆インポート結果
#[derive(Debug)]
pub struct ReverseImport {
    pub dataset: Dataset,
    pub rejected: Vec<RowRejection>,
    /// 元画像が見つからなかったファイル名（Nº順）
    pub missing_photos: Vec<String>,
    pub summary: RunSummary,
}

/// 最初のシートを読み込む
fn read_first_sheet(spreadsheet: &Path) -> Result<ImportedRows> {
    if !spreadsheet.is_file() {
        return Err(GeoSnapError::FileNotFound(spreadsheet.display().to_string()));
    }

    let mut workbook =
        open_workbook_auto(spreadsheet).map_err(|e| GeoSnapError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GeoSnapError::Spreadsheet("シートがありません".into()))?
        .map_err(|e| GeoSnapError::Spreadsheet(e.to_string()))?;

    let header_row_number = range.start().map(|(row, _)| row + 1).unwrap_or(1);
    import_rows(range.rows(), header_row_number)
}

/// Excelから Dataset を再構築する
pub fn run_reverse(
    spreadsheet: &Path,
    photos_dir: Option<&Path>,
    config: &Config,
) -> Result<ReverseImport> {
    info!("Excel読み込み: {}", spreadsheet.display());
    let imported = read_first_sheet(spreadsheet)?;
    let resolver = SourceResolver::new(spreadsheet, photos_dir, config)?;

    let mut summary = RunSummary::new(imported.rows.len() + imported.rejected.len());
    for rejection in &imported.rejected {
        summary.record_failure(format!("fila {}", rejection.row), &rejection.issue);
    }

    let mut records = Vec::with_capacity(imported.rows.len());
    for ImportedRow {
        mut record,
        path_hint,
        ..
    } in imported.rows
    {
        record.source_path = resolver.resolve(&record.file_name, path_hint.as_deref());
        if let Some(path) = &record.source_path {
            // 向き補正は元画像のEXIFから
            record.orientation = exif::read_orientation(path);
            if record.captured_at.is_none() {
                record.captured_at = modified_time(path);
            }
        }
        records.push(record);
    }

    // 行順ではなくNº順
    let dataset = Dataset::from_numbered(records)?;
    let missing_photos: Vec<String> = dataset
        .iter()
        .filter(|r| r.source_path.is_none())
        .map(|r| r.file_name.clone())
        .collect();

    summary.succeeded = dataset.len();
    summary.without_gps = dataset.without_gps_count();
    info!(
        "逆インポート完了: {} (元画像なし {}件)",
        summary,
        missing_photos.len()
    );

    Ok(ReverseImport {
        dataset,
        rejected: imported.rejected,
        missing_photos,
        summary,
    })
}

/// ファイル更新日時（日時列が空の場合の代替）
fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// 元画像が見つからない行のファイル名を返す（事前チェック）
pub fn check_missing_files(
    spreadsheet: &Path,
    photos_dir: Option<&Path>,
    config: &Config,
) -> Result<Vec<String>> {
    let imported = read_first_sheet(spreadsheet)?;
    let resolver = SourceResolver::new(spreadsheet, photos_dir, config)?;

    let mut rows = imported.rows;
    rows.sort_by_key(|r| r.record.sequence_number);

    Ok(rows
        .iter()
        .filter(|r| {
            resolver
                .resolve(&r.record.file_name, r.path_hint.as_deref())
                .is_none()
        })
        .map(|r| r.record.file_name.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn header() -> Vec<Data> {
        vec![
            s("Nº"),
            s("Archivo"),
            s("DESCRIPCIÓN"),
            s("Fecha"),
            s("Latitud"),
            s("Longitud"),
            s("Altitud [m]"),
            s("Rumbo [°]"),
        ]
    }

    fn row(n: f64, file: &str, lat: Data, lon: Data) -> Vec<Data> {
        vec![
            Data::Float(n),
            s(file),
            Data::Empty,
            s("2024-03-15 09:30:00"),
            lat,
            lon,
            Data::Float(2500.5),
            Data::Empty,
        ]
    }

    fn import(rows: &[Vec<Data>]) -> Result<ImportedRows> {
        import_rows(rows.iter().map(|r| r.as_slice()), 1)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Nº"), "no");
        assert_eq!(normalize_header("DESCRIPCIÓN"), "descripcion");
        assert_eq!(normalize_header("Altitud [m]"), "altitud");
        assert_eq!(normalize_header("Rumbo [°]"), "rumbo");
        assert_eq!(normalize_header("  Fecha Hora "), "fecha_hora");
    }

    #[test]
    fn test_match_column_aliases() {
        assert_eq!(match_column("Nº"), Some(Column::Number));
        assert_eq!(match_column("numero"), Some(Column::Number));
        assert_eq!(match_column("File"), Some(Column::FileName));
        assert_eq!(match_column("LAT"), Some(Column::Latitude));
        assert_eq!(match_column("lng"), Some(Column::Longitude));
        assert_eq!(match_column("Longitud"), Some(Column::Longitude));
        assert_eq!(match_column("Ruta de archivo"), Some(Column::Path));
        assert_eq!(match_column("Fecha de captura"), Some(Column::Timestamp));
        assert_eq!(match_column("Bearing"), Some(Column::Bearing));
        assert_eq!(match_column("otra cosa"), None);
        assert_eq!(match_column(""), None);
    }

    #[test]
    fn test_missing_required_columns() {
        let header = vec![s("Archivo"), s("Latitud"), s("Longitud")];
        match map_headers(&header) {
            Err(GeoSnapError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Nº", "Altitud", "Fecha"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_reordered_columns() {
        let rows = vec![
            vec![s("lon"), s("lat"), s("alt"), s("date"), s("file"), s("id_foto")],
            vec![
                Data::Float(-77.0),
                Data::Float(-12.0),
                Data::Empty,
                Data::Empty,
                s("a.jpg"),
                Data::Int(1),
            ],
        ];
        let imported = import(&rows).unwrap();
        assert_eq!(imported.rows.len(), 1);
        let record = &imported.rows[0].record;
        assert_eq!(record.coordinates, Some(Coordinates::new(-12.0, -77.0)));
        assert_eq!(record.altitude, None);
    }

    #[test]
    fn test_valid_rows_and_rejections() {
        let rows = vec![
            header(),
            row(1.0, "a.jpg", Data::Float(40.4), Data::Float(-3.7)),
            row(2.0, "b.jpg", s("91"), Data::Float(0.0)),
            row(3.0, "c.jpg", s("10,5"), s("-20,25")),
            row(4.0, "d.jpg", Data::Float(10.0), Data::Empty),
            row(5.0, "e.jpg", s("abc"), Data::Float(1.0)),
            row(6.0, "", Data::Float(1.0), Data::Float(1.0)),
            row(1.0, "dup.jpg", Data::Float(1.0), Data::Float(1.0)),
            row(0.0, "zero.jpg", Data::Float(1.0), Data::Float(1.0)),
            row(7.0, "f.jpg", Data::Float(1.0), Data::Float(181.0)),
            vec![Data::Empty; 8],
            row(8.0, "nogps.jpg", Data::Empty, Data::Empty),
        ];
        let imported = import(&rows).unwrap();

        let accepted: Vec<u32> = imported.rows.iter().map(|r| r.record.sequence_number).collect();
        assert_eq!(accepted, vec![1, 3, 8]);
        assert_eq!(
            imported.rows[1].record.coordinates,
            Some(Coordinates::new(10.5, -20.25))
        );
        assert!(imported.rows[2].record.coordinates.is_none());

        let issues: Vec<(u32, RowIssue)> = imported
            .rejected
            .iter()
            .map(|r| (r.row, r.issue.clone()))
            .collect();
        assert_eq!(
            issues,
            vec![
                (3, RowIssue::LatitudeOutOfRange(91.0)),
                (5, RowIssue::IncompleteCoordinates),
                (6, RowIssue::NonNumericCoordinate("abc".into())),
                (7, RowIssue::MissingFileName),
                (8, RowIssue::DuplicateSequence(1)),
                (9, RowIssue::InvalidSequence("0".into())),
                (10, RowIssue::LongitudeOutOfRange(181.0)),
            ]
        );
    }

    #[test]
    fn test_row_values() {
        let rows = vec![header(), row(1.0, "=cmd.jpg", Data::Float(1.0), Data::Float(2.0))];
        let imported = import(&rows).unwrap();
        let record = &imported.rows[0].record;

        assert_eq!(record.file_name, "'=cmd.jpg");
        assert_eq!(record.altitude, Some(2500.5));
        assert_eq!(record.timestamp_text().as_deref(), Some("2024-03-15 09:30:00"));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(sanitize_text("@x"), "'@x");
        assert_eq!(sanitize_text("\tx"), "'\tx");
        assert_eq!(sanitize_text("-12.5"), "-12.5");
        assert_eq!(sanitize_text("foto.jpg"), "foto.jpg");
    }

    #[test]
    fn test_parse_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31)
            .and_then(|d| d.and_hms_opt(12, 34, 56));
        assert_eq!(parse_timestamp_text("2024-01-31 12:34:56"), expected);
        assert_eq!(parse_timestamp_text("31/01/2024 12:34:56"), expected);
        assert_eq!(parse_timestamp_text("2024:01:31 12:34:56"), expected);
        assert_eq!(
            parse_timestamp_text("31/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 31).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(parse_timestamp_text("ayer"), None);

        // 45322.5 = 2024-01-31 12:00:00
        assert_eq!(
            excel_serial_to_datetime(45322.5),
            NaiveDate::from_ymd_opt(2024, 1, 31).and_then(|d| d.and_hms_opt(12, 0, 0))
        );
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(1e9), None);
    }

    #[test]
    fn test_resolver_lookup_order() {
        let dir = tempdir().unwrap();
        let photos = dir.path().join("fotos");
        std::fs::create_dir_all(photos.join("sub")).unwrap();
        std::fs::write(photos.join("sub").join("IMG_1.JPG"), b"x").unwrap();
        std::fs::write(dir.path().join("beside.jpg"), b"x").unwrap();
        let sheet = dir.path().join("reporte.xlsx");

        let resolver = SourceResolver::new(&sheet, Some(&photos), &Config::default()).unwrap();

        let found = resolver.resolve("img_1.jpg", None).unwrap();
        assert!(found.ends_with("IMG_1.JPG"));
        // 区切り付きの名前もファイル名部分で探す
        assert!(resolver.resolve("../../etc/img_1.jpg", None).is_some());
        assert_eq!(
            resolver.resolve("beside.jpg", None),
            Some(dir.path().join("beside.jpg"))
        );
        let hint = photos.join("sub").join("IMG_1.JPG");
        assert_eq!(resolver.resolve("other.jpg", Some(&hint)), Some(hint.clone()));
        assert_eq!(resolver.resolve("nada.jpg", None), None);
    }

    #[test]
    fn test_resolver_missing_photos_dir() {
        let result = SourceResolver::new(
            Path::new("x.xlsx"),
            Some(Path::new("/nonexistent/fotos")),
            &Config::default(),
        );
        assert!(matches!(result, Err(GeoSnapError::FolderNotFound(_))));
    }

    #[test]
    fn test_run_reverse_missing_file() {
        let result = run_reverse(Path::new("/nonexistent/a.xlsx"), None, &Config::default());
        assert!(matches!(result, Err(GeoSnapError::FileNotFound(_))));
    }
}
