//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use geosnap::config::Config;
use geosnap::error::{ExportError, GeoSnapError};
use geosnap::importer;
use geosnap::scanner;
use std::path::Path;
use tempfile::tempdir;

fn extensions() -> Vec<String> {
    Config::default().extensions
}

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), &extensions());
    assert!(matches!(result, Err(GeoSnapError::FolderNotFound(_))));
}

/// 画像のないフォルダは空のVec（エラーにするのはパイプライン側）
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path(), &extensions()).unwrap();
    assert!(result.is_empty());
}

/// 存在しないExcel
#[test]
fn test_reverse_missing_spreadsheet() {
    let path = Path::new("/nonexistent/datos.xlsx");
    let result = importer::run_reverse(path, None, &Config::default());
    assert!(matches!(result, Err(GeoSnapError::FileNotFound(_))));
}

/// Excelではないファイル
#[test]
fn test_reverse_not_a_spreadsheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("falso.xlsx");
    std::fs::write(&path, "esto no es un libro").unwrap();

    let result = importer::run_reverse(&path, None, &Config::default());
    assert!(matches!(result, Err(GeoSnapError::Spreadsheet(_))));
}

/// 必須列が欠けたExcel
#[test]
fn test_reverse_missing_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("incompleto.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Nº").unwrap();
    sheet.write_string(0, 1, "Archivo").unwrap();
    sheet.write_string(0, 2, "Latitud").unwrap();
    sheet.write_number(1, 0, 1).unwrap();
    sheet.write_string(1, 1, "a.jpg").unwrap();
    workbook.save(&path).unwrap();

    match importer::run_reverse(&path, None, &Config::default()) {
        Err(GeoSnapError::MissingColumns(columns)) => {
            assert!(columns.iter().any(|c| c.contains("Longitud")));
            assert!(!columns.iter().any(|c| c.contains("Latitud")));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

/// Displayが空でない
#[test]
fn test_error_display() {
    let errors = vec![
        GeoSnapError::Config("テスト設定エラー".to_string()),
        GeoSnapError::FileNotFound("test.xlsx".to_string()),
        GeoSnapError::FolderNotFound("/path/to/folder".to_string()),
        GeoSnapError::NoImagesFound("フォルダ".to_string()),
        GeoSnapError::MissingColumns(vec!["Latitud".into(), "Longitud".into()]),
        GeoSnapError::Spreadsheet("壊れています".to_string()),
        GeoSnapError::Cancelled,
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }

    let err = GeoSnapError::MissingColumns(vec!["Latitud".into(), "Longitud".into()]);
    assert!(err.to_string().contains("Latitud, Longitud"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: GeoSnapError = io_err.into();

    assert!(matches!(err, GeoSnapError::Io(_)));
    assert!(err.to_string().contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: GeoSnapError = json_err.into();

    assert!(matches!(err, GeoSnapError::JsonParse(_)));
}

/// common::Errorは透過的に表示される
#[test]
fn test_common_error_transparent() {
    let common_err = geosnap_common::Error::DuplicateSequence(7);
    let expected = common_err.to_string();
    let err: GeoSnapError = common_err.into();

    assert!(matches!(err, GeoSnapError::Common(_)));
    assert_eq!(err.to_string(), expected);
}

/// 出力エラーの変換
#[test]
fn test_export_error_conversion() {
    let err: GeoSnapError = ExportError::write(Path::new("/tmp/x.kmz"), "disk full").into();
    assert!(matches!(err, GeoSnapError::Export(ExportError::WriteError { .. })));
    assert!(err.to_string().contains("/tmp/x.kmz"));
    assert!(err.to_string().contains("disk full"));
}
