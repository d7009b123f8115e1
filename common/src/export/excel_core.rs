//! Excel生成（共通ライブラリ）
//!
//! layout.rs の列定義を使用して写真一覧シートを生成

use crate::layout::{SHEET_COLUMNS, SHEET_NAME};
use crate::types::{Dataset, PhotoRecord};
use rust_xlsxwriter::*;

/// セル値
enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

/// フィールド値を取得
fn get_field_value(record: &PhotoRecord, key: &str) -> CellValue {
    let number = |v: Option<f64>| v.map(CellValue::Number).unwrap_or(CellValue::Blank);
    let text = |v: String| {
        if v.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(v)
        }
    };

    match key {
        "number" => CellValue::Number(record.sequence_number as f64),
        "file" => text(record.file_name.clone()),
        "description" => text(record.description.clone()),
        "timestamp" => text(record.timestamp_text().unwrap_or_default()),
        "latitude" => number(record.latitude()),
        "longitude" => number(record.longitude()),
        "altitude" => number(record.altitude),
        "bearing" => number(record.bearing),
        "path" => text(
            record
                .source_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ),
        _ => CellValue::Blank,
    }
}

/// 数値書式（列ごと）
fn num_format(key: &str) -> Option<&'static str> {
    match key {
        "number" => Some("0"),
        "latitude" | "longitude" => Some("0.000000"),
        "altitude" | "bearing" => Some("0.00"),
        _ => None,
    }
}

/// Excelをバッファに生成
///
/// 1レコード1行、Nº順。GPSなしのレコードも出力する。
/// 空のDatasetはヘッダー行のみのシートになる。
pub fn generate_excel_buffer(dataset: &Dataset) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    // フォーマット定義
    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_border(FormatBorder::Thin);

    let cell_format = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    // ヘッダー行
    for (col, column) in SHEET_COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .set_column_width(col, column.width)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
        worksheet
            .write_string_with_format(0, col, column.header, &header_format)
            .map_err(|e| format!("ヘッダー書き込みエラー: {}", e))?;
    }
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;

    // データ行
    for (index, record) in dataset.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, column) in SHEET_COLUMNS.iter().enumerate() {
            let col = col as u16;
            match get_field_value(record, column.key) {
                CellValue::Text(value) => {
                    worksheet
                        .write_string_with_format(row, col, &value, &cell_format)
                        .map_err(|e| format!("値書き込みエラー: {}", e))?;
                }
                CellValue::Number(value) => {
                    let format = match num_format(column.key) {
                        Some(f) => cell_format.clone().set_num_format(f),
                        None => cell_format.clone(),
                    };
                    worksheet
                        .write_number_with_format(row, col, value, &format)
                        .map_err(|e| format!("値書き込みエラー: {}", e))?;
                }
                CellValue::Blank => {
                    worksheet
                        .write_blank(row, col, &cell_format)
                        .map_err(|e| format!("空セル書き込みエラー: {}", e))?;
                }
            }
        }
    }

    // バッファに書き出し
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;

    #[test]
    fn test_empty_dataset_produces_workbook() {
        let buffer = generate_excel_buffer(&Dataset::default()).expect("生成失敗");
        // xlsx は zip コンテナ
        assert_eq!(&buffer[..2], b"PK");
    }

    #[test]
    fn test_field_values() {
        let mut record = PhotoRecord::new("foto.jpg");
        record.sequence_number = 3;
        record.coordinates = Some(Coordinates::new(-12.05, -77.04));

        assert!(matches!(get_field_value(&record, "number"), CellValue::Number(n) if n == 3.0));
        assert!(matches!(
            get_field_value(&record, "longitude"),
            CellValue::Number(n) if n == -77.04
        ));
        assert!(matches!(get_field_value(&record, "altitude"), CellValue::Blank));
        assert!(matches!(get_field_value(&record, "description"), CellValue::Blank));
        assert!(matches!(
            get_field_value(&record, "file"),
            CellValue::Text(ref s) if s == "foto.jpg"
        ));
    }
}
