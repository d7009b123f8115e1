//! EXIFメタデータ抽出
//!
//! 1ファイルを読み、GPS・撮影日時・向き・カメラ情報を PhotoRecord に正規化する。
//! 失敗はバッチ全体を止めず、ExtractionOutcome::Failure として返す。

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use geosnap_common::{Coordinates, ExtractionOutcome, FailureReason, Orientation, PhotoRecord};
use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind};
use std::path::Path;
use tracing::{debug, warn};

/// EXIFの日時書式
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// HEIF系のftypブランド
const HEIF_BRANDS: &[&[u8]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Jpeg,
    Png,
    Tiff,
    WebP,
    Heif,
}

/// マジックバイトからコンテナ形式を判定
fn sniff_container(bytes: &[u8]) -> Option<Container> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(Container::Jpeg)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(Container::Png)
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some(Container::Tiff)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(Container::WebP)
    } else if bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && HEIF_BRANDS.contains(&&bytes[8..12])
    {
        Some(Container::Heif)
    } else {
        None
    }
}

/// 度分秒 → 10進度（南緯・西経は負）
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: char) -> f64 {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    match reference.to_ascii_uppercase() {
        'S' | 'W' => -value,
        _ => value,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 1ファイルからメタデータを抽出する
///
/// Nº は仮に0。確定はバッチ側で行う。
pub fn extract(path: &Path) -> ExtractionOutcome {
    let failure = |reason: FailureReason| {
        debug!("抽出失敗 {}: {}", path.display(), reason);
        ExtractionOutcome::Failure {
            source: path.to_path_buf(),
            reason,
        }
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return failure(FailureReason::Unreadable(e.to_string())),
    };
    if bytes.is_empty() {
        return failure(FailureReason::Unreadable("empty file".into()));
    }

    let container = match sniff_container(&bytes) {
        Some(c) => c,
        None => return failure(FailureReason::UnsupportedFormat("unknown container".into())),
    };

    // ヘッダからサイズのみ取得（ピクセルはデコードしない）
    let dimensions = if container == Container::Heif {
        None
    } else {
        let reader = match image::ImageReader::new(Cursor::new(&bytes)).with_guessed_format() {
            Ok(r) => r,
            Err(e) => return failure(FailureReason::Unreadable(e.to_string())),
        };
        match reader.into_dimensions() {
            Ok(dims) => Some(dims),
            Err(e) => return failure(FailureReason::CorruptMetadata(e.to_string())),
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut record = PhotoRecord::new(file_name);
    record.source_path = Some(path.to_path_buf());
    record.dimensions = dimensions;

    let exif = match Reader::new().read_from_container(&mut Cursor::new(&bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            debug!("EXIFなし: {}", record.file_name);
            return ExtractionOutcome::Success(record);
        }
        Err(exif::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            return failure(FailureReason::CorruptMetadata(e.to_string()));
        }
        Err(exif::Error::Io(e)) => return failure(FailureReason::Unreadable(e.to_string())),
        Err(e) => return failure(FailureReason::CorruptMetadata(e.to_string())),
    };

    record.coordinates = get_coordinates(&exif);
    record.altitude = get_altitude(&exif);
    record.bearing = get_rational(&exif, Tag::GPSImgDirection);
    record.captured_at = get_datetime(&exif, &record.file_name);
    record.orientation = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .map(Orientation::from_exif)
        .unwrap_or_default();
    record.camera = get_camera(&exif);

    ExtractionOutcome::Success(record)
}

/// 向きだけを読む（逆インポート時のサムネイル補正用）
pub fn read_orientation(path: &Path) -> Orientation {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Orientation::Normal,
    };
    Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .map(Orientation::from_exif)
        .unwrap_or_default()
}

/// ASCII値の先頭文字列
fn get_ascii(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
        Value::Ascii(values) => values.first().map(|v| {
            String::from_utf8_lossy(v)
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string()
        }),
        _ => None,
    })
}

fn get_rational(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
        Value::Rational(v) if !v.is_empty() && v[0].denom != 0 => Some(v[0].to_f64()),
        _ => None,
    })
}

/// 度分秒の3つ組
fn get_dms(exif: &exif::Exif, tag: Tag) -> Option<(f64, f64, f64)> {
    exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
        Value::Rational(v) if v.len() >= 3 && v.iter().take(3).all(|r| r.denom != 0) => {
            Some((v[0].to_f64(), v[1].to_f64(), v[2].to_f64()))
        }
        _ => None,
    })
}

fn get_coordinates(exif: &exif::Exif) -> Option<Coordinates> {
    let (lat_d, lat_m, lat_s) = get_dms(exif, Tag::GPSLatitude)?;
    let (lon_d, lon_m, lon_s) = get_dms(exif, Tag::GPSLongitude)?;
    let lat_ref = get_ascii(exif, Tag::GPSLatitudeRef)
        .and_then(|s| s.chars().next())
        .unwrap_or('N');
    let lon_ref = get_ascii(exif, Tag::GPSLongitudeRef)
        .and_then(|s| s.chars().next())
        .unwrap_or('E');

    let coordinates = Coordinates::new(
        dms_to_decimal(lat_d, lat_m, lat_s, lat_ref),
        dms_to_decimal(lon_d, lon_m, lon_s, lon_ref),
    );

    // (0, 0) は測位エラー
    if coordinates.is_null_island() {
        None
    } else {
        Some(coordinates)
    }
}

fn get_altitude(exif: &exif::Exif) -> Option<f64> {
    let altitude = get_rational(exif, Tag::GPSAltitude)?;
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .map(|f| matches!(&f.value, Value::Byte(v) if v.first() == Some(&1)))
        .unwrap_or(false);

    Some(round2(if below_sea_level { -altitude } else { altitude }))
}

/// DateTimeOriginal → DateTime の順で探す
fn get_datetime(exif: &exif::Exif, file_name: &str) -> Option<NaiveDateTime> {
    let text = get_ascii(exif, Tag::DateTimeOriginal)
        .filter(|s| !s.is_empty())
        .or_else(|| get_ascii(exif, Tag::DateTime).filter(|s| !s.is_empty()))?;

    match NaiveDateTime::parse_from_str(&text, EXIF_DATETIME_FORMAT) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("日時を解析できません {}: {:?} ({})", file_name, text, e);
            None
        }
    }
}

fn get_camera(exif: &exif::Exif) -> Option<String> {
    let make = get_ascii(exif, Tag::Make).unwrap_or_default();
    let model = get_ascii(exif, Tag::Model).unwrap_or_default();
    let camera = format!("{} {}", make, model).trim().to_string();
    if camera.is_empty() {
        None
    } else {
        Some(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dms_to_decimal() {
        let lat = dms_to_decimal(40.0, 26.0, 46.0, 'N');
        let lon = dms_to_decimal(79.0, 58.0, 56.0, 'W');
        assert!((lat - 40.446111).abs() < 1e-5);
        assert!((lon - -79.982222).abs() < 1e-5);
        assert!(dms_to_decimal(12.0, 0.0, 0.0, 's') < 0.0);
        assert!(dms_to_decimal(77.0, 0.0, 0.0, 'E') > 0.0);
    }

    #[test]
    fn test_sniff_container() {
        assert_eq!(sniff_container(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(Container::Jpeg));
        assert_eq!(sniff_container(b"\x89PNG\r\n\x1a\n...."), Some(Container::Png));
        assert_eq!(sniff_container(b"II*\0rest"), Some(Container::Tiff));
        assert_eq!(sniff_container(b"RIFF\0\0\0\0WEBPVP8 "), Some(Container::WebP));
        assert_eq!(sniff_container(b"\0\0\0\x18ftypheic\0\0\0\0"), Some(Container::Heif));
        assert_eq!(sniff_container(b"\0\0\0\x18ftypisom\0\0\0\0"), None);
        assert_eq!(sniff_container(b"hello world"), None);
    }

    #[test]
    fn test_sniff_all_heif_brands() {
        for brand in HEIF_BRANDS {
            let mut header = b"\0\0\0\x18ftyp".to_vec();
            header.extend_from_slice(brand);
            assert_eq!(sniff_container(&header), Some(Container::Heif), "{:?}", brand);
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(123.456), 123.46);
        assert_eq!(round2(-5.004), -5.0);
    }

    #[test]
    fn test_extract_empty_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        fs::write(&path, b"").unwrap();

        match extract(&path) {
            ExtractionOutcome::Failure { reason, .. } => {
                assert!(matches!(reason, FailureReason::Unreadable(_)))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_extract_missing_file_is_unreadable() {
        let outcome = extract(Path::new("/nonexistent/foto.jpg"));
        assert!(matches!(
            outcome,
            ExtractionOutcome::Failure { reason: FailureReason::Unreadable(_), .. }
        ));
    }

    #[test]
    fn test_extract_garbage_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        fs::write(&path, b"this is not an image at all").unwrap();

        assert!(matches!(
            extract(&path),
            ExtractionOutcome::Failure { reason: FailureReason::UnsupportedFormat(_), .. }
        ));
    }

    #[test]
    fn test_extract_truncated_jpeg_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cut.jpg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();

        assert!(matches!(
            extract(&path),
            ExtractionOutcome::Failure { reason: FailureReason::CorruptMetadata(_), .. }
        ));
    }

    #[test]
    fn test_extract_png_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image::RgbImage::new(30, 20).save(&path).unwrap();

        match extract(&path) {
            ExtractionOutcome::Success(record) => {
                assert_eq!(record.file_name, "plain.png");
                assert_eq!(record.dimensions, Some((30, 20)));
                assert!(record.coordinates.is_none());
                assert!(record.captured_at.is_none());
                assert_eq!(record.orientation, Orientation::Normal);
                assert_eq!(record.sequence_number, 0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
