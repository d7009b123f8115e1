//! KMZ生成
//!
//! GPS付きレコード1件につきプレースマーク1つ。サムネイルは files/ 以下に同梱し、
//! 外部の画像は参照しない。方位がある写真には黄色の矢印を描く。

use super::escape_xml;
use crate::error::ExportError;
use crate::thumbnail::ThumbnailSet;
use geosnap_common::{Dataset, PhotoRecord};
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 地球半径（m）
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// 矢印の軸長・羽の長さ（m）と羽の角度（度）
const ARROW_SHAFT_M: f64 = 30.0;
const ARROW_WING_M: f64 = 8.0;
const ARROW_WING_ANGLE: f64 = 150.0;

/// KML色は aabbggrr
const PIN_COLOR: &str = "ff0000ff";
const ARROW_COLOR: &str = "ff00ffff";
const ARROW_WIDTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmzStats {
    pub placemarks: usize,
    pub images: usize,
}

/// アーカイブ内のサムネイル名
pub fn image_entry_name(sequence_number: u32) -> String {
    format!("files/thumb_{:04}.jpg", sequence_number)
}

/// 始点・距離・方位から終点を求める（球面）
pub fn destination_point(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> (f64, f64) {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    (lat2.to_degrees(), lon2.to_degrees())
}

/// 矢印の折れ線（始点 → 先端 → 羽1 → 先端 → 羽2）
fn arrow_coordinates(lat: f64, lon: f64, bearing: f64) -> Vec<(f64, f64)> {
    let (end_lat, end_lon) = destination_point(lat, lon, ARROW_SHAFT_M, bearing);
    let (w1_lat, w1_lon) =
        destination_point(end_lat, end_lon, ARROW_WING_M, bearing + ARROW_WING_ANGLE);
    let (w2_lat, w2_lon) =
        destination_point(end_lat, end_lon, ARROW_WING_M, bearing - ARROW_WING_ANGLE);

    vec![
        (lon, lat),
        (end_lon, end_lat),
        (w1_lon, w1_lat),
        (end_lon, end_lat),
        (w2_lon, w2_lat),
    ]
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

/// 吹き出しHTML（画像 + データ表）
fn balloon_html(record: &PhotoRecord, has_image: bool) -> String {
    let mut html = String::new();
    if has_image {
        html.push_str(&format!(
            r#"<img src="{}" style="max-width:400px; display:block; margin-bottom:10px;"/>"#,
            image_entry_name(record.sequence_number)
        ));
    }

    let rows = [
        ("Nº", record.sequence_number.to_string()),
        ("Archivo", record.file_name.clone()),
        ("DESCRIPCIÓN", record.description.clone()),
        ("Fecha", record.timestamp_text().unwrap_or_default()),
        ("Latitud", fmt_opt(record.latitude(), 6)),
        ("Longitud", fmt_opt(record.longitude(), 6)),
        ("Altitud [m]", fmt_opt(record.altitude, 2)),
        ("Rumbo [°]", fmt_opt(record.bearing, 1)),
    ];

    html.push_str(r#"<table border="1" style="border-collapse: collapse; width: 100%;">"#);
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td><b>{}</b></td><td>{}</td></tr>",
            label,
            escape_xml(&value)
        ));
    }
    html.push_str("</table>");
    html
}

fn point_xml(record: &PhotoRecord, lat: f64, lon: f64) -> String {
    match record.altitude {
        Some(alt) => format!("<Point><coordinates>{},{},{}</coordinates></Point>", lon, lat, alt),
        None => format!("<Point><coordinates>{},{}</coordinates></Point>", lon, lat),
    }
}

/// doc.kml を組み立てる（Nº順、GPSなしは除外）
pub fn build_kml(dataset: &Dataset, thumbnails: &ThumbnailSet, document_name: &str) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#);
    xml.push_str("\n<Document>\n");
    xml.push_str(&format!("  <name>{}</name>\n", escape_xml(document_name)));
    xml.push_str("  <Style id=\"foto\">\n");
    xml.push_str(&format!(
        "    <IconStyle><color>{}</color><scale>1.1</scale></IconStyle>\n",
        PIN_COLOR
    ));
    xml.push_str(&format!(
        "    <LineStyle><color>{}</color><width>{}</width></LineStyle>\n",
        ARROW_COLOR, ARROW_WIDTH
    ));
    xml.push_str("  </Style>\n");

    for record in dataset.with_coordinates() {
        let Some(coords) = record.coordinates else {
            continue;
        };
        let has_image = thumbnails.get(record.sequence_number).is_some();

        xml.push_str("  <Placemark>\n");
        xml.push_str(&format!(
            "    <name>Foto Nº {}</name>\n",
            record.sequence_number
        ));
        xml.push_str(&format!(
            "    <description><![CDATA[{}]]></description>\n",
            balloon_html(record, has_image)
        ));
        xml.push_str("    <styleUrl>#foto</styleUrl>\n");

        let point = point_xml(record, coords.latitude, coords.longitude);
        match record.bearing {
            Some(bearing) => {
                let line = arrow_coordinates(coords.latitude, coords.longitude, bearing)
                    .iter()
                    .map(|(lon, lat)| format!("{},{}", lon, lat))
                    .collect::<Vec<_>>()
                    .join(" ");
                xml.push_str("    <MultiGeometry>\n");
                xml.push_str(&format!("      {}\n", point));
                xml.push_str(&format!(
                    "      <LineString><tessellate>1</tessellate><coordinates>{}</coordinates></LineString>\n",
                    line
                ));
                xml.push_str("    </MultiGeometry>\n");
            }
            None => xml.push_str(&format!("    {}\n", point)),
        }
        xml.push_str("  </Placemark>\n");
    }

    xml.push_str("</Document>\n</kml>\n");
    xml
}

/// KMZを出力
pub fn build_kmz(
    dataset: &Dataset,
    thumbnails: &ThumbnailSet,
    output_path: &Path,
) -> Result<KmzStats, ExportError> {
    let placemarks = dataset.with_coordinates().count();
    if placemarks == 0 {
        return Err(ExportError::NothingToExport(
            "GPS付きの写真がありません".into(),
        ));
    }

    let document_name = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "GeoSnap".into());
    let kml = build_kml(dataset, thumbnails, &document_name);

    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // JPEGは圧縮済み
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("doc.kml", deflated)
        .map_err(|e| ExportError::write(output_path, e))?;
    zip.write_all(kml.as_bytes())
        .map_err(|e| ExportError::write(output_path, e))?;

    let mut images = 0;
    for record in dataset.with_coordinates() {
        if let Some(thumb) = thumbnails.get(record.sequence_number) {
            zip.start_file(image_entry_name(record.sequence_number), stored)
                .map_err(|e| ExportError::write(output_path, e))?;
            zip.write_all(&thumb.data)
                .map_err(|e| ExportError::write(output_path, e))?;
            images += 1;
        }
    }

    let bytes = zip
        .finish()
        .map_err(|e| ExportError::write(output_path, e))?
        .into_inner();
    std::fs::write(output_path, &bytes).map_err(|e| ExportError::write(output_path, e))?;

    debug!("KMZ: {}地点, 画像{}枚, {} bytes", placemarks, images, bytes.len());
    Ok(KmzStats { placemarks, images })
}
