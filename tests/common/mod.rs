//! 統合テスト用の画像生成ヘルパー

#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// 埋め込むGPS/撮影情報
#[derive(Debug, Clone, Default)]
pub struct ExifSpec {
    /// (緯度, 経度) 10進度
    pub coordinates: Option<(f64, f64)>,
    pub altitude: Option<f64>,
    pub bearing: Option<f64>,
    /// "YYYY:MM:DD HH:MM:SS"
    pub datetime: Option<&'static str>,
    pub orientation: Option<u16>,
}

impl ExifSpec {
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_none()
            && self.altitude.is_none()
            && self.bearing.is_none()
            && self.datetime.is_none()
            && self.orientation.is_none()
    }
}

fn solid_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    })
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, 80)
        .encode_image(&solid_image(width, height))
        .unwrap();
    data
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    solid_image(width, height)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn rational(value: f64, denom: u32) -> Rational {
    Rational {
        num: (value * denom as f64).round() as u32,
        denom,
    }
}

fn dms(decimal: f64) -> Value {
    let abs = decimal.abs();
    let degrees = abs.trunc();
    let minutes = ((abs - degrees) * 60.0).trunc();
    let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
    Value::Rational(vec![
        rational(degrees, 1),
        rational(minutes, 1),
        rational(seconds, 10_000),
    ])
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

/// TIFF形式のEXIFブロックを作る
pub fn exif_block(spec: &ExifSpec) -> Vec<u8> {
    let mut fields = Vec::new();
    if let Some((lat, lon)) = spec.coordinates {
        fields.push(field(Tag::GPSLatitudeRef, ascii(if lat < 0.0 { "S" } else { "N" })));
        fields.push(field(Tag::GPSLatitude, dms(lat)));
        fields.push(field(Tag::GPSLongitudeRef, ascii(if lon < 0.0 { "W" } else { "E" })));
        fields.push(field(Tag::GPSLongitude, dms(lon)));
    }
    if let Some(alt) = spec.altitude {
        fields.push(field(
            Tag::GPSAltitudeRef,
            Value::Byte(vec![if alt < 0.0 { 1 } else { 0 }]),
        ));
        fields.push(field(Tag::GPSAltitude, Value::Rational(vec![rational(alt.abs(), 100)])));
    }
    if let Some(bearing) = spec.bearing {
        fields.push(field(Tag::GPSImgDirectionRef, ascii("T")));
        fields.push(field(Tag::GPSImgDirection, Value::Rational(vec![rational(bearing, 100)])));
    }
    if let Some(dt) = spec.datetime {
        fields.push(field(Tag::DateTimeOriginal, ascii(dt)));
    }
    if let Some(orientation) = spec.orientation {
        fields.push(field(Tag::Orientation, Value::Short(vec![orientation])));
    }

    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    buf.into_inner()
}

/// SOI直後にAPP1(Exif)セグメントを差し込む
pub fn jpeg_with_exif(width: u32, height: u32, spec: &ExifSpec) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);
    if spec.is_empty() {
        return jpeg;
    }
    let tiff = exif_block(spec);

    let mut app1 = Vec::with_capacity(tiff.len() + 10);
    app1.extend_from_slice(&[0xFF, 0xE1]);
    let length = (tiff.len() + 8) as u16;
    app1.extend_from_slice(&length.to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32, spec: &ExifSpec) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, jpeg_with_exif(width, height, spec)).unwrap();
    path
}

/// SOIのみの壊れたJPEG
pub fn write_corrupt_jpeg(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F']).unwrap();
    path
}
