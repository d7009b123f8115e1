//! Word写真帳（.docx）生成
//!
//! A4横、1ページ2×2の固定表。WordprocessingMLの最小構成を手組みで書き出す。

use super::escape_xml;
use crate::error::ExportError;
use crate::thumbnail::ThumbnailSet;
use geosnap_common::{Dataset, DocumentLayout, PhotoRecord};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const PLACEHOLDER_TEXT: &str = "Imagen no disponible";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="jpeg" ContentType="image/jpeg"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocxStats {
    pub pages: usize,
    pub images: usize,
    /// 画像なしで枠だけ残したレコード数
    pub placeholders: usize,
}

fn relationship_id(sequence_number: u32) -> String {
    format!("rIdImg{}", sequence_number)
}

fn media_name(sequence_number: u32) -> String {
    format!("image{}.jpeg", sequence_number)
}

/// "Figura n.-" に続くキャプション本文
pub fn caption_text(record: &PhotoRecord) -> String {
    let mut parts = vec![record.file_name.clone()];
    if let Some(ts) = record.timestamp_text() {
        parts.push(ts);
    }
    match record.coordinates {
        Some(c) => parts.push(format!("Lat: {:.6}, Lon: {:.6}", c.latitude, c.longitude)),
        None => parts.push("Sin GPS".to_string()),
    }
    parts.join(" | ")
}

fn caption_xml(record: &PhotoRecord) -> String {
    format!(
        concat!(
            r#"<w:p><w:pPr><w:spacing w:before="60" w:after="0"/><w:jc w:val="center"/></w:pPr>"#,
            r#"<w:r><w:rPr><w:b/><w:sz w:val="18"/></w:rPr><w:t xml:space="preserve">Figura {}.- </w:t></w:r>"#,
            r#"<w:r><w:rPr><w:sz w:val="18"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#
        ),
        record.sequence_number,
        escape_xml(&caption_text(record))
    )
}

fn drawing_xml(sequence_number: u32, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            r#"<w:p><w:pPr><w:spacing w:before="0" w:after="0"/><w:jc w:val="center"/></w:pPr>"#,
            r#"<w:r><w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Foto {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="{media}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ),
        cx = cx,
        cy = cy,
        id = sequence_number,
        media = media_name(sequence_number),
        rid = relationship_id(sequence_number),
    )
}

fn placeholder_xml() -> String {
    format!(
        concat!(
            r#"<w:p><w:pPr><w:spacing w:before="1200" w:after="1200"/><w:jc w:val="center"/></w:pPr>"#,
            r#"<w:r><w:rPr><w:i/><w:color w:val="808080"/></w:rPr><w:t>{}</w:t></w:r></w:p>"#
        ),
        PLACEHOLDER_TEXT
    )
}

/// 1ページ分の表（4スロット、空きは空段落）
fn page_table_xml(
    slots: &[Option<&PhotoRecord>],
    thumbnails: Option<&ThumbnailSet>,
    layout: &DocumentLayout,
) -> String {
    let mut xml = String::new();
    xml.push_str("<w:tbl><w:tblPr>");
    xml.push_str(&format!(
        r#"<w:tblW w:w="{}" w:type="dxa"/><w:jc w:val="center"/>"#,
        layout.cell_width * 2
    ));
    xml.push_str(concat!(
        "<w:tblBorders>",
        r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        "</w:tblBorders>",
        r#"<w:tblLayout w:type="fixed"/></w:tblPr>"#
    ));
    xml.push_str(&format!(
        r#"<w:tblGrid><w:gridCol w:w="{0}"/><w:gridCol w:w="{0}"/></w:tblGrid>"#,
        layout.cell_width
    ));

    for row in slots.chunks(2) {
        xml.push_str(&format!(
            r#"<w:tr><w:trPr><w:cantSplit/><w:trHeight w:val="{}" w:hRule="exact"/></w:trPr>"#,
            layout.row_height
        ));
        for slot in row {
            xml.push_str(&format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/><w:vAlign w:val="center"/></w:tcPr>"#,
                layout.cell_width
            ));
            match slot {
                Some(record) => {
                    let thumb = thumbnails.and_then(|t| t.get(record.sequence_number));
                    match thumb {
                        Some(thumb) => {
                            let (cx, cy) = layout.fit_within(thumb.width, thumb.height);
                            xml.push_str(&drawing_xml(record.sequence_number, cx, cy));
                        }
                        None => xml.push_str(&placeholder_xml()),
                    }
                    xml.push_str(&caption_xml(record));
                }
                // セルには段落が最低1つ必要
                None => xml.push_str("<w:p/>"),
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

/// Nº からページごとのスロット配置を作る（レコードのないページは含まない）
fn paginate<'a>(
    dataset: &'a Dataset,
    layout: &DocumentLayout,
) -> BTreeMap<u32, Vec<Option<&'a PhotoRecord>>> {
    let mut pages: BTreeMap<u32, Vec<Option<&PhotoRecord>>> = BTreeMap::new();
    for record in dataset {
        let (page, slot) = layout.slot_position(record.sequence_number);
        let slots = pages
            .entry(page)
            .or_insert_with(|| vec![None; layout.photos_per_page as usize]);
        slots[slot as usize] = Some(record);
    }
    pages
}

/// word/document.xml を組み立てる
pub fn build_document_xml(
    dataset: &Dataset,
    thumbnails: Option<&ThumbnailSet>,
    layout: &DocumentLayout,
) -> String {
    let pages = paginate(dataset, layout);

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(&format!("<w:document {}><w:body>", DOCUMENT_NAMESPACES));

    for (index, slots) in pages.values().enumerate() {
        if index > 0 {
            xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        xml.push_str(&page_table_xml(slots, thumbnails, layout));
    }

    // 表の直後で本文を終えない
    xml.push_str(r#"<w:p><w:pPr><w:spacing w:before="0" w:after="0"/></w:pPr></w:p>"#);
    xml.push_str(&format!(
        concat!(
            r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}" w:orient="landscape"/>"#,
            r#"<w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="0" w:footer="0" w:gutter="0"/>"#,
            "</w:sectPr>"
        ),
        layout.page_width,
        layout.page_height,
        m = layout.margin
    ));
    xml.push_str("</w:body></w:document>");
    xml
}

fn document_rels_xml(sequence_numbers: &[u32]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for &seq in sequence_numbers {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            relationship_id(seq),
            media_name(seq)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Word写真帳を出力
///
/// `thumbnails` が None の場合は画像を使えないため出力対象なしになる。
pub fn build_docx(
    dataset: &Dataset,
    thumbnails: Option<&ThumbnailSet>,
    output_path: &Path,
) -> Result<DocxStats, ExportError> {
    let with_image: Vec<u32> = match thumbnails {
        Some(set) => dataset
            .iter()
            .map(|r| r.sequence_number)
            .filter(|&seq| set.get(seq).is_some())
            .collect(),
        None => Vec::new(),
    };
    if with_image.is_empty() {
        return Err(ExportError::NothingToExport(
            "画像を表示できる写真がありません".into(),
        ));
    }

    let layout = DocumentLayout::a4_landscape();
    let document = build_document_xml(dataset, thumbnails, &layout);
    let pages = paginate(dataset, &layout).len();

    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", document),
        ("word/_rels/document.xml.rels", document_rels_xml(&with_image)),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(name, deflated)
            .map_err(|e| ExportError::write(output_path, e))?;
        zip.write_all(content.as_bytes())
            .map_err(|e| ExportError::write(output_path, e))?;
    }

    if let Some(set) = thumbnails {
        for &seq in &with_image {
            if let Some(thumb) = set.get(seq) {
                zip.start_file(format!("word/media/{}", media_name(seq)), stored)
                    .map_err(|e| ExportError::write(output_path, e))?;
                zip.write_all(&thumb.data)
                    .map_err(|e| ExportError::write(output_path, e))?;
            }
        }
    }

    let bytes = zip
        .finish()
        .map_err(|e| ExportError::write(output_path, e))?
        .into_inner();
    std::fs::write(output_path, &bytes).map_err(|e| ExportError::write(output_path, e))?;

    let stats = DocxStats {
        pages,
        images: with_image.len(),
        placeholders: dataset.len() - with_image.len(),
    };
    debug!("Word: {:?}", stats);
    Ok(stats)
}
