//! レイアウト設定モジュール
//!
//! mm基準のレイアウト定義（Excel列・Word写真帳の共通定義）

// ============================================
// Excel（写真一覧シート）
// ============================================

/// シート名
pub const SHEET_NAME: &str = "Listado de Fotos";

/// シート列定義
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetColumn {
    pub key: &'static str,
    pub header: &'static str,
    /// Excel列幅（文字数単位）
    pub width: f64,
}

/// 固定列（A列から順に配置）
pub const SHEET_COLUMNS: &[SheetColumn] = &[
    SheetColumn { key: "number", header: "Nº", width: 8.0 },
    SheetColumn { key: "file", header: "Archivo", width: 30.0 },
    SheetColumn { key: "description", header: "DESCRIPCIÓN", width: 50.0 },
    SheetColumn { key: "timestamp", header: "Fecha", width: 22.0 },
    SheetColumn { key: "latitude", header: "Latitud", width: 15.0 },
    SheetColumn { key: "longitude", header: "Longitud", width: 15.0 },
    SheetColumn { key: "altitude", header: "Altitud [m]", width: 12.0 },
    SheetColumn { key: "bearing", header: "Rumbo [°]", width: 10.0 },
    SheetColumn { key: "path", header: "Ruta", width: 60.0 },
];

/// キーから列番号（0始まり）を取得
pub fn column_index(key: &str) -> Option<u16> {
    SHEET_COLUMNS
        .iter()
        .position(|c| c.key == key)
        .map(|i| i as u16)
}

// ============================================
// Word（写真帳、A4横）
// ============================================

/// A4横サイズ（mm）
pub const PAGE_WIDTH_MM: f32 = 297.0;
pub const PAGE_HEIGHT_MM: f32 = 210.0;

/// 余白（mm、0.5インチ）
pub const MARGIN_MM: f32 = 12.7;

/// 1ページあたりの写真数（2×2）
pub const PHOTOS_PER_PAGE: u32 = 4;
pub const GRID_COLUMNS: u32 = 2;
pub const GRID_ROWS: u32 = PHOTOS_PER_PAGE / GRID_COLUMNS;

/// 利用可能領域（mm）
pub const USABLE_WIDTH_MM: f32 = PAGE_WIDTH_MM - MARGIN_MM * 2.0; // 271.6mm
pub const USABLE_HEIGHT_MM: f32 = PAGE_HEIGHT_MM - MARGIN_MM * 2.0; // 184.6mm

/// セルサイズ（mm）。行高さはページ送り用の段落分を差し引く
pub const CELL_WIDTH_MM: f32 = USABLE_WIDTH_MM / GRID_COLUMNS as f32; // 135.8mm
pub const CELL_HEIGHT_MM: f32 = (USABLE_HEIGHT_MM - 8.0) / GRID_ROWS as f32; // 88.3mm

/// 画像枠（mm）。残りはキャプション2行分
pub const IMAGE_BOX_WIDTH_MM: f32 = 125.0;
pub const IMAGE_BOX_HEIGHT_MM: f32 = 72.0;

// ============================================
// 変換係数
// ============================================

/// mm → twip (1mm = 1440/25.4 twip)
pub const MM_TO_TWIPS: f32 = 1440.0 / 25.4;

/// mm → EMU (DrawingML)
pub const MM_TO_EMU: f32 = 36000.0;

pub fn mm_to_twips(mm: f32) -> u32 {
    (mm * MM_TO_TWIPS).round() as u32
}

pub fn mm_to_emu(mm: f32) -> u64 {
    (mm * MM_TO_EMU).round() as u64
}

// ============================================
// レイアウト設定構造体
// ============================================

/// Word写真帳レイアウト（twip/EMU換算済み）
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    /// ページ幅（twip）
    pub page_width: u32,
    /// ページ高さ（twip）
    pub page_height: u32,
    /// 余白（twip）
    pub margin: u32,
    /// 表セル幅（twip）
    pub cell_width: u32,
    /// 表行高さ（twip、固定）
    pub row_height: u32,
    /// 画像枠（EMU）
    pub image_box_width: u64,
    pub image_box_height: u64,
    pub photos_per_page: u32,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self::a4_landscape()
    }
}

impl DocumentLayout {
    /// A4横・2×2
    pub fn a4_landscape() -> Self {
        Self {
            page_width: 16838,
            page_height: 11906,
            margin: mm_to_twips(MARGIN_MM),
            cell_width: mm_to_twips(CELL_WIDTH_MM),
            row_height: mm_to_twips(CELL_HEIGHT_MM),
            image_box_width: mm_to_emu(IMAGE_BOX_WIDTH_MM),
            image_box_height: mm_to_emu(IMAGE_BOX_HEIGHT_MM),
            photos_per_page: PHOTOS_PER_PAGE,
        }
    }

    /// Nº から (ページ, スロット) を求める（どちらも0始まり）
    pub fn slot_position(&self, sequence_number: u32) -> (u32, u32) {
        let index = sequence_number.saturating_sub(1);
        (index / self.photos_per_page, index % self.photos_per_page)
    }

    /// 縦横比を保ったまま画像枠に収まるサイズ（EMU）
    pub fn fit_within(&self, width_px: u32, height_px: u32) -> (u64, u64) {
        if width_px == 0 || height_px == 0 {
            return (self.image_box_width, self.image_box_height);
        }
        let scale = f64::min(
            self.image_box_width as f64 / width_px as f64,
            self.image_box_height as f64 / height_px as f64,
        );
        (
            (width_px as f64 * scale).round() as u64,
            (height_px as f64 * scale).round() as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_columns() {
        assert_eq!(SHEET_COLUMNS.len(), 9);
        assert_eq!(SHEET_COLUMNS[0].header, "Nº");
        assert_eq!(column_index("latitude"), Some(4));
        assert_eq!(column_index("path"), Some(8));
        assert_eq!(column_index("unknown"), None);
    }

    #[test]
    fn test_a4_landscape_twips() {
        let layout = DocumentLayout::a4_landscape();
        assert!(layout.page_width > layout.page_height);
        assert_eq!(layout.margin, 720);
        // 2セル分 + 余白がページ幅に収まる
        assert!(layout.cell_width * 2 + layout.margin * 2 <= layout.page_width);
        assert!(layout.row_height * 2 + layout.margin * 2 <= layout.page_height);
    }

    #[test]
    fn test_slot_position() {
        let layout = DocumentLayout::default();
        assert_eq!(layout.slot_position(1), (0, 0));
        assert_eq!(layout.slot_position(4), (0, 3));
        assert_eq!(layout.slot_position(5), (1, 0));
        assert_eq!(layout.slot_position(10), (2, 1));
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        let layout = DocumentLayout::default();

        // 縦長は高さ基準
        let (w, h) = layout.fit_within(600, 800);
        assert_eq!(h, layout.image_box_height);
        assert!(w < layout.image_box_width);

        // 横長は幅基準
        let (w, h) = layout.fit_within(4000, 1000);
        assert_eq!(w, layout.image_box_width);
        assert!(h < layout.image_box_height);
    }
}
