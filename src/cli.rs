use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geosnap")]
#[command(about = "位置情報付き写真から KMZ・Excel・Word 写真帳を生成するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真フォルダから KMZ と Excel（と Word）を生成
    Photos {
        /// 写真フォルダ（複数指定時は順に処理）
        #[arg(required = true)]
        folders: Vec<PathBuf>,

        /// 出力フォルダ（デフォルト: 設定値、なければ写真フォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プロジェクト名（出力ファイル名）
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Word写真帳も生成
        #[arg(long)]
        word: bool,

        /// 並列数（0 = CPUコア数）
        #[arg(short = 'j', long)]
        jobs: Option<usize>,

        /// サムネイル長辺（px）
        #[arg(long)]
        thumb_size: Option<u32>,

        /// 実行結果のJSONを書き出す
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// 編集済みExcelから KMZ（と Word）を再生成
    Excel {
        /// 入力Excelファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 元写真のフォルダ（デフォルト: Excelと同じフォルダ）
        #[arg(short, long)]
        photos: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プロジェクト名（出力ファイル名）
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Word写真帳も生成
        #[arg(long)]
        word: bool,

        /// 実行結果のJSONを書き出す
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Excelの各行に対応する元写真があるか確認
    Check {
        /// 入力Excelファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 元写真のフォルダ
        #[arg(short, long)]
        photos: Option<PathBuf>,
    },

    /// 設定を管理
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// 並列数を設定（0 = CPUコア数）
        #[arg(long)]
        set_concurrency: Option<usize>,

        /// サムネイル長辺を設定（px）
        #[arg(long)]
        set_thumb_size: Option<u32>,

        /// 既定の出力フォルダを設定
        #[arg(long)]
        set_output: Option<PathBuf>,

        /// 既定のプロジェクト名を設定
        #[arg(long)]
        set_project: Option<String>,

        /// Word写真帳を既定で生成するか
        #[arg(long)]
        word: Option<bool>,
    },
}
