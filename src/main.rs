use clap::Parser;
use geosnap::batch::{CancelFlag, Progress};
use geosnap::pipeline::{self, ExcelRequest, PhotosRequest, PipelineOutcome, PipelineReport};
use geosnap::queue::JobQueue;
use geosnap::{cli, config, error, export, importer, logging};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use export::OutputSelection;
use geosnap_common::{ItemFailure, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}

fn update_progress(pb: &ProgressBar, progress: &Progress<'_>) {
    if pb.length() != Some(progress.total as u64) {
        pb.set_length(progress.total as u64);
    }
    pb.set_position(progress.completed as u64);
    pb.set_message(progress.last.describe());
}

fn print_report(report: &PipelineReport) {
    println!("✔ {}", report.summary);
    for failure in &report.summary.failed {
        println!("  ⚠ {}: {}", failure.source, failure.reason);
    }
    for failure in &report.thumbnail_failures {
        println!("  ⚠ 画像なしで出力 {}: {}", failure.source, failure.reason);
    }
    if !report.missing_photos.is_empty() {
        println!("  元写真が見つかりません ({}件):", report.missing_photos.len());
        for name in &report.missing_photos {
            println!("    - {}", name);
        }
    }
    for (label, result) in report.outputs.entries() {
        match result {
            Ok(path) => println!("  {}: {}", label, path.display()),
            Err(e) => println!("  {}: ⚠ {}", label, e),
        }
    }
}

fn write_summary<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    println!("✔ 実行結果を保存: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRecord<'a> {
    summary: &'a RunSummary,
    outputs: Vec<String>,
    missing_photos: &'a [String],
    thumbnail_failures: &'a [ItemFailure],
}

impl<'a> RunRecord<'a> {
    fn from_outcome(outcome: &'a PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Completed(report) => Self {
                summary: &report.summary,
                outputs: report
                    .outputs
                    .outputs()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
                missing_photos: &report.missing_photos,
                thumbnail_failures: &report.thumbnail_failures,
            },
            PipelineOutcome::Cancelled(summary) => Self {
                summary,
                outputs: Vec::new(),
                missing_photos: &[],
                thumbnail_failures: &[],
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;
    let cancel = CancelFlag::new();

    match cli.command {
        Commands::Photos {
            folders,
            output,
            name,
            word,
            jobs,
            thumb_size,
            summary,
        } => {
            println!("📸 geosnap - 写真モード\n");

            // コマンドライン指定はこの実行のみ有効
            let mut config = config;
            if let Some(jobs) = jobs {
                config.concurrency = jobs;
            }
            if let Some(px) = thumb_size {
                config.thumbnail_max_dimension = px;
            }
            config.validate()?;

            let selection = OutputSelection::forward(word || config.generate_word);
            let requests: Vec<PhotosRequest> = folders
                .iter()
                .map(|folder| PhotosRequest {
                    folder: folder.clone(),
                    output_dir: output.clone(),
                    project_name: name.clone(),
                    outputs: selection,
                })
                .collect();

            if let [request] = requests.as_slice() {
                let pb = create_progress_bar();
                let outcome = pipeline::process_photos(request, &config, &cancel, |p| {
                    update_progress(&pb, p)
                })?;
                pb.finish_and_clear();

                match &outcome {
                    PipelineOutcome::Completed(report) => print_report(report),
                    PipelineOutcome::Cancelled(run) => println!("処理がキャンセルされました: {}", run),
                }
                if let Some(path) = summary {
                    write_summary(&path, &RunRecord::from_outcome(&outcome))?;
                }
            } else {
                let mut queue = JobQueue::new();
                for request in requests {
                    queue.add_job(request);
                }

                let pb = create_progress_bar();
                let result = queue.process_all(
                    &config,
                    &cancel,
                    |index, total, job| {
                        pb.reset();
                        pb.println(format!("[{}/{}] {}", index, total, job.label()));
                    },
                    |p| update_progress(&pb, p),
                );
                pb.finish_and_clear();

                for line in &result.details {
                    println!("  {}", line);
                }
                println!(
                    "\n✔ {}件中 完了 {} / 失敗 {} / キャンセル {}",
                    result.total, result.completed, result.failed, result.cancelled
                );
                if let Some(path) = summary {
                    write_summary(&path, &result)?;
                }
            }

            println!("\n✅ 完了");
        }

        Commands::Excel {
            input,
            photos,
            output,
            name,
            word,
            summary,
        } => {
            println!("📄 geosnap - Excelモード\n");

            let request = ExcelRequest {
                spreadsheet: input,
                photos_dir: photos,
                output_dir: output,
                project_name: name,
                outputs: OutputSelection::reverse(word || config.generate_word),
            };
            let outcome = pipeline::process_spreadsheet(&request, &config, &cancel)?;

            match &outcome {
                PipelineOutcome::Completed(report) => print_report(report),
                PipelineOutcome::Cancelled(run) => println!("処理がキャンセルされました: {}", run),
            }
            if let Some(path) = summary {
                write_summary(&path, &RunRecord::from_outcome(&outcome))?;
            }

            println!("\n✅ 完了");
        }

        Commands::Check { input, photos } => {
            let missing = importer::check_missing_files(&input, photos.as_deref(), &config)?;
            if missing.is_empty() {
                println!("✔ すべての元写真が見つかりました");
            } else {
                println!("元写真が見つかりません ({}件):", missing.len());
                for name in &missing {
                    println!("  - {}", name);
                }
            }
        }

        Commands::Config {
            show,
            set_concurrency,
            set_thumb_size,
            set_output,
            set_project,
            word,
        } => {
            let mut config = config;

            if let Some(n) = set_concurrency {
                config.set_concurrency(n)?;
                println!("✔ 並列数を設定しました: {}", n);
            }
            if let Some(px) = set_thumb_size {
                config.set_thumbnail_max_dimension(px)?;
                println!("✔ サムネイルサイズを設定しました: {}px", px);
            }
            if let Some(dir) = set_output {
                println!("✔ 出力フォルダを設定しました: {}", dir.display());
                config.set_output_dir(dir)?;
            }
            if let Some(project) = set_project {
                println!("✔ プロジェクト名を設定しました: {}", project);
                config.set_project_name(project)?;
            }
            if let Some(enabled) = word {
                config.set_generate_word(enabled)?;
                println!("✔ Word生成: {}", if enabled { "有効" } else { "無効" });
            }

            if show {
                println!("設定:");
                println!(
                    "  並列数: {}",
                    if config.concurrency == 0 {
                        format!("自動 ({})", config.effective_concurrency())
                    } else {
                        config.concurrency.to_string()
                    }
                );
                println!(
                    "  サムネイル: {}px / 品質 {}",
                    config.thumbnail_max_dimension, config.thumbnail_quality
                );
                println!("  対象拡張子: {}", config.extensions.join(", "));
                println!("  Word生成: {}", if config.generate_word { "有効" } else { "無効" });
                println!(
                    "  出力フォルダ: {}",
                    config
                        .output_dir
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "入力と同じ".into())
                );
                println!("  プロジェクト名: {}", config.project_name);
            }
        }
    }

    Ok(())
}
