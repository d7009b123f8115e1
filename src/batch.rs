//! バッチ抽出
//!
//! 画像パスを上限付きワーカープールに分配し、結果をチャネル経由で
//! 呼び出し側スレッド1本に集約する。進捗コールバックもこのスレッドからのみ呼ぶ。

use crate::config::Config;
use crate::error::{GeoSnapError, Result};
use crate::scanner::{self, exif};
use crossbeam_channel::unbounded;
use geosnap_common::{Dataset, ExtractionOutcome, RunSummary};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// キャンセルフラグ（複製しても同じフラグを共有する）
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 進捗（1件完了ごと）
#[derive(Debug)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub last: &'a ExtractionOutcome,
}

/// 並列数を指定してワーカープールを作成（0 = CPUコア数）
pub fn worker_pool(limit: usize) -> Result<ThreadPool> {
    let threads = if limit == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        limit
    };

    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("geosnap-worker-{}", i))
        .build()
        .map_err(|e| GeoSnapError::WorkerPool(e.to_string()))
}

/// 集約結果（入力順）
#[derive(Debug)]
pub struct Collected {
    pub outcomes: Vec<ExtractionOutcome>,
    pub cancelled: bool,
}

/// 任意の抽出関数で全パスを処理する
///
/// キャンセルは各タスク開始前に確認する。実行中のタスクは最後まで走る。
pub fn collect_outcomes<E, P>(
    paths: &[PathBuf],
    limit: usize,
    cancel: &CancelFlag,
    extract_fn: E,
    mut progress: P,
) -> Result<Collected>
where
    E: Fn(&Path) -> ExtractionOutcome + Sync,
    P: FnMut(&Progress<'_>),
{
    let pool = worker_pool(limit)?;
    let total = paths.len();
    let (tx, rx) = unbounded::<(usize, ExtractionOutcome)>();
    let mut slots: Vec<Option<ExtractionOutcome>> = (0..total).map(|_| None).collect();

    let pool = &pool;
    let extract_fn = &extract_fn;

    std::thread::scope(|scope| {
        scope.spawn(move || {
            pool.install(|| {
                paths
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, path)| {
                        if cancel.is_cancelled() {
                            return;
                        }
                        let outcome = extract_fn(path);
                        // 受信側が先に終わっていれば捨てる
                        let _ = tx.send((index, outcome));
                    });
            });
        });

        // 集約はこのスレッドのみ
        let mut completed = 0;
        for (index, outcome) in rx.iter() {
            completed += 1;
            progress(&Progress {
                completed,
                total,
                last: &outcome,
            });
            slots[index] = Some(outcome);
        }
    });

    let outcomes: Vec<_> = slots.into_iter().flatten().collect();
    let cancelled = cancel.is_cancelled() || outcomes.len() < total;

    Ok(Collected { outcomes, cancelled })
}

/// 順方向の処理結果
#[derive(Debug)]
pub struct ForwardReport {
    pub dataset: Dataset,
    pub summary: RunSummary,
}

#[derive(Debug)]
pub enum ForwardRun {
    Completed(ForwardReport),
    /// キャンセル時はDatasetを作らない
    Cancelled(RunSummary),
}

impl ForwardRun {
    pub fn summary(&self) -> &RunSummary {
        match self {
            ForwardRun::Completed(report) => &report.summary,
            ForwardRun::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ForwardRun::Cancelled(_))
    }

    pub fn into_report(self) -> Result<ForwardReport> {
        match self {
            ForwardRun::Completed(report) => Ok(report),
            ForwardRun::Cancelled(_) => Err(GeoSnapError::Cancelled),
        }
    }
}

/// 写真フォルダを読み込んでDatasetを作る
pub fn run_forward<P>(
    folder: &Path,
    config: &Config,
    cancel: &CancelFlag,
    progress: P,
) -> Result<ForwardRun>
where
    P: FnMut(&Progress<'_>),
{
    let images = scanner::scan_folder(folder, &config.extensions)?;
    if images.is_empty() {
        return Err(GeoSnapError::NoImagesFound(folder.display().to_string()));
    }

    let concurrency = config.effective_concurrency();
    info!("{}枚の写真を検出 (並列数 {})", images.len(), concurrency);

    let paths: Vec<PathBuf> = images.into_iter().map(|i| i.path).collect();
    let collected = collect_outcomes(&paths, concurrency, cancel, exif::extract, progress)?;

    let mut summary = RunSummary::new(paths.len());
    let mut records = Vec::with_capacity(collected.outcomes.len());
    for outcome in collected.outcomes {
        match outcome {
            ExtractionOutcome::Success(record) => {
                debug!("抽出完了: {}", record.file_name);
                records.push(record);
            }
            ExtractionOutcome::Failure { source, reason } => {
                warn!("スキップ {}: {}", source.display(), reason);
                summary.record_failure(source.display().to_string(), reason);
            }
        }
    }
    summary.succeeded = records.len();
    summary.without_gps = records.iter().filter(|r| !r.has_gps()).count();

    if collected.cancelled {
        info!("キャンセルされました: {}", summary);
        summary.cancelled = true;
        return Ok(ForwardRun::Cancelled(summary));
    }

    // ファイル名順に1から採番
    let dataset = Dataset::from_ordered(records);
    info!("抽出完了: {}", summary);

    Ok(ForwardRun::Completed(ForwardReport { dataset, summary }))
}
