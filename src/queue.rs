//! 複数フォルダの順次処理キュー

use crate::batch::{CancelFlag, Progress};
use crate::config::Config;
use crate::pipeline::{self, PhotosRequest, PipelineOutcome};
use geosnap_common::RunSummary;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "待機中"),
            JobStatus::Running => write!(f, "処理中"),
            JobStatus::Completed => write!(f, "完了"),
            JobStatus::Failed(e) => write!(f, "失敗: {}", e),
            JobStatus::Cancelled => write!(f, "キャンセル"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub request: PhotosRequest,
    pub status: JobStatus,
}

impl BatchJob {
    pub fn label(&self) -> String {
        self.request
            .project_name
            .clone()
            .unwrap_or_else(|| self.request.folder.display().to_string())
    }
}

/// キュー全体の結果
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub details: Vec<String>,
    /// 完了・キャンセルしたジョブの抽出集計
    pub runs: Vec<RunSummary>,
}

#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<BatchJob>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// ジョブを追加してインデックスを返す
    pub fn add_job(&mut self, request: PhotosRequest) -> usize {
        self.jobs.push(BatchJob {
            request,
            status: JobStatus::Pending,
        });
        self.jobs.len() - 1
    }

    /// 待機中のジョブのみ削除できる
    pub fn remove_job(&mut self, index: usize) -> bool {
        match self.jobs.get(index) {
            Some(job) if job.status == JobStatus::Pending => {
                self.jobs.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn clear_pending(&mut self) {
        self.jobs.retain(|job| job.status != JobStatus::Pending);
    }

    pub fn pending_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .count()
    }

    pub fn jobs(&self) -> &[BatchJob] {
        &self.jobs
    }

    /// 待機中のジョブを順に処理する
    ///
    /// `on_job` はジョブ開始時に (番号, 総数, ジョブ) で、`on_item` は写真1枚ごとに呼ばれる。
    /// キャンセル後の残りジョブはキャンセル扱い。
    pub fn process_all<J, P>(
        &mut self,
        config: &Config,
        cancel: &CancelFlag,
        mut on_job: J,
        mut on_item: P,
    ) -> QueueSummary
    where
        J: FnMut(usize, usize, &BatchJob),
        P: FnMut(&Progress<'_>),
    {
        let pending: Vec<usize> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.status == JobStatus::Pending)
            .map(|(i, _)| i)
            .collect();

        let mut summary = QueueSummary {
            total: pending.len(),
            ..Default::default()
        };

        for (position, &index) in pending.iter().enumerate() {
            let job = &mut self.jobs[index];
            let label = job.label();

            if cancel.is_cancelled() {
                job.status = JobStatus::Cancelled;
                summary.cancelled += 1;
                summary.details.push(format!("キャンセル: {}", label));
                continue;
            }

            job.status = JobStatus::Running;
            on_job(position + 1, pending.len(), job);

            match pipeline::process_photos(&job.request, config, cancel, &mut on_item) {
                Ok(PipelineOutcome::Completed(report)) => {
                    job.status = JobStatus::Completed;
                    summary.completed += 1;
                    let failed_outputs = report
                        .outputs
                        .entries()
                        .iter()
                        .filter(|(_, r)| r.is_err())
                        .count();
                    let mut note = String::new();
                    if failed_outputs > 0 {
                        note.push_str(&format!(" (出力失敗 {}件)", failed_outputs));
                    }
                    if !report.thumbnail_failures.is_empty() {
                        note.push_str(&format!(
                            " (画像なし {}件)",
                            report.thumbnail_failures.len()
                        ));
                    }
                    summary
                        .details
                        .push(format!("{}: {}{}", label, report.summary, note));
                    summary.runs.push(report.summary);
                    info!("ジョブ完了: {}", label);
                }
                Ok(PipelineOutcome::Cancelled(run)) => {
                    job.status = JobStatus::Cancelled;
                    summary.cancelled += 1;
                    summary.details.push(format!("キャンセル: {}", label));
                    summary.runs.push(run);
                }
                Err(e) => {
                    warn!("ジョブ失敗: {} - {}", label, e);
                    summary.failed += 1;
                    summary.details.push(format!("{}: {}", label, e));
                    job.status = JobStatus::Failed(e.to_string());
                }
            }
        }

        summary
    }
}
