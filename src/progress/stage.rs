//! Stage transitions of the simulated upload.
//!
//! Pure functions only: the tick task in the parent module feeds increments
//! in, so the whole state machine can be driven by a synthetic sequence.

use serde::Serialize;
use std::ops::RangeInclusive;

/// Highest percentage reachable without an explicit completion.
pub const ACTIVE_CAP: f64 = 95.0;

/// Phase of the simulated upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading files, before any transfer.
    Preparing,
    /// Bytes in flight.
    Uploading,
    /// Server-side processing.
    Processing,
    /// Waiting for the server to answer.
    Finalizing,
    /// Upload confirmed.
    Complete,
    /// Upload failed.
    Errored,
}

impl Stage {
    /// Whether ticks still move this stage.
    pub fn is_active(&self) -> bool {
        !matches!(self, Stage::Complete | Stage::Errored)
    }

    /// Largest increment per tick.
    pub fn max_increment(&self) -> f64 {
        match self {
            Stage::Preparing => 3.0,
            Stage::Uploading => 8.0,
            Stage::Processing => 4.0,
            Stage::Finalizing => 1.0,
            Stage::Complete | Stage::Errored => 0.0,
        }
    }

    /// Stage that follows once `threshold` is reached.
    fn next(&self) -> Option<(f64, Stage)> {
        match self {
            Stage::Preparing => Some((15.0, Stage::Uploading)),
            Stage::Uploading => Some((70.0, Stage::Processing)),
            Stage::Processing => Some((90.0, Stage::Finalizing)),
            _ => None,
        }
    }

    /// Status line shown under the bar.
    pub fn status_text(&self) -> &'static str {
        match self {
            Stage::Preparing => "Preparing upload...",
            Stage::Uploading => "Uploading files...",
            Stage::Processing => "Processing files...",
            Stage::Finalizing => "Finalizing...",
            Stage::Complete => "Upload complete!",
            Stage::Errored => "Upload failed",
        }
    }

    /// Per-file status while in this stage.
    pub fn file_status(&self) -> FileStatus {
        match self {
            Stage::Preparing => FileStatus::Queued,
            Stage::Uploading => FileStatus::Uploading,
            Stage::Processing | Stage::Finalizing => FileStatus::Processing,
            Stage::Complete => FileStatus::Complete,
            Stage::Errored => FileStatus::Error,
        }
    }
}

/// Status of one file in the upload list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Waiting.
    Queued,
    /// Being sent.
    Uploading,
    /// Being processed.
    Processing,
    /// Done.
    Complete,
    /// Failed.
    Error,
}

impl FileStatus {
    /// Icon classes for the status.
    pub fn icon(&self) -> &'static str {
        match self {
            FileStatus::Queued => "fas fa-clock text-muted",
            FileStatus::Uploading => "fas fa-spinner fa-spin text-primary",
            FileStatus::Processing => "fas fa-cog fa-spin text-info",
            FileStatus::Complete => "fas fa-check-circle text-success",
            FileStatus::Error => "fas fa-times-circle text-danger",
        }
    }

    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Queued => "Queued",
            FileStatus::Uploading => "Uploading",
            FileStatus::Processing => "Processing",
            FileStatus::Complete => "Complete",
            FileStatus::Error => "Error",
        }
    }
}

/// Snapshot of the simulated progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// Current stage.
    pub stage: Stage,
    /// Percentage in `0.0..=100.0`.
    pub percent: f64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            stage: Stage::Preparing,
            percent: 0.0,
        }
    }
}

impl Progress {
    /// Percentage as shown to the user.
    pub fn display_percent(&self) -> u32 {
        self.percent.floor().clamp(0.0, 100.0) as u32
    }
}

/// Apply one tick.
///
/// `increment` is clamped to `0..=stage.max_increment()`; negative or NaN
/// values count as zero. Active stages never exceed [`ACTIVE_CAP`] and move
/// at most one stage per tick. Terminal stages are returned unchanged.
pub fn advance(progress: Progress, increment: f64) -> Progress {
    let stage = progress.stage;
    if !stage.is_active() {
        return progress;
    }

    let increment = if increment.is_nan() {
        0.0
    } else {
        increment.clamp(0.0, stage.max_increment())
    };
    let percent = (progress.percent + increment).min(ACTIVE_CAP);

    let stage = match stage.next() {
        Some((threshold, next)) if percent >= threshold => next,
        _ => stage,
    };

    Progress { stage, percent }
}

/// Terminal state after an external completion signal.
pub fn complete(progress: Progress) -> Progress {
    match progress.stage {
        Stage::Errored | Stage::Complete => progress,
        _ => Progress {
            stage: Stage::Complete,
            percent: 100.0,
        },
    }
}

/// Terminal state after an external failure signal.
pub fn fail(progress: Progress) -> Progress {
    match progress.stage {
        Stage::Errored | Stage::Complete => progress,
        _ => Progress {
            stage: Stage::Errored,
            percent: progress.percent,
        },
    }
}

/// Clamp a delay range so `min <= max`.
pub fn tick_range(min_ms: u64, max_ms: u64) -> RangeInclusive<u64> {
    let min = min_ms.max(1);
    min..=max_ms.max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(increments: &[f64]) -> Vec<Progress> {
        let mut p = Progress::default();
        increments
            .iter()
            .map(|inc| {
                p = advance(p, *inc);
                p
            })
            .collect()
    }

    #[test]
    fn test_stages_in_order() {
        let trace = run(&[3.0; 200]);
        let stages: Vec<Stage> = trace.iter().map(|p| p.stage).collect();

        let first = |s: Stage| stages.iter().position(|x| *x == s).unwrap();
        assert!(first(Stage::Uploading) < first(Stage::Processing));
        assert!(first(Stage::Processing) < first(Stage::Finalizing));
        assert_eq!(trace[4].stage, Stage::Uploading); // 15.0 after five ticks of 3
        assert_eq!(trace.last().unwrap().stage, Stage::Finalizing);
        assert_eq!(trace.last().unwrap().percent, ACTIVE_CAP);
    }

    #[test]
    fn test_monotonic_and_capped() {
        // Mixed, out-of-range and degenerate increments.
        let incs: Vec<f64> = (0..500)
            .map(|i| match i % 7 {
                0 => -5.0,
                1 => f64::NAN,
                2 => 100.0,
                3 => 0.0,
                4 => 0.37,
                5 => 7.9,
                _ => f64::INFINITY,
            })
            .collect();

        let mut last = 0.0;
        for p in run(&incs) {
            assert!(p.percent >= last, "{} < {}", p.percent, last);
            assert!(p.percent <= ACTIVE_CAP);
            assert!(p.stage.is_active());
            last = p.percent;
        }
    }

    #[test]
    fn test_increment_bounded_by_stage() {
        let p = advance(Progress::default(), 50.0);
        assert_eq!(p.percent, 3.0);
        assert_eq!(p.stage, Stage::Preparing);

        let p = advance(
            Progress {
                stage: Stage::Finalizing,
                percent: 94.5,
            },
            1.0,
        );
        assert_eq!(p.percent, ACTIVE_CAP);
        assert_eq!(p.stage, Stage::Finalizing);
    }

    #[test]
    fn test_one_transition_per_tick() {
        let p = advance(
            Progress {
                stage: Stage::Uploading,
                percent: 68.0,
            },
            8.0,
        );
        assert_eq!(p.stage, Stage::Processing);
        assert_eq!(p.percent, 76.0);
    }

    #[test]
    fn test_terminal_stages_are_sticky() {
        let done = complete(Progress {
            stage: Stage::Finalizing,
            percent: 95.0,
        });
        assert_eq!(done.percent, 100.0);
        assert_eq!(advance(done, 5.0), done);
        assert_eq!(fail(done), done);
        assert_eq!(complete(done), done);

        let failed = fail(Progress {
            stage: Stage::Uploading,
            percent: 40.0,
        });
        assert_eq!(failed.stage, Stage::Errored);
        assert_eq!(failed.percent, 40.0);
        assert_eq!(complete(failed), failed);
    }

    #[test]
    fn test_file_status_follows_stage() {
        assert_eq!(Stage::Preparing.file_status(), FileStatus::Queued);
        assert_eq!(Stage::Uploading.file_status(), FileStatus::Uploading);
        assert_eq!(Stage::Finalizing.file_status(), FileStatus::Processing);
    }

    #[test]
    fn test_tick_range() {
        assert_eq!(tick_range(200, 500), 200..=500);
        assert_eq!(tick_range(0, 0), 1..=1);
        assert_eq!(tick_range(600, 500), 600..=600);
    }
}
