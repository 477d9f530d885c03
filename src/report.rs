use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::sequence::Trajectory;

/// ファイル名用のタイムスタンプ（UTC, YYYYDDD_HHMMSS 形式）
pub fn timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// DDD は 1 月 1 日を 001 とする通日
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y%j_%H%M%S").to_string()
}

/// ファイル名用に長い数を短縮する
pub fn short_n(n: &BigUint) -> String {
    let s = n.to_string();
    if s.len() <= 16 {
        s
    } else {
        format!("{}..{}d", &s[..6], s.len())
    }
}

/// 画面表示用に長い数を省略する
pub fn format_big(n: &BigUint) -> String {
    let s = n.to_string();
    if s.len() <= 50 {
        s
    } else {
        format!("{}...{} ({}桁)", &s[..20], &s[s.len() - 20..], s.len())
    }
}

/// step,value,digits（step 1 が開始値）
pub fn write_trajectory_csv(mut w: impl Write, trajectory: &Trajectory) -> std::io::Result<()> {
    writeln!(w, "step,value,digits")?;
    for (idx, value) in trajectory.points() {
        let s = value.to_string();
        writeln!(w, "{},{},{}", idx, s, s.len())?;
    }
    w.flush()
}

/// key = value 形式のサマリー
pub fn write_summary(mut w: impl Write, trajectory: &Trajectory) -> std::io::Result<()> {
    let (peak_step, peak) = trajectory.peak();
    writeln!(w, "# collatz-viz run")?;
    writeln!(w, "seed = {}", trajectory.seed)?;
    writeln!(w, "transformations = {}", trajectory.transformations())?;
    writeln!(w, "steps = {}", trajectory.reported_steps())?;
    writeln!(w, "peak = {}", peak)?;
    writeln!(w, "peak_step = {}", peak_step)?;
    writeln!(w, "peak_digits = {}", peak.to_string().len())?;
    writeln!(w, "reached_one = {}", trajectory.reached_one())?;
    writeln!(w, "processing_time_us = {:.3}", trajectory.elapsed.as_secs_f64() * 1e6)?;
    w.flush()
}

/// 保存したファイルのパス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRun {
    pub csv: PathBuf,
    pub summary: PathBuf,
}

/// dir 以下に軌道 CSV とサマリーを書き出す
pub fn save_run(dir: &Path, trajectory: &Trajectory) -> Result<SavedRun> {
    std::fs::create_dir_all(dir)?;
    let stem = format!("run_{}_{}", short_n(trajectory.seed.value()), timestamp());

    let csv = dir.join(format!("{}.csv", stem));
    write_trajectory_csv(BufWriter::new(File::create(&csv)?), trajectory)?;

    let summary = dir.join(format!("{}_summary.txt", stem));
    write_summary(BufWriter::new(File::create(&summary)?), trajectory)?;

    debug!(csv = %csv.display(), summary = %summary.display(), "run saved");
    Ok(SavedRun { csv, summary })
}
