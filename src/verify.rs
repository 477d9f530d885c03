use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::sequence;

/// 範囲検証の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// 検証した開始値の総数
    pub total_checked: u64,
    /// 全て 1 に到達したか
    pub all_converged: bool,
    /// 最長の適用回数
    pub max_transformations: u64,
    /// 最長の適用回数を持つ開始値（同数なら最小のもの）
    pub max_transformations_seed: u64,
    /// 上限内に 1 へ到達しなかった開始値（昇順）
    pub failures: Vec<u64>,
}

impl VerifyResult {
    fn empty() -> Self {
        VerifyResult {
            total_checked: 0,
            all_converged: true,
            max_transformations: 0,
            max_transformations_seed: 0,
            failures: Vec::new(),
        }
    }
}

/// チャンク当たりの開始値の数
const CHUNK_SIZE: u64 = 10_000;

/// [start, end] の全整数が 1 に到達するかを並列に検証する。
/// start < 1 は 1 に切り上げる。
/// progress_callback: (完了数, 総数) を定期的に呼ぶ（スレッドセーフ）。
pub fn verify_range(
    start: u64,
    end: u64,
    max_iterations: Option<u64>,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> VerifyResult {
    let never = AtomicBool::new(false);
    verify_range_cancellable(start, end, max_iterations, &never, progress_callback)
}

/// キャンセル可能な並列検証。cancel が true になると途中結果を返す。
pub fn verify_range_cancellable(
    start: u64,
    end: u64,
    max_iterations: Option<u64>,
    cancel: &AtomicBool,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> VerifyResult {
    let start = start.max(1);
    if start > end {
        return VerifyResult::empty();
    }

    let total = end - start + 1;
    let num_chunks = total.div_ceil(CHUNK_SIZE);
    info!(start, end, chunks = num_chunks, threads = rayon::current_num_threads(), "verifying range");

    let global_done = AtomicU64::new(0);
    // (最長適用回数, 開始値)
    let global_max: Mutex<(u64, u64)> = Mutex::new((0, start));
    let global_failures: Mutex<Vec<u64>> = Mutex::new(Vec::new());

    (0..num_chunks).into_par_iter().for_each(|chunk_idx| {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        let chunk_start = start + chunk_idx * CHUNK_SIZE;
        let chunk_end = chunk_start.saturating_add(CHUNK_SIZE - 1).min(end);

        let mut local_max = (0u64, chunk_start);
        let mut local_failures: Vec<u64> = Vec::new();
        let mut unreported = 0u64;

        for n in chunk_start..=chunk_end {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            match sequence::total_stopping_time_u64(n, max_iterations) {
                Some(st) => {
                    if st > local_max.0 {
                        local_max = (st, n);
                    }
                }
                None => local_failures.push(n),
            }
            unreported += 1;

            // チャンク内でも定期的に進捗報告
            if unreported >= 1000 {
                let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
                progress_callback(done, total);
                unreported = 0;
            }
        }

        if unreported > 0 {
            let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
            progress_callback(done, total);
        }

        if let Ok(mut guard) = global_max.lock() {
            // 同数なら小さい開始値を残す
            if local_max.0 > guard.0 || (local_max.0 == guard.0 && local_max.1 < guard.1) {
                *guard = local_max;
            }
        }

        if !local_failures.is_empty() {
            if let Ok(mut guard) = global_failures.lock() {
                guard.extend(local_failures);
            }
        }
    });

    let total_checked = global_done.load(Ordering::Relaxed);
    let (max_transformations, max_transformations_seed) =
        global_max.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut failures = global_failures.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    failures.sort_unstable();

    VerifyResult {
        total_checked,
        all_converged: failures.is_empty(),
        max_transformations,
        max_transformations_seed,
        failures,
    }
}
