use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{CollatzError, Result};
use crate::validate::Seed;

/// 反復回数の既定上限
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;

/// `run_sequence` の実行オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOptions {
    /// 写像の適用回数の上限。None なら 1 に到達するまで回し続ける。
    pub max_iterations: Option<u64>,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        SequenceOptions { max_iterations: Some(DEFAULT_MAX_ITERATIONS) }
    }
}

impl SequenceOptions {
    pub fn with_limit(limit: u64) -> Self {
        SequenceOptions { max_iterations: Some(limit) }
    }

    pub fn unbounded() -> Self {
        SequenceOptions { max_iterations: None }
    }
}

/// 1 回の軌道計算の結果
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// 開始値
    pub seed: Seed,
    /// 開始値の次から 1 までの値（開始値は含まない）
    pub values: Vec<BigUint>,
    /// ループ部分のみの経過時間
    pub elapsed: Duration,
}

impl Trajectory {
    /// 写像の適用回数
    pub fn transformations(&self) -> u64 {
        self.values.len() as u64
    }

    /// 1 始まりのカウンタで数えたステップ数（= 点の数）。
    /// seed=1 でも 1 になる。
    pub fn reported_steps(&self) -> u64 {
        self.transformations() + 1
    }

    pub fn last(&self) -> &BigUint {
        self.values.last().unwrap_or_else(|| self.seed.value())
    }

    pub fn reached_one(&self) -> bool {
        self.last().is_one()
    }

    /// (ステップ番号, 値) の列。ステップ 1 が開始値。
    pub fn points(&self) -> impl Iterator<Item = (u64, &BigUint)> + '_ {
        std::iter::once((1, self.seed.value()))
            .chain(self.values.iter().enumerate().map(|(i, v)| (i as u64 + 2, v)))
    }

    /// 最大値とそれが最初に現れるステップ番号
    pub fn peak(&self) -> (u64, &BigUint) {
        let mut best = (1, self.seed.value());
        for (idx, v) in self.points() {
            if v > best.1 {
                best = (idx, v);
            }
        }
        best
    }
}

/// 1 ステップ: 偶数なら n/2、奇数なら 3n+1。n=0 は定義域外。
pub fn step(n: &BigUint) -> Result<BigUint> {
    if n.is_zero() {
        return Err(CollatzError::OutOfDomain { value: BigInt::ZERO });
    }
    Ok(step_positive(n))
}

#[inline]
fn step_positive(n: &BigUint) -> BigUint {
    if n.is_even() {
        n >> 1u32
    } else {
        n * 3u32 + 1u32
    }
}

/// u128 版の 1 ステップ。3n+1 がオーバーフローするなら None。
/// n >= 1 であること。
#[inline]
pub fn step_u128(n: u128) -> Option<u128> {
    if n % 2 == 0 {
        Some(n / 2)
    } else {
        n.checked_mul(3)?.checked_add(1)
    }
}

/// 開始値から 1 に到達するまでの軌道を計算する。
pub fn run_sequence(seed: &Seed, options: &SequenceOptions) -> Result<Trajectory> {
    run_loop(seed, options, None::<fn(u64, &BigUint)>)
}

/// 進捗コールバック付き軌道計算。
/// callback(step, value) を写像の適用ごとに呼ぶ（step は 1 始まりの適用回数）。
/// コールバックに掛かった時間は `elapsed` に含めない。
pub fn run_sequence_with_callback(
    seed: &Seed,
    options: &SequenceOptions,
    callback: impl FnMut(u64, &BigUint),
) -> Result<Trajectory> {
    run_loop(seed, options, Some(callback))
}

fn run_loop(
    seed: &Seed,
    options: &SequenceOptions,
    mut callback: Option<impl FnMut(u64, &BigUint)>,
) -> Result<Trajectory> {
    let timer = Instant::now();
    let mut in_callback = Duration::ZERO;
    let mut current = seed.value().clone();
    let mut values: Vec<BigUint> = Vec::new();
    let mut steps = 0u64;

    while !current.is_one() {
        if let Some(limit) = options.max_iterations {
            if steps >= limit {
                warn!(seed = %seed, limit, "iteration limit reached before 1");
                return Err(CollatzError::IterationLimit { seed: seed.value().clone(), limit });
            }
        }

        current = step_positive(&current);
        steps += 1;
        if let Some(cb) = callback.as_mut() {
            let paused = Instant::now();
            cb(steps, &current);
            in_callback += paused.elapsed();
        }
        values.push(current.clone());
    }
    let elapsed = timer.elapsed().saturating_sub(in_callback);

    debug!(
        seed_digits = seed.digits(),
        transformations = steps,
        elapsed_us = elapsed.as_micros() as u64,
        "sequence finished"
    );

    Ok(Trajectory { seed: seed.clone(), values, elapsed })
}

/// 値を保存せずに 1 までの適用回数だけを数える。
/// 上限に達したら None。n=0 は収束しないので None。
pub fn total_stopping_time_u64(n: u64, max_iterations: Option<u64>) -> Option<u64> {
    total_stopping_time_u128(n as u128, max_iterations)
}

/// u128 演算で回し、オーバーフローしたら BigUint にフォールバックする。
pub(crate) fn total_stopping_time_u128(n: u128, max_iterations: Option<u64>) -> Option<u64> {
    if n == 0 {
        return None;
    }
    let limit = max_iterations.unwrap_or(u64::MAX);
    let mut current = n;
    let mut steps = 0u64;

    // Phase 1: u128
    while current != 1 {
        if steps >= limit {
            return None;
        }
        match step_u128(current) {
            Some(next) => {
                current = next;
                steps += 1;
            }
            None => break,
        }
    }
    if current == 1 {
        return Some(steps);
    }

    // Phase 2: BigUint
    let mut big = BigUint::from(current);
    while !big.is_one() {
        if steps >= limit {
            return None;
        }
        big = step_positive(&big);
        steps += 1;
    }
    Some(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seed(n: u64) -> Seed {
        Seed::try_from(n).unwrap()
    }

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_step_cases() {
        assert_eq!(step(&big(7)).unwrap(), big(22));
        assert_eq!(step(&big(22)).unwrap(), big(11));
        assert_eq!(step(&big(1)).unwrap(), big(4));
    }

    #[test]
    fn test_step_zero_out_of_domain() {
        assert!(matches!(step(&BigUint::zero()), Err(CollatzError::OutOfDomain { .. })));
    }

    #[test]
    fn test_step_u128_overflow() {
        assert_eq!(step_u128(u128::MAX), None);
        assert_eq!(step_u128(u128::MAX - 1), Some(u128::MAX / 2));
        assert_eq!(step_u128(7), Some(22));
    }

    #[test]
    fn test_seed_one() {
        let t = run_sequence(&seed(1), &SequenceOptions::default()).unwrap();
        assert!(t.values.is_empty());
        assert_eq!(t.transformations(), 0);
        assert_eq!(t.reported_steps(), 1);
        assert!(t.reached_one());
        assert_eq!(t.peak(), (1, &big(1)));
    }

    #[test]
    fn test_seed_6() {
        let t = run_sequence(&seed(6), &SequenceOptions::default()).unwrap();
        let expected: Vec<BigUint> = [3u64, 10, 5, 16, 8, 4, 2, 1].iter().map(|&v| big(v)).collect();
        assert_eq!(t.values, expected);
        assert_eq!(t.transformations(), 8);
        assert_eq!(t.reported_steps(), 9);
        assert_eq!(t.peak(), (5, &big(16)));
    }

    #[test]
    fn test_points_numbering() {
        let t = run_sequence(&seed(6), &SequenceOptions::default()).unwrap();
        let pts: Vec<(u64, u64)> = t.points()
            .map(|(i, v)| (i, v.to_u64_digits().first().copied().unwrap_or(0)))
            .collect();
        assert_eq!(pts.first(), Some(&(1, 6)));
        assert_eq!(pts.get(1), Some(&(2, 3)));
        assert_eq!(pts.last(), Some(&(9, 1)));
        assert_eq!(pts.len() as u64, t.reported_steps());
    }

    #[test]
    fn test_iteration_limit() {
        // 27 は 111 回で 1 に到達
        assert!(run_sequence(&seed(27), &SequenceOptions::with_limit(111)).is_ok());
        match run_sequence(&seed(27), &SequenceOptions::with_limit(110)) {
            Err(CollatzError::IterationLimit { seed, limit }) => {
                assert_eq!(seed, big(27));
                assert_eq!(limit, 110);
            }
            other => panic!("expected IterationLimit, got {:?}", other.map(|t| t.transformations())),
        }
        assert!(run_sequence(&seed(1), &SequenceOptions::with_limit(0)).is_ok());
    }

    #[test]
    fn test_callback_count_matches() {
        let mut calls = 0u64;
        let mut last_step = 0u64;
        let t = run_sequence_with_callback(&seed(97), &SequenceOptions::unbounded(), |s, _| {
            calls += 1;
            assert_eq!(s, last_step + 1);
            last_step = s;
        })
        .unwrap();
        assert_eq!(calls, t.transformations());
        assert_eq!(t.transformations(), 118);
    }

    #[test]
    fn test_callback_time_excluded() {
        let t = run_sequence_with_callback(&seed(6), &SequenceOptions::default(), |_, _| {
            std::thread::sleep(Duration::from_millis(10));
        })
        .unwrap();
        assert_eq!(t.transformations(), 8);
        // コールバックだけで 80ms 以上掛かっている
        assert!(t.elapsed < Duration::from_millis(40), "elapsed={:?}", t.elapsed);
    }

    #[test]
    fn test_stopping_time_matches_trajectory() {
        for n in 1u64..=2000 {
            let t = run_sequence(&seed(n), &SequenceOptions::default()).unwrap();
            assert_eq!(total_stopping_time_u64(n, None), Some(t.transformations()), "n={}", n);
        }
        assert_eq!(total_stopping_time_u64(0, None), None);
        assert_eq!(total_stopping_time_u64(27, Some(110)), None);
    }

    #[test]
    fn test_stopping_time_biguint_fallback() {
        // 3n+1 が u128 をはみ出す奇数
        let n: u128 = (1u128 << 127) + 1;
        let s = Seed::try_from(BigUint::from(n)).unwrap();
        let t = run_sequence(&s, &SequenceOptions::unbounded()).unwrap();
        assert_eq!(total_stopping_time_u128(n, None), Some(t.transformations()));
    }

    proptest! {
        #[test]
        fn prop_step_parity(n in 1u64..u64::MAX / 4) {
            let next = step(&big(n)).unwrap();
            if n % 2 == 0 {
                prop_assert_eq!(next, big(n / 2));
            } else {
                prop_assert_eq!(next, big(3 * n + 1));
            }
            prop_assert_eq!(step_u128(n as u128), Some(if n % 2 == 0 { n as u128 / 2 } else { 3 * n as u128 + 1 }));
        }
    }
}
