use num_bigint::BigUint;
use num_traits::ToPrimitive;
use std::time::{Duration, Instant};

use crate::sequence::Trajectory;

pub const MIN_FRAME_MS: u64 = 25;
pub const MAX_FRAME_MS: u64 = 1000;
pub const DEFAULT_FRAME_MS: u64 = 250;

pub fn clamp_frame_ms(ms: u64) -> u64 {
    ms.clamp(MIN_FRAME_MS, MAX_FRAME_MS)
}

/// グラフ用の y 値。f64 に収まらない値は f64::MAX に丸める。
pub fn plot_value(v: &BigUint) -> f64 {
    match v.to_f64() {
        Some(x) if x.is_finite() => x,
        _ => f64::MAX,
    }
}

/// 軌道の点を一定間隔で 1 点ずつ公開するアニメーション状態。
/// 点は [ステップ番号, 値] で、ステップ 1 が開始値。
#[derive(Debug, Clone)]
pub struct Playback {
    points: Vec<[f64; 2]>,
    revealed: usize,
    interval: Duration,
    last_reveal: Instant,
}

impl Playback {
    pub fn new(trajectory: &Trajectory, frame_ms: u64, now: Instant) -> Self {
        let points = trajectory
            .points()
            .map(|(idx, v)| [idx as f64, plot_value(v)])
            .collect();
        Self::from_points(points, frame_ms, now)
    }

    pub fn from_points(points: Vec<[f64; 2]>, frame_ms: u64, now: Instant) -> Self {
        let revealed = points.len().min(1);
        Playback {
            points,
            revealed,
            interval: Duration::from_millis(clamp_frame_ms(frame_ms)),
            last_reveal: now,
        }
    }

    /// 経過した間隔の数だけ点を公開する。変化があれば true。
    pub fn advance(&mut self, now: Instant) -> bool {
        let remaining = self.points.len() - self.revealed;
        if remaining == 0 {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.last_reveal);
        let frames = (elapsed.as_nanos() / self.interval.as_nanos()) as usize;
        let k = frames.min(remaining);
        if k == 0 {
            return false;
        }
        self.revealed += k;
        self.last_reveal += self.interval * u32::try_from(k).unwrap_or(u32::MAX);
        true
    }

    /// 次の点が公開されるまでの時間。公開済みなら None。
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if self.is_finished() {
            return None;
        }
        let due = self.last_reveal + self.interval;
        Some(due.saturating_duration_since(now))
    }

    pub fn visible(&self) -> &[[f64; 2]] {
        &self.points[..self.revealed]
    }

    pub fn all_points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn is_finished(&self) -> bool {
        self.revealed == self.points.len()
    }

    /// 全点を即座に公開
    pub fn finish(&mut self) {
        self.revealed = self.points.len();
    }

    pub fn restart(&mut self, now: Instant) {
        self.revealed = self.points.len().min(1);
        self.last_reveal = now;
    }

    pub fn frame_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn set_frame_ms(&mut self, ms: u64) {
        self.interval = Duration::from_millis(clamp_frame_ms(ms));
    }

    /// 値の最大（y 軸範囲用）
    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|p| p[1]).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{run_sequence, SequenceOptions};
    use crate::validate::Seed;

    fn playback(n: u64, frame_ms: u64, now: Instant) -> Playback {
        let t = run_sequence(&Seed::try_from(n).unwrap(), &SequenceOptions::default()).unwrap();
        Playback::new(&t, frame_ms, now)
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_frame_ms(0), 25);
        assert_eq!(clamp_frame_ms(250), 250);
        assert_eq!(clamp_frame_ms(5000), 1000);
    }

    #[test]
    fn test_starts_with_seed() {
        let t0 = Instant::now();
        let p = playback(6, 100, t0);
        assert_eq!(p.visible(), &[[1.0, 6.0]]);
        assert_eq!(p.all_points().len(), 9);
        assert!(!p.is_finished());
        assert_eq!(p.max_value(), 16.0);
    }

    #[test]
    fn test_advance_by_intervals() {
        let t0 = Instant::now();
        let mut p = playback(6, 100, t0);
        assert!(!p.advance(t0 + Duration::from_millis(99)));
        assert!(p.advance(t0 + Duration::from_millis(100)));
        assert_eq!(p.visible().len(), 2);
        assert_eq!(p.visible()[1], [2.0, 3.0]);
        // 250ms 後にまとめて 2 点
        assert!(p.advance(t0 + Duration::from_millis(350)));
        assert_eq!(p.visible().len(), 4);
        assert_eq!(p.time_until_next(t0 + Duration::from_millis(350)), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_runs_to_end() {
        let t0 = Instant::now();
        let mut p = playback(6, 25, t0);
        assert!(p.advance(t0 + Duration::from_secs(10)));
        assert!(p.is_finished());
        assert_eq!(p.visible().last(), Some(&[9.0, 1.0]));
        assert!(!p.advance(t0 + Duration::from_secs(20)));
        assert_eq!(p.time_until_next(t0), None);
    }

    #[test]
    fn test_restart_and_finish() {
        let t0 = Instant::now();
        let mut p = playback(27, 250, t0);
        p.finish();
        assert!(p.is_finished());
        p.restart(t0);
        assert_eq!(p.visible().len(), 1);
        p.set_frame_ms(1);
        assert_eq!(p.frame_ms(), 25);
    }

    #[test]
    fn test_huge_values_stay_finite() {
        use num_traits::One;
        let t = run_sequence(&Seed::try_from(BigUint::one() << 1100u32).unwrap(), &SequenceOptions::default()).unwrap();
        let p = Playback::new(&t, 250, Instant::now());
        assert_eq!(p.all_points().len(), 1101);
        assert!(p.all_points().iter().all(|pt| pt[1].is_finite()));
        // 2^1024..=2^1100 の 77 点が上限に張り付く
        assert_eq!(p.all_points().iter().filter(|pt| pt[1] == f64::MAX).count(), 77);
        assert_eq!(p.max_value(), f64::MAX);
        assert_eq!(plot_value(&(BigUint::one() << 1023u32)), 2f64.powi(1023));
    }

    #[test]
    fn test_seed_one_is_finished_immediately() {
        let p = playback(1, 250, Instant::now());
        assert!(p.is_finished());
        assert_eq!(p.visible(), &[[1.0, 1.0]]);
    }
}
