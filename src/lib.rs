//! コラッツ写像 (3n+1) の軌道計算と可視化
//!
//! 正の整数から始めて、偶数なら n/2、奇数なら 3n+1 を 1 に到達するまで繰り返す。
//! 軌道と統計（適用回数・ループの経過時間）を計算し、CLI の対話モードや
//! アニメーション付きグラフ GUI (`gui` feature) から利用する。

pub mod config;
pub mod error;
pub mod history;
pub mod playback;
pub mod report;
pub mod sequence;
pub mod session;
pub mod validate;
pub mod verify;

pub use config::Config;
pub use error::{CollatzError, Result};
pub use history::{History, HistoryEntry};
pub use playback::Playback;
pub use sequence::{run_sequence, run_sequence_with_callback, step, step_u128, total_stopping_time_u64, SequenceOptions, Trajectory, DEFAULT_MAX_ITERATIONS};
pub use session::InteractiveSession;
pub use validate::{validate, CoercionPolicy, RawValue, Seed};
pub use verify::{verify_range, verify_range_cancellable, VerifyResult};
