use num_bigint::{BigInt, BigUint};
use std::path::PathBuf;
use thiserror::Error;

/// エンジン全体のエラー
#[derive(Debug, Error)]
pub enum CollatzError {
    /// 整数に変換できない入力。表示用に元の値を保持する。
    #[error("ERROR: {raw} is not an integer.")]
    NotAnInteger { raw: String },

    /// 0 以下の値（写像の定義域外）
    #[error("ERROR: {value} is out of domain (seed must be a positive integer).")]
    OutOfDomain { value: BigInt },

    /// 反復回数上限に到達
    #[error("ERROR: seed {seed} did not reach 1 within {limit} steps.")]
    IterationLimit { seed: BigUint, limit: u64 },

    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CollatzError>;
