use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{FromPrimitive, One};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{CollatzError, Result};

/// 外部から渡される未検証の値
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(BigInt),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Integer(n) => write!(f, "{}", n),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Integer(BigInt::from(n))
    }
}

impl From<BigInt> for RawValue {
    fn from(n: BigInt) -> Self {
        RawValue::Integer(n)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        RawValue::Float(x)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

/// 整数以外の型をどこまで整数とみなすか。
///
/// | 入力 | Lenient | Strict |
/// |---|---|---|
/// | 整数 | そのまま | そのまま |
/// | 文字列 | 前後空白を除き `[+-]?[0-9]+` のみ | 同左 |
/// | 浮動小数 | 0 方向へ切り捨て (NaN/∞ は不可) | 不可 |
/// | 真偽値 | true=1, false=0 | 不可 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    #[default]
    Lenient,
    Strict,
}

/// 生の値を整数に変換する。失敗時は元の値を保持した `NotAnInteger`。
pub fn validate(raw: &RawValue, policy: CoercionPolicy) -> Result<BigInt> {
    let not_an_integer = || CollatzError::NotAnInteger { raw: raw.to_string() };

    match (raw, policy) {
        (RawValue::Integer(n), _) => Ok(n.clone()),
        (RawValue::Text(s), _) => parse_integer_text(s).ok_or_else(not_an_integer),
        (RawValue::Float(x), CoercionPolicy::Lenient) => {
            // from_f64 は 0 方向に切り捨て、非有限値は None
            BigInt::from_f64(*x).ok_or_else(not_an_integer)
        }
        (RawValue::Bool(b), CoercionPolicy::Lenient) => {
            Ok(if *b { BigInt::one() } else { BigInt::ZERO })
        }
        (RawValue::Float(_), CoercionPolicy::Strict) | (RawValue::Bool(_), CoercionPolicy::Strict) => {
            Err(not_an_integer())
        }
    }
}

fn parse_integer_text(s: &str) -> Option<BigInt> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigInt::from_str(trimmed).ok()
}

/// 検証済みの開始値（正の整数）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seed(BigUint);

impl Seed {
    /// 0 以下は `OutOfDomain`
    pub fn new(n: BigInt) -> Result<Self> {
        match n.into_parts() {
            (Sign::Plus, magnitude) => Ok(Seed(magnitude)),
            (sign, magnitude) => Err(CollatzError::OutOfDomain {
                value: BigInt::from_biguint(sign, magnitude),
            }),
        }
    }

    pub fn from_raw(raw: &RawValue, policy: CoercionPolicy) -> Result<Self> {
        Seed::new(validate(raw, policy)?)
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn into_inner(self) -> BigUint {
        self.0
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// 10進桁数
    pub fn digits(&self) -> usize {
        self.0.to_string().len()
    }
}

impl TryFrom<u64> for Seed {
    type Error = CollatzError;

    fn try_from(n: u64) -> Result<Self> {
        Seed::new(BigInt::from(n))
    }
}

impl TryFrom<BigUint> for Seed {
    type Error = CollatzError;

    fn try_from(n: BigUint) -> Result<Self> {
        Seed::new(BigInt::from(n))
    }
}

impl FromStr for Seed {
    type Err = CollatzError;

    fn from_str(s: &str) -> Result<Self> {
        Seed::from_raw(&RawValue::from(s), CoercionPolicy::Strict)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
