//! 信誉分（温度）
//!
//! 温度以 0.1 为步长变化，始终落在 [36.5, 99.9] 区间内。
//! 内部按“十分位”整数计算，避免浮点累加产生 36.600000000000001 之类的漂移。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::UserId;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReputationScore(f64);

impl ReputationScore {
    /// 新用户的初始温度，也是下限。
    pub const BASELINE: f64 = 36.5;
    pub const CEILING: f64 = 99.9;
    pub const STEP: f64 = 0.1;

    const BASELINE_TENTHS: i64 = 365;
    const CEILING_TENTHS: i64 = 999;

    pub fn baseline() -> Self {
        Self(Self::BASELINE)
    }

    /// 从持久化数据恢复，拒绝区间外或非有限的值。
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::invalid_argument(
                "reputation_score",
                "must be a finite number",
            ));
        }
        let tenths = to_tenths(value);
        if !(Self::BASELINE_TENTHS..=Self::CEILING_TENTHS).contains(&tenths) {
            return Err(DomainError::invalid_argument(
                "reputation_score",
                format!("{value} is outside [{}, {}]", Self::BASELINE, Self::CEILING),
            ));
        }
        Ok(Self::from_tenths(tenths))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_at_ceiling(self) -> bool {
        to_tenths(self.0) >= Self::CEILING_TENTHS
    }

    pub fn is_at_baseline(self) -> bool {
        to_tenths(self.0) <= Self::BASELINE_TENTHS
    }

    fn from_tenths(tenths: i64) -> Self {
        let clamped = tenths.clamp(Self::BASELINE_TENTHS, Self::CEILING_TENTHS);
        Self(clamped as f64 / 10.0)
    }
}

impl Default for ReputationScore {
    fn default() -> Self {
        Self::baseline()
    }
}

impl fmt::Display for ReputationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

fn to_tenths(value: f64) -> i64 {
    (value * 10.0).round() as i64
}

/// 点赞/取消点赞引起的温度变化方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationAdjustment {
    /// 商品被点赞：+0.1，封顶 99.9
    Raise,
    /// 点赞被取消：-0.1，不低于 36.5
    Lower,
}

impl ReputationAdjustment {
    /// 带符号的步长，供存储层在单条 UPDATE 中使用。
    pub fn delta(self) -> f64 {
        match self {
            Self::Raise => ReputationScore::STEP,
            Self::Lower => -ReputationScore::STEP,
        }
    }

    pub fn apply(self, score: ReputationScore) -> ReputationScore {
        let tenths = to_tenths(score.0);
        match self {
            Self::Raise => ReputationScore::from_tenths(tenths + 1),
            Self::Lower => ReputationScore::from_tenths(tenths - 1),
        }
    }
}

/// 一次温度调整的结果，用于日志与调用方观测。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationChange {
    pub user_id: UserId,
    pub previous: ReputationScore,
    pub current: ReputationScore,
}

impl ReputationChange {
    /// 已经处于上限/下限时，调整不会产生变化。
    pub fn is_saturated(&self) -> bool {
        self.previous == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_from_baseline_is_exact() {
        let raised = ReputationAdjustment::Raise.apply(ReputationScore::baseline());
        assert_eq!(raised.value(), 36.6);
        let lowered = ReputationAdjustment::Lower.apply(raised);
        assert_eq!(lowered.value(), 36.5);
    }

    #[test]
    fn raise_saturates_at_ceiling() {
        let mut score = ReputationScore::baseline();
        for _ in 0..1000 {
            score = ReputationAdjustment::Raise.apply(score);
        }
        assert_eq!(score.value(), ReputationScore::CEILING);
        assert!(score.is_at_ceiling());
    }

    #[test]
    fn lower_saturates_at_baseline() {
        let mut score = ReputationScore::new(ReputationScore::CEILING).unwrap();
        for _ in 0..1000 {
            score = ReputationAdjustment::Lower.apply(score);
        }
        assert_eq!(score.value(), ReputationScore::BASELINE);
        assert!(score.is_at_baseline());
    }

    #[test]
    fn new_rejects_out_of_range_values() {
        assert!(ReputationScore::new(36.4).is_err());
        assert!(ReputationScore::new(100.0).is_err());
        assert!(ReputationScore::new(f64::NAN).is_err());
        assert_eq!(ReputationScore::new(42.0).unwrap().value(), 42.0);
    }

    #[test]
    fn delta_sign_follows_direction() {
        assert!(ReputationAdjustment::Raise.delta() > 0.0);
        assert!(ReputationAdjustment::Lower.delta() < 0.0);
    }
}
