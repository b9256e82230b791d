//! Reward signals

use serde::{Deserialize, Serialize};

/// Reward signal from the environment
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reward(pub f64);

impl Reward {
    /// Create a new reward
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the reward value
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Reward> for f64 {
    fn from(reward: Reward) -> Self {
        reward.0
    }
}

impl std::ops::Add for Reward {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl std::ops::AddAssign for Reward {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl std::ops::Sub<f64> for Reward {
    type Output = Self;

    fn sub(self, penalty: f64) -> Self::Output {
        Self(self.0 - penalty)
    }
}

impl std::iter::Sum for Reward {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, r| acc + r)
    }
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_arithmetic() {
        let mut total = Reward::default();
        total += Reward(1.0);
        total += Reward(-0.25);
        assert_eq!(total, Reward(0.75));
        assert_eq!((Reward(1.0) - 0.5).value(), 0.5);

        let summed: Reward = [Reward(0.5), Reward(0.25)].into_iter().sum();
        assert_eq!(f64::from(summed), 0.75);
    }
}
