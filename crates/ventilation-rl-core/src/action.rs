//! Action representations and action spaces

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space using the caller's random source
    fn sample(&self, rng: &mut dyn RngCore) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Discrete action (e.g., for discrete action spaces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl Action for DiscreteAction {
    #[allow(clippy::cast_precision_loss)]
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }
}

impl From<usize> for DiscreteAction {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Discrete action space `{0, 1, ..., n - 1}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteSpace {
    /// Number of discrete actions, must be non-zero
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl ActionSpace for DiscreteSpace {
    type Action = DiscreteAction;

    fn sample(&self, rng: &mut dyn RngCore) -> Self::Action {
        DiscreteAction(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0 < self.n
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_discrete_space_contains() {
        let space = DiscreteSpace::new(4);
        assert!((0..4).all(|a| space.contains(&DiscreteAction(a))));
        assert!(!space.contains(&DiscreteAction(4)));
        assert!(!space.contains(&DiscreteAction(usize::MAX)));
        assert_eq!(space.dim(), Some(1));
    }

    #[test]
    fn test_sampling_is_seeded() {
        let space = DiscreteSpace::new(4);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        let first: Vec<_> = (0..32).map(|_| space.sample(&mut a)).collect();
        let second: Vec<_> = (0..32).map(|_| space.sample(&mut b)).collect();

        assert_eq!(first, second);
        assert!(first.iter().all(|action| space.contains(action)));
    }
}
