//! Observation representations and observation spaces

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for observations from an environment
pub trait Observation: Clone + Debug + Send + Sync {
    /// Convert observation to a feature vector
    fn to_vec(&self) -> Vec<f64>;

    /// Get the shape of the observation
    fn shape(&self) -> Vec<usize>;
}

/// Trait for defining observation spaces
pub trait ObservationSpace: Send + Sync {
    /// The type of observations in this space
    type Observation: Observation;

    /// Sample a random observation from the space
    fn sample(&self, rng: &mut dyn RngCore) -> Self::Observation;

    /// Check if an observation is valid within this space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Get the shape of observations in this space
    fn shape(&self) -> Vec<usize>;
}

/// Vector observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// The observation data
    pub data: Vec<f64>,
}

impl Observation for VectorObservation {
    fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.data.len()]
    }
}

/// Box observation space, closed bounds per dimension
#[derive(Debug, Clone, PartialEq)]
pub struct BoxObservationSpace {
    /// Lower bounds
    pub low: Vec<f64>,
    /// Upper bounds
    pub high: Vec<f64>,
    /// Shape of observations
    pub shape: Vec<usize>,
}

impl BoxObservationSpace {
    /// Create a new box observation space
    pub fn new(low: Vec<f64>, high: Vec<f64>, shape: Vec<usize>) -> crate::Result<Self> {
        let total_size: usize = shape.iter().product();
        if low.len() != total_size || high.len() != total_size {
            return Err(crate::RLError::DimensionMismatch {
                expected: total_size,
                actual: low.len(),
            });
        }
        if low.iter().zip(&high).any(|(l, h)| l > h) {
            return Err(crate::RLError::InvalidState(
                "box lower bound exceeds upper bound".to_string(),
            ));
        }
        Ok(Self { low, high, shape })
    }

    /// Check a raw feature vector against the bounds
    #[must_use]
    pub fn contains_values(&self, values: &[f64]) -> bool {
        values.len() == self.low.len()
            && values
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }
}

impl ObservationSpace for BoxObservationSpace {
    type Observation = VectorObservation;

    fn sample(&self, rng: &mut dyn RngCore) -> Self::Observation {
        let data: Vec<f64> = self
            .low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| rng.gen_range(*l..=*h))
            .collect();

        VectorObservation { data }
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        self.contains_values(&obs.data)
    }

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ventilation_box() -> BoxObservationSpace {
        BoxObservationSpace::new(vec![0.0, 400.0, -100.0], vec![3.0, 3000.0, 100.0], vec![3])
            .unwrap()
    }

    #[test]
    fn test_box_rejects_mismatched_bounds() {
        let err = BoxObservationSpace::new(vec![0.0], vec![1.0, 2.0], vec![2]).unwrap_err();
        assert!(matches!(err, crate::RLError::DimensionMismatch { expected: 2, actual: 1 }));

        assert!(BoxObservationSpace::new(vec![1.0], vec![0.0], vec![1]).is_err());
    }

    #[test]
    fn test_box_contains_is_inclusive() {
        let space = ventilation_box();
        assert!(space.contains_values(&[0.0, 400.0, -100.0]));
        assert!(space.contains_values(&[3.0, 3000.0, 100.0]));
        assert!(!space.contains_values(&[3.0, 3000.1, 0.0]));
        assert!(!space.contains_values(&[0.0, 400.0]));
    }

    #[test]
    fn test_degenerate_dimension_samples() {
        let space =
            BoxObservationSpace::new(vec![0.0, 400.0, 0.0], vec![3.0, 3000.0, 0.0], vec![3])
                .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let obs = space.sample(&mut rng);
        assert_eq!(obs.data[2], 0.0);
        assert_eq!(obs.shape(), vec![3]);
    }

    proptest! {
        #[test]
        fn samples_stay_in_bounds(seed in any::<u64>()) {
            let space = ventilation_box();
            let mut rng = StdRng::seed_from_u64(seed);
            let obs = space.sample(&mut rng);
            prop_assert!(space.contains(&obs));
        }
    }
}
