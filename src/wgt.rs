use crate::prelude::Mass;

/// Mixing proportions of the active components followed by the mass reserved for
/// opening a new component. Always normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights(Vec<f64>);

impl Weights {
    /// Weights with no active component: all mass goes to a new component.
    pub fn only_new() -> Weights {
        Weights(vec![1.0])
    }

    /// Occupation counts shifted by the mass, with the mass alone for a new component.
    pub fn from_counts(counts: &[usize], mass: Mass) -> Weights {
        let w: Vec<f64> = counts
            .iter()
            .map(|&count| count as f64 + mass)
            .chain(std::iter::once(mass.unwrap()))
            .collect();
        Weights::normalized(w)
    }

    pub fn from(w: &[f64]) -> Option<Weights> {
        if w.is_empty() {
            return None;
        }
        for ww in w.iter() {
            if ww.is_nan() || ww.is_infinite() || *ww < 0.0 {
                return None;
            }
        }
        if w.iter().sum::<f64>() <= 0.0 {
            return None;
        }
        Some(Weights::normalized(Vec::from(w)))
    }

    fn normalized(mut w: Vec<f64>) -> Weights {
        let sum: f64 = w.iter().sum();
        for ww in w.iter_mut() {
            *ww /= sum;
        }
        Weights(w)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of active components covered by these weights.
    pub fn n_components(&self) -> usize {
        self.0.len() - 1
    }

    /// Weight of opening a new component.
    pub fn new_component(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0[..]
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights::only_new()
    }
}

impl std::ops::Index<usize> for Weights {
    type Output = f64;
    fn index(&self, i: usize) -> &Self::Output {
        &self.0[i]
    }
}
