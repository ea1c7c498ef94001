//! Weighted pool of strategy parameters and their running scores.
//!
//! Every slot keeps the feedback it has received split into a positive and a
//! negative part. The first few good outcomes of a parameter count in full, so
//! a parameter that has been good a handful of times stays ahead of one that
//! has been good once, however often it is drawn. Past `good_cap` only the
//! rate of good outcomes per draw tells two successful parameters apart, which
//! keeps an early leader from locking in when a later one is good more often.
//! Negative feedback is judged as a rate per draw, so a parameter that is
//! drawn a lot and is occasionally bad is not pushed below one that has simply
//! not been tried yet.

use std::ops::Index;

use log::trace;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Index of a parameter inside its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(usize);

impl ParameterId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How scores turn into selection weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weighting {
    /// Merit gained per unit of positive score, up to `good_cap`
    pub good_gain: f64,
    /// Positive score beyond which `good_gain` stops accumulating
    pub good_cap: f64,
    /// Merit gained per unit of positive score per draw
    pub good_rate_gain: f64,
    /// Merit lost per unit of negative score per draw
    pub bad_gain: f64,
    /// Minimum weight relative to the best parameter in the pool
    pub exploration_floor: f64,
}

impl Default for Weighting {
    fn default() -> Self {
        Weighting {
            good_gain: 2.0,
            good_cap: 4.0,
            good_rate_gain: 8.0,
            bad_gain: 20.0,
            exploration_floor: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<P> {
    parameter: P,
    positive: f64,
    negative: f64,
    draws: u64,
}

impl<P> Slot<P> {
    fn score(&self) -> f64 {
        self.positive + self.negative
    }

    fn merit(&self, weighting: &Weighting) -> f64 {
        let draws = self.draws as f64 + 1.0;
        weighting.good_gain * self.positive.min(weighting.good_cap)
            + weighting.good_rate_gain * self.positive / draws
            + weighting.bad_gain * self.negative / draws
    }
}

/// Parameters owned by one example source, selectable by weighted random choice
#[derive(Debug, Clone)]
pub struct ParameterPool<P> {
    slots: Vec<Slot<P>>,
    weighting: Weighting,
}

impl<P> ParameterPool<P> {
    pub fn new(weighting: Weighting) -> Self {
        ParameterPool {
            slots: Vec::new(),
            weighting,
        }
    }

    /// Insert a parameter with a neutral score and no draws
    pub fn add(&mut self, parameter: P) -> ParameterId {
        self.slots.push(Slot {
            parameter,
            positive: 0.0,
            negative: 0.0,
            draws: 0,
        });
        ParameterId(self.slots.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of every parameter, in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ParameterId> {
        (0..self.slots.len()).map(ParameterId)
    }

    pub fn parameter(&self, id: ParameterId) -> Option<&P> {
        self.slots.get(id.0).map(|slot| &slot.parameter)
    }

    /// Cumulative score: the sum of every delta recorded for this parameter
    pub fn score(&self, id: ParameterId) -> Option<f64> {
        self.slots.get(id.0).map(Slot::score)
    }

    /// Total positive feedback recorded for this parameter
    pub fn positive(&self, id: ParameterId) -> Option<f64> {
        self.slots.get(id.0).map(|slot| slot.positive)
    }

    pub fn draws(&self, id: ParameterId) -> Option<u64> {
        self.slots.get(id.0).map(|slot| slot.draws)
    }

    /// Highest cumulative score currently held by any parameter
    pub fn best_score(&self) -> Option<f64> {
        self.slots.iter().map(Slot::score).fold(None, |best, score| match best {
            Some(best) if best >= score => Some(best),
            _ => Some(score),
        })
    }

    /// Selection weights, normalised so the best parameter weighs 1.0
    pub fn weights(&self) -> Vec<f64> {
        let merits: Vec<f64> = self
            .slots
            .iter()
            .map(|slot| slot.merit(&self.weighting))
            .collect();
        let best = merits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        merits
            .iter()
            .map(|merit| (merit - best).exp().max(self.weighting.exploration_floor))
            .collect()
    }

    /// Pick a parameter at random in proportion to its weight and count the
    /// draw against it. Returns `None` only when the pool is empty.
    pub fn select(&mut self, rng: &mut ChaCha8Rng) -> Option<ParameterId> {
        if self.slots.is_empty() {
            return None;
        }

        let weights = self.weights();
        let total: f64 = weights.iter().sum();
        let mut target = rng.gen::<f64>() * total;

        // Rounding can leave a sliver of `target` past the last weight.
        let mut chosen = weights.len() - 1;
        for (index, weight) in weights.iter().enumerate() {
            if target < *weight {
                chosen = index;
                break;
            }
            target -= weight;
        }

        trace!(
            "selected parameter {} of {} (weight {:.3e} of {:.3e})",
            chosen,
            weights.len(),
            weights[chosen],
            total
        );
        let id = ParameterId(chosen);
        self.record_draw(id);
        Some(id)
    }

    pub fn record_draw(&mut self, id: ParameterId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.draws += 1;
        }
    }

    /// Adjust a parameter's score: positive deltas for good outcomes, negative
    /// for bad ones. Unknown ids are ignored.
    pub fn record_outcome(&mut self, id: ParameterId, delta: f64) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if delta >= 0.0 {
                slot.positive += delta;
            } else {
                slot.negative += delta;
            }
        }
    }
}

/// Ids are only minted by `add`, so indexing with one from the same pool
/// never fails.
impl<P> Index<ParameterId> for ParameterPool<P> {
    type Output = P;

    fn index(&self, id: ParameterId) -> &P {
        &self.slots[id.0].parameter
    }
}

impl<P> Default for ParameterPool<P> {
    fn default() -> Self {
        Self::new(Weighting::default())
    }
}
