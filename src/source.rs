//! Adaptive, caller-pulled sequence of candidate examples.
//!
//! An `ExampleSource` first replays every example stored for its strategy,
//! then generates fresh ones forever. Generation draws from a pool of
//! strategy parameters; `mark_good` and `mark_bad` feedback on the last
//! generated value moves the pool's weights towards the parameters that keep
//! producing interesting examples, and grows the pool when the current
//! parameters stop being good enough.

use std::fmt;
use std::vec;

use log::{debug, trace};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::database::Storage;
use crate::errors::{FeedbackMisuse, SourceError};
use crate::pool::{ParameterId, ParameterPool, Weighting};
use crate::strategy::Strategy;

/// Tuning of an example source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Parameters drawn before the pool starts selecting among them
    pub min_parameters: usize,

    /// The pool never grows past this many parameters
    pub pool_ceiling: usize,

    /// Score change on `mark_good`
    pub good_delta: f64,

    /// Score change on `mark_bad`
    pub bad_delta: f64,

    /// Merit per unit of positive score, up to `good_cap`
    pub good_gain: f64,

    /// Positive score past which only the success rate adds merit
    pub good_cap: f64,

    /// Merit per unit of positive score per draw
    pub good_rate_gain: f64,

    /// Merit per unit of bad outcomes per draw
    pub bad_gain: f64,

    /// Minimum selection weight relative to the best parameter
    pub exploration_floor: f64,

    /// Generated draws per bad-rate evaluation
    pub growth_window: usize,

    /// Fraction of bad draws in a window above which the pool grows
    pub bad_rate_threshold: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let weighting = Weighting::default();
        SourceConfig {
            min_parameters: 32,
            pool_ceiling: 256,
            good_delta: 1.0,
            bad_delta: -1.0,
            good_gain: weighting.good_gain,
            good_cap: weighting.good_cap,
            good_rate_gain: weighting.good_rate_gain,
            bad_gain: weighting.bad_gain,
            exploration_floor: weighting.exploration_floor,
            growth_window: 12,
            bad_rate_threshold: 0.1,
        }
    }
}

impl SourceConfig {
    pub fn weighting(&self) -> Weighting {
        Weighting {
            good_gain: self.good_gain,
            good_cap: self.good_cap,
            good_rate_gain: self.good_rate_gain,
            bad_gain: self.bad_gain,
            exploration_floor: self.exploration_floor,
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        let invalid = |reason: String| Err(SourceError::Configuration(reason));

        if self.min_parameters == 0 {
            return invalid("min_parameters must be at least 1".to_string());
        }
        if self.pool_ceiling < self.min_parameters {
            return invalid(format!(
                "pool_ceiling ({}) is below min_parameters ({})",
                self.pool_ceiling, self.min_parameters
            ));
        }
        if !(self.good_delta > 0.0 && self.good_delta.is_finite()) {
            return invalid(format!("good_delta must be positive, got {}", self.good_delta));
        }
        if !(self.bad_delta < 0.0 && self.bad_delta.is_finite()) {
            return invalid(format!("bad_delta must be negative, got {}", self.bad_delta));
        }
        if !(self.exploration_floor > 0.0 && self.exploration_floor <= 1.0) {
            return invalid(format!(
                "exploration_floor must be in (0, 1], got {}",
                self.exploration_floor
            ));
        }
        if !(self.good_gain >= 0.0 && self.good_gain.is_finite()) {
            return invalid(format!(
                "good_gain must be finite and non-negative, got {}",
                self.good_gain
            ));
        }
        if !(self.good_rate_gain >= 0.0 && self.good_rate_gain.is_finite()) {
            return invalid(format!(
                "good_rate_gain must be finite and non-negative, got {}",
                self.good_rate_gain
            ));
        }
        if !(self.good_cap > 0.0) {
            return invalid(format!("good_cap must be positive, got {}", self.good_cap));
        }
        if !(self.bad_gain >= 0.0 && self.bad_gain.is_finite()) {
            return invalid(format!(
                "bad_gain must be finite and non-negative, got {}",
                self.bad_gain
            ));
        }
        if self.growth_window == 0 {
            return invalid("growth_window must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.bad_rate_threshold) {
            return invalid(format!(
                "bad_rate_threshold must be in [0, 1], got {}",
                self.bad_rate_threshold
            ));
        }
        Ok(())
    }
}

/// Where a source is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// Nothing pulled yet
    New,
    /// Between values; no generated value is waiting for feedback
    Iterating,
    /// The last value was generated and may receive feedback
    AwaitingFeedback,
    /// No strategy and nothing left to replay. Terminal.
    Exhausted,
}

/// The generated value currently eligible for feedback
#[derive(Debug)]
struct Draw<V> {
    parameter: ParameterId,
    value: V,
}

#[derive(Debug)]
enum LastPull<V> {
    Nothing,
    Replayed,
    Pending(Draw<V>),
    Resolved,
}

/// Builder for `ExampleSource`. The entropy source is required, as is at
/// least one of strategy and storage.
pub struct SourceBuilder<'db, S: Strategy> {
    entropy: Option<ChaCha8Rng>,
    strategy: Option<S>,
    storage: Option<Storage<'db, S>>,
    config: SourceConfig,
}

impl<'db, S: Strategy> SourceBuilder<'db, S> {
    pub fn entropy(mut self, rng: ChaCha8Rng) -> Self {
        self.entropy = Some(rng);
        self
    }

    pub fn strategy(mut self, strategy: S) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn storage(mut self, storage: Storage<'db, S>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the whole tuning block. Later calls to `min_parameters` still
    /// apply on top of it.
    pub fn config(mut self, config: SourceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn min_parameters(mut self, min_parameters: usize) -> Self {
        self.config.min_parameters = min_parameters;
        self
    }

    pub fn build(self) -> Result<ExampleSource<'db, S>, SourceError> {
        let rng = self.entropy.ok_or_else(|| {
            SourceError::Configuration("an entropy source is required".to_string())
        })?;
        if self.strategy.is_none() && self.storage.is_none() {
            return Err(SourceError::Configuration(
                "at least one of strategy and storage is required".to_string(),
            ));
        }
        self.config.validate()?;

        debug!(
            "building example source (strategy: {}, storage: {}, min_parameters: {})",
            self.strategy.is_some(),
            self.storage.is_some(),
            self.config.min_parameters
        );

        Ok(ExampleSource {
            rng,
            strategy: self.strategy,
            storage: self.storage,
            replay: None,
            pool: ParameterPool::new(self.config.weighting()),
            config: self.config,
            state: SourceState::New,
            last: LastPull::Nothing,
            window_draws: 0,
            window_bad: 0,
        })
    }
}

/// Steered, unbounded sequence of examples for one strategy
pub struct ExampleSource<'db, S: Strategy> {
    rng: ChaCha8Rng,
    strategy: Option<S>,
    storage: Option<Storage<'db, S>>,
    /// Stored strings still to replay, fetched on the first pull
    replay: Option<vec::IntoIter<String>>,
    pool: ParameterPool<S::Parameter>,
    config: SourceConfig,
    state: SourceState,
    last: LastPull<S::Value>,
    window_draws: usize,
    window_bad: usize,
}

impl<S: Strategy> fmt::Debug for ExampleSource<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleSource")
            .field("state", &self.state)
            .field("parameters", &self.pool.len())
            .field("has_strategy", &self.strategy.is_some())
            .field("has_storage", &self.storage.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<'db, S: Strategy> ExampleSource<'db, S> {
    pub fn builder() -> SourceBuilder<'db, S> {
        SourceBuilder {
            entropy: None,
            strategy: None,
            storage: None,
            config: SourceConfig::default(),
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Number of parameters in the pool
    pub fn parameter_count(&self) -> usize {
        self.pool.len()
    }

    pub fn pool(&self) -> &ParameterPool<S::Parameter> {
        &self.pool
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Next example: stored ones first, then generated ones. `Ok(None)` means
    /// the sequence has ended, which only happens without a strategy.
    pub fn pull(&mut self) -> Result<Option<S::Value>, SourceError> {
        if self.state == SourceState::Exhausted {
            return Ok(None);
        }

        if self.state == SourceState::New {
            if let Some(storage) = &self.storage {
                let stored = storage.fetch_encoded()?;
                debug!("replaying {} stored examples", stored.len());
                self.replay = Some(stored.into_iter());
            }
            self.state = SourceState::Iterating;
        }

        if let Some(value) = self.next_replayed()? {
            return Ok(Some(value));
        }

        self.generate()
    }

    fn next_replayed(&mut self) -> Result<Option<S::Value>, SourceError> {
        let (replay, storage) = match (self.replay.as_mut(), self.storage.as_ref()) {
            (Some(replay), Some(storage)) => (replay, storage),
            _ => return Ok(None),
        };

        match replay.next() {
            Some(encoded) => {
                self.last = LastPull::Replayed;
                self.state = SourceState::Iterating;
                trace!("replaying {:?}", encoded);
                Ok(Some(storage.decode(&encoded)?))
            }
            None => {
                trace!("replay finished");
                self.replay = None;
                Ok(None)
            }
        }
    }

    fn generate(&mut self) -> Result<Option<S::Value>, SourceError> {
        let strategy = match &self.strategy {
            Some(strategy) => strategy,
            None => {
                debug!("no strategy to generate from, source exhausted");
                self.state = SourceState::Exhausted;
                return Ok(None);
            }
        };

        let selected = if self.pool.len() < self.config.min_parameters {
            None
        } else {
            self.pool.select(&mut self.rng)
        };
        let id = match selected {
            Some(id) => id,
            None => {
                let id = self.pool.add(strategy.draw_parameter(&mut self.rng));
                self.pool.record_draw(id);
                trace!("warm-up parameter {} drawn", id.index());
                id
            }
        };

        let value = strategy.produce(&mut self.rng, &self.pool[id]);
        self.window_draws += 1;
        self.last = LastPull::Pending(Draw {
            parameter: id,
            value: value.clone(),
        });
        self.state = SourceState::AwaitingFeedback;
        Ok(Some(value))
    }

    fn pending(&self) -> Result<&Draw<S::Value>, FeedbackMisuse> {
        match &self.last {
            LastPull::Pending(draw) => Ok(draw),
            LastPull::Nothing => Err(FeedbackMisuse::NoDraw),
            LastPull::Replayed => Err(FeedbackMisuse::Replayed),
            LastPull::Resolved => Err(FeedbackMisuse::AlreadyResolved),
        }
    }

    fn resolve(&mut self) {
        self.last = LastPull::Resolved;
        self.state = SourceState::Iterating;
    }

    /// Report the last generated value as interesting. It is saved to storage
    /// first; if saving fails the value stays pending and nothing is scored.
    ///
    /// The pool grows when this is the parameter's first good value, so the
    /// number of parameters that have ever succeeded sets the record. Further
    /// successes of the same parameter only raise its score.
    pub fn mark_good(&mut self) -> Result<(), SourceError> {
        let draw = self.pending()?;
        if let Some(storage) = &self.storage {
            storage.save(&draw.value)?;
        }
        let id = draw.parameter;
        self.resolve();

        let first_success = self.pool.positive(id) == Some(0.0);
        self.pool.record_outcome(id, self.config.good_delta);
        trace!(
            "parameter {} marked good, score {}",
            id.index(),
            self.pool.score(id).unwrap_or_default()
        );
        if first_success {
            self.grow("first success of a parameter");
        }
        Ok(())
    }

    /// Report the last generated value as uninteresting
    pub fn mark_bad(&mut self) -> Result<(), SourceError> {
        let id = self.pending()?.parameter;
        self.resolve();

        self.pool.record_outcome(id, self.config.bad_delta);
        self.window_bad += 1;
        trace!(
            "parameter {} marked bad ({} of {} in window)",
            id.index(),
            self.window_bad,
            self.window_draws
        );

        if self.window_draws >= self.config.growth_window {
            let bad_rate = self.window_bad as f64 / self.window_draws as f64;
            if bad_rate > self.config.bad_rate_threshold {
                self.grow("bad rate above threshold");
            }
            self.window_draws = 0;
            self.window_bad = 0;
        }
        Ok(())
    }

    fn grow(&mut self, reason: &str) {
        if self.pool.len() >= self.config.pool_ceiling {
            trace!("pool at ceiling of {}, not growing", self.config.pool_ceiling);
            return;
        }
        if let Some(strategy) = &self.strategy {
            self.pool.add(strategy.draw_parameter(&mut self.rng));
            debug!("pool grew to {} parameters: {}", self.pool.len(), reason);
        }
    }
}

impl<S: Strategy> Iterator for ExampleSource<'_, S> {
    type Item = Result<S::Value, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull().transpose()
    }
}
