/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Deadline arithmetic and the single deadline timer of a validator.
//!
//! Main type: [`TimeoutScheduler`].

use std::time::{Duration, SystemTime};

use crate::types::data_types::{TotalView, ViewNumber};

/// Largest offset from the genesis time that a deadline can have, about 136 years.
const MAX_OFFSET_MILLIS: u64 = u32::MAX as u64 * 1000;

/// Largest exponent used when computing `2^(view + k)`. Views beyond this escalate no further.
const MAX_EXPONENT: u64 = 62;

/// Source of wall-clock time for the consensus engine.
pub trait Clock: Send {
    /// Get the current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Configuration variables for the [`TimeoutScheduler`].
#[derive(Clone, Debug)]
pub(crate) struct TimeoutConfiguration {
    /// The time at which block intervals start counting.
    pub(crate) genesis_time: SystemTime,

    /// Duration of one block interval.
    pub(crate) block_interval: Duration,
}

/// Holds the single deadline of a validator and converts allowances, measured in block intervals since
/// the genesis time, into absolute deadlines.
///
/// # Usage
///
/// The scheduler does not own a thread. Its owner [`arm`](Self::arm)s a deadline and checks
/// [`expired`](Self::expired) whenever it gets the chance, which is how the
/// [algorithm thread](crate::algorithm) drives the engine's `tick`.
pub(crate) struct TimeoutScheduler {
    config: TimeoutConfiguration,
    deadline: Option<SystemTime>,
}

impl TimeoutScheduler {
    /// Create a scheduler with no deadline armed.
    pub(crate) fn new(config: TimeoutConfiguration) -> Self {
        Self {
            config,
            deadline: None,
        }
    }

    /// Convert `allowance` block intervals into the absolute deadline `genesis_time + allowance * block_interval`.
    pub(crate) fn deadline(&self, allowance: u64) -> SystemTime {
        let interval_millis =
            u64::try_from(self.config.block_interval.as_millis()).unwrap_or(u64::MAX);
        let offset_millis = interval_millis
            .saturating_mul(allowance)
            .min(MAX_OFFSET_MILLIS);
        self.config.genesis_time + Duration::from_millis(offset_millis)
    }

    /// Replace the armed deadline with `deadline`.
    pub(crate) fn arm(&mut self, deadline: SystemTime) {
        self.deadline = Some(deadline);
    }

    /// Remove the armed deadline, if any.
    pub(crate) fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Get the armed deadline, if any.
    pub(crate) fn armed(&self) -> Option<SystemTime> {
        self.deadline
    }

    /// Check whether a deadline is armed and has been reached at `now`.
    pub(crate) fn expired(&self, now: SystemTime) -> bool {
        self.armed().is_some_and(|deadline| deadline <= now)
    }
}

/// Block intervals after which a round in `view` starts, for every validator.
///
/// `total_view + 2^(view+1) - 2`.
pub fn round_start_allowance(total_view: TotalView, view: ViewNumber) -> u64 {
    total_view
        .int()
        .saturating_add(pow2(view.int().saturating_add(1)))
        .saturating_sub(2)
}

/// Block intervals after which the due miner of `view` gives up on its own round.
///
/// `total_view + 2^(view+1) - 1`.
pub fn leader_allowance(total_view: TotalView, view: ViewNumber) -> u64 {
    total_view
        .int()
        .saturating_add(pow2(view.int().saturating_add(1)))
        .saturating_sub(1)
}

/// Block intervals after which a validator that is not due in `view` gives up on the round.
///
/// `total_view + 2^(view+2) - 2`. A validator that voted to change to `expect_view` waits
/// `follower_allowance(total_view, expect_view)` before escalating further.
pub fn follower_allowance(total_view: TotalView, view: ViewNumber) -> u64 {
    total_view
        .int()
        .saturating_add(pow2(view.int().saturating_add(2)))
        .saturating_sub(2)
}

fn pow2(exponent: u64) -> u64 {
    1u64 << exponent.min(MAX_EXPONENT)
}
