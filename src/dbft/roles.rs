/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and traits that determine what role a validator plays in a given view.
//!
//! Leader duty is delegated to a [`RoundSchedule`]. The default [`RoundRobinSchedule`] rotates the leader
//! by height and view. Hosts that rotate `next_miners` themselves opt into [`HostRotatedSchedule`].

use crate::types::{
    data_types::{Address, ViewNumber},
    validator_set::is_quorum,
};

use super::types::Tip;

/// Decides which validator is due to propose in a view, and how many votes make a decision binding.
pub trait RoundSchedule: Send {
    /// Deterministically pick the validator due to propose the block on top of `tip` in `view`.
    ///
    /// Returns `None` only if `tip.next_miners` is empty.
    fn due_miner(&self, tip: &Tip, view: ViewNumber) -> Option<Address>;

    /// Check whether `vote_count` matching votes out of `validator_count` validators are enough to make
    /// a decision binding. Used for both the agreement quorum and the change-view quorum.
    fn quorum_reached(&self, validator_count: usize, vote_count: usize) -> bool {
        is_quorum(validator_count, vote_count)
    }
}

/// Picks `next_miners[(height + view) mod len]`, where `height` is the height of the block being
/// proposed. Over a fixed `next_miners` order, the miner due in view 0 moves by one position every height.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobinSchedule;

impl RoundSchedule for RoundRobinSchedule {
    fn due_miner(&self, tip: &Tip, view: ViewNumber) -> Option<Address> {
        let height = tip.header.number.int().wrapping_add(1);
        select_miner(&tip.next_miners, height.wrapping_add(view.int()))
    }
}

/// Picks `next_miners[view mod len]`, ignoring the height.
///
/// Only for hosts that rotate `next_miners` themselves when they advance the tip, so that the first entry
/// is the validator due in view 0 of the next height.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostRotatedSchedule;

impl RoundSchedule for HostRotatedSchedule {
    fn due_miner(&self, tip: &Tip, view: ViewNumber) -> Option<Address> {
        select_miner(&tip.next_miners, view.int())
    }
}

fn select_miner(next_miners: &[Address], index: u64) -> Option<Address> {
    if next_miners.is_empty() {
        return None;
    }
    let position = (index % next_miners.len() as u64) as usize;
    Some(next_miners[position])
}
