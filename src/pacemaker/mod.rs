/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol for deciding when a validator starts a round and when it gives up on one.
//!
//! ## Anchoring to genesis
//!
//! Deadlines are not measured from the moment a validator entered a view. Instead, every deadline is
//! `genesis_time + allowance * block_interval`, where the allowance is a number of block intervals
//! computed from the tip's [`TotalView`](crate::types::data_types::TotalView) and the current view.
//! Because every validator that agrees on the tip computes the same deadlines, validators that fall
//! behind catch up by skipping views whose deadlines have already passed, instead of each running its
//! own drifting timer.
//!
//! ## Exponential escalation
//!
//! Let `T` be the tip's total view and `v` the current view. Then:
//!
//! |Deadline|Allowance|
//! |---|---|
//! |Round in `v` starts (all validators)|`T + 2^(v+1) - 2`|
//! |Due miner of `v` gives up|`T + 2^(v+1) - 1`|
//! |Other validators give up on `v`|`T + 2^(v+2) - 2`|
//! |A validator that voted for view `e` escalates again|`T + 2^(e+2) - 2`|
//!
//! The window of view `v` doubles with every view, which gives a correct leader of a later view
//! enough time to propose even if validators' clocks are skewed.

pub mod implementation;

pub use implementation::{
    follower_allowance, leader_allowance, round_start_allowance, Clock, SystemClock,
};
