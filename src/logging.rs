/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via replica's
//! [config](crate::replica::Configuration).
//!
//! dBFT-rs logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReceiveProposal](crate::events::ReceiveProposalEvent) is printed:
//!
//! ```text
//! ReceiveProposal, 1701329264, 3f2a91c0, fNGCJyk, 11, 0
//! ```
//!
//! In the snippet:
//! - The third value is the first eight hex characters of the address of the origin of the proposal.
//! - The fourth value is the first seven characters of the Base64 encoding of the hash of the proposed
//!   block.
//! - The fifth value is the height of the proposed block.
//! - The sixth value is the view in which the block was proposed.
//!
//! Aborted rounds, and messages dropped because they were
//! [rejected](crate::dbft::MessageVerdict::Rejected), are logged at the `warn` level. Every other event
//! is logged at the `info` level.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;
use std::time::SystemTime;

use crate::{events::*, types::data_types::Address};

// Names of each event in PascalCase for printing:
pub const UPDATE_TIP: &str = "UpdateTip";

pub const PROPOSE: &str = "Propose";
pub const PREPARE_RESPONSE: &str = "PrepareResponse";
pub const CHANGE_VIEW: &str = "ChangeView";

pub const RECEIVE_PROPOSAL: &str = "ReceiveProposal";
pub const RECEIVE_PREPARE_RESPONSE: &str = "ReceivePrepareResponse";
pub const RECEIVE_CHANGE_VIEW: &str = "ReceiveChangeView";
pub const DROP_MESSAGE: &str = "DropMessage";

pub const START_ROUND: &str = "StartRound";
pub const MINE_BLOCK: &str = "MineBlock";
pub const VIEW_TIMEOUT: &str = "ViewTimeout";
pub const CHANGE_VIEW_SUCCESS: &str = "ChangeViewSuccess";
pub const CATCH_UP: &str = "CatchUp";
pub const ABORT_ROUND: &str = "AbortRound";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for UpdateTipEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_tip_event: &UpdateTipEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                UPDATE_TIP,
                secs_since_unix_epoch(update_tip_event.timestamp),
                first_seven_base64_chars(&update_tip_event.hash.bytes()),
                update_tip_event.number,
                update_tip_event.total_view.int(),
                update_tip_event.next_miners.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                first_seven_base64_chars(&propose_event.block.hash().bytes()),
                propose_event.block.number(),
                propose_event.block.header.header.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for PrepareResponseEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |prepare_response_event: &PrepareResponseEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PREPARE_RESPONSE,
                secs_since_unix_epoch(prepare_response_event.timestamp),
                first_seven_base64_chars(&prepare_response_event.hash.bytes()),
                prepare_response_event.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ChangeViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |change_view_event: &ChangeViewEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CHANGE_VIEW,
                secs_since_unix_epoch(change_view_event.timestamp),
                change_view_event.view,
                change_view_event.new_view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_proposal_event: &ReceiveProposalEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RECEIVE_PROPOSAL,
                secs_since_unix_epoch(receive_proposal_event.timestamp),
                short_address(&receive_proposal_event.origin),
                first_seven_base64_chars(&receive_proposal_event.block.hash().bytes()),
                receive_proposal_event.block.number(),
                receive_proposal_event.block.header.header.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceivePrepareResponseEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_prepare_response_event: &ReceivePrepareResponseEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RECEIVE_PREPARE_RESPONSE,
                secs_since_unix_epoch(receive_prepare_response_event.timestamp),
                short_address(&receive_prepare_response_event.origin),
                first_seven_base64_chars(&receive_prepare_response_event.hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveChangeViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_change_view_event: &ReceiveChangeViewEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RECEIVE_CHANGE_VIEW,
                secs_since_unix_epoch(receive_change_view_event.timestamp),
                short_address(&receive_change_view_event.origin),
                receive_change_view_event.new_view
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_message_event: &DropMessageEvent| {
            let level = if drop_message_event.rejected {
                log::Level::Warn
            } else {
                log::Level::Info
            };
            log::log!(
                level,
                "{}, {}, {}, {}, {}",
                DROP_MESSAGE,
                secs_since_unix_epoch(drop_message_event.timestamp),
                drop_message_event.command,
                drop_message_event.rejected,
                drop_message_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for StartRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_round_event: &StartRoundEvent| {
            log::info!(
                "{}, {}, {}, {}",
                START_ROUND,
                secs_since_unix_epoch(start_round_event.timestamp),
                start_round_event.view,
                short_address(&start_round_event.due_miner)
            )
        };
        Box::new(logger)
    }
}

impl Logger for MineBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |mine_block_event: &MineBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                MINE_BLOCK,
                secs_since_unix_epoch(mine_block_event.timestamp),
                first_seven_base64_chars(&mine_block_event.block.hash().bytes()),
                mine_block_event.block.number(),
                mine_block_event.view,
                mine_block_event.block.header.quorum_signatures().len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ViewTimeoutEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |view_timeout_event: &ViewTimeoutEvent| {
            log::info!(
                "{}, {}, {}",
                VIEW_TIMEOUT,
                secs_since_unix_epoch(view_timeout_event.timestamp),
                view_timeout_event.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ChangeViewSuccessEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |change_view_success_event: &ChangeViewSuccessEvent| {
            log::info!(
                "{}, {}, {}",
                CHANGE_VIEW_SUCCESS,
                secs_since_unix_epoch(change_view_success_event.timestamp),
                change_view_success_event.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for CatchUpEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |catch_up_event: &CatchUpEvent| {
            log::info!(
                "{}, {}, {}",
                CATCH_UP,
                secs_since_unix_epoch(catch_up_event.timestamp),
                catch_up_event.skipped_view
            )
        };
        Box::new(logger)
    }
}

impl Logger for AbortRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |abort_round_event: &AbortRoundEvent| {
            log::warn!(
                "{}, {}, {}",
                ABORT_ROUND,
                secs_since_unix_epoch(abort_round_event.timestamp),
                abort_round_event.view
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Get the first 8 hex characters of an address.
fn short_address(address: &Address) -> String {
    let mut encoded = hex::encode(address.bytes());
    encoded.truncate(8);
    encoded
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
