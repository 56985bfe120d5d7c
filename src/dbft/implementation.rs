/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the dBFT state machine.
//!
//! Main type: [`DbftConsensusEngine`].

use std::{
    sync::mpsc::Sender,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    events::{
        AbortRoundEvent, CatchUpEvent, ChangeViewEvent, ChangeViewSuccessEvent, DropMessageEvent,
        Event, MineBlockEvent, PrepareResponseEvent, ProposeEvent, ReceiveChangeViewEvent,
        ReceivePrepareResponseEvent, ReceiveProposalEvent, StartRoundEvent, UpdateTipEvent,
        ViewTimeoutEvent,
    },
    host::{CreateBlockRequest, Host, MineBlockRequest, VerifyBlockRequest},
    networking::{
        messages::{DecodeError, WireMessage},
        network::{Network, ValidatorUpdateHandle},
        sending::SenderHandle,
    },
    pacemaker::implementation::{
        follower_allowance, leader_allowance, round_start_allowance, Clock, TimeoutScheduler,
    },
    types::{
        block::{Block, BlockHeader, QuorumEntry},
        crypto_primitives::Keypair,
        data_types::{Address, CryptoHash, TotalView, ViewNumber},
    },
};

use super::{
    messages::{ChangeView, DbftMessage, PrepareRequest, PrepareResponse, QuorumSignature},
    roles::RoundSchedule,
    types::{ChangeViewBallot, ConsensusContext, ConsensusState, PreSigns, Signs, Tip},
};

/// Upper bound on how many views a single rearm skips. Past this, view windows no longer grow.
const MAX_CATCH_UP_VIEWS: usize = 64;

/// A single validator's dBFT state machine.
///
/// # Usage
///
/// The engine is driven by three kinds of calls, which must never interleave:
/// 1. [`tick`](Self::tick): called as often as is practical. Fires the armed deadline, if it passed.
/// 2. [`on_receive_msg`](Self::on_receive_msg): called for every [`WireMessage`] received from the network.
/// 3. The host's answers: [`update_tip`](Self::update_tip), [`new_proposal`](Self::new_proposal), and
///    [`agree_proposal`](Self::agree_proposal).
///
/// In return, the engine calls the [`Host`] to create, verify, and mine blocks, and broadcasts
/// [`DbftMessage`]s through the [`Network`].
pub(crate) struct DbftConsensusEngine<N: Network, H: Host> {
    config: DbftConfiguration,
    tip: Option<Tip>,
    context: ConsensusContext,
    ballot: ChangeViewBallot,
    timeouts: TimeoutScheduler,
    schedule: Box<dyn RoundSchedule>,
    host: H,
    clock: Box<dyn Clock>,
    sender_handle: SenderHandle<N>,
    validator_update_handle: ValidatorUpdateHandle<N>,
    event_publisher: Option<Sender<Event>>,
}

impl<N: Network, H: Host> DbftConsensusEngine<N, H> {
    /// Create a new engine. It has no tip and stays idle until the first [`update_tip`](Self::update_tip).
    pub(crate) fn new(
        config: DbftConfiguration,
        timeouts: TimeoutScheduler,
        schedule: Box<dyn RoundSchedule>,
        host: H,
        clock: Box<dyn Clock>,
        network: N,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        Self {
            config,
            tip: None,
            context: ConsensusContext::default(),
            ballot: ChangeViewBallot::new(),
            timeouts,
            schedule,
            host,
            clock,
            sender_handle: SenderHandle::new(network.clone()),
            validator_update_handle: ValidatorUpdateHandle::new(network),
            event_publisher,
        }
    }

    /// Replace the tip with `header`, cancelling the in-flight round.
    ///
    /// Returns `false` and does nothing if `header` is the current tip.
    ///
    /// ## Internal procedure
    ///
    /// 1. Install the new tip and inform the network of its `next_miners`.
    /// 2. Reset the context to `None` in view 0 and clear the ballot.
    /// 3. Rearm the deadline. If the round of view 0 should already have started, it starts now.
    pub(crate) fn update_tip(
        &mut self,
        header: BlockHeader,
        next_miners: Vec<Address>,
        total_view: TotalView,
    ) -> bool {
        let hash = header.hash();
        if self.tip.as_ref().is_some_and(|tip| tip.hash == hash) {
            return false;
        }

        // 1. Install the new tip.
        let tip = Tip::new(header, next_miners, total_view);
        self.validator_update_handle
            .update_validators(&tip.next_miners);
        Event::UpdateTip(UpdateTipEvent {
            timestamp: self.clock.now(),
            hash: tip.hash,
            number: tip.header.number,
            total_view: tip.total_view,
            next_miners: tip.next_miners.clone(),
        })
        .publish(&self.event_publisher);
        self.tip = Some(tip);

        // 2. Reset the round.
        self.context = ConsensusContext::default();
        self.ballot.clear();

        // 3. Rearm.
        self.rearm();

        true
    }

    /// Fire the armed deadline if it has passed.
    ///
    /// If no round has started in the current view, this starts it. Otherwise the local validator
    /// gives up on the current view and votes to change to the next one.
    pub(crate) fn tick(&mut self) {
        if !self.timeouts.expired(self.clock.now()) {
            return;
        }
        self.timeouts.disarm();

        if self.tip.is_none() {
            return;
        }

        if self.context.is_idle() {
            self.rearm();
        } else {
            self.on_view_timeout();
        }
    }

    /// Process a message received from the network.
    ///
    /// The returned verdict tells the caller whether the message changed state, was irrelevant
    /// ([`Ignored`](MessageVerdict::Ignored)), or should count against its sender
    /// ([`Rejected`](MessageVerdict::Rejected)).
    pub(crate) fn on_receive_msg(&mut self, msg: &WireMessage) -> MessageVerdict {
        let verdict = match DbftMessage::try_from(msg) {
            Err(err) => MessageVerdict::Rejected(RejectReason::Malformed(err)),
            Ok(_) if self.tip.is_none() => MessageVerdict::Ignored(IgnoreReason::NoTip),
            Ok(DbftMessage::PrepareRequest(prepare_request)) => {
                self.on_receive_prepare_request(prepare_request)
            }
            Ok(DbftMessage::PrepareResponse(prepare_response)) => {
                self.on_receive_prepare_response(prepare_response)
            }
            Ok(DbftMessage::ChangeView(change_view)) => self.on_receive_change_view(change_view),
        };

        if let Some((reason, rejected)) = verdict.drop_reason() {
            Event::DropMessage(DropMessageEvent {
                timestamp: self.clock.now(),
                command: msg.command.clone(),
                reason,
                rejected,
            })
            .publish(&self.event_publisher);
        }

        verdict
    }

    /// Handle the host's answer to a [`create_block`](Host::create_block) request.
    ///
    /// ## Internal procedure
    ///
    /// 1. Check that the local validator is waiting for a block, and that `block` extends the tip in the
    ///    current view with the local validator as proposer. Otherwise, skip.
    /// 2. Sign the header and broadcast it in a `PrepareRequest`.
    /// 3. Ask the host to verify the block, like any other candidate.
    pub(crate) fn new_proposal(&mut self, block: Block) -> ProposalResult {
        let Some(tip) = &self.tip else {
            return self.abort_round();
        };

        // 1. Check the state and the block.
        let ConsensusContext::WaitingCreate { cur_view } = self.context else {
            return ProposalResult::Skipped;
        };
        let header = &block.header.header;
        if header.parent_hash != tip.hash
            || header.number != tip.header.number + 1
            || header.view != cur_view
            || header.proposer != self.config.keypair.public()
        {
            return ProposalResult::Skipped;
        }

        // 2. Sign and broadcast.
        let mut block = block;
        if !block.header.sign(&self.config.keypair) {
            return ProposalResult::Skipped;
        }
        self.sender_handle
            .broadcast(DbftMessage::prepare_request(block.clone()));
        Event::Propose(ProposeEvent {
            timestamp: self.clock.now(),
            block: block.clone(),
        })
        .publish(&self.event_publisher);

        // 3. Verify.
        self.context = ConsensusContext::WaitingVerify {
            cur_view,
            block: block.clone(),
            pre_signs: PreSigns::new(),
        };
        self.host.verify_block(VerifyBlockRequest::new(block));

        ProposalResult::Ok
    }

    /// Handle the host's confirmation that a candidate block is valid.
    ///
    /// ## Internal procedure
    ///
    /// 1. Check that the local validator is verifying a candidate with the same hash. Otherwise, skip.
    /// 2. Sign the hash and broadcast it in a `PrepareResponse`.
    /// 3. Collect the local signature and every buffered signature over the same hash, and mine the
    ///    block if they already form a quorum.
    pub(crate) fn agree_proposal(&mut self, block: &Block) -> ProposalResult {
        if self.tip.is_none() {
            return self.abort_round();
        }

        // 1. Check the state and the block.
        let ConsensusContext::WaitingVerify {
            cur_view,
            block: candidate,
            pre_signs,
        } = &self.context
        else {
            return ProposalResult::Skipped;
        };
        let hash = candidate.hash();
        if block.hash() != hash {
            return ProposalResult::Skipped;
        }
        let cur_view = *cur_view;

        // 2. Sign and broadcast.
        let signature = QuorumSignature::new(&self.config.keypair, &hash.bytes());
        self.sender_handle.broadcast(DbftMessage::PrepareResponse(PrepareResponse {
            hash,
            signature,
        }));

        // 3. Collect signatures.
        let mut signs = Signs::new();
        signs.insert(self.config.address, signature);
        pre_signs
            .iter()
            .filter(|(_, (signed_hash, _))| signed_hash == &hash)
            .for_each(|(address, (_, signature))| {
                signs.insert(*address, *signature);
            });
        self.context = ConsensusContext::WaitingAgree {
            cur_view,
            block: candidate.clone(),
            signs,
        };

        Event::PrepareResponse(PrepareResponseEvent {
            timestamp: self.clock.now(),
            view: cur_view,
            hash,
        })
        .publish(&self.event_publisher);

        self.try_mine();

        ProposalResult::Ok
    }

    /// Process an authenticated `PrepareRequest`.
    ///
    /// ## Internal procedure
    ///
    /// 1. Authenticate: the header hash and the proposer signature must be valid, and the proposer
    ///    must be another member of `next_miners`.
    /// 2. Check relevance: the local validator must be waiting for a proposal, and the block must
    ///    extend the tip in the current view, proposed by the due miner of the view.
    /// 3. Ask the host to verify the block.
    fn on_receive_prepare_request(&mut self, prepare_request: PrepareRequest) -> MessageVerdict {
        let Some(tip) = &self.tip else {
            return MessageVerdict::Ignored(IgnoreReason::NoTip);
        };
        let block = prepare_request.block;
        let header = &block.header.header;

        // 1. Authenticate.
        if !block.header.is_correct() {
            return MessageVerdict::Rejected(RejectReason::IncorrectHash);
        }
        if !block.header.verify_proposer() {
            return MessageVerdict::Rejected(RejectReason::InvalidSignature);
        }
        let origin = header.proposer_address();
        if origin == self.config.address {
            return MessageVerdict::Rejected(RejectReason::SelfSignature);
        }
        if !tip.is_miner(&origin) {
            return MessageVerdict::Rejected(RejectReason::UnknownSigner);
        }

        // 2. Check relevance.
        let parent_matches = header.parent_hash == tip.hash;
        let height_matches = header.number == tip.header.number + 1;
        let proposed_view = header.view;
        let due_miner = self.schedule.due_miner(tip, proposed_view);

        Event::ReceiveProposal(ReceiveProposalEvent {
            timestamp: self.clock.now(),
            origin,
            block: block.clone(),
        })
        .publish(&self.event_publisher);

        let ConsensusContext::WaitingProposal {
            cur_view,
            pre_signs,
        } = &mut self.context
        else {
            return MessageVerdict::Ignored(IgnoreReason::UnexpectedState(self.context.state()));
        };
        if !parent_matches {
            return MessageVerdict::Ignored(IgnoreReason::WrongParent);
        }
        if !height_matches {
            return MessageVerdict::Ignored(IgnoreReason::WrongHeight);
        }
        if proposed_view != *cur_view {
            return MessageVerdict::Ignored(IgnoreReason::WrongView);
        }
        if due_miner != Some(origin) {
            return MessageVerdict::Ignored(IgnoreReason::NotDueMiner);
        }

        // 3. Verify.
        self.context = ConsensusContext::WaitingVerify {
            cur_view: *cur_view,
            block: block.clone(),
            pre_signs: std::mem::take(pre_signs),
        };
        self.host.verify_block(VerifyBlockRequest::new(block));

        MessageVerdict::Accepted
    }

    /// Process an authenticated `PrepareResponse`.
    ///
    /// ## Internal procedure
    ///
    /// 1. Authenticate: the signature must be valid over the hash and come from another member of
    ///    `next_miners`.
    /// 2. If the local validator has not signed a candidate yet, buffer the signature.
    /// 3. If it has, record the signature if it is for the same candidate, and mine the block once the
    ///    signatures form a quorum.
    fn on_receive_prepare_response(&mut self, prepare_response: PrepareResponse) -> MessageVerdict {
        let Some(tip) = &self.tip else {
            return MessageVerdict::Ignored(IgnoreReason::NoTip);
        };
        let PrepareResponse { hash, signature } = prepare_response;

        // 1. Authenticate.
        if !signature.verify(&hash.bytes()) {
            return MessageVerdict::Rejected(RejectReason::InvalidSignature);
        }
        let origin = signature.address();
        if origin == self.config.address {
            return MessageVerdict::Rejected(RejectReason::SelfSignature);
        }
        if !tip.is_miner(&origin) {
            return MessageVerdict::Rejected(RejectReason::UnknownSigner);
        }

        Event::ReceivePrepareResponse(ReceivePrepareResponseEvent {
            timestamp: self.clock.now(),
            origin,
            hash,
        })
        .publish(&self.event_publisher);

        match &mut self.context {
            // 2. Buffer.
            ConsensusContext::WaitingProposal { pre_signs, .. }
            | ConsensusContext::WaitingVerify { pre_signs, .. } => {
                if pre_signs.contains_key(&origin) {
                    return MessageVerdict::Ignored(IgnoreReason::Duplicate);
                }
                pre_signs.insert(origin, (hash, signature));
                MessageVerdict::Accepted
            }

            // 3. Record.
            ConsensusContext::WaitingAgree { block, signs, .. } => {
                if block.hash() != hash {
                    return MessageVerdict::Ignored(IgnoreReason::HashMismatch);
                }
                if signs.contains_key(&origin) {
                    return MessageVerdict::Ignored(IgnoreReason::Duplicate);
                }
                signs.insert(origin, signature);
                self.try_mine();
                MessageVerdict::Accepted
            }

            context => MessageVerdict::Ignored(IgnoreReason::UnexpectedState(context.state())),
        }
    }

    /// Process an authenticated `ChangeView` vote.
    ///
    /// ## Internal procedure
    ///
    /// 1. Authenticate: the signature must be valid over the change-view digest of the tip, and come
    ///    from another member of `next_miners`.
    /// 2. Record the vote if it is for a view higher than both the current view and the sender's
    ///    previous vote.
    /// 3. Adopt the highest view that a quorum voted for, if any.
    fn on_receive_change_view(&mut self, change_view: ChangeView) -> MessageVerdict {
        let Some(tip) = &self.tip else {
            return MessageVerdict::Ignored(IgnoreReason::NoTip);
        };

        // 1. Authenticate.
        if !change_view.is_correct(&tip.hash) {
            return MessageVerdict::Rejected(RejectReason::InvalidSignature);
        }
        let origin = change_view.signature.address();
        if origin == self.config.address {
            return MessageVerdict::Rejected(RejectReason::SelfSignature);
        }
        if !tip.is_miner(&origin) {
            return MessageVerdict::Rejected(RejectReason::UnknownSigner);
        }

        Event::ReceiveChangeView(ReceiveChangeViewEvent {
            timestamp: self.clock.now(),
            origin,
            new_view: change_view.new_view,
        })
        .publish(&self.event_publisher);

        // 2. Record.
        if change_view.new_view <= self.context.cur_view() {
            return MessageVerdict::Ignored(IgnoreReason::StaleView);
        }
        match self.ballot.get(&origin) {
            Some(voted) if *voted == change_view.new_view => {
                return MessageVerdict::Ignored(IgnoreReason::Duplicate)
            }
            Some(voted) if *voted > change_view.new_view => {
                return MessageVerdict::Ignored(IgnoreReason::StaleView)
            }
            _ => {}
        }
        self.ballot.insert(origin, change_view.new_view);

        // 3. Adopt.
        self.try_change_view();

        MessageVerdict::Accepted
    }

    /// Give up on the current view: vote to change to the next view, or, if already voted, to the one
    /// after the view voted for.
    fn on_view_timeout(&mut self) {
        let Some(tip) = &self.tip else {
            return;
        };
        let tip_hash = tip.hash;
        let cur_view = self.context.cur_view();
        let new_view = match self.context {
            ConsensusContext::ChangeViewSent { expect_view, .. } => expect_view + 1,
            _ => cur_view + 1,
        };

        Event::ViewTimeout(ViewTimeoutEvent {
            timestamp: self.clock.now(),
            view: cur_view,
        })
        .publish(&self.event_publisher);

        self.sender_handle.broadcast(DbftMessage::change_view(
            &self.config.keypair,
            &tip_hash,
            new_view,
        ));
        self.ballot.insert(self.config.address, new_view);
        self.context = ConsensusContext::ChangeViewSent {
            cur_view,
            expect_view: new_view,
        };

        Event::ChangeView(ChangeViewEvent {
            timestamp: self.clock.now(),
            view: cur_view,
            new_view,
        })
        .publish(&self.event_publisher);

        if !self.try_change_view() {
            self.rearm();
        }
    }

    /// If the candidate collected a quorum of signatures, attach them and hand the block to the host.
    fn try_mine(&mut self) {
        let Some(tip) = &self.tip else {
            return;
        };
        let ConsensusContext::WaitingAgree {
            cur_view,
            block,
            signs,
        } = &self.context
        else {
            return;
        };
        if !self
            .schedule
            .quorum_reached(tip.next_miners.len(), signs.len())
        {
            return;
        }

        let signatures: Vec<QuorumEntry> = tip
            .next_miners
            .iter()
            .filter_map(|address| {
                signs.get(address).map(|signature| QuorumEntry {
                    address: *address,
                    signature: signature.signature,
                })
            })
            .collect();
        let cur_view = *cur_view;
        let mut block = block.clone();
        block.header.add_signs(signatures.clone());

        self.context = ConsensusContext::WaitingBlock {
            cur_view,
            block: block.clone(),
        };

        Event::MineBlock(MineBlockEvent {
            timestamp: self.clock.now(),
            view: cur_view,
            block: block.clone(),
        })
        .publish(&self.event_publisher);

        self.host
            .mine_block(MineBlockRequest::new(block, signatures));
    }

    /// Adopt the highest view, above the current view, that a quorum of identical votes in the ballot
    /// agrees on. Returns whether a view was adopted.
    fn try_change_view(&mut self) -> bool {
        let Some(tip) = &self.tip else {
            return false;
        };
        let cur_view = self.context.cur_view();
        let validator_count = tip.next_miners.len();

        let mut candidates: Vec<ViewNumber> = self
            .ballot
            .values()
            .copied()
            .filter(|view| *view > cur_view)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let adopted = candidates.into_iter().rev().find(|candidate| {
            let votes = self
                .ballot
                .values()
                .filter(|view| *view == candidate)
                .count();
            self.schedule.quorum_reached(validator_count, votes)
        });

        let Some(view) = adopted else {
            return false;
        };

        self.context = ConsensusContext::ChangeViewSucc { cur_view: view };
        self.ballot.clear();

        Event::ChangeViewSuccess(ChangeViewSuccessEvent {
            timestamp: self.clock.now(),
            view,
        })
        .publish(&self.event_publisher);

        self.rearm();
        true
    }

    /// Arm the deadline for the current context.
    ///
    /// If the context is idle and its round should already have started, start it. If the deadline
    /// of the current view has already passed, skip to the next view and repeat, so that a timer never
    /// fires with a zero or negative delay.
    fn rearm(&mut self) {
        let now = self.clock.now();

        for _ in 0..MAX_CATCH_UP_VIEWS {
            let Some(tip) = &self.tip else {
                self.timeouts.disarm();
                return;
            };
            let cur_view = self.context.cur_view();
            let Some(due_miner) = self.schedule.due_miner(tip, cur_view) else {
                self.timeouts.disarm();
                return;
            };
            let give_up = self.timeouts.deadline(give_up_allowance(
                &self.context,
                tip.total_view,
                due_miner == self.config.address,
            ));

            if self.context.is_idle() {
                let start = self
                    .timeouts
                    .deadline(round_start_allowance(tip.total_view, cur_view));
                if start > now {
                    self.timeouts.arm(start);
                    return;
                }
                if give_up > now {
                    self.start_round(due_miner);
                    continue;
                }
            } else if give_up > now {
                self.timeouts.arm(give_up);
                return;
            }

            self.catch_up();
        }

        // Windows stopped growing: let the next tick give up on the view.
        let Some(tip) = &self.tip else {
            return;
        };
        let cur_view = self.context.cur_view();
        let is_due = self.schedule.due_miner(tip, cur_view) == Some(self.config.address);
        let give_up = give_up_allowance(&self.context, tip.total_view, is_due);
        self.timeouts.arm(self.timeouts.deadline(give_up));
    }

    /// Start the round of the current view, with `due_miner` as its leader.
    fn start_round(&mut self, due_miner: Address) {
        let Some(tip) = &self.tip else {
            return;
        };
        let cur_view = self.context.cur_view();
        let now = self.clock.now();

        Event::StartRound(StartRoundEvent {
            timestamp: now,
            view: cur_view,
            due_miner,
        })
        .publish(&self.event_publisher);

        if due_miner == self.config.address {
            let template = BlockHeader {
                parent_hash: tip.hash,
                number: tip.header.number + 1,
                timestamp: secs_since_unix_epoch(now).max(tip.header.timestamp),
                view: cur_view,
                proposer: self.config.keypair.public(),
                data_hash: CryptoHash::default(),
                state_root: CryptoHash::default(),
            };
            self.context = ConsensusContext::WaitingCreate { cur_view };
            self.host.create_block(CreateBlockRequest::new(template));
        } else {
            self.context = ConsensusContext::WaitingProposal {
                cur_view,
                pre_signs: PreSigns::new(),
            };
        }
    }

    /// Skip the current view, keeping only the ballot entries for later views.
    fn catch_up(&mut self) {
        let skipped_view = self.context.cur_view();
        let next_view = skipped_view + 1;
        self.context = ConsensusContext::None {
            cur_view: next_view,
        };
        self.ballot.retain(|_, view| *view > next_view);

        Event::CatchUp(CatchUpEvent {
            timestamp: self.clock.now(),
            skipped_view,
        })
        .publish(&self.event_publisher);
    }

    /// Abort the round after the host broke the calling contract.
    fn abort_round(&mut self) -> ProposalResult {
        let view = self.context.cur_view();
        self.context = ConsensusContext::None { cur_view: view };
        self.timeouts.disarm();

        Event::AbortRound(AbortRoundEvent {
            timestamp: self.clock.now(),
            view,
        })
        .publish(&self.event_publisher);

        ProposalResult::Skipped
    }
}

#[cfg(test)]
impl<N: Network, H: Host> DbftConsensusEngine<N, H> {
    /// Get the tag of the current context.
    pub(crate) fn state(&self) -> ConsensusState {
        self.context.state()
    }

    /// Get the context of the in-flight round.
    pub(crate) fn context(&self) -> &ConsensusContext {
        &self.context
    }

    /// Get the current tip, if the host provided one.
    pub(crate) fn tip(&self) -> Option<&Tip> {
        self.tip.as_ref()
    }

    /// Get the change-view votes collected in the current round.
    pub(crate) fn ballot(&self) -> &ChangeViewBallot {
        &self.ballot
    }

    /// Get the armed deadline, if any.
    pub(crate) fn deadline(&self) -> Option<SystemTime> {
        self.timeouts.armed()
    }

    /// Get the host this engine calls.
    pub(crate) fn host(&self) -> &H {
        &self.host
    }
}

/// Block intervals after which the local validator gives up on the round in `context`.
fn give_up_allowance(context: &ConsensusContext, total_view: TotalView, is_due: bool) -> u64 {
    match context {
        ConsensusContext::ChangeViewSent { expect_view, .. } => {
            follower_allowance(total_view, *expect_view)
        }
        _ if is_due => leader_allowance(total_view, context.cur_view()),
        _ => follower_allowance(total_view, context.cur_view()),
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

/// Configuration variables for the [`DbftConsensusEngine`].
#[derive(Clone)]
pub(crate) struct DbftConfiguration {
    /// The keypair with which the local validator signs headers and votes.
    pub(crate) keypair: Keypair,

    /// The address of `keypair`.
    pub(crate) address: Address,
}

impl DbftConfiguration {
    pub(crate) fn new(keypair: Keypair) -> Self {
        Self {
            address: keypair.address(),
            keypair,
        }
    }
}

/// Outcome of a host answer ([`new_proposal`](crate::replica::ReplicaHandle::new_proposal) or
/// [`agree_proposal`](crate::replica::ReplicaHandle::agree_proposal)).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalResult {
    /// The answer advanced the round.
    Ok,

    /// The answer no longer matches the round, for example because the tip moved on. The host should
    /// take no further action.
    Skipped,
}

/// Outcome of processing a received [`WireMessage`].
#[derive(Debug)]
pub enum MessageVerdict {
    /// The message changed the state of the round.
    Accepted,

    /// The message is authentic but irrelevant to the current round.
    Ignored(IgnoreReason),

    /// The message is malformed or unauthenticated. The network provider may ban its sender.
    Rejected(RejectReason),
}

impl MessageVerdict {
    /// Check whether the message changed the state of the round.
    pub fn is_accepted(&self) -> bool {
        matches!(self, MessageVerdict::Accepted)
    }

    /// Check whether the message counts against its sender.
    pub fn is_rejected(&self) -> bool {
        matches!(self, MessageVerdict::Rejected(_))
    }

    fn drop_reason(&self) -> Option<(String, bool)> {
        match self {
            MessageVerdict::Accepted => None,
            MessageVerdict::Ignored(reason) => Some((format!("{:?}", reason), false)),
            MessageVerdict::Rejected(reason) => Some((format!("{:?}", reason), true)),
        }
    }
}

/// Enumerates why an authentic message was irrelevant to the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The host has not provided a tip yet.
    NoTip,

    /// The engine is in a state that cannot use the message.
    UnexpectedState(ConsensusState),

    /// The proposed block does not extend the tip.
    WrongParent,

    /// The proposed block is not at the height after the tip.
    WrongHeight,

    /// The proposed block belongs to another view.
    WrongView,

    /// The proposer is not the due miner of the proposed view.
    NotDueMiner,

    /// The response signs another candidate than the one the local validator signed.
    HashMismatch,

    /// The vote is for a view that is not higher than the current view or the sender's previous vote.
    StaleView,

    /// The same vote from the same sender was already counted.
    Duplicate,
}

/// Enumerates why a message counts against its sender.
#[derive(Debug)]
pub enum RejectReason {
    /// The message cannot be decoded.
    Malformed(DecodeError),

    /// The header hash does not match the header content.
    IncorrectHash,

    /// The signature does not verify.
    InvalidSignature,

    /// The signer is not one of the tip's `next_miners`.
    UnknownSigner,

    /// The message carries the local validator's own signature.
    SelfSignature,
}
