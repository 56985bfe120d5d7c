/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The thread that dispatches [events](crate::events) published by the algorithm thread to the
//! registered handlers.
//!
//! Handlers run on their own thread so that slow handlers never delay consensus. If `log_events` is
//! enabled in the replica's [configuration](crate::replica::Configuration), the default
//! [logging](crate::logging) handler of every event type is registered before any user handler.

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

/// Pointer to a handler closure for events of type `T`.
pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// How long the event bus sleeps when no event is pending.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Stores the handlers registered for every event type.
pub(crate) struct EventHandlers {
    pub(crate) update_tip_handlers: Vec<HandlerPtr<UpdateTipEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) prepare_response_handlers: Vec<HandlerPtr<PrepareResponseEvent>>,
    pub(crate) change_view_handlers: Vec<HandlerPtr<ChangeViewEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) receive_prepare_response_handlers: Vec<HandlerPtr<ReceivePrepareResponseEvent>>,
    pub(crate) receive_change_view_handlers: Vec<HandlerPtr<ReceiveChangeViewEvent>>,
    pub(crate) drop_message_handlers: Vec<HandlerPtr<DropMessageEvent>>,
    pub(crate) start_round_handlers: Vec<HandlerPtr<StartRoundEvent>>,
    pub(crate) mine_block_handlers: Vec<HandlerPtr<MineBlockEvent>>,
    pub(crate) view_timeout_handlers: Vec<HandlerPtr<ViewTimeoutEvent>>,
    pub(crate) change_view_success_handlers: Vec<HandlerPtr<ChangeViewSuccessEvent>>,
    pub(crate) catch_up_handlers: Vec<HandlerPtr<CatchUpEvent>>,
    pub(crate) abort_round_handlers: Vec<HandlerPtr<AbortRoundEvent>>,
}

impl EventHandlers {
    /// Collect the optional user handlers, preceded by the default loggers if `log_events` is set.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        update_tip_handler: Option<HandlerPtr<UpdateTipEvent>>,
        propose_handler: Option<HandlerPtr<ProposeEvent>>,
        prepare_response_handler: Option<HandlerPtr<PrepareResponseEvent>>,
        change_view_handler: Option<HandlerPtr<ChangeViewEvent>>,
        receive_proposal_handler: Option<HandlerPtr<ReceiveProposalEvent>>,
        receive_prepare_response_handler: Option<HandlerPtr<ReceivePrepareResponseEvent>>,
        receive_change_view_handler: Option<HandlerPtr<ReceiveChangeViewEvent>>,
        drop_message_handler: Option<HandlerPtr<DropMessageEvent>>,
        start_round_handler: Option<HandlerPtr<StartRoundEvent>>,
        mine_block_handler: Option<HandlerPtr<MineBlockEvent>>,
        view_timeout_handler: Option<HandlerPtr<ViewTimeoutEvent>>,
        change_view_success_handler: Option<HandlerPtr<ChangeViewSuccessEvent>>,
        catch_up_handler: Option<HandlerPtr<CatchUpEvent>>,
        abort_round_handler: Option<HandlerPtr<AbortRoundEvent>>,
    ) -> EventHandlers {
        fn handlers<T: Logger>(
            log_events: bool,
            user_handler: Option<HandlerPtr<T>>,
        ) -> Vec<HandlerPtr<T>> {
            let mut handlers = Vec::new();
            if log_events {
                handlers.push(T::get_logger());
            }
            handlers.extend(user_handler);
            handlers
        }

        EventHandlers {
            update_tip_handlers: handlers(log_events, update_tip_handler),
            propose_handlers: handlers(log_events, propose_handler),
            prepare_response_handlers: handlers(log_events, prepare_response_handler),
            change_view_handlers: handlers(log_events, change_view_handler),
            receive_proposal_handlers: handlers(log_events, receive_proposal_handler),
            receive_prepare_response_handlers: handlers(
                log_events,
                receive_prepare_response_handler,
            ),
            receive_change_view_handlers: handlers(log_events, receive_change_view_handler),
            drop_message_handlers: handlers(log_events, drop_message_handler),
            start_round_handlers: handlers(log_events, start_round_handler),
            mine_block_handlers: handlers(log_events, mine_block_handler),
            view_timeout_handlers: handlers(log_events, view_timeout_handler),
            change_view_success_handlers: handlers(log_events, change_view_success_handler),
            catch_up_handlers: handlers(log_events, catch_up_handler),
            abort_round_handlers: handlers(log_events, abort_round_handler),
        }
    }

    /// Check whether no handler is registered for any event type.
    pub(crate) fn is_empty(&self) -> bool {
        self.update_tip_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.prepare_response_handlers.is_empty()
            && self.change_view_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.receive_prepare_response_handlers.is_empty()
            && self.receive_change_view_handlers.is_empty()
            && self.drop_message_handlers.is_empty()
            && self.start_round_handlers.is_empty()
            && self.mine_block_handlers.is_empty()
            && self.view_timeout_handlers.is_empty()
            && self.change_view_success_handlers.is_empty()
            && self.catch_up_handlers.is_empty()
            && self.abort_round_handlers.is_empty()
    }

    /// Invoke every handler registered for the type of `event`, in registration order.
    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::UpdateTip(update_tip_event) => self
                .update_tip_handlers
                .iter()
                .for_each(|handler| handler(&update_tip_event)),

            Event::Propose(propose_event) => self
                .propose_handlers
                .iter()
                .for_each(|handler| handler(&propose_event)),

            Event::PrepareResponse(prepare_response_event) => self
                .prepare_response_handlers
                .iter()
                .for_each(|handler| handler(&prepare_response_event)),

            Event::ChangeView(change_view_event) => self
                .change_view_handlers
                .iter()
                .for_each(|handler| handler(&change_view_event)),

            Event::ReceiveProposal(receive_proposal_event) => self
                .receive_proposal_handlers
                .iter()
                .for_each(|handler| handler(&receive_proposal_event)),

            Event::ReceivePrepareResponse(receive_prepare_response_event) => self
                .receive_prepare_response_handlers
                .iter()
                .for_each(|handler| handler(&receive_prepare_response_event)),

            Event::ReceiveChangeView(receive_change_view_event) => self
                .receive_change_view_handlers
                .iter()
                .for_each(|handler| handler(&receive_change_view_event)),

            Event::DropMessage(drop_message_event) => self
                .drop_message_handlers
                .iter()
                .for_each(|handler| handler(&drop_message_event)),

            Event::StartRound(start_round_event) => self
                .start_round_handlers
                .iter()
                .for_each(|handler| handler(&start_round_event)),

            Event::MineBlock(mine_block_event) => self
                .mine_block_handlers
                .iter()
                .for_each(|handler| handler(&mine_block_event)),

            Event::ViewTimeout(view_timeout_event) => self
                .view_timeout_handlers
                .iter()
                .for_each(|handler| handler(&view_timeout_event)),

            Event::ChangeViewSuccess(change_view_success_event) => self
                .change_view_success_handlers
                .iter()
                .for_each(|handler| handler(&change_view_success_event)),

            Event::CatchUp(catch_up_event) => self
                .catch_up_handlers
                .iter()
                .for_each(|handler| handler(&catch_up_event)),

            Event::AbortRound(abort_round_event) => self
                .abort_round_handlers
                .iter()
                .for_each(|handler| handler(&abort_round_event)),
        }
    }
}

/// Start the event bus thread, which fires handlers for every event received from `event_subscriber`
/// until `shutdown_signal` fires or either channel disconnects.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.try_recv() {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(TryRecvError::Empty) => thread::sleep(IDLE_SLEEP),
            Err(TryRecvError::Disconnected) => {
                log::debug!("Event publisher disconnected, stopping the event bus.");
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{mpsc, Arc, Mutex},
        time::SystemTime,
    };

    use super::*;
    use crate::types::data_types::ViewNumber;

    #[test]
    fn fire_registered_handlers_test() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let recorder = fired.clone();
        let view_timeout_handler: HandlerPtr<ViewTimeoutEvent> =
            Box::new(move |event: &ViewTimeoutEvent| recorder.lock().unwrap().push(event.view));

        let handlers = EventHandlers::new(
            false,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            Some(view_timeout_handler),
            None,
            None,
            None,
        );
        assert!(!handlers.is_empty());

        let (event_publisher, event_subscriber) = mpsc::channel();
        let (shutdown, shutdown_signal) = mpsc::channel();
        let event_bus = start_event_bus(handlers, event_subscriber, shutdown_signal);

        for view in 0..3 {
            Event::ViewTimeout(ViewTimeoutEvent {
                timestamp: SystemTime::now(),
                view: ViewNumber::new(view),
            })
            .publish(&Some(event_publisher.clone()));
        }
        Event::CatchUp(CatchUpEvent {
            timestamp: SystemTime::now(),
            skipped_view: ViewNumber::new(7),
        })
        .publish(&Some(event_publisher.clone()));

        // The bus stops by itself once the publisher is gone and the channel is drained.
        drop(event_publisher);
        event_bus.join().unwrap();
        drop(shutdown);

        assert_eq!(
            *fired.lock().unwrap(),
            vec![ViewNumber::new(0), ViewNumber::new(1), ViewNumber::new(2)]
        );
    }

    #[test]
    fn empty_handlers_test() {
        let without_handlers = |log_events| {
            EventHandlers::new(
                log_events, None, None, None, None, None, None, None, None, None, None, None, None,
                None, None,
            )
        };

        let handlers = without_handlers(false);
        assert!(handlers.is_empty());

        let handlers = without_handlers(true);
        assert!(!handlers.is_empty());
        assert_eq!(handlers.mine_block_handlers.len(), 1);
    }
}
