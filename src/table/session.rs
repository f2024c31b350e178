//! The session loop: one task that owns every piece of mutable table
//! state and applies exactly one input at a time.
//!
//! Inbound server messages and local user intents both funnel into this
//! single consumer, so reconciliation never races a pre-action
//! resolution or an optimistic display write. After each input the loop
//! publishes a fresh [`TableUpdate`] for whatever frontend is attached.

use crate::game::entities::{Bet, ChatMessage, Chips, PlayerAction, TableState};
use crate::game::overlay::AnimationOverlay;
use crate::game::preaction::{PreAction, PreActionQueue};
use crate::game::reconciler::Reconciler;
use crate::net::connection::{Inbound, SessionStatus};
use crate::net::errors::{ClientError, Rejection};
use crate::net::gateway::CommandSink;
use crate::net::messages::{ClientCommand, PlayerRef, ServerEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How often timer-bounded presentation state is expired.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Something the local user asked for. Sending never implies success;
/// the server confirms through later events or rejects explicitly.
#[derive(Clone, Debug)]
pub enum UserIntent {
    SitDown { seat_id: usize, buy_in_amount: Chips },
    AddChips { amount: Chips },
    StandUp,
    /// A manual action on the local turn. Discards any staged
    /// pre-action.
    Act(PlayerAction),
    /// Toggle a pre-action for the next local turn.
    StagePreAction(PreAction),
    Chat(String),
}

/// One frame of renderable state, published after every applied input.
#[derive(Clone, Debug)]
pub struct TableUpdate {
    pub state: TableState,
    pub status: SessionStatus,
    pub staged_pre_action: Option<PreAction>,
    /// Pot as rendered: canonical plus any optimistic local outlay.
    pub displayed_pot: Chips,
    /// Local stack as rendered, when seated.
    pub displayed_stack: Option<Chips>,
    /// Chips currently animating from the felt into the pot.
    pub collecting_bets: Vec<Bet>,
    pub chat: Option<ChatMessage>,
    pub notice: Option<String>,
    pub rejection: Option<Rejection>,
}

/// The single-owner session actor. Generic over the sink so the loop's
/// decisions can be tested against a recording sink.
pub struct TableSession<S> {
    reconciler: Reconciler,
    preactions: PreActionQueue,
    overlay: AnimationOverlay,
    sink: S,
    player: PlayerRef,
    status: SessionStatus,
}

impl<S: CommandSink> TableSession<S> {
    pub fn new(player: PlayerRef, sink: S) -> Self {
        Self {
            reconciler: Reconciler::new(player.id.clone()),
            preactions: PreActionQueue::new(),
            overlay: AnimationOverlay::new(),
            sink,
            player,
            status: SessionStatus::Connecting,
        }
    }

    pub fn state(&self) -> &TableState {
        self.reconciler.state()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn staged_pre_action(&self) -> Option<PreAction> {
        self.preactions.staged()
    }

    fn local_stack(&self) -> Option<Chips> {
        self.reconciler
            .local_seat()
            .and_then(|seat_id| self.reconciler.state().occupant(seat_id))
            .map(|occupant| occupant.chip_stack)
    }

    /// Build the renderable frame for the state as it stands.
    fn render(&self) -> TableUpdate {
        TableUpdate {
            state: self.reconciler.state().clone(),
            status: self.status,
            staged_pre_action: self.preactions.staged(),
            displayed_pot: self.overlay.displayed_pot(self.reconciler.state().pot_total),
            displayed_stack: self
                .local_stack()
                .map(|stack| self.overlay.displayed_stack(stack)),
            collecting_bets: self.overlay.collected_bets().to_vec(),
            chat: None,
            notice: None,
            rejection: None,
        }
    }

    /// Apply one inbound message and produce the next frame.
    pub fn handle_inbound(&mut self, inbound: &Inbound, now: Instant) -> TableUpdate {
        match inbound {
            Inbound::Status(status) => {
                self.status = *status;
                if matches!(
                    status,
                    SessionStatus::Reconnecting | SessionStatus::Connecting
                ) {
                    // Optimistic rendering and animations are meaningless
                    // across a gap; the staged pre-action is the user's
                    // standing intent and survives.
                    self.overlay.reset();
                    self.reconciler.on_reconnect();
                }
                self.render()
            }
            Inbound::Event(event) => self.handle_event(event, now),
        }
    }

    fn handle_event(&mut self, event: &ServerEvent, now: Instant) -> TableUpdate {
        let outcome = self.reconciler.apply(event);

        if matches!(event, ServerEvent::GameState(_)) {
            // The snapshot is the confirmation (or refutation) of
            // whatever the optimistic delta anticipated.
            self.overlay.clear_display_delta();
            self.overlay.sync_bets(&self.reconciler.state().bets);
        }
        self.overlay
            .observe_dealer(self.reconciler.state().dealer_seat, now);

        if let Some(bets) = &outcome.collected_bets {
            self.overlay.begin_collection(bets.clone(), now);
        }

        if outcome.turn_started
            && let Some(action) = self
                .preactions
                .resolve(self.reconciler.state().current_bet_to_call)
        {
            log::info!("pre-action resolved to {action}");
            if let Err(e) = self.send_action(action) {
                // The turn stays with the user; the server's timer will
                // handle it if they never act.
                log::warn!("pre-action send failed: {e}");
            }
        }

        let mut update = self.render();
        update.chat = outcome.chat;
        update.notice = outcome.notice;
        update.rejection = outcome.rejection;
        update
    }

    /// Apply one local intent. An error means nothing left the client.
    pub fn handle_intent(&mut self, intent: UserIntent) -> Result<(), ClientError> {
        match intent {
            UserIntent::SitDown {
                seat_id,
                buy_in_amount,
            } => {
                self.sink.try_send(ClientCommand::sit_down(
                    seat_id,
                    buy_in_amount,
                    self.player.clone(),
                ))?;
                self.reconciler.mark_awaiting_sit_down();
            }
            UserIntent::AddChips { amount } => {
                self.sink.try_send(ClientCommand::AddChips { amount })?;
                self.reconciler.mark_awaiting_add_chips();
            }
            UserIntent::StandUp => {
                self.sink.try_send(ClientCommand::StandUp)?;
                self.preactions.clear();
            }
            UserIntent::Act(action) => {
                // Acting by hand supersedes whatever was staged.
                self.preactions.clear();
                self.send_action(action)?;
            }
            UserIntent::StagePreAction(intent) => {
                self.preactions.stage(intent);
            }
            UserIntent::Chat(text) => {
                self.sink
                    .try_send(ClientCommand::chat(self.player.name.clone(), text, None))?;
            }
        }
        Ok(())
    }

    /// Emit a player action and stage its optimistic rendering. The
    /// delta is staged only once the command has actually left.
    fn send_action(&mut self, action: PlayerAction) -> Result<(), ClientError> {
        let stack = self.local_stack().unwrap_or(0);
        self.sink
            .try_send(ClientCommand::player_action(action.clone(), self.player.name.clone()))?;
        self.overlay.stage_local_action(&action, stack);
        Ok(())
    }

    /// Drive the session until the connection closes or both input
    /// channels are gone.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<Inbound>,
        mut intents: mpsc::UnboundedReceiver<UserIntent>,
        updates: mpsc::UnboundedSender<TableUpdate>,
    ) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else { return };
                    let closing = matches!(message, Inbound::Status(SessionStatus::Closed));
                    let update = self.handle_inbound(&message, Instant::now());
                    if updates.send(update).is_err() || closing {
                        return;
                    }
                }
                intent = intents.recv() => {
                    let Some(intent) = intent else { return };
                    let update = match self.handle_intent(intent) {
                        Ok(()) => self.render(),
                        Err(e) => {
                            log::warn!("{e}");
                            let mut update = self.render();
                            update.notice = Some(e.to_string());
                            update
                        }
                    };
                    if updates.send(update).is_err() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    self.overlay.tick(Instant::now());
                }
            }
        }
    }
}
