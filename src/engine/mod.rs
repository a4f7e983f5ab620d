//! The pairing engine: one serialized decision point for every event.
//!
//! The engine owns all mutable state (profiles, onboarding progress,
//! the matchmaker) behind a single lock. One `handle_event` call locks
//! for the whole decision, builds the replies, and releases before
//! anything is dispatched, so a concurrent caller can never observe a
//! half-finished pairing.

pub mod command;

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::OnboardingPolicy;
use crate::error::{MatchError, ValidationError};
use crate::matchmaker::{LeaveOutcome, MatchOutcome, Matchmaker};
use crate::onboarding::{self, OnboardingProgress, OnboardingStep, StepOutcome, flow, prompts};
use crate::profile::{Profile, ProfileStore};
use crate::types::{IncomingEvent, Keyboard, OutgoingMessage, Payload, UserId, buttons};

use self::command::{Command, CommandParser};

/// Point-in-time counters for the ops endpoint and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub profiles: usize,
    pub onboarding: usize,
    pub waiting: usize,
    pub active_pairs: usize,
}

/// Everything mutable, behind the engine's one lock.
#[derive(Debug, Default)]
struct EngineState {
    profiles: ProfileStore,
    onboarding: HashMap<UserId, OnboardingProgress>,
    matchmaker: Matchmaker,
}

/// The pairing engine. See the module docs for the locking contract.
pub struct Engine {
    state: Mutex<EngineState>,
    policy: OnboardingPolicy,
}

impl Engine {
    pub fn new(policy: OnboardingPolicy) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            policy,
        }
    }

    // ── Event handling ──────────────────────────────────────────────

    /// Process one inbound event, returning every message to deliver.
    ///
    /// State is fully mutated before this returns; the caller
    /// dispatches the messages afterwards, outside the lock.
    pub async fn handle_event(&self, event: &IncomingEvent) -> Vec<OutgoingMessage> {
        let mut state = self.state.lock().await;
        let user = event.user_id;

        // Mid-onboarding users are routed to onboarding exclusively;
        // even command-shaped text counts as an answer.
        if state.onboarding.contains_key(&user) {
            return self.continue_onboarding(&mut state, user, &event.payload);
        }

        if let Some(text) = event.payload.as_text() {
            match CommandParser::parse(text) {
                Command::Start => return self.start(&mut state, user),
                Command::Find => return self.find(&mut state, user),
                Command::Next => return self.next(&mut state, user),
                Command::Stop => return self.stop(&mut state, user),
                Command::Help => return vec![help_reply(user)],
                Command::SetName(arg) => return self.set_name(&mut state, user, &arg),
                Command::SetGender(arg) => return self.set_gender(&mut state, user, &arg),
                Command::Content => {}
            }
        }

        self.relay(&state, user, &event.payload)
    }

    // ── Onboarding ──────────────────────────────────────────────────

    /// `/start`: enter onboarding per policy, or greet a finished user.
    fn start(&self, state: &mut EngineState, user: UserId) -> Vec<OutgoingMessage> {
        let rerun = match self.policy {
            OnboardingPolicy::Always => true,
            OnboardingPolicy::IfIncomplete => !state.profiles.is_complete(user),
        };
        if !rerun {
            let name = state.profiles.get(user).name;
            return vec![welcome_back(user, &name)];
        }
        self.enter_onboarding(state, user)
    }

    /// Begin collecting a fresh profile.
    ///
    /// Any session or queue slot is torn down first; onboarding users
    /// are never paired and never waiting.
    fn enter_onboarding(&self, state: &mut EngineState, user: UserId) -> Vec<OutgoingMessage> {
        let mut out = Vec::new();
        if let LeaveOutcome::SessionEnded(partner) = state.matchmaker.leave(user) {
            tracing::info!(%user, %partner, "session ended");
            out.push(partner_left(partner));
        }
        state.onboarding.insert(user, OnboardingProgress::new());
        tracing::info!(%user, "onboarding started");
        out.push(
            OutgoingMessage::text(user, prompts::for_step(OnboardingStep::Name))
                .maybe_keyboard(prompts::keyboard_for_step(OnboardingStep::Name)),
        );
        out
    }

    /// Feed a mid-onboarding payload into the state machine.
    fn continue_onboarding(
        &self,
        state: &mut EngineState,
        user: UserId,
        payload: &Payload,
    ) -> Vec<OutgoingMessage> {
        let Some(progress) = state.onboarding.get_mut(&user) else {
            return Vec::new();
        };
        match onboarding::apply_input(progress, payload) {
            StepOutcome::Advanced { prompt, keyboard } => {
                vec![OutgoingMessage::text(user, prompt).maybe_keyboard(keyboard)]
            }
            StepOutcome::Rejected(err) => vec![OutgoingMessage::text(user, retry_text(err))],
            StepOutcome::Ignored => Vec::new(),
            StepOutcome::Completed(profile) => {
                state.onboarding.remove(&user);
                state.profiles.set(user, profile);
                tracing::info!(%user, "onboarding complete");
                vec![
                    OutgoingMessage::text(user, prompts::profile_ready())
                        .with_keyboard(Keyboard::Main),
                ]
            }
        }
    }

    // ── Matchmaking commands ────────────────────────────────────────

    /// `/find`: request a partner. Incomplete profiles are sent into
    /// onboarding instead of the pool.
    fn find(&self, state: &mut EngineState, user: UserId) -> Vec<OutgoingMessage> {
        if !state.profiles.is_complete(user) {
            let mut out = vec![OutgoingMessage::text(user, FINISH_PROFILE_FIRST)];
            out.extend(self.enter_onboarding(state, user));
            return out;
        }
        match state.matchmaker.request_partner(user) {
            Ok(MatchOutcome::Paired(partner)) => {
                tracing::info!(%user, %partner, "paired");
                connected_notices(state, user, partner)
            }
            Ok(MatchOutcome::Waiting) => vec![waiting_reply(user)],
            Err(MatchError::AlreadyPaired(_)) => {
                vec![OutgoingMessage::text(user, ALREADY_CHATTING)]
            }
            Err(err) => {
                tracing::warn!(%user, %err, "partner request failed");
                Vec::new()
            }
        }
    }

    /// `/next`: drop the current partner and immediately search again.
    fn next(&self, state: &mut EngineState, user: UserId) -> Vec<OutgoingMessage> {
        if !state.profiles.is_complete(user) {
            let mut out = vec![OutgoingMessage::text(user, FINISH_PROFILE_FIRST)];
            out.extend(self.enter_onboarding(state, user));
            return out;
        }
        let (old_partner, outcome) = state.matchmaker.next_partner(user);
        let mut out = Vec::new();
        if let Some(partner) = old_partner {
            tracing::info!(%user, %partner, "session ended");
            out.push(partner_left(partner));
        }
        match outcome {
            MatchOutcome::Paired(partner) => {
                tracing::info!(%user, %partner, "paired");
                out.extend(connected_notices(state, user, partner));
            }
            MatchOutcome::Waiting => out.push(waiting_reply(user)),
        }
        out
    }

    /// `/stop`: leave the chat or the queue. Safe to repeat.
    fn stop(&self, state: &mut EngineState, user: UserId) -> Vec<OutgoingMessage> {
        match state.matchmaker.leave(user) {
            LeaveOutcome::SessionEnded(partner) => {
                tracing::info!(%user, %partner, "session ended");
                vec![
                    partner_left(partner),
                    OutgoingMessage::text(user, "You left the chat.")
                        .with_keyboard(Keyboard::Main),
                ]
            }
            LeaveOutcome::LeftQueue => vec![
                OutgoingMessage::text(user, "You left the waiting queue.")
                    .with_keyboard(Keyboard::Main),
            ],
            LeaveOutcome::Idle => vec![
                OutgoingMessage::text(user, "You're not chatting with anyone right now.")
                    .with_keyboard(Keyboard::Main),
            ],
        }
    }

    /// Forward content to the partner, or nudge the sender to find one.
    fn relay(&self, state: &EngineState, user: UserId, payload: &Payload) -> Vec<OutgoingMessage> {
        match state.matchmaker.partner_of(user) {
            Some(partner) => {
                tracing::debug!(%user, %partner, kind = payload.kind(), "relay");
                vec![OutgoingMessage::payload(partner, payload.clone())]
            }
            None => vec![not_connected(user)],
        }
    }

    // ── Profile edits ───────────────────────────────────────────────

    /// `/name <new name>`: rename a finished profile in place.
    fn set_name(&self, state: &mut EngineState, user: UserId, arg: &str) -> Vec<OutgoingMessage> {
        if !state.profiles.is_complete(user) {
            return vec![OutgoingMessage::text(user, EDITS_NEED_PROFILE)];
        }
        if arg.is_empty() {
            return vec![OutgoingMessage::text(user, "Send /name followed by your new name.")];
        }
        match flow::validate_name(arg) {
            Ok(name) => {
                let mut profile = state.profiles.get(user);
                profile.name = name.clone();
                state.profiles.set(user, profile);
                vec![
                    OutgoingMessage::text(user, format!("Your name is now {name}."))
                        .with_keyboard(Keyboard::Main),
                ]
            }
            Err(err) => vec![OutgoingMessage::text(user, retry_text(err))],
        }
    }

    /// `/gender <label>`: change the stored gender.
    fn set_gender(&self, state: &mut EngineState, user: UserId, arg: &str) -> Vec<OutgoingMessage> {
        if !state.profiles.is_complete(user) {
            return vec![OutgoingMessage::text(user, EDITS_NEED_PROFILE)];
        }
        if arg.is_empty() {
            return vec![OutgoingMessage::text(user, "Send /gender male or /gender female.")];
        }
        match flow::validate_gender(arg) {
            Ok(gender) => {
                let mut profile = state.profiles.get(user);
                profile.gender = Some(gender);
                state.profiles.set(user, profile);
                vec![
                    OutgoingMessage::text(user, format!("Your gender is now {gender}."))
                        .with_keyboard(Keyboard::Main),
                ]
            }
            Err(err) => vec![OutgoingMessage::text(user, retry_text(err))],
        }
    }

    // ── Read-only views ─────────────────────────────────────────────

    /// Counters for the ops endpoint.
    pub async fn stats(&self) -> EngineStats {
        let state = self.state.lock().await;
        EngineStats {
            profiles: state.profiles.len(),
            onboarding: state.onboarding.len(),
            waiting: state.matchmaker.waiting_count(),
            active_pairs: state.matchmaker.active_pairs(),
        }
    }

    pub async fn partner_of(&self, id: UserId) -> Option<UserId> {
        self.state.lock().await.matchmaker.partner_of(id)
    }

    pub async fn is_waiting(&self, id: UserId) -> bool {
        self.state.lock().await.matchmaker.is_waiting(id)
    }

    /// The stored profile (anonymous default for unknown users).
    pub async fn profile_of(&self, id: UserId) -> Profile {
        self.state.lock().await.profiles.get(id)
    }
}

// ── Notices ─────────────────────────────────────────────────────────

const ALREADY_CHATTING: &str = "⚠️ You're already chatting. Use \"Next 🔁\" to switch partners.";
const FINISH_PROFILE_FIRST: &str = "Let's finish your profile before matching you with someone.";
const EDITS_NEED_PROFILE: &str = "Set up your profile first with /start.";

fn waiting_reply(user: UserId) -> OutgoingMessage {
    OutgoingMessage::text(user, "⏳ Waiting for a partner...")
}

fn partner_left(partner: UserId) -> OutgoingMessage {
    OutgoingMessage::text(partner, "🚫 Your partner left the chat.")
}

fn not_connected(user: UserId) -> OutgoingMessage {
    OutgoingMessage::text(
        user,
        format!(
            "You're not connected to anyone yet.\nTap \"{}\" to get matched.",
            buttons::FIND
        ),
    )
    .with_keyboard(Keyboard::Main)
}

/// Both sides of a fresh pairing hear who they got.
fn connected_notices(state: &EngineState, user: UserId, partner: UserId) -> Vec<OutgoingMessage> {
    let user_summary = state.profiles.get(user).summary();
    let partner_summary = state.profiles.get(partner).summary();
    vec![
        OutgoingMessage::text(user, connected_text(&partner_summary)),
        OutgoingMessage::text(partner, connected_text(&user_summary)),
    ]
}

fn connected_text(summary: &str) -> String {
    format!("🔗 You're now chatting with {summary}. Say hi!")
}

fn retry_text(err: ValidationError) -> String {
    format!("That doesn't look right: {err}. Try again.")
}

fn welcome_back(user: UserId, name: &str) -> OutgoingMessage {
    OutgoingMessage::text(
        user,
        format!(
            "👋 Welcome back, {name}! Tap \"{}\" to get matched, or /help for commands.",
            buttons::FIND
        ),
    )
    .with_keyboard(Keyboard::Main)
}

fn help_reply(user: UserId) -> OutgoingMessage {
    OutgoingMessage::text(
        user,
        "Commands:\n\
         /find - find a chat partner\n\
         /next - switch to a new partner\n\
         /stop - leave the chat or the queue\n\
         /name <new name> - change your name\n\
         /gender <male|female> - change your gender\n\
         /start - set up your profile\n\
         /help - this list",
    )
    .with_keyboard(Keyboard::Main)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaRef;

    fn text_event(user: i64, text: &str) -> IncomingEvent {
        IncomingEvent::new("test", UserId(user), Payload::text(text))
    }

    fn photo_event(user: i64) -> IncomingEvent {
        IncomingEvent::new(
            "test",
            UserId(user),
            Payload::Photo(MediaRef::new(format!("photo-{user}"))),
        )
    }

    /// Walk a user through the whole onboarding conversation.
    async fn onboard(engine: &Engine, user: i64) {
        engine.handle_event(&text_event(user, "/start")).await;
        engine.handle_event(&text_event(user, "Alice")).await;
        engine.handle_event(&text_event(user, "25")).await;
        engine.handle_event(&photo_event(user)).await;
        engine.handle_event(&text_event(user, "Female")).await;
        engine
            .handle_event(&text_event(user, "Here for good conversation."))
            .await;
    }

    fn recipients(messages: &[OutgoingMessage]) -> Vec<UserId> {
        messages.iter().map(|m| m.recipient).collect()
    }

    #[tokio::test]
    async fn onboarding_then_find_pairs_two_users() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;
        onboard(&engine, 2).await;

        let replies = engine.handle_event(&text_event(1, "/find")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);
        assert!(engine.is_waiting(UserId(1)).await);

        let replies = engine.handle_event(&text_event(2, "/find")).await;
        let mut to = recipients(&replies);
        to.sort();
        assert_eq!(to, vec![UserId(1), UserId(2)]);

        assert_eq!(engine.partner_of(UserId(1)).await, Some(UserId(2)));
        assert_eq!(engine.partner_of(UserId(2)).await, Some(UserId(1)));

        let stats = engine.stats().await;
        assert_eq!(
            stats,
            EngineStats {
                profiles: 2,
                onboarding: 0,
                waiting: 0,
                active_pairs: 1,
            }
        );
    }

    #[tokio::test]
    async fn onboarding_swallows_command_shaped_text() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        engine.handle_event(&text_event(1, "/start")).await;

        // "/find" is an onboarding answer here, and an invalid name
        let replies = engine.handle_event(&text_event(1, "/find")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);
        assert!(!engine.is_waiting(UserId(1)).await);

        let stats = engine.stats().await;
        assert_eq!(stats.onboarding, 1);
        assert_eq!(stats.waiting, 0);
    }

    #[tokio::test]
    async fn find_with_incomplete_profile_starts_onboarding() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);

        let replies = engine.handle_event(&text_event(1, "/find")).await;
        // A nudge plus the first onboarding question
        assert_eq!(replies.len(), 2);
        assert_eq!(recipients(&replies), vec![UserId(1), UserId(1)]);
        assert_eq!(engine.stats().await.onboarding, 1);
        assert!(!engine.is_waiting(UserId(1)).await);
    }

    #[tokio::test]
    async fn relay_forwards_payloads_untouched() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;
        onboard(&engine, 2).await;
        engine.handle_event(&text_event(1, "/find")).await;
        engine.handle_event(&text_event(2, "/find")).await;

        let replies = engine.handle_event(&text_event(1, "hello there")).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].recipient, UserId(2));
        assert_eq!(replies[0].payload.as_text(), Some("hello there"));

        let media = MediaRef::new("file-9").with_caption("look at this");
        let event = IncomingEvent::new("test", UserId(2), Payload::Photo(media.clone()));
        let replies = engine.handle_event(&event).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].recipient, UserId(1));
        assert_eq!(replies[0].payload, Payload::Photo(media));
    }

    #[tokio::test]
    async fn relay_while_unpaired_is_a_notice_to_sender() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;

        let replies = engine.handle_event(&text_event(1, "anybody?")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);
        let text = replies[0].payload.as_text().unwrap_or_default();
        assert!(text.contains("not connected"), "got: {text}");
    }

    #[tokio::test]
    async fn next_swaps_partner_and_notifies_the_old_one() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        for user in [1, 2, 3] {
            onboard(&engine, user).await;
        }
        engine.handle_event(&text_event(1, "/find")).await;
        engine.handle_event(&text_event(2, "/find")).await;
        engine.handle_event(&text_event(3, "/find")).await;
        assert!(engine.is_waiting(UserId(3)).await);

        let replies = engine.handle_event(&text_event(1, "/next")).await;
        // Old partner notice plus two connected notices
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0].recipient, UserId(2));

        assert_eq!(engine.partner_of(UserId(1)).await, Some(UserId(3)));
        assert_eq!(engine.partner_of(UserId(2)).await, None);
        assert!(!engine.is_waiting(UserId(2)).await);
    }

    #[tokio::test]
    async fn next_with_empty_pool_parks_the_caller() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;
        onboard(&engine, 2).await;
        engine.handle_event(&text_event(1, "/find")).await;
        engine.handle_event(&text_event(2, "/find")).await;

        let replies = engine.handle_event(&text_event(1, "/next")).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].recipient, UserId(2));
        assert_eq!(replies[1].recipient, UserId(1));

        assert!(engine.is_waiting(UserId(1)).await);
        assert!(!engine.is_waiting(UserId(2)).await);
        assert_eq!(engine.stats().await.active_pairs, 0);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;
        onboard(&engine, 2).await;
        engine.handle_event(&text_event(1, "/find")).await;
        engine.handle_event(&text_event(2, "/find")).await;

        let replies = engine.handle_event(&text_event(1, "/stop")).await;
        let mut to = recipients(&replies);
        to.sort();
        assert_eq!(to, vec![UserId(1), UserId(2)]);

        // Second stop only talks to the caller
        let replies = engine.handle_event(&text_event(1, "/stop")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);

        let stats = engine.stats().await;
        assert_eq!(stats.active_pairs, 0);
        assert_eq!(stats.waiting, 0);
    }

    #[tokio::test]
    async fn stop_while_waiting_leaves_the_queue() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;
        engine.handle_event(&text_event(1, "/find")).await;
        assert!(engine.is_waiting(UserId(1)).await);

        let replies = engine.handle_event(&text_event(1, "/stop")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);
        assert!(!engine.is_waiting(UserId(1)).await);
    }

    #[tokio::test]
    async fn start_under_always_policy_tears_down_the_session() {
        let engine = Engine::new(OnboardingPolicy::Always);
        onboard(&engine, 1).await;
        onboard(&engine, 2).await;
        engine.handle_event(&text_event(1, "/find")).await;
        engine.handle_event(&text_event(2, "/find")).await;
        assert_eq!(engine.stats().await.active_pairs, 1);

        let replies = engine.handle_event(&text_event(1, "/start")).await;
        // Partner hears the teardown, then user 1 gets the name prompt
        assert_eq!(recipients(&replies), vec![UserId(2), UserId(1)]);

        let stats = engine.stats().await;
        assert_eq!(stats.active_pairs, 0);
        assert_eq!(stats.onboarding, 1);
        assert!(!engine.is_waiting(UserId(2)).await);
    }

    #[tokio::test]
    async fn start_when_complete_greets_instead_of_reonboarding() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;

        let replies = engine.handle_event(&text_event(1, "/start")).await;
        assert_eq!(replies.len(), 1);
        let text = replies[0].payload.as_text().unwrap_or_default();
        assert!(text.contains("Alice"), "got: {text}");
        assert_eq!(engine.stats().await.onboarding, 0);
    }

    #[tokio::test]
    async fn name_edit_validates_and_updates() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);
        onboard(&engine, 1).await;

        engine.handle_event(&text_event(1, "/name Bob")).await;
        assert_eq!(engine.profile_of(UserId(1)).await.name, "Bob");

        engine.handle_event(&text_event(1, "/name B0b!")).await;
        assert_eq!(engine.profile_of(UserId(1)).await.name, "Bob");

        engine.handle_event(&text_event(1, "/gender male")).await;
        let profile = engine.profile_of(UserId(1)).await;
        assert_eq!(profile.gender, Some(crate::profile::Gender::Male));
        assert!(profile.is_complete());
    }

    #[tokio::test]
    async fn edits_require_a_finished_profile() {
        let engine = Engine::new(OnboardingPolicy::IfIncomplete);

        let replies = engine.handle_event(&text_event(1, "/name Bob")).await;
        assert_eq!(recipients(&replies), vec![UserId(1)]);
        // The nudge does not drop the user into onboarding
        assert_eq!(engine.stats().await.onboarding, 0);
        assert_eq!(engine.profile_of(UserId(1)).await.name, "Anonymous");
    }
}
