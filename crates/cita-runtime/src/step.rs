//! The per-turn driver.
//!
//! One [`DialogueEngine::advance`] call processes one inbound user
//! message: intent override check, planner call, tool execution,
//! conditional retry-policy routing, transition validation, atomic
//! commit. The transition table, never the planner, is authoritative:
//! planner state labels are proposals, applied only if validation accepts
//! them. Every failure inside a turn resolves to a canonical message plus
//! a defined next state; only busy/persistence/cancellation conditions
//! surface to the caller as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use cita_core::intent::{IntentRouter, Override, detect_language};
use cita_core::messages::Message;
use cita_core::session::Session;
use cita_core::state::{State, TransitionTable, directive_for};
use cita_core::templates;
use cita_llm::errors::PlannerError;
use cita_llm::planner::{Planner, plan_with_timeout};
use cita_llm::types::{PlannerRequest, PlannerResponse};
use cita_settings::CitaSettings;

use crate::errors::RuntimeError;
use crate::events::{EngineEvent, EventEmitter};
use crate::retry::{Action, EscalationReason, Outcome, RetryPolicy, classify};
use crate::route::needs_retry_policy;
use crate::store::SessionStore;
use crate::tools::{ToolBackend, execute_batch};

/// One inbound user message.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    /// External session identifier (transport-scoped).
    pub external_session_id: &'a str,
    /// Sanitized user text.
    pub text: &'a str,
    /// Transport hint recorded on the session, if the caller has one.
    pub platform: Option<&'a str>,
}

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Internal thread id the external session resolved to.
    pub thread_id: String,
    /// State the session ended the turn in.
    pub state: State,
    /// Outbound message for the user.
    pub reply: String,
}

/// The orchestrator step.
pub struct DialogueEngine {
    table: TransitionTable,
    router: IntentRouter,
    policy: RetryPolicy,
    store: Arc<SessionStore>,
    planner: Arc<dyn Planner>,
    tools: Arc<dyn ToolBackend>,
    emitter: Arc<EventEmitter>,
    planner_timeout: Duration,
    tool_timeout: Duration,
    history_window: usize,
}

impl DialogueEngine {
    /// Wire the engine from its collaborators and settings.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        planner: Arc<dyn Planner>,
        tools: Arc<dyn ToolBackend>,
        emitter: Arc<EventEmitter>,
        settings: &CitaSettings,
    ) -> Self {
        Self {
            table: TransitionTable::new(),
            router: IntentRouter::new(),
            policy: RetryPolicy::new(settings.retry.escalation_threshold),
            store,
            planner,
            tools,
            emitter,
            planner_timeout: Duration::from_millis(settings.planner.timeout_ms),
            tool_timeout: Duration::from_millis(settings.tools.timeout_ms),
            history_window: settings.session.history_window,
        }
    }

    /// The event emitter turns publish to.
    #[must_use]
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    /// Process one inbound message for a session.
    ///
    /// Cancellation is atomic: a turn cancelled before commit leaves no
    /// trace: no state change, no data, no history.
    #[instrument(skip_all, fields(external_id = request.external_session_id))]
    pub async fn advance(
        &self,
        request: TurnRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, RuntimeError> {
        let started = Instant::now();
        let thread_id = self.store.resolve(request.external_session_id);
        let _guard = self.store.begin_turn(&thread_id)?;

        let mut session = self.store.get_or_create(&thread_id).await?;
        let _ = self.emitter.emit(EngineEvent::TurnStarted {
            session_id: thread_id.clone(),
        });

        session.observe_language(detect_language(request.text));
        if session.platform.is_none() {
            session.platform = request.platform.map(str::to_owned);
        }
        session.push_message(Message::user(request.text));

        let reply = match self.router.classify(request.text) {
            Some(intent) => self.apply_override(&mut session, intent),
            None => self.run_planner_turn(&mut session, cancel).await,
        };
        session.push_message(Message::assistant(reply.clone()));

        if cancel.is_cancelled() {
            warn!(thread_id, "turn cancelled before commit, discarding draft");
            return Err(RuntimeError::Cancelled(thread_id));
        }

        let state = session.state;
        self.store.commit(session).await?;

        counter!("turns_total").increment(1);
        histogram!("turn_duration_seconds").record(started.elapsed().as_secs_f64());
        let _ = self.emitter.emit(EngineEvent::TurnCompleted {
            session_id: thread_id.clone(),
            state,
        });
        info!(thread_id, %state, "turn committed");

        Ok(TurnOutcome {
            thread_id,
            state,
            reply,
        })
    }

    /// Run the idle sweep: evict sessions idle longer than `max_idle`
    /// (and their identity mappings), broadcasting the result.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let evicted = self.store.evict_idle_older_than(max_idle).await;
        if evicted > 0 {
            let _ = self
                .emitter
                .emit(EngineEvent::SessionsEvicted { count: evicted });
        }
        evicted
    }

    /// Intent override: bypass normal progression and enter the target
    /// flow from wherever the session is, via table validation (the
    /// universal edges make it legal from every non-terminal state).
    fn apply_override(&self, session: &mut Session, intent: Override) -> String {
        let target = intent.entry_state();
        let language = session.language;

        if target == session.state {
            // Already there; just repeat the entry prompt.
            return templates::entry_prompt(target, language).to_owned();
        }

        match self.table.validate(session.state, target) {
            Ok(next) => {
                debug!(from = %session.state, to = %next, "intent override");
                session.state = next;
                counter!("intent_overrides_total").increment(1);
                let _ = self.emitter.emit(EngineEvent::OverrideFired {
                    session_id: session.id.clone(),
                    target: next,
                });
                templates::entry_prompt(next, language).to_owned()
            }
            Err(err) => {
                // Only reachable from the terminal state.
                warn!(%err, "override rejected by transition table");
                templates::recoverable_error_message(language).to_owned()
            }
        }
    }

    /// The state-driven path: planner, tools, conditional routing,
    /// proposal validation.
    async fn run_planner_turn(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> String {
        let directive = directive_for(session.state);
        let request = PlannerRequest {
            objective: directive.objective.to_owned(),
            expected_tool: directive.expected_tool.map(str::to_owned),
            history: session.history.trimmed(self.history_window).to_vec(),
            tools: self.tools.schemas(),
        };

        let response =
            match plan_with_timeout(self.planner.as_ref(), request, self.planner_timeout).await {
                Ok(response) if response.is_empty() => {
                    warn!("planner returned neither message nor tool calls");
                    return templates::recoverable_error_message(session.language).to_owned();
                }
                Ok(response) => response,
                Err(PlannerError::Timeout { .. } | PlannerError::Transport(_)) => {
                    // Identical treatment to a system-error tool result.
                    return self.handle_system_failure(session);
                }
                Err(PlannerError::Malformed(reason)) => {
                    warn!(reason, "malformed planner response");
                    return templates::recoverable_error_message(session.language).to_owned();
                }
            };

        let mut last_result: Option<String> = None;
        if !response.tool_calls.is_empty() {
            let results =
                execute_batch(self.tools.as_ref(), &response.tool_calls, self.tool_timeout, cancel)
                    .await;
            for result in &results {
                session.push_message(Message::tool(result.text.clone()));
            }
            last_result = results.into_iter().last().map(|r| r.text);
        }

        // Conditional routing: only the verify states parse tool results
        // through the retry policy; every other state skips it entirely.
        if let Some(result_text) = last_result.as_deref()
            && needs_retry_policy(session.state)
            && let Some(reply) = self.apply_policy(session, result_text)
        {
            return reply;
        }

        self.apply_proposal(session, &response)
    }

    /// Run the retry policy on the turn's last relevant tool result.
    /// Returns the outbound reply when the policy resolved the turn
    /// (re-prompt or escalation); `None` means proceed.
    fn apply_policy(&self, session: &mut Session, result_text: &str) -> Option<String> {
        let flow = session.state.flow()?;
        let outcome = classify(result_text);
        debug!(state = %session.state, ?outcome, "retry policy consulted");

        match self.policy.apply(&mut session.retries, flow.retry_key(), outcome) {
            Action::Proceed => None,
            Action::Reprompt => Some(templates::reprompt_message(session.language).to_owned()),
            Action::Escalate(reason) => Some(self.escalate(session, reason)),
        }
    }

    /// A planner-side failure, treated identically to a system-error tool
    /// result: in a verify state the policy escalates; elsewhere the
    /// policy is skipped and the turn resolves to the technical-difficulty
    /// message in place.
    fn handle_system_failure(&self, session: &mut Session) -> String {
        if needs_retry_policy(session.state)
            && let Some(flow) = session.state.flow()
        {
            let action =
                self.policy
                    .apply(&mut session.retries, flow.retry_key(), Outcome::SystemError);
            if let Action::Escalate(reason) = action {
                return self.escalate(session, reason);
            }
        }
        templates::technical_difficulty_message(session.language).to_owned()
    }

    /// Force the escalation transition to the hub and produce the
    /// matching canonical message.
    fn escalate(&self, session: &mut Session, reason: EscalationReason) -> String {
        if let Ok(next) = self.table.validate(session.state, State::PostAction) {
            session.state = next;
        }
        counter!("escalations_total").increment(1);
        let _ = self.emitter.emit(EngineEvent::EscalationFired {
            session_id: session.id.clone(),
            reason,
        });
        match reason {
            EscalationReason::RetryLimit => {
                templates::escalation_message(session.language).to_owned()
            }
            EscalationReason::SystemFailure => {
                templates::technical_difficulty_message(session.language).to_owned()
            }
        }
    }

    /// Apply the planner's proposed state and data updates, but only if
    /// the table accepts the transition. An unknown label is a missing
    /// proposal (stay in place); a known-but-illegal one keeps the prior
    /// state, skips the data updates, and substitutes the recoverable
    /// message.
    fn apply_proposal(&self, session: &mut Session, response: &PlannerResponse) -> String {
        let language = session.language;

        let proposed = response.proposed_state.as_deref().and_then(|label| {
            match State::from_label(label) {
                Ok(state) => Some(state),
                Err(_) => {
                    debug!(label, "ignoring unknown state label from planner");
                    None
                }
            }
        });

        if let Some(target) = proposed
            && target != session.state
        {
            match self.table.validate(session.state, target) {
                Ok(next) => session.state = next,
                Err(err) => {
                    warn!(%err, "planner proposed illegal transition, session stays put");
                    counter!("illegal_transitions_total").increment(1);
                    return templates::recoverable_error_message(language).to_owned();
                }
            }
        }

        session.data.merge(response.data_updates.clone());
        response
            .message
            .clone()
            .unwrap_or_else(|| templates::entry_prompt(session.state, language).to_owned())
    }
}
