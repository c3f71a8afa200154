//! Canonical engine messages.
//!
//! These are the fixed utterances the engine emits without consulting the
//! planner: flow entry prompts on intent overrides, and the escalation /
//! technical-difficulty / recoverable-error messages. Wording is picked by
//! the session's detected language, defaulting to Spanish (the deployments
//! this engine ships to are Spanish-first).

use crate::intent::Language;
use crate::state::State;

fn lang_or_default(language: Option<Language>) -> Language {
    language.unwrap_or(Language::Es)
}

/// Prompt emitted when an intent override enters `state`.
///
/// Only meaningful for the override targets; other states fall back to a
/// generic "how can I help" prompt.
#[must_use]
pub fn entry_prompt(state: State, language: Option<Language>) -> &'static str {
    match (state, lang_or_default(language)) {
        (State::CancelAskConfirmation, Language::Es) => {
            "Claro, puedo cancelar tu cita. ¿Me das tu número de confirmación?"
        }
        (State::CancelAskConfirmation, Language::En) => {
            "Sure, I can cancel your appointment. Could you give me your confirmation number?"
        }
        (State::RescheduleAskConfirmation, Language::Es) => {
            "Claro, puedo cambiar tu cita. ¿Me das tu número de confirmación?"
        }
        (State::RescheduleAskConfirmation, Language::En) => {
            "Sure, I can move your appointment. Could you give me your confirmation number?"
        }
        (State::Complete, Language::Es) => "¡Gracias por escribirnos! Hasta pronto.",
        (State::Complete, Language::En) => "Thanks for reaching out! Goodbye.",
        (_, Language::Es) => "¿En qué puedo ayudarte?",
        (_, Language::En) => "How can I help you?",
    }
}

/// Emitted when a flow exhausts its retry budget.
#[must_use]
pub fn escalation_message(language: Option<Language>) -> &'static str {
    match lang_or_default(language) {
        Language::Es => {
            "No pude encontrar esa cita. Un miembro del equipo te contactará para ayudarte. ¿Necesitas algo más?"
        }
        Language::En => {
            "I couldn't find that appointment. A team member will reach out to help. Is there anything else you need?"
        }
    }
}

/// Emitted when a backend/system failure forces an immediate escalation.
#[must_use]
pub fn technical_difficulty_message(language: Option<Language>) -> &'static str {
    match lang_or_default(language) {
        Language::Es => {
            "Estamos teniendo problemas técnicos en este momento. Por favor intenta de nuevo en unos minutos. ¿Necesitas algo más?"
        }
        Language::En => {
            "We're having technical difficulties right now. Please try again in a few minutes. Is there anything else you need?"
        }
    }
}

/// Emitted when a turn fails in a recoverable way (illegal proposal,
/// malformed planner response). The session stays where it was.
#[must_use]
pub fn recoverable_error_message(language: Option<Language>) -> &'static str {
    match lang_or_default(language) {
        Language::Es => "Perdona, no entendí eso. ¿Puedes repetirlo?",
        Language::En => "Sorry, I didn't catch that. Could you say it again?",
    }
}

/// Re-prompt emitted when a verify step fails on user-provided data but
/// the retry budget still has room.
#[must_use]
pub fn reprompt_message(language: Option<Language>) -> &'static str {
    match lang_or_default(language) {
        Language::Es => {
            "No encontré una cita con esos datos. ¿Puedes revisar tu número de confirmación e intentarlo de nuevo?"
        }
        Language::En => {
            "I couldn't find an appointment with those details. Could you double-check your confirmation number and try again?"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_spanish() {
        assert!(escalation_message(None).contains("equipo"));
        assert!(entry_prompt(State::CancelAskConfirmation, None).contains("cancelar"));
    }

    #[test]
    fn english_variants_exist() {
        assert!(technical_difficulty_message(Some(Language::En)).contains("technical"));
        assert!(reprompt_message(Some(Language::En)).contains("confirmation number"));
    }

    #[test]
    fn override_targets_have_specific_prompts() {
        let cancel = entry_prompt(State::CancelAskConfirmation, Some(Language::En));
        let reschedule = entry_prompt(State::RescheduleAskConfirmation, Some(Language::En));
        let exit = entry_prompt(State::Complete, Some(Language::En));
        assert_ne!(cancel, reschedule);
        assert_ne!(cancel, exit);
    }
}
