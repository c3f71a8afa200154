//! Intent-based flow pre-emption.
//!
//! A user utterance can force a flow switch regardless of the current
//! state. The router is a pure classifier over raw text: no model call,
//! no session access. Pattern groups overlap on purpose ("cambiar mi
//! cita" satisfies loose cancel phrasing too), so evaluation order is the
//! contract: **Reschedule before Cancel before Exit**. The first group
//! with any matching pattern wins; pattern order inside a group does not
//! matter.

use std::sync::LazyLock;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::state::State;

// ─────────────────────────────────────────────────────────────────────────────
// Override
// ─────────────────────────────────────────────────────────────────────────────

/// A pre-emptive flow switch detected in the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Override {
    /// Switch into the rescheduling flow.
    Reschedule,
    /// Switch into the cancellation flow.
    Cancel,
    /// End the conversation.
    Exit,
}

impl Override {
    /// The state this override transitions the session into.
    #[must_use]
    pub fn entry_state(self) -> State {
        match self {
            Self::Reschedule => State::RescheduleAskConfirmation,
            Self::Cancel => State::CancelAskConfirmation,
            Self::Exit => State::Complete,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

static RESCHEDULE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\breschedul\w*",
        r"(?i)\breagendar\b",
        r"(?i)\breprogramar\b",
        r"(?i)\bcambiar\s+(mi\s+|la\s+)?(cita|turno|hora)\b",
        r"(?i)\bmover\s+(mi\s+|la\s+)?(cita|turno)\b",
        r"(?i)\b(change|move)\s+(my\s+|the\s+)?(appointment|booking|time)\b",
        r"(?i)\b(another|different|otra)\s+(time|hora|fecha)\b",
    ])
    .expect("reschedule patterns are valid")
});

static CANCEL: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bcancel\w*",
        r"(?i)\banular\b",
        r"(?i)\bcall\s+off\b",
        r"(?i)\bya\s+no\s+(quiero|puedo)\s+(ir|asistir)\b",
    ])
    .expect("cancel patterns are valid")
});

static EXIT: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bthat'?s\s+all\b",
        r"(?i)\bnothing\s+else\b",
        r"(?i)\beso\s+es\s+todo\b",
        r"(?i)\bnada\s+m[aá]s\b",
        r"(?i)\b(adi[oó]s|goodbye|bye)\b",
        r"(?i)^\s*no,?\s+(gracias|thanks|thank\s+you)\s*[.!]?\s*$",
    ])
    .expect("exit patterns are valid")
});

/// Pure, stateless intent classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentRouter;

impl IntentRouter {
    /// Create a router.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify raw user text into at most one override.
    ///
    /// Groups are evaluated in fixed priority order; see the module doc
    /// for why the order is significant.
    #[must_use]
    pub fn classify(self, text: &str) -> Option<Override> {
        if RESCHEDULE.is_match(text) {
            Some(Override::Reschedule)
        } else if CANCEL.is_match(text) {
            Some(Override::Cancel)
        } else if EXIT.is_match(text) {
            Some(Override::Exit)
        } else {
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Language detection
// ─────────────────────────────────────────────────────────────────────────────

/// Message language detected from user text. Bookkeeping only: templates
/// pick their wording from it, the state machine never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Spanish.
    Es,
    /// English.
    En,
}

impl Language {
    /// ISO 639-1 code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }
}

static SPANISH_MARKERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(hola|gracias|quiero|necesito|cita|turno|cancelar|cambiar|reagendar|buenos|buenas|por\s+favor|mañana|s[ií])\b",
        r"[¿¡]",
        r"(?i)[a-z]+(ó|í|á|é|ú)[a-z]*",
    ])
    .expect("spanish markers are valid")
});

static ENGLISH_MARKERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(hello|hi|hey|thanks|thank\s+you|please|appointment|booking|book|cancel|change|move|reschedule|want|need|tomorrow|today|goodbye|bye|yes)\b",
    ])
    .expect("english markers are valid")
});

/// Marker-based language detection. Returns `None` when the text carries
/// no usable signal (numbers, a bare confirmation code) so a previous
/// detection is not overwritten.
#[must_use]
pub fn detect_language(text: &str) -> Option<Language> {
    if SPANISH_MARKERS.is_match(text) {
        Some(Language::Es)
    } else if ENGLISH_MARKERS.is_match(text) {
        Some(Language::En)
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reschedule_detected() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("I need to reschedule"),
            Some(Override::Reschedule)
        );
        assert_eq!(
            router.classify("quiero cambiar mi cita"),
            Some(Override::Reschedule)
        );
        assert_eq!(
            router.classify("can we move my appointment?"),
            Some(Override::Reschedule)
        );
    }

    #[test]
    fn cancel_detected() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("cancel my appointment"), Some(Override::Cancel));
        assert_eq!(router.classify("quiero cancelar"), Some(Override::Cancel));
        assert_eq!(router.classify("please call off the visit"), Some(Override::Cancel));
    }

    #[test]
    fn exit_detected() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("that's all, thanks"), Some(Override::Exit));
        assert_eq!(router.classify("eso es todo, gracias"), Some(Override::Exit));
        assert_eq!(router.classify("no gracias"), Some(Override::Exit));
    }

    #[test]
    fn reschedule_wins_over_cancel() {
        // "change my appointment" also satisfies loose cancel phrasing in
        // the source material; priority order must pick reschedule.
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("cancel that, I'd rather reschedule my appointment"),
            Some(Override::Reschedule)
        );
        assert_eq!(
            router.classify("cambiar la cita, o cancelar, no sé"),
            Some(Override::Reschedule)
        );
    }

    #[test]
    fn cancel_wins_over_exit() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("cancel it, that's all"),
            Some(Override::Cancel)
        );
    }

    #[test]
    fn plain_answers_pass_through() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("a haircut at 3pm please"), None);
        assert_eq!(router.classify("my number is CNF-1234"), None);
        assert_eq!(router.classify("sí, el martes"), None);
    }

    #[test]
    fn entry_states() {
        assert_eq!(
            Override::Reschedule.entry_state(),
            State::RescheduleAskConfirmation
        );
        assert_eq!(Override::Cancel.entry_state(), State::CancelAskConfirmation);
        assert_eq!(Override::Exit.entry_state(), State::Complete);
    }

    #[test]
    fn detects_spanish() {
        assert_eq!(detect_language("hola, quiero una cita"), Some(Language::Es));
        assert_eq!(detect_language("¿tienen algo mañana?"), Some(Language::Es));
    }

    #[test]
    fn detects_english() {
        assert_eq!(detect_language("book me a haircut"), Some(Language::En));
    }

    #[test]
    fn no_signal_no_language() {
        assert_eq!(detect_language("12345"), None);
        assert_eq!(detect_language("CNF-99"), None);
        assert_eq!(detect_language(""), None);
    }
}
