//! Input safety filter.
//!
//! Redacts personal data from incoming messages and hard-blocks requests the
//! simulation must never answer, such as medical diagnoses.

use regex::Regex;
use std::sync::LazyLock;

/// Email addresses.
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b"));

/// US social security numbers. Must run before the phone pattern.
static SSN_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\b\d{3}-\d{2}-\d{4}\b"));

/// Ten-digit phone numbers with optional separators.
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?:\+?1[\s.\-]?)?\(?\b\d{3}\)?[\s.\-]?\d{3}[\s.\-]?\d{4}\b")
});

/// Requests to diagnose or prescribe for a medical condition.
static DIAGNOSIS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"(?i)\b(diagnos(e|es|ed|is|ing)|prescrib(e|es|ing)|what (medication|medicine|dosage))\b",
    )
});

const DIAGNOSIS_REFUSAL: &str = "I can't provide medical diagnoses or treatment advice. \
     Please involve the school nurse, a counselor, or a qualified health professional.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// The (possibly redacted) message may proceed.
    Allowed { text: String, redactions: usize },
    /// The turn must short-circuit with `reason` as the system reply.
    Blocked { reason: String },
}

/// Runs the redaction and block rules over `input`.
pub fn screen(input: &str) -> SafetyVerdict {
    if DIAGNOSIS_REGEX.is_match(input) {
        return SafetyVerdict::Blocked {
            reason: DIAGNOSIS_REFUSAL.to_string(),
        };
    }

    let mut redactions = 0;
    let mut text = input.to_string();
    for (regex, replacement) in [
        (&*EMAIL_REGEX, "[REDACTED_EMAIL]"),
        (&*SSN_REGEX, "[REDACTED_ID]"),
        (&*PHONE_REGEX, "[REDACTED_PHONE]"),
    ] {
        redactions += regex.find_iter(&text).count();
        text = regex.replace_all(&text, replacement).into_owned();
    }
    SafetyVerdict::Allowed { text, redactions }
}

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Covered by the `load_regex` test.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}
