/*!
 * Field Redaction
 * Masks sensitive values before they reach log lines or label values
 */

use crate::core::types::SmallStr;
use regex::Regex;
use std::borrow::Cow;

/// Fixed token substituted for fully masked values
pub const MASK_TOKEN: &str = "[REDACTED]";

/// How a rule selects field names
///
/// Matchers have a fixed specificity order: exact beats suffix beats
/// pattern. Within the same specificity, configured order decides.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// Full field name, case-sensitive
    Exact(SmallStr),
    /// Field name suffix, e.g. `_token` matches `session_token`
    Suffix(SmallStr),
    /// Regular expression over the field name
    Pattern(Regex),
}

impl FieldMatcher {
    fn matches(&self, field: &str) -> bool {
        match self {
            FieldMatcher::Exact(name) => field == name.as_str(),
            FieldMatcher::Suffix(suffix) => field.ends_with(suffix.as_str()),
            FieldMatcher::Pattern(re) => re.is_match(field),
        }
    }

    // Lower rank checks first
    fn specificity(&self) -> u8 {
        match self {
            FieldMatcher::Exact(_) => 0,
            FieldMatcher::Suffix(_) => 1,
            FieldMatcher::Pattern(_) => 2,
        }
    }
}

/// Value transformation applied on a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskAction {
    /// Replace the whole value with [`MASK_TOKEN`]
    Full,
    /// Keep the last `n` characters, star out the rest (e.g. card numbers)
    KeepLast(usize),
}

/// A single redaction rule: field matcher plus value transformer
///
/// Pure function over (field name, value); no shared mutable state.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    matcher: FieldMatcher,
    action: MaskAction,
}

impl RedactionRule {
    pub fn exact(name: &str, action: MaskAction) -> Self {
        Self {
            matcher: FieldMatcher::Exact(name.into()),
            action,
        }
    }

    pub fn suffix(suffix: &str, action: MaskAction) -> Self {
        Self {
            matcher: FieldMatcher::Suffix(suffix.into()),
            action,
        }
    }

    pub fn pattern(pattern: &str, action: MaskAction) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: FieldMatcher::Pattern(Regex::new(pattern)?),
            action,
        })
    }
}

/// Ordered rule set consulted by both the log and the label paths
///
/// First match wins; unmatched fields pass through unchanged. Every
/// transformation is idempotent, so re-redacting an already-masked value is
/// a no-op.
#[derive(Debug, Clone)]
pub struct Redactor {
    // Sorted most specific first at construction
    rules: Vec<RedactionRule>,
}

impl Redactor {
    /// Build from configured rules, stable-sorted by matcher specificity
    pub fn new(mut rules: Vec<RedactionRule>) -> Self {
        rules.sort_by_key(|r| r.matcher.specificity());
        Self { rules }
    }

    /// Pass-through redactor, for tests and opt-out configurations
    pub fn disabled() -> Self {
        Self { rules: Vec::new() }
    }

    /// Conventional sensitive-name rules: password, token, secret, card and
    /// credential fields are fully masked
    pub fn default_rules() -> Vec<RedactionRule> {
        vec![
            RedactionRule::exact("password", MaskAction::Full),
            RedactionRule::exact("passwd", MaskAction::Full),
            RedactionRule::exact("authorization", MaskAction::Full),
            RedactionRule::suffix("_password", MaskAction::Full),
            RedactionRule::suffix("_token", MaskAction::Full),
            RedactionRule::suffix("_secret", MaskAction::Full),
            RedactionRule::suffix("_key", MaskAction::Full),
            RedactionRule::suffix("_credential", MaskAction::Full),
            RedactionRule::suffix("_card", MaskAction::Full),
            RedactionRule::exact("token", MaskAction::Full),
            RedactionRule::exact("secret", MaskAction::Full),
            RedactionRule::exact("card_number", MaskAction::Full),
        ]
    }

    /// Apply the first matching rule to `value`; unmatched values pass
    /// through borrowed (zero-copy)
    pub fn redact<'v>(&self, field: &str, value: &'v str) -> Cow<'v, str> {
        for rule in &self.rules {
            if rule.matcher.matches(field) {
                return apply(rule.action, value);
            }
        }
        Cow::Borrowed(value)
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}

fn apply(action: MaskAction, value: &str) -> Cow<'_, str> {
    match action {
        MaskAction::Full => {
            if value == MASK_TOKEN {
                Cow::Borrowed(value)
            } else {
                Cow::Borrowed(MASK_TOKEN)
            }
        }
        MaskAction::KeepLast(keep) => {
            let total = value.chars().count();
            if total <= keep {
                return Cow::Borrowed(value);
            }
            let mut masked = String::with_capacity(value.len());
            for (i, c) in value.chars().enumerate() {
                if i < total - keep {
                    masked.push('*');
                } else {
                    masked.push(c);
                }
            }
            if masked == value {
                Cow::Borrowed(value)
            } else {
                Cow::Owned(masked)
            }
        }
    }
}
