//! # Prompt Resolution Module
//!
//! Turns activity names into generation prompts. Two strategies share one
//! contract: given `n` names, return `n` prompts in the same order.
//!
//! - [`PromptStrategy::Template`] - local keyword table, pure and infallible
//! - [`PromptStrategy::Creative`] - few-shot query to a language model
//!
//! ```
//! use dayscore::prompts::{resolve_prompts, PromptStrategy};
//!
//! let names = vec!["Commute to work".to_string(), "Walk by the beach".to_string()];
//! let prompts = resolve_prompts(&names, &PromptStrategy::Template, false)?;
//! assert_eq!(prompts.len(), names.len());
//! # Ok::<(), dayscore::error::Error>(())
//! ```

use crate::creative::{self, PromptCompleter};
use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::HashMap;

/// How prompts are obtained for a batch.
pub enum PromptStrategy<'a> {
    Template,
    Creative(&'a dyn PromptCompleter),
}

impl PromptStrategy<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            PromptStrategy::Template => "template",
            PromptStrategy::Creative(_) => "creative",
        }
    }
}

/// Resolve one prompt per activity name, preserving order.
///
/// `deterministic` only affects the creative strategy, where it requests
/// reproducible (zero temperature) output.
///
/// # Errors
///
/// Returns [`Error::PromptResolution`] if the creative strategy fails or
/// returns a different number of prompts than names.
pub fn resolve_prompts(
    names: &[String],
    strategy: &PromptStrategy<'_>,
    deterministic: bool,
) -> Result<Vec<String>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    info!(
        "Resolving {} prompts with the {} strategy",
        names.len(),
        strategy.label()
    );

    let prompts = match strategy {
        PromptStrategy::Template => names.iter().map(|n| template_prompt(n)).collect(),
        PromptStrategy::Creative(completer) => creative::query(*completer, names, deterministic)?,
    };

    if prompts.len() != names.len() {
        return Err(Error::prompt(format!(
            "Expected {} prompts but got {}",
            names.len(),
            prompts.len()
        )));
    }
    for (name, prompt) in names.iter().zip(&prompts) {
        debug!("'{name}' -> '{prompt}'");
    }
    Ok(prompts)
}

/// Keyword groups and the sound they stand for. When several groups match,
/// the one listed first wins, so specific scenes come before generic ones.
const SOUND_TABLE: &[(&[&str], &str)] = &[
    (
        &["beach", "ocean", "seaside", "surf"],
        "footsteps tapping on the sand with waves in the background",
    ),
    (
        &["beer", "drinks", "bar", "party", "friends", "celebration"],
        "laughter and the clinking of glasses, crunching of chips",
    ),
    (
        &["commute", "drive", "driving", "traffic", "bus", "train"],
        "cars honking in traffic",
    ),
    (
        &["pod", "conference", "webinar", "zoom"],
        "mic feedback, low murmur of voices discussing on a conference call",
    ),
    (
        &["meeting", "call", "sync", "standup", "interview", "1:1"],
        "keyboard typing and mouse clicks with chatter in the background",
    ),
    (
        &["class", "lecture", "course", "seminar", "lesson", "study"],
        "turning pages, lecturer speaking faintly in the background",
    ),
    (
        &["gym", "workout", "training", "run", "yoga"],
        "sneakers squeaking, weights clanking, upbeat music in the distance",
    ),
    (
        &["lunch", "breakfast", "dinner", "coffee", "cafe", "brunch"],
        "cafe chatter, cutlery on plates and an espresso machine hissing",
    ),
    (
        &["walk", "hike", "park", "garden"],
        "birdsong and footsteps on a gravel path",
    ),
    (
        &["sleep", "nap", "relax", "meditation"],
        "soft rain on a window and a quiet room tone",
    ),
    (
        &["code", "coding", "focus", "review", "work"],
        "steady keyboard typing in a quiet office",
    ),
];

lazy_static::lazy_static! {
    /// Keyword -> position of its group in `SOUND_TABLE`
    static ref KEYWORD_INDEX: HashMap<&'static str, usize> = SOUND_TABLE
        .iter()
        .enumerate()
        .flat_map(|(i, (keywords, _))| keywords.iter().map(move |k| (*k, i)))
        .collect();
}

/// Map one activity to a sound description using the keyword table.
pub fn template_prompt(activity: &str) -> String {
    let lowered = activity.to_lowercase();

    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == ':'))
        .filter(|w| !w.is_empty())
        .filter_map(keyword_group)
        .min()
        .map(|i| SOUND_TABLE[i].1.to_string())
        .unwrap_or_else(|| format!("ambient sounds of {}", lowered.trim()))
}

/// Exact keyword or its simple plural ("classes" finds "class").
fn keyword_group(word: &str) -> Option<usize> {
    KEYWORD_INDEX
        .get(word)
        .or_else(|| word.strip_suffix("es").and_then(|w| KEYWORD_INDEX.get(w)))
        .or_else(|| word.strip_suffix('s').and_then(|w| KEYWORD_INDEX.get(w)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creative::CompletionRequest;
    use std::cell::Cell;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    struct Canned {
        reply: String,
        calls: Cell<usize>,
    }

    impl PromptCompleter for Canned {
        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.reply.clone())
        }
    }

    /// Completer whose service cannot be reached
    struct Offline {
        calls: Cell<usize>,
    }

    impl PromptCompleter for Offline {
        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Err(Error::prompt("Completion request failed: connection refused"))
        }
    }

    #[test]
    fn test_template_preserves_length_and_order() {
        let input = names(&["Commute to work", "Walk by the beach", "Meeting with Joe"]);
        let prompts = resolve_prompts(&input, &PromptStrategy::Template, false).unwrap();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0], "cars honking in traffic");
        assert!(prompts[1].contains("waves"));
        assert!(prompts[2].contains("keyboard typing"));
    }

    #[test]
    fn test_template_is_pure() {
        let input = names(&["Monday MS FinTech Classes", "Knitting circle"]);
        let a = resolve_prompts(&input, &PromptStrategy::Template, false).unwrap();
        let b = resolve_prompts(&input, &PromptStrategy::Template, true).unwrap();
        let c = resolve_prompts(&input, &PromptStrategy::Template, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_template_fallback_wraps_activity() {
        assert_eq!(template_prompt("Knitting Circle"), "ambient sounds of knitting circle");
    }

    #[test]
    fn test_template_matches_whole_words_and_plurals() {
        assert!(template_prompt("Tuesday classes").contains("lecturer"));
        assert!(template_prompt("subclass").starts_with("ambient sounds of"));
        assert!(template_prompt("Dinner at the restaurant").contains("cafe"));
        assert!(template_prompt("Training session").contains("sneakers"));
    }

    #[test]
    fn test_empty_input_skips_completer() {
        let canned = Canned {
            reply: String::new(),
            calls: Cell::new(0),
        };
        let prompts = resolve_prompts(&[], &PromptStrategy::Creative(&canned), true).unwrap();
        assert!(prompts.is_empty());
        assert_eq!(canned.calls.get(), 0);
    }

    #[test]
    fn test_creative_preserves_length_and_order() {
        let canned = Canned {
            reply: r#"{"sounds": ["Cars honking", "Waves on sand"]}"#.to_string(),
            calls: Cell::new(0),
        };
        let input = names(&["Commute to work", "Walk by the beach"]);
        let prompts = resolve_prompts(&input, &PromptStrategy::Creative(&canned), true).unwrap();
        assert_eq!(prompts, vec!["Cars honking", "Waves on sand"]);
        assert_eq!(canned.calls.get(), 1);
    }

    #[test]
    fn test_creative_length_mismatch_is_an_error() {
        let canned = Canned {
            reply: r#"{"sounds": ["Only one"]}"#.to_string(),
            calls: Cell::new(0),
        };
        let input = names(&["a", "b"]);
        let err = resolve_prompts(&input, &PromptStrategy::Creative(&canned), false).unwrap_err();
        assert!(matches!(err, Error::PromptResolution(_)));
    }

    #[test]
    fn test_completer_failure_is_not_replaced_by_templates() {
        let offline = Offline {
            calls: Cell::new(0),
        };
        let input = names(&["Commute to work", "Walk by the beach"]);
        let err = resolve_prompts(&input, &PromptStrategy::Creative(&offline), true).unwrap_err();
        assert!(matches!(&err, Error::PromptResolution(msg) if msg.contains("connection refused")));
        assert_eq!(offline.calls.get(), 1);
    }
}
