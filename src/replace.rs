//! Tag-aware token replacement in raw part text.
//!
//! A placeholder that survived editing intact can be replaced verbatim. One
//! that was split across runs needs the tag-aware path: the matcher walks
//! the raw text character by character, skipping everything between `<` and
//! `>` without consuming placeholder characters, and on a full match
//! replaces the whole consumed span, interior markup included; the markup
//! is deliberately discarded. Both paths produce identical output for a token
//! that occurs verbatim; the direct path exists purely for speed.

use memchr::memmem;
use tracing::warn;

/// A match attempt is abandoned once it has consumed more than this many
/// times the token's length. Hard termination guard against pathological
/// input; an abandoned occurrence is left untouched, never an error.
pub const DEFAULT_SCAN_BUDGET_FACTOR: usize = 10;

/// Outcome of replacing one token throughout a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceOutcome {
    /// Occurrences replaced
    pub replaced: usize,
    /// Match attempts abandoned by the scan-budget guard
    pub abandoned: usize,
}

/// Replace every occurrence of `token` in `raw` with `value`.
///
/// Tries the direct path first: when the literal occurs verbatim (not split
/// by interior markup), a plain substring replacement is behaviorally
/// equivalent and much cheaper. Otherwise falls back to the tag-aware scan
/// with `budget_factor` bounding each match attempt.
pub fn replace_token(
    raw: &str,
    token: &str,
    value: &str,
    budget_factor: usize,
) -> (String, ReplaceOutcome) {
    if token.is_empty() {
        return (raw.to_string(), ReplaceOutcome::default());
    }

    if memmem::find(raw.as_bytes(), token.as_bytes()).is_some() {
        let replaced = memmem::find_iter(raw.as_bytes(), token.as_bytes()).count();
        return (
            raw.replace(token, value),
            ReplaceOutcome {
                replaced,
                abandoned: 0,
            },
        );
    }

    replace_tag_aware(raw, token, value, budget_factor)
}

/// What one tag-aware match attempt concluded.
enum Attempt {
    /// Matched; the value is the raw offset just past the consumed span.
    Matched(usize),
    NoMatch,
    /// The scan-budget guard fired before the attempt could conclude.
    Abandoned,
}

fn replace_tag_aware(
    raw: &str,
    token: &str,
    value: &str,
    budget_factor: usize,
) -> (String, ReplaceOutcome) {
    let bytes = raw.as_bytes();
    let token_bytes = token.as_bytes();
    let first = token_bytes[0];
    let budget = token.len().saturating_mul(budget_factor);

    let mut out = String::with_capacity(raw.len());
    let mut outcome = ReplaceOutcome::default();
    // Start of the raw region not yet copied to the output.
    let mut copied = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == first {
            match try_match(bytes, pos, token_bytes, budget) {
                Attempt::Matched(end) => {
                    out.push_str(&raw[copied..pos]);
                    out.push_str(value);
                    outcome.replaced += 1;
                    pos = end;
                    copied = end;
                    continue;
                },
                Attempt::Abandoned => {
                    outcome.abandoned += 1;
                    warn!(
                        token,
                        offset = pos,
                        budget,
                        "match attempt exceeded scan budget, leaving occurrence untouched"
                    );
                },
                Attempt::NoMatch => {},
            }
        }
        // Failed attempts restart one position later.
        pos += 1;
    }

    out.push_str(&raw[copied..]);
    (out, outcome)
}

/// Attempt to match `token` starting at `start`, skipping interior tags.
///
/// Tag state is local to the attempt: characters between `<` and `>` are
/// passed over without consuming token characters; any other character must
/// equal the next expected token character or the attempt fails. Consuming
/// more than `budget` bytes abandons the attempt.
fn try_match(bytes: &[u8], start: usize, token: &[u8], budget: usize) -> Attempt {
    let mut in_tag = false;
    let mut matched = 0;
    let mut pos = start;

    while pos < bytes.len() && matched < token.len() {
        if pos - start > budget {
            return Attempt::Abandoned;
        }
        let b = bytes[pos];
        if b == b'<' {
            in_tag = true;
        } else if b == b'>' {
            in_tag = false;
        } else if !in_tag {
            if b == token[matched] {
                matched += 1;
            } else {
                return Attempt::NoMatch;
            }
        }
        pos += 1;
    }

    if matched == token.len() {
        Attempt::Matched(pos)
    } else {
        Attempt::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(raw: &str, token: &str, value: &str) -> (String, ReplaceOutcome) {
        replace_token(raw, token, value, DEFAULT_SCAN_BUDGET_FACTOR)
    }

    #[test]
    fn test_verbatim_replacement() {
        let (out, outcome) = replace("<w:t>Dear {{name}},</w:t>", "{{name}}", "Ada");
        assert_eq!(out, "<w:t>Dear Ada,</w:t>");
        assert_eq!(outcome.replaced, 1);
        assert_eq!(outcome.abandoned, 0);
    }

    #[test]
    fn test_verbatim_replaces_all_occurrences() {
        let (out, outcome) = replace("{{x}} and {{x}}", "{{x}}", "1");
        assert_eq!(out, "1 and 1");
        assert_eq!(outcome.replaced, 2);
    }

    #[test]
    fn test_split_token_is_matched_and_markup_discarded() {
        let raw = "<w:t>{{na</w:t><w:r><w:t>me}}</w:t></w:r>";
        let (out, outcome) = replace(raw, "{{name}}", "Ada");
        assert_eq!(out, "<w:t>Ada</w:t></w:r>");
        assert_eq!(outcome.replaced, 1);
    }

    #[test]
    fn test_token_split_by_self_closing_tag() {
        let raw = "{{na<tag/>me}}";
        let (out, _) = replace(raw, "{{name}}", "Ada");
        assert_eq!(out, "Ada");
    }

    #[test]
    fn test_no_match_leaves_text_intact() {
        let raw = "<w:t>no placeholders here</w:t>";
        let (out, outcome) = replace(raw, "{{name}}", "Ada");
        assert_eq!(out, raw);
        assert_eq!(outcome, ReplaceOutcome::default());
    }

    #[test]
    fn test_empty_value_erases_token() {
        let (out, _) = replace("a {{gone}} b", "{{gone}}", "");
        assert_eq!(out, "a  b");
    }

    #[test]
    fn test_scan_budget_abandons_pathological_input() {
        // The opening braces are followed by an enormous run of markup, so
        // a match attempt would have to consume far more than 10x the token
        // length before finding the rest of it.
        let mut raw = String::from("{{");
        for _ in 0..50 {
            raw.push_str("<r></r>");
        }
        raw.push_str("name}}");
        let (out, outcome) = replace(&raw, "{{name}}", "Ada");
        assert_eq!(out, raw);
        assert_eq!(outcome.replaced, 0);
        assert!(outcome.abandoned >= 1);
    }

    #[test]
    fn test_match_within_budget_still_succeeds() {
        // A couple of short interior tags stay well inside the budget.
        let raw = "{{na<a/><b/>me}}";
        let (out, outcome) = replace(raw, "{{name}}", "Ada");
        assert_eq!(out, "Ada");
        assert_eq!(outcome.abandoned, 0);
    }

    #[test]
    fn test_direct_and_tag_aware_paths_agree_on_verbatim_input() {
        let raw = "<w:t>x {{a}} y {{a}} z</w:t>";
        let (direct, _) = replace(raw, "{{a}}", "V");
        let (aware, _) = replace_tag_aware(raw, "{{a}}", "V", DEFAULT_SCAN_BUDGET_FACTOR);
        assert_eq!(direct, aware);
    }

    #[test]
    fn test_multibyte_value_and_token() {
        let raw = "<w:t>{{grü</w:t><w:t>ße}}</w:t>";
        let (out, _) = replace(raw, "{{grüße}}", "Grüße!");
        assert_eq!(out, "<w:t>Grüße!</w:t>");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// Strategy for placeholder names (no braces, no markup characters)
        fn name_strategy() -> impl Strategy<Value = String> {
            "[a-zA-Z][a-zA-Z0-9_]{0,12}"
        }

        /// Strategy for surrounding text free of braces and markup
        fn filler_strategy() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9 .,]{0,30}"
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// A token occurring verbatim is replaced identically by the
            /// direct path and the tag-aware path.
            #[test]
            fn prop_direct_and_tag_aware_paths_agree(
                name in name_strategy(),
                before in filler_strategy(),
                between in filler_strategy(),
                after in filler_strategy(),
                value in filler_strategy(),
            ) {
                let token = format!("{{{{{name}}}}}");
                let raw = format!("<w:t>{before}{token}{between}{token}{after}</w:t>");

                let (direct, direct_outcome) =
                    replace_token(&raw, &token, &value, DEFAULT_SCAN_BUDGET_FACTOR);
                let (aware, aware_outcome) =
                    replace_tag_aware(&raw, &token, &value, DEFAULT_SCAN_BUDGET_FACTOR);

                prop_assert_eq!(&direct, &aware);
                prop_assert_eq!(direct_outcome.replaced, aware_outcome.replaced);
                prop_assert_eq!(direct_outcome.replaced, 2);
            }

            /// A token split at an arbitrary point by an interior tag is
            /// still matched, and the interior tag disappears with it.
            #[test]
            fn prop_split_token_is_reassembled(
                name in name_strategy(),
                split in 1usize..8,
                value in filler_strategy(),
            ) {
                let token = format!("{{{{{name}}}}}");
                let split = split.min(token.len() - 1);
                let raw = format!(
                    "<w:t>{}</w:t><w:t>{}</w:t>",
                    &token[..split],
                    &token[split..]
                );

                let (out, outcome) =
                    replace_token(&raw, &token, &value, DEFAULT_SCAN_BUDGET_FACTOR);

                prop_assert_eq!(outcome.replaced, 1);
                prop_assert!(out.contains(&value));
                prop_assert!(!out.contains(&token));
            }
        }
    }
}
