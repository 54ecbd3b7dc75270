//! Ecosystem-aware ordering of version strings.
//!
//! This is an approximation of PEP 440, Maven `ComparableVersion` and semver,
//! not a full implementation of any of them. Versions are split into numeric
//! and alphabetic tokens on `.`, `-`, `_` and on digit/letter boundaries, with
//! build metadata (`+...`) ignored. Tokens compare as follows:
//!
//! pre-release qualifier < end of version < post-release qualifier < number
//!
//! so `1.0-rc1 < 1.0 < 1.0.post1 < 1.0.1`. Strings that do not start with a
//! digit (after an optional `v`) cannot be tokenized and sort before every
//! version that can, lexicographically among themselves.

use std::cmp::Ordering;

use crate::types::Ecosystem;

/// Compare two version strings under the rules of `ecosystem`.
///
/// Distinct strings may compare `Equal` (e.g. `1.0+a` and `1.0+b`); callers
/// that need a strict order break ties themselves.
pub fn compare(a: &str, b: &str, ecosystem: Ecosystem) -> Ordering {
    VersionKey::parse(a, ecosystem).cmp(&VersionKey::parse(b, ecosystem))
}

/// Sortable key derived from a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKey {
    /// Could not be tokenized; compared as a plain string.
    Opaque(String),
    Tokens(Vec<Token>),
}

/// One version component. Variant order is the cross-kind ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Token {
    /// Marker that sorts before the bare release (`rc`, `alpha`, `SNAPSHOT`, `jre`).
    PreRelease { rank: u8, label: String },
    /// Padding used when the shorter version runs out of tokens.
    End,
    /// Marker that sorts after the bare release (`post`, `sp`).
    PostRelease { label: String },
    /// Digits with leading zeros stripped, compared by length then value.
    Number { len: usize, digits: String },
}

impl Token {
    fn is_number(&self) -> bool {
        matches!(self, Token::Number { .. })
    }

    fn is_zero(&self) -> bool {
        matches!(self, Token::Number { len: 0, .. })
    }
}

impl VersionKey {
    pub fn parse(version: &str, ecosystem: Ecosystem) -> Self {
        let trimmed = version.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let body = body.split('+').next().unwrap_or(body);

        if !body.starts_with(|c: char| c.is_ascii_digit()) {
            return VersionKey::Opaque(trimmed.to_string());
        }

        let mut tokens = Vec::new();
        for raw in split_tokens(body) {
            if raw.chars().all(|c| c.is_ascii_digit()) {
                let digits = raw.trim_start_matches('0');
                tokens.push(Token::Number {
                    len: digits.len(),
                    digits: digits.to_string(),
                });
                continue;
            }
            let label = raw.to_lowercase();
            if is_release_marker(&label) {
                continue;
            }
            if is_post_release(&label, ecosystem) {
                tokens.push(Token::PostRelease { label });
            } else {
                tokens.push(Token::PreRelease {
                    rank: pre_release_rank(&label),
                    label,
                });
            }
        }

        VersionKey::Tokens(drop_trailing_zeros(tokens))
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (VersionKey::Opaque(a), VersionKey::Opaque(b)) => a.cmp(b),
            (VersionKey::Opaque(_), VersionKey::Tokens(_)) => Ordering::Less,
            (VersionKey::Tokens(_), VersionKey::Opaque(_)) => Ordering::Greater,
            (VersionKey::Tokens(a), VersionKey::Tokens(b)) => {
                // A shorter list is padded with End rather than being smaller
                // outright, otherwise 1.0 would sort below 1.0-rc1.
                let len = a.len().max(b.len());
                (0..len)
                    .map(|i| {
                        let x = a.get(i).unwrap_or(&Token::End);
                        let y = b.get(i).unwrap_or(&Token::End);
                        x.cmp(y)
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }
        }
    }
}

/// Drop zero components that end a numeric run (`1.0` -> `1`, `1.0-rc1` -> `1-rc1`)
/// so that `1.0`, `1.0.0` and `1` are equal. The leading component is kept.
fn drop_trailing_zeros(tokens: Vec<Token>) -> Vec<Token> {
    let droppable: Vec<bool> = (0..tokens.len())
        .map(|i| {
            i > 0
                && tokens[i].is_zero()
                && tokens[i + 1..]
                    .iter()
                    .take_while(|t| t.is_number())
                    .all(Token::is_zero)
        })
        .collect();
    tokens
        .into_iter()
        .zip(droppable)
        .filter_map(|(t, drop)| (!drop).then_some(t))
        .collect()
}

fn split_tokens(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for part in body.split(['.', '-', '_']) {
        let mut start = 0;
        let bytes = part.as_bytes();
        for i in 1..bytes.len() {
            if bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit() {
                out.push(&part[start..i]);
                start = i;
            }
        }
        if start < part.len() {
            out.push(&part[start..]);
        }
    }
    out
}

fn is_release_marker(label: &str) -> bool {
    matches!(label, "final" | "ga" | "release")
}

fn is_post_release(label: &str, ecosystem: Ecosystem) -> bool {
    match ecosystem {
        Ecosystem::Python => matches!(label, "post" | "rev" | "r"),
        Ecosystem::Maven => matches!(label, "sp"),
        Ecosystem::Npm => false,
    }
}

fn pre_release_rank(label: &str) -> u8 {
    match label {
        "dev" => 0,
        "a" | "alpha" => 1,
        "b" | "beta" => 2,
        "m" | "milestone" => 3,
        "c" | "rc" | "cr" | "pre" | "preview" => 4,
        "snapshot" => 5,
        _ => 6,
    }
}
