use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{bail, Result};

use crate::error::PreconditionViolation;

/// Separator between the endpoints of a rendered range.
pub const RANGE_DELIMITER: &str = "...";

/// A maximal run of consecutive keys sharing one predicate value.
///
/// Indices are inclusive positions into the key sequence the span was
/// assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_index: usize,
    pub end_index: usize,
    pub status: bool,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// The keys this span covers.
    pub fn expand<'a>(&self, keys: &'a [String]) -> &'a [String] {
        &keys[self.start_index..=self.end_index]
    }
}

/// Run-length encode `keys` by `predicate`, preserving caller order.
pub fn assemble<F>(keys: &[String], predicate: F) -> Vec<Span>
where
    F: Fn(&str) -> bool,
{
    let mut spans: Vec<Span> = Vec::new();

    for (idx, key) in keys.iter().enumerate() {
        let status = predicate(key);
        match spans.last_mut() {
            Some(current) if current.status == status => current.end_index = idx,
            _ => spans.push(Span {
                start_index: idx,
                end_index: idx,
                status,
            }),
        }
    }

    spans
}

/// Render a span as `key` or `[first...last]`.
pub fn string_for_span(span: &Span, keys: &[String]) -> String {
    if span.start_index == span.end_index {
        keys[span.start_index].clone()
    } else {
        format!(
            "[{}{}{}]",
            keys[span.start_index], RANGE_DELIMITER, keys[span.end_index]
        )
    }
}

/// Render a whole selection as comma-separated ranges over `all_keys`.
pub fn selection_to_range_text(selected: &[String], all_keys: &[String]) -> String {
    let chosen: HashSet<&str> = selected.iter().map(String::as_str).collect();
    assemble(all_keys, |k| chosen.contains(k))
        .iter()
        .filter(|s| s.status)
        .map(|s| string_for_span(s, all_keys))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse operator range text (`p1, [p3...p5], p7...p9`) into an ordered,
/// duplicate-free subsequence of `all_keys`.
///
/// A token that exactly matches a key is taken as that key before it is read
/// as a range, so keys containing `...` stay selectable on their own.
///
/// # Errors
///
/// Fails on unknown keys and on ranges whose start comes after their end.
/// Keys containing `,` cannot be expressed in range text and are reported as
/// unknown.
pub fn parse_range_text(text: &str, all_keys: &[String]) -> Result<Vec<String>> {
    let index: HashMap<&str, usize> = all_keys
        .iter()
        .enumerate()
        .map(|(idx, key)| (key.as_str(), idx))
        .collect();
    let position = |key: &str| -> Result<usize> {
        match index.get(key) {
            Some(&idx) => Ok(idx),
            None => Err(PreconditionViolation::UnknownPartition {
                key: key.to_string(),
            }
            .into()),
        }
    };

    let mut chosen = BTreeSet::new();
    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(&idx) = index.get(token) {
            chosen.insert(idx);
            continue;
        }

        let token = token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .unwrap_or(token)
            .trim();

        match token.split_once(RANGE_DELIMITER) {
            Some((start, end)) if !index.contains_key(token) => {
                let start_idx = position(start.trim())?;
                let end_idx = position(end.trim())?;
                if start_idx > end_idx {
                    bail!(
                        "Invalid partition range '{}': '{}' comes after '{}'",
                        token,
                        start.trim(),
                        end.trim()
                    );
                }
                chosen.extend(start_idx..=end_idx);
            }
            _ => {
                chosen.insert(position(token)?);
            }
        }
    }

    Ok(chosen.into_iter().map(|idx| all_keys[idx].clone()).collect())
}
