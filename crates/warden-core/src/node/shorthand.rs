//! Shorthand expansion of permission keys.
//!
//! A group delimited by `{}` or `()` expands into one key per item. Items are
//! a numeric range (`1-4`), a character range (`a-d`) or a list separated by
//! `,` or `|`. Groups expand until none are left.

use std::collections::BTreeSet;

const MAX_RANGE: u32 = 250;

/// Expand `key`, returning every expansion except `key` itself.
pub fn expand_shorthand(key: &str) -> Vec<String> {
    let mut results: BTreeSet<String> = BTreeSet::new();
    results.insert(key.to_string());

    loop {
        let mut expanded_any = false;
        let mut next = BTreeSet::new();
        for item in &results {
            match expand_group(item) {
                Some(expanded) => {
                    expanded_any = true;
                    next.extend(expanded);
                }
                None => {
                    next.insert(item.clone());
                }
            }
        }
        results = next;
        if !expanded_any {
            break;
        }
    }

    results.remove(key);
    results.into_iter().collect()
}

fn index_of_either(s: &str, a: char, b: char) -> Option<usize> {
    s.find(a).or_else(|| s.find(b))
}

fn expand_group(input: &str) -> Option<Vec<String>> {
    let open = index_of_either(input, '{', '(')?;
    let close = index_of_either(input, '}', ')')?;
    if close < open {
        return None;
    }

    let before = &input[..open];
    let between = &input[open + 1..close];
    let after = &input[close + 1..];

    let items = numeric_range(between)
        .or_else(|| character_range(between))
        .unwrap_or_else(|| list(between));

    Some(
        items
            .into_iter()
            .map(|item| format!("{before}{item}{after}"))
            .collect(),
    )
}

fn numeric_range(input: &str) -> Option<Vec<String>> {
    let idx = input.find('-')?;
    if idx == 0 || idx == input.len() - 1 {
        return None;
    }
    let a: i64 = input[..idx].parse().ok()?;
    let b: i64 = input[idx + 1..].parse().ok()?;
    let (lo, hi) = (a.min(b), a.max(b));
    if hi - lo > i64::from(MAX_RANGE) {
        return None;
    }
    Some((lo..=hi).map(|i| i.to_string()).collect())
}

fn character_range(input: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() != 3 || chars[1] != '-' {
        return None;
    }
    let (a, b) = (u32::from(chars[0]), u32::from(chars[2]));
    let (lo, hi) = (a.min(b), a.max(b));
    if hi - lo > MAX_RANGE {
        return None;
    }
    Some(
        (lo..=hi)
            .filter_map(char::from_u32)
            .map(String::from)
            .collect(),
    )
}

fn list(input: &str) -> Vec<String> {
    if index_of_either(input, ',', '|').is_none() {
        return vec![input.to_string()];
    }
    input
        .split([',', '|'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_expansion() {
        assert_eq!(
            expand_shorthand("essentials.{fly,heal|home}"),
            vec!["essentials.fly", "essentials.heal", "essentials.home"]
        );
    }

    #[test]
    fn test_numeric_range() {
        assert_eq!(
            expand_shorthand("kit.(3-1)"),
            vec!["kit.1", "kit.2", "kit.3"]
        );
    }

    #[test]
    fn test_character_range() {
        assert_eq!(expand_shorthand("zone.{a-c}"), vec!["zone.a", "zone.b", "zone.c"]);
    }

    #[test]
    fn test_multiple_groups() {
        assert_eq!(
            expand_shorthand("{a,b}.{1-2}"),
            vec!["a.1", "a.2", "b.1", "b.2"]
        );
    }

    #[test]
    fn test_oversized_range_falls_back_to_literal() {
        assert_eq!(expand_shorthand("x.{1-500}"), vec!["x.1-500"]);
    }

    #[test]
    fn test_plain_key_has_no_expansions() {
        assert!(expand_shorthand("plain.key").is_empty());
        assert!(expand_shorthand("broken}.{key").is_empty());
    }
}
