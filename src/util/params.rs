//! `key=value` argument parsing.

use std::collections::BTreeMap;

use crate::util::config::is_truthy;

/// Parsed `key=value` arguments. A bare `key` means `key=true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    /// Parse arguments; later occurrences of a key win.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = args
            .into_iter()
            .filter_map(|arg| {
                let arg = arg.as_ref().trim();
                if arg.is_empty() {
                    return None;
                }
                let (key, value) = arg.split_once('=').unwrap_or((arg, "true"));
                Some((key.trim().to_lowercase(), value.trim().to_string()))
            })
            .collect();
        Params { values }
    }

    /// Non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among `keys`.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Whether `key` is present with a truthy value.
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// Keys not in `known`.
    pub fn unknown_keys<'a>(&'a self, known: &[&str]) -> Vec<&'a str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| !known.contains(k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
