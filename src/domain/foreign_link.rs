// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Foreign-Link Rewriting
//!
//! A tenant's pre-data dump contains the `CREATE SERVER` and
//! `CREATE USER MAPPING` statements of its `postgres_fdw` link. Those carry the
//! reference database's connection options verbatim, so before the dump can
//! be replayed in another environment the options must be repointed.
//!
//! Two strategies are offered:
//! - [`RewriteMode::Literal`] replaces every `key '<old>'` with `key '<new>'`
//!   anywhere in the text, both values written as SQL string literals.
//! - [`RewriteMode::OptionAware`] only touches the values inside the
//!   `OPTIONS (...)` lists of server and user-mapping statements, leaving
//!   foreign-table options, comments and everything else as they were.
//!
//! Both are pure functions over the file contents; reading and writing the
//! artifact is done by the application layer.

use crate::domain::entities::ConnectionDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The connection options a foreign server or user mapping may carry.
pub const LINK_OPTION_KEYS: [&str; 5] = ["dbname", "host", "port", "user", "password"];

/// Statements whose `OPTIONS` lists hold the link's connection metadata.
const LINK_STATEMENTS: [&str; 2] = ["CREATE SERVER ", "CREATE USER MAPPING "];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    Literal,
    #[default]
    OptionAware,
}

impl FromStr for RewriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "literal" => Ok(RewriteMode::Literal),
            "option_aware" | "structured" => Ok(RewriteMode::OptionAware),
            other => Err(format!("unknown rewrite mode: {}", other)),
        }
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteMode::Literal => write!(f, "literal"),
            RewriteMode::OptionAware => write!(f, "option_aware"),
        }
    }
}

/// How many values were replaced, per option key.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RewriteSummary {
    pub replacements: BTreeMap<String, usize>,
}

impl RewriteSummary {
    pub fn total(&self) -> usize {
        self.replacements.values().sum()
    }

    fn record(&mut self, key: &str, count: usize) {
        if count > 0 {
            *self.replacements.entry(key.to_string()).or_insert(0) += count;
        }
    }
}

/// One `(key, old value, new value)` triple to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionChange {
    pub key: &'static str,
    pub old: String,
    pub new: String,
}

/// Pairs up the five link options of two descriptors, skipping unchanged values.
pub fn option_changes(old: &ConnectionDescriptor, new: &ConnectionDescriptor) -> Vec<OptionChange> {
    let values = |d: &ConnectionDescriptor| {
        [
            d.dbname.clone(),
            d.host.clone(),
            d.port.to_string(),
            d.user.clone(),
            d.password_or_empty().to_string(),
        ]
    };

    LINK_OPTION_KEYS
        .iter()
        .zip(values(old).into_iter().zip(values(new)))
        .filter(|(_, (o, n))| o != n)
        .map(|(key, (old, new))| OptionChange {
            key: *key,
            old,
            new,
        })
        .collect()
}

/// Repoints the foreign-link options in `content` from `old` to `new`.
pub fn rewrite_foreign_link(
    content: &str,
    old: &ConnectionDescriptor,
    new: &ConnectionDescriptor,
    mode: RewriteMode,
) -> (String, RewriteSummary) {
    let changes = option_changes(old, new);
    match mode {
        RewriteMode::Literal => rewrite_literal(content, &changes),
        RewriteMode::OptionAware => rewrite_option_lists(content, &changes),
    }
}

fn rewrite_literal(content: &str, changes: &[OptionChange]) -> (String, RewriteSummary) {
    let mut summary = RewriteSummary::default();
    let mut modified = content.to_string();

    for change in changes {
        let from = format!("{} {}", change.key, quote_literal(&change.old));
        let to = format!("{} {}", change.key, quote_literal(&change.new));
        summary.record(change.key, modified.matches(&from).count());
        modified = modified.replace(&from, &to);
    }

    (modified, summary)
}

fn rewrite_option_lists(content: &str, changes: &[OptionChange]) -> (String, RewriteSummary) {
    let mut summary = RewriteSummary::default();
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for start in link_statement_starts(content) {
        let Some(options) = parse_statement_options(content, start) else {
            continue;
        };
        for option in options {
            let key = option.key.as_str();
            if let Some(change) = changes
                .iter()
                .find(|c| c.key == key && c.old == option.value)
            {
                edits.push((option.span.0, option.span.1, quote_literal(&change.new)));
                summary.record(change.key, 1);
            }
        }
    }

    let mut modified = String::with_capacity(content.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        modified.push_str(&content[cursor..start]);
        modified.push_str(&replacement);
        cursor = end;
    }
    modified.push_str(&content[cursor..]);

    (modified, summary)
}

/// A parsed `key 'value'` entry of an `OPTIONS (...)` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOption {
    /// Normalized key: bare identifiers are folded to lower case.
    pub key: String,
    /// Unescaped value.
    pub value: String,
    /// Byte span of the quoted literal, quotes included.
    pub span: (usize, usize),
}

/// Byte offsets of every server or user-mapping statement that starts a line.
fn link_statement_starts(content: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut line_start = 0;
    for line in content.split_inclusive('\n') {
        if LINK_STATEMENTS.iter().any(|s| line.starts_with(s)) {
            starts.push(line_start);
        }
        line_start += line.len();
    }
    starts
}

/// Finds the statement's `OPTIONS (` clause and parses it.
///
/// Returns `None` when the statement has no option list or the list does not
/// parse, in which case the statement is left untouched.
pub fn parse_statement_options(content: &str, start: usize) -> Option<Vec<LinkOption>> {
    let bytes = content.as_bytes();
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\'')?,
            b'"' => i = skip_quoted(bytes, i, b'"')?,
            b';' => return None,
            b'O' if is_keyword_at(bytes, i, b"OPTIONS") => {
                let open = skip_whitespace(bytes, i + b"OPTIONS".len());
                if bytes.get(open) == Some(&b'(') {
                    return parse_option_list(content, open + 1);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn parse_option_list(content: &str, mut i: usize) -> Option<Vec<LinkOption>> {
    let bytes = content.as_bytes();
    let mut options = Vec::new();

    loop {
        i = skip_whitespace(bytes, i);
        if bytes.get(i) == Some(&b')') {
            return Some(options);
        }

        let key = if bytes.get(i) == Some(&b'"') {
            let end = skip_quoted(bytes, i, b'"')?;
            let key = unescape(&content[i + 1..end - 1], '"');
            i = end;
            key
        } else {
            let key_start = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            if i == key_start {
                return None;
            }
            content[key_start..i].to_lowercase()
        };

        i = skip_whitespace(bytes, i);
        if bytes.get(i) != Some(&b'\'') {
            return None;
        }
        let end = skip_quoted(bytes, i, b'\'')?;
        options.push(LinkOption {
            key,
            value: unescape(&content[i + 1..end - 1], '\''),
            span: (i, end),
        });
        i = skip_whitespace(bytes, end);

        match bytes.get(i) {
            Some(b',') => i += 1,
            Some(b')') => return Some(options),
            _ => return None,
        }
    }
}

/// Returns the index just past the closing quote; doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_keyword_at(bytes: &[u8], i: usize, keyword: &[u8]) -> bool {
    bytes[i..].starts_with(keyword)
        && (i == 0 || !is_ident_byte(bytes[i - 1]))
        && bytes
            .get(i + keyword.len())
            .map_or(true, |b| !is_ident_byte(*b))
}

fn unescape(raw: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    raw.replace(&doubled, &quote.to_string())
}

/// Renders `value` as a standard SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
