//! Loader for local `.env` files
//!
//! Secrets such as the OpenAI API key and the Qiita access token live in a
//! `.env` file next to the project. The file is read once at startup and by
//! the task runner, which re-exports a fixed set of keys to child processes.

use crate::error::{EditorError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("static regex"))
}

/// Parsed contents of an env file, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: Vec<(String, String)>,
}

impl EnvFile {
    /// Parse env file contents
    ///
    /// Supports blank lines, `#` comments, an optional `export ` prefix and
    /// single or double quoted values. Later duplicates replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::EnvFile` naming the offending line when a line
    /// has no `=`, an invalid key, or an unterminated quote.
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::env_file::EnvFile;
    ///
    /// let env = EnvFile::parse("# secrets\nOPENAI_API_KEY=sk-test\n").unwrap();
    /// assert_eq!(env.get("OPENAI_API_KEY"), Some("sk-test"));
    /// ```
    pub fn parse(contents: &str) -> Result<Self> {
        let mut env = EnvFile::default();

        for (idx, raw_line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let (key, value) = line.split_once('=').ok_or_else(|| EditorError::EnvFile {
                line: line_no,
                message: "expected KEY=VALUE".to_string(),
            })?;

            let key = key.trim();
            if !key_pattern().is_match(key) {
                return Err(EditorError::EnvFile {
                    line: line_no,
                    message: format!("invalid key '{}'", key),
                }
                .into());
            }

            let value = parse_value(value.trim()).map_err(|message| EditorError::EnvFile {
                line: line_no,
                message,
            })?;

            env.set(key, value);
        }

        Ok(env)
    }

    /// Read and parse an env file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    /// Read an env file if it exists
    ///
    /// Returns `Ok(None)` when the file is missing so callers can fall back
    /// to the inherited environment.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    fn set(&mut self, key: &str, value: String) {
        if let Some(slot) = self.vars.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.vars.push((key.to_string(), value));
        }
    }

    /// Look up a variable by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All variables in file order
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the file defined no variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Keep only the listed keys, in the order they are listed
    ///
    /// Keys absent from the file are skipped rather than exported empty.
    pub fn select(&self, keys: &[String]) -> Vec<(String, String)> {
        keys.iter()
            .filter_map(|key| self.get(key).map(|v| (key.clone(), v.to_string())))
            .collect()
    }

    /// Export variables into the current process environment
    ///
    /// Variables already present in the environment are left alone unless
    /// `overwrite` is set. Returns the number of variables written.
    pub fn apply_to_process(&self, overwrite: bool) -> usize {
        let mut applied = 0;
        for (key, value) in &self.vars {
            if !overwrite && defined_in_process(key) {
                tracing::debug!("Keeping existing environment value for {}", key);
                continue;
            }
            std::env::set_var(key, value);
            applied += 1;
        }
        applied
    }
}

/// Whether the inherited environment already defines `key`
///
/// Values from an env file never replace such variables, neither in this
/// process nor in task steps.
pub fn defined_in_process(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

fn parse_value(raw: &str) -> std::result::Result<String, String> {
    match raw.chars().next() {
        Some('"') => parse_double_quoted(&raw[1..]),
        Some('\'') => {
            let rest = &raw[1..];
            let end = rest.find('\'').ok_or("unterminated ' quote")?;
            expect_only_comment(&rest[end + 1..])?;
            Ok(rest[..end].to_string())
        }
        _ => {
            // Unquoted values end at a `#` that follows whitespace
            let mut after_space = false;
            let end = raw
                .char_indices()
                .find_map(|(idx, c)| {
                    let starts_comment = c == '#' && after_space;
                    after_space = c.is_ascii_whitespace();
                    starts_comment.then_some(idx)
                })
                .unwrap_or(raw.len());
            Ok(raw[..end].trim_end().to_string())
        }
    }
}

/// Unescape `\n`, `\"` and `\\` up to the closing quote
fn parse_double_quoted(rest: &str) -> std::result::Result<String, String> {
    let mut value = String::with_capacity(rest.len());
    let mut chars = rest.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => {
                expect_only_comment(&rest[idx + 1..])?;
                return Ok(value);
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            other => value.push(other),
        }
    }

    Err("unterminated \" quote".to_string())
}

fn expect_only_comment(trailing: &str) -> std::result::Result<(), String> {
    let trailing = trailing.trim_start();
    if trailing.is_empty() || trailing.starts_with('#') {
        Ok(())
    } else {
        Err(format!("unexpected text after closing quote: '{}'", trailing))
    }
}
