//! Deterministic retrieval over a content root.
//!
//! `resolve` is pure given a fixed content root: files are scanned in
//! path order, candidate lists are capped and sorted, and every miss
//! produces the deterministic placeholder snippet. Resolved snippets
//! and file contents are cached for the life of the store behind
//! `RwLock`, so sessions can share one store read-only (including
//! concurrently).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use regex::Regex;
use tracing::debug;

use ctxbench_core::{truncate_bytes, Query, Snippet, SourceLocator, MAX_SNIPPET_SIZE};

/// Candidate cap for `file:` name matches.
const MAX_FILE_CANDIDATES: usize = 5;

/// Keyword search returns at most this many matches.
const MAX_KEYWORD_MATCHES: usize = 3;

/// Context window around a keyword match: lines before / after.
const CONTEXT_BEFORE: usize = 2;
const CONTEXT_AFTER: usize = 7;

/// Per-match context cap in bytes, applied before concatenation.
const MAX_MATCH_CONTEXT: usize = 500;

pub struct RepoStore {
    root: PathBuf,
    /// Read-through file cache keyed by path. `None` marks a file that
    /// could not be read as UTF-8; it stays skipped for the whole
    /// process.
    file_cache: RwLock<HashMap<PathBuf, Option<String>>>,
    /// Resolved snippets keyed by the raw query string, so repeated
    /// queries return identical output without re-scanning.
    snippet_cache: RwLock<HashMap<String, Snippet>>,
}

impl RepoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_cache: RwLock::new(HashMap::new()),
            snippet_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a symbolic query to a snippet. Never fails: resolution
    /// misses and unknown query kinds produce the deterministic
    /// not-found snippet so downstream size/id logic never branches on
    /// absence.
    pub fn resolve(&self, raw: &str) -> Snippet {
        let raw = raw.trim();
        if let Some(hit) = self.snippet_cache.read().expect("lock").get(raw) {
            return hit.clone();
        }

        let snippet = match Query::parse(raw) {
            Query::File { name, range } => self.resolve_file(raw, &name, range),
            Query::FunctionLookup { name } => {
                self.resolve_definition(raw, &function_header_re(&name))
            }
            Query::TypeLookup { name } => self.resolve_definition(raw, &type_header_re(&name)),
            Query::KeywordSearch { term } => self.resolve_keyword(raw, &term),
            Query::Unknown { .. } => Snippet::not_found(raw),
        };

        self.snippet_cache
            .write()
            .expect("lock")
            .insert(raw.to_string(), snippet.clone());
        snippet
    }

    // -----------------------------------------------------------------
    // Query kinds
    // -----------------------------------------------------------------

    fn resolve_file(&self, raw: &str, name: &str, range: Option<(usize, usize)>) -> Snippet {
        let needle = name.to_lowercase();
        let candidates: Vec<PathBuf> = self
            .all_files()
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .map(|f| f.to_string_lossy().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .take(MAX_FILE_CANDIDATES)
            .collect();

        let Some(path) = candidates.first() else {
            return Snippet::not_found(raw);
        };
        let Some(content) = self.load(path) else {
            return Snippet::not_found(raw);
        };

        let (text, start_line, end_line) = match range {
            Some((start, end)) => extract_lines(&content, start, end),
            None => {
                let text = truncate_bytes(&content, MAX_SNIPPET_SIZE);
                let lines = text.lines().count().max(1);
                (text.to_string(), 1, lines)
            }
        };

        Snippet::from_text(
            raw,
            text,
            SourceLocator::Resolved {
                path: self.relative(path),
                start_line,
                end_line,
            },
        )
    }

    fn resolve_definition(&self, raw: &str, header: &Regex) -> Snippet {
        for path in self.source_files() {
            let Some(content) = self.load(&path) else {
                continue;
            };
            if let Some((text, start_line, end_line)) = extract_block(&content, header) {
                return Snippet::from_text(
                    raw,
                    text,
                    SourceLocator::Resolved {
                        path: self.relative(&path),
                        start_line,
                        end_line,
                    },
                );
            }
        }
        Snippet::not_found(raw)
    }

    fn resolve_keyword(&self, raw: &str, term: &str) -> Snippet {
        let needle = term.to_lowercase();
        let mut matches: Vec<(String, usize, String)> = Vec::new();

        'files: for path in self.source_files() {
            let Some(content) = self.load(&path) else {
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();
            for (i, line) in lines.iter().enumerate() {
                if !line.to_lowercase().contains(&needle) {
                    continue;
                }
                let start = i.saturating_sub(CONTEXT_BEFORE);
                let end = (i + 1 + CONTEXT_AFTER).min(lines.len());
                let context = lines[start..end].join("\n");
                matches.push((
                    self.relative(&path),
                    i + 1,
                    truncate_bytes(&context, MAX_MATCH_CONTEXT).to_string(),
                ));
                if matches.len() >= MAX_KEYWORD_MATCHES {
                    break 'files;
                }
            }
        }

        if matches.is_empty() {
            return Snippet::not_found(raw);
        }

        let body = matches
            .iter()
            .map(|(path, line, context)| format!("// {path}:{line}\n{context}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = truncate_bytes(&body, MAX_SNIPPET_SIZE).to_string();

        let (first_path, first_line, _) = &matches[0];
        Snippet::from_text(
            raw,
            text,
            SourceLocator::Resolved {
                path: first_path.clone(),
                start_line: *first_line,
                end_line: first_line + CONTEXT_AFTER + CONTEXT_BEFORE + 1,
            },
        )
    }

    // -----------------------------------------------------------------
    // Scanning and caching
    // -----------------------------------------------------------------

    /// All regular files under the root in sorted path order, skipping
    /// hidden entries and build output.
    fn all_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') || name == "target" {
                    continue;
                }
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }

    fn source_files(&self) -> Vec<PathBuf> {
        self.all_files()
            .into_iter()
            .filter(|p| p.extension().map(|e| e == "rs").unwrap_or(false))
            .collect()
    }

    fn load(&self, path: &Path) -> Option<String> {
        if let Some(cached) = self.file_cache.read().expect("lock").get(path) {
            return cached.clone();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => Some(c),
            Err(e) => {
                debug!("skipping unreadable file {}: {e}", path.display());
                None
            }
        };
        self.file_cache
            .write()
            .expect("lock")
            .insert(path.to_path_buf(), content.clone());
        content
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}

/// Extract a 1-based, clamped line range.
fn extract_lines(content: &str, start: usize, end: usize) -> (String, usize, usize) {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return (String::new(), 1, 1);
    }
    let start = start.max(1).min(lines.len());
    let end = end.max(start).min(lines.len());
    let text = lines[start - 1..end].join("\n");
    (
        truncate_bytes(&text, MAX_SNIPPET_SIZE).to_string(),
        start,
        end,
    )
}

/// Extract a definition block: from the header line to the line where
/// its brace pairing closes (or the terminating `;` for braceless
/// items), truncated.
fn extract_block(content: &str, header: &Regex) -> Option<(String, usize, usize)> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.iter().position(|l| header.is_match(l))?;

    let mut depth: i64 = 0;
    let mut opened = false;
    let mut end = lines.len();
    for (offset, line) in lines[start..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                // Braceless item (`struct Id(u64);`) ends at the `;`.
                ';' if !opened => {
                    end = start + offset + 1;
                    break;
                }
                _ => {}
            }
        }
        if end != lines.len() {
            break;
        }
        if opened && depth <= 0 {
            end = start + offset + 1;
            break;
        }
    }

    let text = lines[start..end].join("\n");
    Some((
        truncate_bytes(&text, MAX_SNIPPET_SIZE).to_string(),
        start + 1,
        end,
    ))
}

fn function_header_re(name: &str) -> Regex {
    Regex::new(&format!(
        r"^\s*(pub(\([^)]*\))?\s+)?(async\s+)?fn\s+{}\s*[(<]",
        regex::escape(name)
    ))
    .expect("valid function header pattern")
}

fn type_header_re(name: &str) -> Regex {
    Regex::new(&format!(
        r"^\s*(pub(\([^)]*\))?\s+)?(struct|enum|trait)\s+{}\b",
        regex::escape(name)
    ))
    .expect("valid type header pattern")
}
