//! Embedded retrieval fixture for the benchmark: `ticketd`, a small
//! ticket-routing/scoring service. 14 source files, ~600 lines.
//!
//! Pure retrieval content. It is written to disk and scanned by the
//! store; it is never compiled or executed, and a few bugs are left in
//! on purpose so analysis tasks have something to find.

use std::path::Path;

use anyhow::{Context, Result};

pub const PROJECT_FILES: &[(&str, &str)] = &[
    ("Cargo.toml", CARGO_TOML),
    ("README.md", README_MD),
    ("src/main.rs", MAIN_RS),
    ("src/lib.rs", LIB_RS),
    ("src/error.rs", ERROR_RS),
    ("src/ticket.rs", TICKET_RS),
    ("src/rules.rs", RULES_RS),
    ("src/scoring.rs", SCORING_RS),
    ("src/routing.rs", ROUTING_RS),
    ("src/triage.rs", TRIAGE_RS),
    ("src/escalation.rs", ESCALATION_RS),
    ("src/validate.rs", VALIDATE_RS),
    ("src/store.rs", STORE_RS),
    ("src/audit.rs", AUDIT_RS),
    ("src/notify.rs", NOTIFY_RS),
    ("src/config.rs", CONFIG_RS),
];

/// Write the fixture tree under `dir`, creating parents as needed.
pub fn materialize(dir: &Path) -> Result<usize> {
    for (path, content) in PROJECT_FILES {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&full, content).with_context(|| format!("writing {}", full.display()))?;
    }
    Ok(PROJECT_FILES.len())
}

const CARGO_TOML: &str = r#"[package]
name = "ticketd"
version = "0.4.2"
edition = "2021"
description = "Helpdesk ticket routing and prioritization service"

[dependencies]
"#;

const README_MD: &str = r#"# ticketd

Routes incoming helpdesk tickets to handler teams. Pipeline:

validate -> score -> route -> triage -> (escalate)

Each stage is a module under `src/`. Tickets persist through the
file-backed store; every state change is audit-logged.
"#;

const MAIN_RS: &str = r#"//! CLI entry point: read tickets from stdin as `subject|body|customer`
//! lines, run them through the pipeline, print assignments.

use std::io::{self, BufRead};

use ticketd::config::load_settings;
use ticketd::routing::Router;
use ticketd::rules::RuleEngine;
use ticketd::ticket::Ticket;
use ticketd::validate::validate_ticket;

fn main() {
    let settings = load_settings();
    let engine = RuleEngine::with_defaults();
    let router = Router::new(engine, settings.clone());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut parts = line.splitn(3, '|');
        let subject = parts.next().unwrap_or("").to_string();
        let body = parts.next().unwrap_or("").to_string();
        let customer = parts.next().unwrap_or("anonymous").to_string();

        let ticket = Ticket::new(subject, body, customer);
        match validate_ticket(&ticket, &settings) {
            Ok(()) => {
                let result = router.route_ticket(ticket);
                println!("{} -> {}", result.ticket.id, result.assigned_to);
            }
            Err(e) => eprintln!("rejected: {e}"),
        }
    }
}
"#;

const LIB_RS: &str = r#"//! ticketd: helpdesk ticket routing and prioritization.
//!
//! Module map:
//! - `ticket`: core domain types (Ticket, Status, Priority, Category)
//! - `rules`: keyword rules and the rule engine
//! - `scoring`: weighted priority scoring
//! - `routing`: rule-driven assignment to handler teams
//! - `triage`: priority queue of pending tickets
//! - `escalation`: SLA tracking and escalation
//! - `validate`: input validation and rate limiting
//! - `store`: file-backed persistence with a read cache
//! - `audit`: append-only audit trail
//! - `notify`: handler notifications
//! - `config`: service settings

pub mod audit;
pub mod config;
pub mod error;
pub mod escalation;
pub mod notify;
pub mod routing;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod ticket;
pub mod triage;
pub mod validate;
"#;

const ERROR_RS: &str = r#"//! Error types for ticketd.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TicketError {
    /// Input failed validation (empty subject, oversized body, ...).
    Invalid(String),
    /// Customer exceeded the submission rate limit.
    RateLimited { customer: String, window_secs: u64 },
    /// Persistence failure from the store.
    Storage(String),
    /// Referenced ticket does not exist.
    NotFound(u64),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid ticket: {msg}"),
            Self::RateLimited {
                customer,
                window_secs,
            } => write!(f, "rate limited: {customer} (window {window_secs}s)"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
            Self::NotFound(id) => write!(f, "ticket not found: {id}"),
        }
    }
}

impl std::error::Error for TicketError {}

/// Map an error to the retry/no-retry bucket used by the web layer.
pub fn classify_failure(err: &TicketError) -> &'static str {
    match err {
        TicketError::Invalid(_) => "permanent",
        TicketError::RateLimited { .. } => "retry-later",
        TicketError::Storage(_) => "retry",
        TicketError::NotFound(_) => "permanent",
    }
}
"#;

const TICKET_RS: &str = r#"//! Core ticket domain types.

/// Lifecycle status. Legal transitions:
/// New -> Triaged -> Assigned -> Resolved -> Closed, with Escalated
/// reachable from Triaged or Assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    Triaged,
    Assigned,
    Escalated,
    Resolved,
    Closed,
}

impl Status {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(&self, next: Status) -> bool {
        use Status::*;
        matches!(
            (self, next),
            (New, Triaged)
                | (Triaged, Assigned)
                | (Triaged, Escalated)
                | (Assigned, Escalated)
                | (Assigned, Resolved)
                | (Escalated, Resolved)
                | (Resolved, Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Technical,
    Billing,
    Account,
    Bug,
    General,
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub body: String,
    pub customer: String,
    pub status: Status,
    pub priority: Priority,
    pub category: Category,
    pub assigned_to: Option<String>,
}

impl Ticket {
    pub fn new(subject: String, body: String, customer: String) -> Self {
        // BUG: id derived from subject length collides constantly;
        // should come from the store's sequence.
        let id = subject.len() as u64 * 31 + body.len() as u64;
        Self {
            id,
            subject,
            body,
            customer,
            status: Status::New,
            priority: Priority::Normal,
            category: Category::General,
            assigned_to: None,
        }
    }

    /// Apply a status transition, ignoring illegal ones silently.
    pub fn transition(&mut self, next: Status) {
        if self.status.can_transition(next) {
            self.status = next;
        }
    }
}

/// Handler-side view of an agent with per-category permission.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub team: String,
    pub categories: Vec<Category>,
}

impl Agent {
    /// Permission check: agents only view tickets in their categories.
    pub fn can_view(&self, ticket: &Ticket) -> bool {
        self.categories.contains(&ticket.category)
    }
}
"#;

const RULES_RS: &str = r#"//! Keyword rules driving categorization and routing.

use crate::ticket::{Category, Priority, Ticket};

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub category: Category,
    pub priority: Priority,
    pub target_team: Option<&'static str>,
}

pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Built-in rule set, ordered by priority: the first match on the
    /// highest-priority rule wins.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Rule {
                name: "outage",
                keywords: &["outage", "down", "unreachable"],
                category: Category::Technical,
                priority: Priority::Urgent,
                target_team: Some("oncall"),
            },
            Rule {
                name: "payment-failure",
                keywords: &["charge", "refund", "invoice"],
                category: Category::Billing,
                priority: Priority::High,
                target_team: Some("billing-team"),
            },
            Rule {
                name: "crash-report",
                keywords: &["crash", "panic", "stacktrace"],
                category: Category::Bug,
                priority: Priority::High,
                target_team: None,
            },
            Rule {
                name: "password",
                keywords: &["password", "locked out", "2fa"],
                category: Category::Account,
                priority: Priority::Normal,
                target_team: Some("account-team"),
            },
        ])
    }

    /// All rules matching the ticket text, in declaration order.
    pub fn match_rules(&self, ticket: &Ticket) -> Vec<&Rule> {
        let haystack = format!("{} {}", ticket.subject, ticket.body).to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|kw| haystack.contains(kw)))
            .collect()
    }

    /// Highest-priority match, if any.
    pub fn best_match(&self, ticket: &Ticket) -> Option<&Rule> {
        self.match_rules(ticket)
            .into_iter()
            .max_by_key(|rule| rule.priority)
    }
}
"#;

const SCORING_RS: &str = r#"//! Weighted priority scoring.

use std::collections::HashMap;

use crate::ticket::{Priority, Ticket};

/// Component scores keyed by signal name, plus the weighted total.
#[derive(Debug, Clone)]
pub struct Score {
    pub total: f64,
    pub components: HashMap<&'static str, f64>,
}

/// Compute the weighted priority score for a ticket.
///
/// Signals: urgency keywords in the subject, body length (longer
/// reports score slightly higher), customer tier, and resubmission.
pub fn calculate_priority(ticket: &Ticket, tier_weight: f64) -> Score {
    let mut components = HashMap::new();

    let subject = ticket.subject.to_lowercase();
    let urgency = ["urgent", "asap", "immediately", "broken"]
        .iter()
        .filter(|kw| subject.contains(*kw))
        .count() as f64;
    components.insert("urgency", urgency * 2.5);

    let length = (ticket.body.len() as f64 / 500.0).min(2.0);
    components.insert("detail", length);

    components.insert("tier", tier_weight);

    let resubmit = if ticket.subject.starts_with("RE:") { 1.5 } else { 0.0 };
    components.insert("resubmit", resubmit);

    let total = components.values().sum();
    Score { total, components }
}

/// Normalize a batch of scores into [0, 1].
///
/// BUG: divides by the max without guarding the all-zero batch, so a
/// batch of empty tickets produces NaN scores downstream.
pub fn normalize_scores(scores: &[Score]) -> Vec<f64> {
    let max = scores.iter().map(|s| s.total).fold(0.0, f64::max);
    scores.iter().map(|s| s.total / max).collect()
}

/// Map a numeric score onto the priority ladder.
pub fn to_priority(total: f64) -> Priority {
    if total >= 5.0 {
        Priority::Urgent
    } else if total >= 3.0 {
        Priority::High
    } else if total >= 1.0 {
        Priority::Normal
    } else {
        Priority::Low
    }
}
"#;

const ROUTING_RS: &str = r#"//! Rule-driven assignment of tickets to handler teams.

use std::collections::HashMap;

use crate::config::Settings;
use crate::rules::RuleEngine;
use crate::scoring::{calculate_priority, to_priority};
use crate::ticket::{Category, Status, Ticket};

#[derive(Debug)]
pub struct RoutingResult {
    pub ticket: Ticket,
    pub assigned_to: String,
    pub rule_matched: Option<&'static str>,
    pub confidence: f64,
}

pub struct Router {
    engine: RuleEngine,
    settings: Settings,
    defaults: HashMap<Category, &'static str>,
}

impl Router {
    pub fn new(engine: RuleEngine, settings: Settings) -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(Category::Technical, "tech-team");
        defaults.insert(Category::Billing, "billing-team");
        defaults.insert(Category::Account, "account-team");
        defaults.insert(Category::Bug, "engineering-team");
        defaults.insert(Category::General, "support-team");
        Self {
            engine,
            settings,
            defaults,
        }
    }

    /// Route one ticket: score it, apply the best rule, fall back to
    /// the per-category default assignment table.
    pub fn route_ticket(&self, mut ticket: Ticket) -> RoutingResult {
        let score = calculate_priority(&ticket, self.settings.tier_weight);
        ticket.priority = to_priority(score.total);

        let (assigned_to, rule_matched, confidence) = match self.engine.best_match(&ticket) {
            Some(rule) => {
                ticket.category = rule.category;
                if rule.priority > ticket.priority {
                    ticket.priority = rule.priority;
                }
                let team = rule
                    .target_team
                    .unwrap_or_else(|| self.assign_default(ticket.category));
                (team, Some(rule.name), 1.0)
            }
            None => (self.assign_default(ticket.category), None, 0.5),
        };

        ticket.transition(Status::Triaged);
        ticket.transition(Status::Assigned);
        ticket.assigned_to = Some(assigned_to.to_string());

        RoutingResult {
            ticket,
            assigned_to: assigned_to.to_string(),
            rule_matched,
            confidence,
        }
    }

    /// Default routing table lookup for a category.
    pub fn assign_default(&self, category: Category) -> &'static str {
        self.defaults.get(&category).copied().unwrap_or("support-team")
    }
}
"#;

const TRIAGE_RS: &str = r#"//! Priority queue of pending tickets.

use crate::ticket::{Priority, Ticket};

/// Pending tickets ordered by priority, FIFO within a priority.
pub struct TriageQueue {
    entries: Vec<Ticket>,
}

impl TriageQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert keeping the queue sorted: higher priority first, stable
    /// for equal priority.
    pub fn enqueue(&mut self, ticket: Ticket) {
        let pos = self
            .entries
            .iter()
            .position(|t| t.priority < ticket.priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, ticket);
    }

    /// Pop the most urgent ticket.
    pub fn dequeue(&mut self) -> Option<Ticket> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Count of tickets at or above the given priority.
    pub fn pressure(&self, at_least: Priority) -> usize {
        self.entries.iter().filter(|t| t.priority >= at_least).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
"#;

const ESCALATION_RS: &str = r#"//! SLA tracking and escalation.

use crate::ticket::{Priority, Status, Ticket};

/// Response deadline in hours per priority tier.
pub fn sla_hours(priority: Priority) -> u64 {
    match priority {
        Priority::Urgent => 1,
        Priority::High => 4,
        Priority::Normal => 24,
        Priority::Low => 72,
    }
}

/// Hours remaining before the SLA deadline breaches; negative means
/// already breached.
pub fn hours_until_breach(priority: Priority, age_hours: i64) -> i64 {
    sla_hours(priority) as i64 - age_hours
}

/// Whether the ticket has exceeded its SLA window.
pub fn check_sla(ticket: &Ticket, age_hours: i64) -> bool {
    hours_until_breach(ticket.priority, age_hours) < 0
}

/// Escalate a ticket that breached its SLA: bump priority one step,
/// move it to the escalated state, and reassign to the oncall team.
pub fn escalate_ticket(ticket: &mut Ticket) {
    ticket.priority = match ticket.priority {
        Priority::Low => Priority::Normal,
        Priority::Normal => Priority::High,
        Priority::High | Priority::Urgent => Priority::Urgent,
    };
    ticket.transition(Status::Escalated);
    ticket.assigned_to = Some("oncall".to_string());
}
"#;

const VALIDATE_RS: &str = r#"//! Input validation and per-customer rate limiting.

use std::collections::HashMap;

use crate::config::Settings;
use crate::error::TicketError;
use crate::ticket::Ticket;

/// Validate an incoming ticket against the configured limits.
pub fn validate_ticket(ticket: &Ticket, settings: &Settings) -> Result<(), TicketError> {
    if ticket.subject.trim().is_empty() {
        return Err(TicketError::Invalid("empty subject".into()));
    }
    if ticket.subject.len() > settings.max_subject_len {
        return Err(TicketError::Invalid(format!(
            "subject exceeds {} chars",
            settings.max_subject_len
        )));
    }
    if ticket.body.len() > settings.max_body_len {
        return Err(TicketError::Invalid(format!(
            "body exceeds {} bytes",
            settings.max_body_len
        )));
    }
    Ok(())
}

/// Strip control characters from a subject line.
pub fn sanitize_subject(subject: &str) -> String {
    subject.chars().filter(|c| !c.is_control()).collect()
}

/// Sliding-window submission counter per customer.
pub struct RateWindow {
    counts: HashMap<String, u32>,
    pub window_secs: u64,
    pub max_per_window: u32,
}

impl RateWindow {
    pub fn new(window_secs: u64, max_per_window: u32) -> Self {
        Self {
            counts: HashMap::new(),
            window_secs,
            max_per_window,
        }
    }

    /// Count a submission and check the rate limit for this customer.
    pub fn check_rate(&mut self, customer: &str) -> Result<(), TicketError> {
        let count = self.counts.entry(customer.to_string()).or_insert(0);
        *count += 1;
        if *count > self.max_per_window {
            return Err(TicketError::RateLimited {
                customer: customer.to_string(),
                window_secs: self.window_secs,
            });
        }
        Ok(())
    }

    /// Reset all counters at the window boundary.
    pub fn roll_window(&mut self) {
        self.counts.clear();
    }
}
"#;

const STORE_RS: &str = r#"//! File-backed ticket persistence with a read cache.
//!
//! Tickets persist as one pipe-delimited line per ticket. Reads go
//! through an in-memory cache; the cache is invalidated wholesale on
//! every write.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::TicketError;
use crate::ticket::Ticket;

pub struct TicketStore {
    path: PathBuf,
    cache: HashMap<u64, Ticket>,
    cache_valid: bool,
}

/// Open (or create) a store at the given path.
pub fn open_store(path: PathBuf) -> Result<TicketStore, TicketError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TicketError::Storage(e.to_string()))?;
    }
    Ok(TicketStore {
        path,
        cache: HashMap::new(),
        cache_valid: false,
    })
}

impl TicketStore {
    /// Persist a ticket, appending to the data file.
    pub fn persist(&mut self, ticket: &Ticket) -> Result<(), TicketError> {
        let line = format!(
            "{}|{}|{}|{}\n",
            ticket.id, ticket.customer, ticket.subject, ticket.body
        );
        let mut existing = fs::read_to_string(&self.path).unwrap_or_default();
        existing.push_str(&line);
        fs::write(&self.path, existing).map_err(|e| TicketError::Storage(e.to_string()))?;
        self.cache_valid = false;
        Ok(())
    }

    /// Cached lookup by id, reloading the file when the cache is cold.
    pub fn cached_lookup(&mut self, id: u64) -> Result<Option<Ticket>, TicketError> {
        if !self.cache_valid {
            self.reload()?;
        }
        Ok(self.cache.get(&id).cloned())
    }

    /// Linear scan over subjects; the index is the cache itself.
    pub fn search_tickets(&mut self, needle: &str) -> Result<Vec<Ticket>, TicketError> {
        if !self.cache_valid {
            self.reload()?;
        }
        let needle = needle.to_lowercase();
        Ok(self
            .cache
            .values()
            .filter(|t| t.subject.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// Export every ticket line for backup.
    pub fn export_tickets(&self) -> Result<String, TicketError> {
        fs::read_to_string(&self.path).map_err(|e| TicketError::Storage(e.to_string()))
    }

    fn reload(&mut self) -> Result<(), TicketError> {
        self.cache.clear();
        let content = fs::read_to_string(&self.path).unwrap_or_default();
        for line in content.lines() {
            let mut parts = line.splitn(4, '|');
            let id: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let customer = parts.next().unwrap_or("").to_string();
            let subject = parts.next().unwrap_or("").to_string();
            let body = parts.next().unwrap_or("").to_string();
            let mut ticket = Ticket::new(subject, body, customer);
            ticket.id = id;
            self.cache.insert(id, ticket);
        }
        self.cache_valid = true;
        Ok(())
    }
}
"#;

const AUDIT_RS: &str = r#"//! Append-only audit trail of ticket state changes.

use crate::ticket::Status;

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub ticket_id: u64,
    pub actor: String,
    pub from: Status,
    pub to: Status,
    pub note: String,
}

pub struct AuditLog {
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Record a transition in the audit trail. Events are never
    /// mutated or removed.
    pub fn record_audit(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    /// Full history for one ticket, oldest first.
    pub fn history(&self, ticket_id: u64) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
"#;

const NOTIFY_RS: &str = r#"//! Handler notifications.

use crate::ticket::{Priority, Ticket};

#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    Email,
    Pager,
}

/// Urgent tickets page; everything else emails.
pub fn channel_for(priority: Priority) -> Channel {
    if priority == Priority::Urgent {
        Channel::Pager
    } else {
        Channel::Email
    }
}

/// Render and "send" a notification for an assignment. Returns the
/// rendered message for the outbox.
pub fn send_notification(ticket: &Ticket, team: &str) -> String {
    let channel = channel_for(ticket.priority);
    format!(
        "[{:?}] to {team}: ticket {} ({:?}): {}",
        channel, ticket.id, ticket.priority, ticket.subject
    )
}
"#;

const CONFIG_RS: &str = r#"//! Service settings.

#[derive(Debug, Clone)]
pub struct Settings {
    pub max_subject_len: usize,
    pub max_body_len: usize,
    /// Weight applied to the customer-tier scoring signal.
    pub tier_weight: f64,
    /// Score threshold above which tickets skip triage.
    pub fast_path_threshold: f64,
    pub rate_window_secs: u64,
    pub rate_max_per_window: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_subject_len: 200,
            max_body_len: 64 * 1024,
            tier_weight: 1.0,
            fast_path_threshold: 5.0,
            rate_window_secs: 3600,
            rate_max_per_window: 20,
        }
    }
}

/// Load settings from environment overrides on top of the defaults.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(v) = std::env::var("TICKETD_TIER_WEIGHT") {
        if let Ok(w) = v.parse() {
            settings.tier_weight = w;
        }
    }
    if let Ok(v) = std::env::var("TICKETD_FAST_PATH") {
        if let Ok(t) = v.parse() {
            settings.fast_path_threshold = t;
        }
    }
    settings
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let count = materialize(dir.path()).unwrap();
        assert_eq!(count, PROJECT_FILES.len());
        assert!(dir.path().join("src/routing.rs").exists());
        assert!(dir.path().join("Cargo.toml").exists());
    }

    #[test]
    fn test_fixture_covers_catalog_targets() {
        let all: String = PROJECT_FILES.iter().map(|(_, c)| *c).collect();
        for needle in [
            "fn route_ticket",
            "fn calculate_priority",
            "fn open_store",
            "fn validate_ticket",
            "struct Ticket",
            "enum TicketError",
            "fn escalate_ticket",
            "fn check_sla",
            "fn record_audit",
            "fn send_notification",
            "fn load_settings",
        ] {
            assert!(all.contains(needle), "fixture missing {needle}");
        }
    }
}
