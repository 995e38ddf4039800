//! Built-in 25-task catalog over the embedded `ticketd` fixture.
//!
//! Each task pairs an analysis prompt with a fixed, ordered query
//! triple so runs are reproducible. A few queries deliberately miss
//! (attachments, metrics); the pipeline must handle not-found
//! snippets without branching.

use ctxbench_core::{Catalog, TaskSpec};

const TASKS: &[(&str, [&str; 3])] = &[
    (
        "Explain how tickets are routed to handler teams and what happens when no rule matches.",
        ["file:routing.rs", "function-lookup:route_ticket", "keyword-search:routing"],
    ),
    (
        "Analyze the priority scoring signals and how component scores combine into a total.",
        ["file:scoring.rs", "function-lookup:calculate_priority", "keyword-search:normalize"],
    ),
    (
        "Describe the persistence format and when ticket data is actually written to disk.",
        ["file:store.rs", "function-lookup:open_store", "keyword-search:persist"],
    ),
    (
        "Review input validation: which malformed tickets are rejected and which slip through?",
        ["keyword-search:validate", "function-lookup:validate_ticket", "file:validate.rs"],
    ),
    (
        "Map the ticket lifecycle states and verify every transition is reachable.",
        ["file:ticket.rs", "type-lookup:Ticket", "keyword-search:status"],
    ),
    (
        "Audit error handling: are failures classified correctly for retry decisions?",
        ["keyword-search:error", "type-lookup:TicketError", "function-lookup:classify_failure"],
    ),
    (
        "Evaluate the read cache: when is it invalidated and can it serve stale tickets?",
        ["keyword-search:cache", "function-lookup:cached_lookup", "file:store.rs:1-40"],
    ),
    (
        "Check the audit trail: is every state change recorded and is the log truly append-only?",
        ["keyword-search:audit", "function-lookup:record_audit", "file:audit.rs"],
    ),
    (
        "Review configuration handling and which settings can be overridden at runtime.",
        ["file:config.rs", "keyword-search:threshold", "function-lookup:load_settings"],
    ),
    (
        "Trace the escalation path for tickets that breach their response window.",
        ["keyword-search:escalat", "function-lookup:escalate_ticket", "file:escalation.rs"],
    ),
    (
        "Analyze the rate limiter: what does the sliding window actually bound?",
        ["keyword-search:rate", "function-lookup:check_rate", "type-lookup:RateWindow"],
    ),
    (
        "Explain the default assignment table and when it overrides rule targets.",
        ["function-lookup:assign_default", "keyword-search:assign", "file:routing.rs:1-40"],
    ),
    (
        "Review notification dispatch: which channel fires for which priority?",
        ["keyword-search:notify", "function-lookup:send_notification", "file:notify.rs"],
    ),
    (
        "Evaluate ticket search: what is indexed and what degrades to a linear scan?",
        ["function-lookup:search_tickets", "keyword-search:subject", "file:store.rs:40-90"],
    ),
    (
        "Investigate attachment handling end to end.",
        ["keyword-search:attach", "function-lookup:upload_attachment", "file:attachments.rs"],
    ),
    (
        "Describe the triage queue ordering guarantees under mixed priorities.",
        ["file:triage.rs", "type-lookup:TriageQueue", "keyword-search:pressure"],
    ),
    (
        "Verify the SLA windows per priority tier against the escalation checks.",
        ["keyword-search:sla", "function-lookup:check_sla", "file:escalation.rs:1-30"],
    ),
    (
        "Check queue insertion: is FIFO order preserved within one priority level?",
        ["function-lookup:enqueue", "keyword-search:priority", "file:triage.rs:1-30"],
    ),
    (
        "Analyze the rule engine: how do overlapping keyword rules resolve?",
        ["type-lookup:RuleEngine", "keyword-search:rule", "file:rules.rs"],
    ),
    (
        "Review deadline computation for negative ages and already-breached tickets.",
        ["keyword-search:deadline", "function-lookup:hours_until_breach", "file:escalation.rs"],
    ),
    (
        "Survey operational metrics coverage across the service.",
        ["keyword-search:metric", "function-lookup:record_metric", "file:metrics.rs"],
    ),
    (
        "Assess backup and export: can the full ticket set be reconstructed?",
        ["keyword-search:backup", "function-lookup:export_tickets", "file:store.rs:1-100"],
    ),
    (
        "Verify status transition rules: which illegal transitions are silently dropped?",
        ["type-lookup:Status", "keyword-search:transition", "file:ticket.rs:1-60"],
    ),
    (
        "Review the permission model for agents viewing tickets outside their categories.",
        ["keyword-search:permission", "function-lookup:can_view", "type-lookup:Agent"],
    ),
    (
        "Summarize the overall architecture: modules, data flow, and the processing pipeline.",
        ["file:lib.rs", "file:main.rs", "keyword-search:pipeline"],
    ),
];

pub fn builtin() -> Catalog {
    Catalog::new(
        TASKS
            .iter()
            .map(|(prompt, queries)| TaskSpec {
                prompt: prompt.to_string(),
                queries: queries.iter().map(|q| q.to_string()).collect(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbench_core::Query;

    #[test]
    fn test_builtin_has_25_tasks_of_3_queries() {
        let catalog = builtin();
        assert_eq!(catalog.len(), 25);
        for task in &catalog.tasks {
            assert_eq!(task.queries.len(), 3);
        }
    }

    #[test]
    fn test_all_queries_parse_to_known_kinds() {
        for task in &builtin().tasks {
            for query in &task.queries {
                assert!(
                    !matches!(Query::parse(query), Query::Unknown { .. }),
                    "unparseable query: {query}"
                );
            }
        }
    }
}
