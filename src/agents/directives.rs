//! Inline per-agent directive parsing.
//!
//! A task like `"@Alice: summarize the log @Bob: draft a reply"` fans out to
//! the named agents without manager planning. Text after an `@Name:` marker
//! up to the next marker (or the end of the task) is that agent's subtask.

use regex::Regex;

use crate::agents::Agent;

/// Extract `@AgentName: subtask` segments from free-form task text.
///
/// Names are matched case-insensitively against the group's agents; the
/// returned pairs carry the agent's canonical name. Markers naming no known
/// agent are logged and dropped. A repeated name keeps its last subtask.
/// Pairs are returned in first-occurrence order; an empty result means the
/// caller should fall back to the manager or specific-agent flows.
pub fn parse_agent_directives(task: &str, agents: &[Agent]) -> Vec<(String, String)> {
    // Compilation cannot fail for a fixed pattern.
    let marker = Regex::new(r"@(\w[\w-]*)\s*:").expect("valid directive pattern");

    let matches: Vec<(usize, usize, &str)> = marker
        .captures_iter(task)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str()))
        })
        .collect();

    let mut directives: Vec<(String, String)> = Vec::new();
    for (i, (_, end, name)) in matches.iter().enumerate() {
        let Some(agent) = agents
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        else {
            tracing::debug!("Directive names unknown agent, dropping: @{}", name);
            continue;
        };

        let subtask_end = matches
            .get(i + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(task.len());
        let subtask = task[*end..subtask_end].trim().to_string();

        match directives.iter_mut().find(|(n, _)| n == &agent.name) {
            Some((_, existing)) => *existing = subtask,
            None => directives.push((agent.name.clone(), subtask)),
        }
    }

    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(names: &[&str]) -> Vec<Agent> {
        names
            .iter()
            .map(|n| Agent::new(*n, "llama2", "prompt", vec![]))
            .collect()
    }

    #[test]
    fn test_parses_two_directives() {
        let agents = agents(&["Alice", "Bob"]);
        let parsed = parse_agent_directives("@Alice: do X @Bob: do Y", &agents);
        assert_eq!(
            parsed,
            vec![
                ("Alice".to_string(), "do X".to_string()),
                ("Bob".to_string(), "do Y".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_name_is_dropped() {
        let agents = agents(&["Alice", "Bob"]);
        let parsed =
            parse_agent_directives("@Alice: do X @Carol: do Z @Bob: do Y", &agents);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|(n, _)| n != "Carol"));
    }

    #[test]
    fn test_no_known_agent_yields_empty() {
        let agents = agents(&["Alice"]);
        assert!(parse_agent_directives("@Carol: do Z", &agents).is_empty());
        assert!(parse_agent_directives("no markers here", &agents).is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive_with_canonical_names() {
        let agents = agents(&["Alice"]);
        let parsed = parse_agent_directives("@alice: do X", &agents);
        assert_eq!(parsed, vec![("Alice".to_string(), "do X".to_string())]);
    }

    #[test]
    fn test_repeated_name_keeps_last_subtask() {
        let agents = agents(&["Alice"]);
        let parsed = parse_agent_directives("@Alice: first @Alice: second", &agents);
        assert_eq!(parsed, vec![("Alice".to_string(), "second".to_string())]);
    }

    #[test]
    fn test_last_directive_runs_to_end_of_string() {
        let agents = agents(&["Bob"]);
        let parsed = parse_agent_directives(
            "please handle this @Bob: draft a reply to the customer",
            &agents,
        );
        assert_eq!(
            parsed,
            vec![("Bob".to_string(), "draft a reply to the customer".to_string())]
        );
    }
}
