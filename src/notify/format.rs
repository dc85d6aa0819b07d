//! Display helpers for notification content

use crate::Session;

/// Prefix the agent uses for tools provided by MCP servers
const MCP_PREFIX: &str = "mcp__";

/// Longest query excerpt used as a session summary
const QUERY_SUMMARY_CHARS: usize = 50;

/// First 8 characters of an id, for titles
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn is_mcp_tool(tool_name: &str) -> bool {
    tool_name.starts_with(MCP_PREFIX)
}

fn title_case(segment: &str) -> String {
    segment
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Turn `mcp__server__tool_name` into `Server - Tool Name`.
///
/// Names without the MCP prefix are returned unchanged.
pub fn format_mcp_tool_name(tool_name: &str) -> String {
    let Some(rest) = tool_name.strip_prefix(MCP_PREFIX) else {
        return tool_name.to_string();
    };

    match rest.split_once("__") {
        Some((server, tool)) if !tool.is_empty() => {
            format!("{} - {}", title_case(server), title_case(tool))
        }
        Some((server, _)) => title_case(server),
        None => title_case(rest),
    }
}

/// One-line human summary of what a session is about
pub fn summarize_session(session: &Session) -> String {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(title) = non_empty(&session.title) {
        return title;
    }
    if let Some(summary) = non_empty(&session.summary) {
        return summary;
    }
    if let Some(query) = non_empty(&session.query) {
        if query.chars().count() > QUERY_SUMMARY_CHARS {
            let excerpt: String = query.chars().take(QUERY_SUMMARY_CHARS).collect();
            return format!("{}...", excerpt.trim_end());
        }
        return query;
    }
    "Untitled session".to_string()
}
