//! Groups command implementation

use anyhow::{Context, Result};
use std::path::Path;

use sessiondesk::grouping::{build_task_groups, ExpansionState};
use sessiondesk::{ConversationEvent, EventType, Role};

/// Print a conversation the way the session view lays it out
pub fn groups_command(conversation_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(conversation_path).with_context(|| {
        format!("Failed to read conversation: {}", conversation_path.display())
    })?;
    let events: Vec<ConversationEvent> = serde_json::from_str(&content).with_context(|| {
        format!("Failed to parse conversation: {}", conversation_path.display())
    })?;

    let grouping = build_task_groups(&events);
    let mut expansion = ExpansionState::new();
    expansion.apply_pending_approvals(&grouping.task_groups);

    println!(
        "{} events, {} at top level, {} task groups\n",
        events.len(),
        grouping.root_events.len(),
        grouping.task_groups.len()
    );

    for event in &grouping.root_events {
        let Some(group) = grouping.group_for(event) else {
            println!("  {}", describe(event));
            continue;
        };

        let expanded = expansion.is_expanded(group.task_id());
        let pending = if group.has_pending_approval {
            ", approval pending"
        } else {
            ""
        };
        println!(
            "  {} {} ({} tool calls{})",
            if expanded { "v" } else { ">" },
            describe(event),
            group.tool_call_count,
            pending
        );

        if expanded {
            for sub in &group.sub_task_events {
                println!("      {}", describe(sub));
            }
        } else if let Some(latest) = &group.latest_event {
            println!("      ... {}", describe(latest));
        }
    }

    Ok(())
}

fn describe(event: &ConversationEvent) -> String {
    let mut line = match event.event_type {
        EventType::Message => {
            let author = match event.role {
                Some(Role::User) => "user",
                Some(Role::Assistant) => "assistant",
                None => "message",
            };
            format!(
                "#{} {}: {}",
                event.id,
                author,
                event.content.as_deref().unwrap_or_default()
            )
        }
        EventType::ToolCall => format!(
            "#{} call {}",
            event.id,
            event.tool_name.as_deref().unwrap_or("?")
        ),
        EventType::ToolResult => format!(
            "#{} result for {}",
            event.id,
            event.tool_result_for_id.as_deref().unwrap_or("?")
        ),
    };
    if let Some(status) = event.approval_status {
        line.push_str(&format!(" [{}]", status));
    }
    line
}
