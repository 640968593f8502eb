//! Prompt assembly for reply and speaker-selection turns.
//!
//! Only success-state entries reach the provider; error and interrupt
//! markers are bookkeeping for `retry`/`resume` and never replay as
//! history.

use colloquy_core::types::{ChatEntry, ChatState, ProviderMessage};

/// Entries sent by or addressed to `node`, in log order.
pub(crate) fn channel_history<'a>(chats: &'a [ChatEntry], node: &str) -> Vec<&'a ChatEntry> {
    chats.iter().filter(|entry| entry.involves(node)).collect()
}

/// Build the prompt for `replier` over a history slice: the node's role
/// text (if any) as a leading system message, its own entries as
/// assistant messages, everything else as user messages attributed to the
/// sender.
pub(crate) fn reply_prompt(
    role: Option<&str>,
    history: &[&ChatEntry],
    replier: &str,
) -> Vec<ProviderMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(role) = role {
        messages.push(ProviderMessage::system(role));
    }
    for entry in history {
        if entry.state != ChatState::Success {
            continue;
        }
        if entry.from == replier {
            messages.push(ProviderMessage::assistant(&entry.content));
        } else {
            messages.push(ProviderMessage::named_user(&entry.from, &entry.content));
        }
    }
    messages
}

/// The manager's view of its group channel, used as the base of
/// speaker-selection prompts: every entry as an attributed user message.
pub(crate) fn selection_context(
    role: Option<&str>,
    history: &[&ChatEntry],
) -> Vec<ProviderMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(role) = role {
        messages.push(ProviderMessage::system(role));
    }
    for entry in history {
        if entry.state != ChatState::Success {
            continue;
        }
        messages.push(ProviderMessage::named_user(&entry.from, &entry.content));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::types::Role;

    fn log() -> Vec<ChatEntry> {
        vec![
            ChatEntry::success("human", "bot", "2 + 2 = 4?"),
            ChatEntry::success("bot", "human", "Yes."),
            ChatEntry::error("bot", "human", "401: Rate limit"),
            ChatEntry::success("human", "other", "unrelated"),
        ]
    }

    #[test]
    fn test_channel_history_filters_by_node() {
        let chats = log();
        let history = channel_history(&chats, "bot");
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|e| e.involves("bot")));
    }

    #[test]
    fn test_role_text_leads_as_system() {
        let chats = log();
        let history = channel_history(&chats, "bot");
        let messages = reply_prompt(Some("You are a bot."), &history, "bot");

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are a bot.");
    }

    #[test]
    fn test_reply_prompt_maps_authorship() {
        let chats = log();
        let history = channel_history(&chats, "bot");
        let messages = reply_prompt(None, &history, "bot");

        // the error entry is skipped
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].name.as_deref(), Some("human"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Yes.");
    }

    #[test]
    fn test_selection_context_attributes_all_speakers() {
        let chats = log();
        let history = channel_history(&chats, "bot");
        let messages = selection_context(None, &history);

        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == Role::User));
        assert_eq!(messages[1].name.as_deref(), Some("bot"));
    }
}
