//! Speaker selection for manager-coordinated groups.

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use colloquy_core::error::ProviderResult;
use colloquy_core::traits::Provider;
use colloquy_core::types::{ProviderMessage, ProviderReply};

/// Ask the provider to name the member who speaks next.
///
/// The reply must match a member exactly after trimming. One stricter
/// re-prompt is allowed; after that the choice falls back to a random
/// member other than `previous`, since the model may hallucinate a name
/// outside the group.
pub(crate) async fn select_speaker(
    provider: &dyn Provider,
    mut context: Vec<ProviderMessage>,
    members: &[String],
    previous: Option<&str>,
) -> ProviderResult<String> {
    context.push(ProviderMessage::user(format!(
        "You are in a role play game. The following roles are available: {}. \
         Read the conversation, then select the next role to speak. \
         Only return the role.",
        members.join(", ")
    )));

    for attempt in 0..2 {
        let reply = provider.create(context.clone(), &[]).await?;
        let named = match reply {
            ProviderReply::Text(text) => text.trim().to_string(),
            ProviderReply::FunctionCall(call) => {
                warn!(function = %call.name, "selection reply was a function call");
                String::new()
            }
        };

        if let Some(member) = members.iter().find(|m| **m == named) {
            debug!(speaker = %member, attempt, "next speaker selected");
            return Ok(member.clone());
        }

        warn!(reply = %named, attempt, "selection named a node outside the group");
        if attempt == 0 {
            context.push(ProviderMessage::user(format!(
                "That is not one of the available roles. \
                 Respond with exactly one of: {}.",
                members.join(", ")
            )));
        }
    }

    Ok(fallback(members, previous))
}

/// Random member other than the previous speaker; the previous speaker
/// only repeats when it is the sole member.
fn fallback(members: &[String], previous: Option<&str>) -> String {
    let pool: Vec<&String> = members
        .iter()
        .filter(|m| Some(m.as_str()) != previous)
        .collect();

    let picked = pool
        .choose(&mut rand::thread_rng())
        .copied()
        .or_else(|| members.first())
        .cloned()
        .unwrap_or_default();
    warn!(speaker = %picked, "falling back to a random speaker");
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use colloquy_core::error::ProviderError;
    use colloquy_test_utils::FnProvider;

    fn members() -> Vec<String> {
        vec!["dog".to_string(), "cat".to_string(), "mouse".to_string()]
    }

    #[tokio::test]
    async fn test_valid_selection_is_returned() {
        let provider = Arc::new(FnProvider::new(|_messages| Ok("  cat ".into())));
        let speaker = select_speaker(provider.as_ref(), vec![], &members(), None)
            .await
            .unwrap();
        assert_eq!(speaker, "cat");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_reprompts_once_then_falls_back() {
        let provider = Arc::new(FnProvider::new(|_messages| Ok("ghost".into())));
        let speaker = select_speaker(provider.as_ref(), vec![], &members(), Some("dog"))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
        assert!(members().contains(&speaker));
        assert_ne!(speaker, "dog");
    }

    #[tokio::test]
    async fn test_selection_prompt_lists_roles() {
        let provider = Arc::new(FnProvider::new(|messages| {
            let last = messages.last().unwrap();
            assert!(last.content.contains("next role"));
            assert!(last.content.contains("dog, cat, mouse"));
            Ok("dog".into())
        }));
        select_speaker(provider.as_ref(), vec![], &members(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let provider = Arc::new(FnProvider::new(|_messages| {
            Err(ProviderError::RateLimit("slow down".into()))
        }));
        let result = select_speaker(provider.as_ref(), vec![], &members(), None).await;
        assert!(matches!(result, Err(ProviderError::RateLimit(_))));
    }

    #[test]
    fn test_fallback_avoids_previous_speaker() {
        for _ in 0..32 {
            let picked = fallback(&members(), Some("cat"));
            assert_ne!(picked, "cat");
        }

        let solo = vec!["dog".to_string()];
        assert_eq!(fallback(&solo, Some("dog")), "dog");
    }
}
