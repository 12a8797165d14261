use serde::Serialize;
use tracing::{error, info, warn};

use crate::llm::{GenerateRequest, GenerativeModel};
use crate::ops::action::{self, ActionPayload, Coordinates};
use crate::ops::coalesce::Conversation;
use crate::ops::structured::{Extraction, FallbackReason};

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub action: ActionPayload,
}

/// Reply used when the model cannot be reached. Carries its own neutral
/// action block so it goes through the same extraction as a real reply.
pub fn offline_reply(location: Option<Coordinates>) -> String {
    let coords = location.unwrap_or_default();
    format!(
        "I apologize, but my planning core is currently offline or experiencing issues. Please try again later.\n\
```json\n\
{{\n  \"map_action\": \"NONE\",\n  \"coordinates\": {{ \"lat\": {}, \"lng\": {} }},\n  \"feasibility_score\": 0,\n  \"status\": \"DRAFT\",\n  \"idea_title\": null,\n  \"idea_description\": null,\n  \"author\": null\n}}\n\
```",
        coords.lat, coords.lng
    )
}

/// Ask the auditor model for the next reply. Provider failures never reach
/// the caller; they degrade to [`offline_reply`].
pub async fn respond(
    model: &dyn GenerativeModel,
    conversation: Conversation,
    system_instruction: String,
    location: Option<Coordinates>,
) -> ChatReply {
    let request = GenerateRequest::conversation(conversation.into_contents(), system_instruction);

    info!("Calling {} for auditor reply", model.model_id());
    let output = match model.generate(request).await {
        Ok(text) => text,
        Err(e) => {
            error!("Model call failed, using offline reply: {}", e);
            offline_reply(location)
        }
    };

    let extracted = action::extract_action(&output, location);
    if let Extraction::Fallback { reason: FallbackReason::Invalid(ref msg), .. } = extracted.action {
        warn!("Could not parse action block: {}", msg);
    }

    ChatReply {
        text: extracted.text,
        action: extracted.action.into_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::action::{MapAction, ProposalStatus};
    use crate::ops::structured;

    #[test]
    fn offline_reply_embeds_a_parseable_neutral_action() {
        let here = Coordinates { lat: 51.5072, lng: -0.1276 };
        let text = offline_reply(Some(here));
        let extracted = structured::extract_fenced::<ActionPayload, _>(&text, || {
            panic!("offline reply must carry a parseable block")
        });
        let action = extracted.into_value();
        assert_eq!(action.map_action(), MapAction::None);
        assert_eq!(action.status(), ProposalStatus::Draft);
        assert_eq!(action.coordinates(), Some(here));
        assert!(structured::strip_action_json(&text).starts_with("I apologize"));
    }
}
