use serde::Deserialize;

use crate::ops::action::Coordinates;

/// Auditor role, rubric and output contract. Location context and
/// directives are appended per request.
pub const AUDITOR_RUBRIC: &str = r#"Role: You are the "Zonify Urban Planning Auditor." You evaluate community proposals for a specific location using a structured 5-pillar rubric.

The 5-Pillar Scoring Rubric (20 points each, Total 100):
1. **Urban Fit**: Does it match the district's character and architectural language?
2. **Sustainability**: Is it eco-friendly, energy efficient, or lowering the carbon footprint?
3. **Safety**: Does it improve public safety or lighting, or reduce risks for pedestrians?
4. **Accessibility**: Is it inclusive (ADA/Universal Design) and easy to reach?
5. **Practicality**: Is the business model viable and realistic, and does it fill a gap in the market?

Filter Logic:
1. Rejection: If an idea is physically impossible, harmful or satirical, set status to "REJECTED".
2. Evaluation: Gather information until you can score every pillar. Ask ONE targeted question at a time.

Output Format (Strict JSON Control):
Every response must end with a JSON block:
```json
{
  "map_action": "MOVE_TO" | "SHOW_PINS" | "SHOW_3D_SIMULATION" | "NONE",
  "coordinates": { "lat": number, "lng": number },
  "feasibility_score": number (0-100, the sum of the pillars),
  "scoring_breakdown": {
     "urban_fit": number (0-20),
     "sustainability": number (0-20),
     "safety": number (0-20),
     "accessibility": number (0-20),
     "practicality": number (0-20)
  },
  "status": "DRAFT" | "VALIDATED" | "REJECTED",
  "idea_title": string | null,
  "idea_description": string | null,
  "flags": ["string array of risks/conflicts"]
}
```

Notes:
- Use "DRAFT" while gathering information.
- Use "VALIDATED" ONLY when you approve the idea (Total Score >= 80/100)."#;

const FORCE_VALIDATE_DIRECTIVE: &str = "CRITICAL DIRECTIVE: The user has forcefully finalized the proposal. You MUST immediately set `status` to \"VALIDATED\" and `map_action` to \"SHOW_3D_SIMULATION\". Do not ask any more questions. You MUST provide a concise `idea_title` summarizing the proposal and an `idea_description` outlining the constraints and features requested in the chat history.";

/// The community idea a user is building on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefiningIdea {
    #[serde(default)]
    pub business_type: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditContext<'a> {
    pub place_name: Option<&'a str>,
    pub location: Option<Coordinates>,
    pub refining_idea: Option<&'a RefiningIdea>,
    pub force_validate: bool,
}

pub fn build_system_instruction(ctx: &AuditContext<'_>) -> String {
    let place = ctx
        .place_name
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("Unknown");
    let coords = match ctx.location {
        Some(c) => format!("{{\"lat\":{},\"lng\":{}}}", c.lat, c.lng),
        None => "null".to_string(),
    };

    let mut prompt = format!(
        "{}\n- Current active location: {} at coordinates {}\n",
        AUDITOR_RUBRIC, place, coords
    );

    if let Some(idea) = ctx.refining_idea {
        prompt.push_str(&format!(
            "- REFINING CONTEXT: The user is refining an existing community idea titled \"{}\". Merge new details conceptually.\n",
            idea.business_type
        ));
    }

    if ctx.force_validate {
        prompt.push('\n');
        prompt.push_str(FORCE_VALIDATE_DIRECTIVE);
        prompt.push('\n');
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_context_is_interpolated() {
        let prompt = build_system_instruction(&AuditContext {
            place_name: Some("Bryant Park"),
            location: Some(Coordinates { lat: 40.7536, lng: -73.9832 }),
            ..Default::default()
        });
        assert!(prompt.starts_with(AUDITOR_RUBRIC));
        assert!(prompt.contains("Bryant Park at coordinates {\"lat\":40.7536,\"lng\":-73.9832}"));
        assert!(!prompt.contains("CRITICAL DIRECTIVE"));
        assert!(!prompt.contains("REFINING CONTEXT"));
    }

    #[test]
    fn missing_place_is_unknown() {
        let prompt = build_system_instruction(&AuditContext::default());
        assert!(prompt.contains("Unknown at coordinates null"));
    }

    #[test]
    fn force_validate_forbids_questions() {
        let prompt = build_system_instruction(&AuditContext {
            force_validate: true,
            ..Default::default()
        });
        assert!(prompt.contains("CRITICAL DIRECTIVE"));
        assert!(prompt.contains("Do not ask any more questions"));
        assert!(prompt.contains("\"VALIDATED\""));
        assert!(prompt.contains("\"SHOW_3D_SIMULATION\""));
    }

    #[test]
    fn refining_idea_is_named() {
        let idea = RefiningIdea { business_type: "Night Market".to_string() };
        let prompt = build_system_instruction(&AuditContext {
            refining_idea: Some(&idea),
            ..Default::default()
        });
        assert!(prompt.contains("refining an existing community idea titled \"Night Market\""));
    }
}
