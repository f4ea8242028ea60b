use crate::provider::Prompt;

const SYSTEM: &str = "You are a professional meeting recorder. Read the whole meeting transcript \
and summarise it faithfully. Only report decisions that were actually made and tasks that were \
actually assigned. Never invent participants.";

/// Section-formatted prompt. Used for streaming, where the user watches the
/// text arrive and JSON would be unreadable.
const SECTIONS_TEMPLATE: &str = "Analyze the following meeting transcript and provide a structured summary with exactly three sections:

1. OVERVIEW: A brief, one-paragraph overview of the meeting (2-3 sentences)
2. KEY DECISIONS: A bulleted list of the key decisions made during the meeting
3. ACTION ITEMS: A bulleted list of action items assigned, including who they were assigned to

Format your response as follows:
OVERVIEW:
[Your overview paragraph here]

KEY DECISIONS:
- [Decision 1]
- [Decision 2]

ACTION ITEMS:
- [Action item 1] - Assigned to: [Person]
- [Action item 2] - Assigned to: [Person]

If there are no decisions or action items, write \"- None\" under the heading.

";

const JSON_TEMPLATE: &str = "Analyze the following meeting transcript and respond with a single JSON object, and nothing else, with exactly this structure:
{
  \"overview\": \"A brief one-paragraph overview of the meeting (2-3 sentences)\",
  \"key_decisions\": [\"Decision 1\", \"Decision 2\"],
  \"action_items\": [{\"task\": \"Action item 1\", \"assignee\": \"Person or null\"}]
}

Use empty arrays when no decisions or action items were found.

";

const TRANSCRIPT_MARKER: &str = "Meeting transcript:\n";

pub fn digest_prompt(transcript: &str) -> Prompt {
    Prompt {
        system: SYSTEM.to_string(),
        user: format!("{}{}{}", SECTIONS_TEMPLATE, TRANSCRIPT_MARKER, transcript.trim()),
    }
}

pub fn structured_digest_prompt(transcript: &str) -> Prompt {
    Prompt {
        system: SYSTEM.to_string(),
        user: format!("{}{}{}", JSON_TEMPLATE, TRANSCRIPT_MARKER, transcript.trim()),
    }
}

/// The transcript embedded in a prompt built by this module.
pub(crate) fn transcript_of(prompt: &Prompt) -> &str {
    prompt
        .user
        .split_once(TRANSCRIPT_MARKER)
        .map(|(_, transcript)| transcript)
        .unwrap_or(&prompt.user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_the_transcript_last() {
        let p = digest_prompt("  Ana: let's ship on Friday.\n");
        assert!(p.user.ends_with("Meeting transcript:\nAna: let's ship on Friday."));
        assert!(p.user.contains("KEY DECISIONS:"));

        let p = structured_digest_prompt("Bo: agreed");
        assert!(p.user.contains("\"key_decisions\""));
        assert!(p.user.ends_with("Bo: agreed"));
        assert_eq!(transcript_of(&p), "Bo: agreed");
    }
}
