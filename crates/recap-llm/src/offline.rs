//! A provider that never leaves the process.
//!
//! It writes a rough section-formatted digest straight from the transcript
//! and streams it in fixed-size chunks, which is enough to exercise the whole
//! create / stream / store path without an API key.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::LlmError;
use crate::prompt::transcript_of;
use crate::provider::{LlmProvider, Prompt, TextStream};

pub const OFFLINE_CHUNK_CHARS: usize = 50;

const DECISION_CUES: [&str; 5] = ["decided", "agreed", "decision", "we will go with", "approved"];
const ACTION_CUES: [&str; 5] = [" will ", "todo", "action item", "follow up", "take care of"];

#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    chunk_delay: Duration,
}

impl OfflineProvider {
    pub fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }
}

#[async_trait]
impl LlmProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn model(&self) -> &str {
        "heuristic"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let transcript = transcript_of(prompt);
        if transcript.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(render(transcript))
    }

    async fn stream(&self, prompt: &Prompt) -> Result<TextStream, LlmError> {
        let text = self.complete(prompt).await?;
        let delay = self.chunk_delay;

        let chunks = chunk_chars(&text, OFFLINE_CHUNK_CHARS);
        let stream = futures_util::stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, LlmError>(chunk)
        });
        Ok(stream.boxed())
    }
}

/// Split on char boundaries into pieces of at most `size` chars.
pub fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect()
}

fn render(transcript: &str) -> String {
    let lines: Vec<&str> = transcript.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let mut speakers: Vec<&str> = Vec::new();
    for line in &lines {
        if let Some((speaker, _)) = split_speaker(line) {
            if !speakers.contains(&speaker) {
                speakers.push(speaker);
            }
        }
    }

    let opening = lines
        .first()
        .map(|l| split_speaker(l).map_or(*l, |(_, said)| said))
        .unwrap_or_default();
    let mut overview = format!("A meeting of {} transcript lines", lines.len());
    if !speakers.is_empty() {
        overview.push_str(&format!(" between {}", speakers.join(", ")));
    }
    overview.push_str(&format!(". It opened with: \"{}\"", opening));

    let mut decisions = Vec::new();
    let mut actions = Vec::new();
    for line in &lines {
        let lower = line.to_lowercase();
        let (speaker, said) = match split_speaker(line) {
            Some((speaker, said)) => (Some(speaker), said),
            None => (None, *line),
        };
        if DECISION_CUES.iter().any(|cue| lower.contains(cue)) {
            decisions.push(format!("- {}", said));
        } else if ACTION_CUES.iter().any(|cue| lower.contains(cue)) {
            match speaker {
                Some(speaker) => actions.push(format!("- {} - Assigned to: {}", said, speaker)),
                None => actions.push(format!("- {}", said)),
            }
        }
    }
    if decisions.is_empty() {
        decisions.push("- None".to_string());
    }
    if actions.is_empty() {
        actions.push("- None".to_string());
    }

    format!(
        "OVERVIEW:\n{}\n\nKEY DECISIONS:\n{}\n\nACTION ITEMS:\n{}\n",
        overview,
        decisions.join("\n"),
        actions.join("\n")
    )
}

/// `Ana: text` -> (`Ana`, `text`) when the prefix looks like a speaker label.
fn split_speaker(line: &str) -> Option<(&str, &str)> {
    let (speaker, said) = line.split_once(':')?;
    let speaker = speaker.trim();
    let plausible = !speaker.is_empty()
        && speaker.split_whitespace().count() <= 3
        && speaker.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '.' || c == '-');
    plausible.then(|| (speaker, said.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_digest;
    use crate::prompt::digest_prompt;
    use recap_types::models::ActionItem;

    const TRANSCRIPT: &str = "Ana: Welcome everyone, let's review the launch.
Bo: We agreed to ship on Friday.
Ana: I will update the release notes.
Bo: Sounds good.";

    #[tokio::test]
    async fn offline_output_parses_into_a_digest() {
        let text = OfflineProvider::default().complete(&digest_prompt(TRANSCRIPT)).await.unwrap();
        let digest = parse_digest(&text);

        assert!(digest.overview.contains("between Ana, Bo"));
        assert_eq!(digest.key_decisions, vec!["We agreed to ship on Friday."]);
        assert_eq!(
            digest.action_items,
            vec![ActionItem::new("I will update the release notes.", Some("Ana".into()))]
        );
    }

    #[tokio::test]
    async fn stream_reassembles_to_complete_output() {
        let provider = OfflineProvider::default();
        let prompt = digest_prompt(TRANSCRIPT);
        let whole = provider.complete(&prompt).await.unwrap();

        let chunks: Vec<String> = provider
            .stream(&prompt)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert!(chunks.iter().all(|c| c.chars().count() <= OFFLINE_CHUNK_CHARS));
        assert_eq!(chunks.concat(), whole);
    }

    #[test]
    fn chunking_respects_char_boundaries() {
        assert_eq!(chunk_chars("ééé", 2), vec!["éé", "é"]);
        assert!(chunk_chars("", 5).is_empty());
    }
}
