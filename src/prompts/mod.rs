//! System prompt construction
//!
//! This module holds the default companion prompt and the composer that
//! folds working memory into the effective system prompt for a chat turn.

use crate::memory::WorkingMemory;

/// Default base system prompt for the companion
///
/// Used when no override is stored. The memory-usage guidance here is a
/// behavioral contract passed to the model; the composed memory section
/// below repeats the "only when naturally relevant" instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a supportive, reflective companion. You provide emotional support through brief, personal conversations.

CONVERSATION STYLE:
- Keep responses SHORT (2-4 sentences max)
- Be conversational, like texting a close friend
- Focus on ONE thing at a time
- Ask ONE question per response, not multiple
- Use simple, natural language
- Avoid lengthy explanations or advice dumps

USING MEMORY:
- Reference things you know about the user when RELEVANT and helpful
- Only make connections that are natural and appropriate to the current topic
- Don't force memory references - if nothing in your memory relates to what they're saying, just respond to what they shared
- When you do reference memory, do it naturally: \"Last time you mentioned...\" or \"I remember you said...\"
- Build continuity across conversations, but stay focused on what they need right now

CORE APPROACH:
- Listen deeply, respond briefly
- Reflect what you hear in a sentence
- Ask ONE thoughtful follow-up question
- Be warm, empathetic, non-judgmental
- Help them explore feelings, not just solve problems
- Stay grounded in what they're actually talking about

BOUNDARIES - You are NOT:
- A coding assistant (decline code/technical requests)
- A general Q&A bot (decline factual queries unrelated to emotional wellbeing)
- A task helper (decline writing/summaries/translations)

If off-topic: \"I'm here for emotional support and self-reflection. Want to talk about what's on your mind?\"

Remember: BRIEF responses. ONE focus per message. Use memory when relevant, but don't force it.";

/// Section headers for the composed memory block
const MEMORY_SECTION_DELIMITER: &str = "=== WHAT YOU KNOW ABOUT THIS USER ===";
const FACTS_HEADER: &str = "Personal Facts:";
const PREFERENCES_HEADER: &str = "Their Preferences & Values:";
const TOPICS_HEADER: &str = "Past Conversation Topics:";

/// Compose the effective system prompt for a chat turn
///
/// Returns the base prompt unchanged when memory is entirely empty.
/// Otherwise appends a delimited section listing each non-empty collection
/// under a fixed header, one bullet per entry, closed by an instruction to
/// reference memory only when naturally relevant.
///
/// Pure function: deterministic for identical inputs, no I/O.
///
/// # Arguments
///
/// * `base_prompt` - The stored base system prompt
/// * `memory` - Current working memory
///
/// # Examples
///
/// ```
/// use confide::memory::WorkingMemory;
/// use confide::prompts::compose_system_prompt;
///
/// let empty = WorkingMemory::empty("default");
/// assert_eq!(compose_system_prompt("base", &empty), "base");
///
/// let mut memory = WorkingMemory::empty("default");
/// memory.facts.push("works as a nurse".to_string());
/// let composed = compose_system_prompt("base", &memory);
/// assert!(composed.contains("works as a nurse"));
/// ```
pub fn compose_system_prompt(base_prompt: &str, memory: &WorkingMemory) -> String {
    if memory.is_empty() {
        return base_prompt.to_string();
    }

    let mut prompt = String::from(base_prompt);
    prompt.push_str("\n\n");
    prompt.push_str(MEMORY_SECTION_DELIMITER);
    prompt.push_str("\nUse this information when it's naturally relevant to the conversation. Don't force connections.\n");

    for (header, entries) in [
        (FACTS_HEADER, &memory.facts),
        (PREFERENCES_HEADER, &memory.preferences),
        (TOPICS_HEADER, &memory.topics),
    ] {
        if entries.is_empty() {
            continue;
        }
        prompt.push('\n');
        prompt.push_str(header);
        for entry in entries {
            prompt.push_str("\n- ");
            prompt.push_str(entry);
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "\nReference these details only when they naturally relate to what the user is sharing right now.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(facts: &[&str], preferences: &[&str], topics: &[&str]) -> WorkingMemory {
        WorkingMemory {
            user_id: "default".to_string(),
            facts: facts.iter().map(|s| s.to_string()).collect(),
            preferences: preferences.iter().map(|s| s.to_string()).collect(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_memory_returns_base_unchanged() {
        let empty = WorkingMemory::empty("default");
        assert_eq!(compose_system_prompt("any base prompt", &empty), "any base prompt");
        assert_eq!(compose_system_prompt("", &empty), "");
    }

    #[test]
    fn test_composed_prompt_starts_with_base() {
        let memory = memory(&["has a dog"], &[], &[]);
        let composed = compose_system_prompt("base prompt", &memory);
        assert!(composed.starts_with("base prompt"));
    }

    #[test]
    fn test_included_and_excluded_sections() {
        let memory = memory(&["works as a nurse"], &[], &["work stress"]);
        let composed = compose_system_prompt("base", &memory);

        assert!(composed.contains("works as a nurse"));
        assert!(composed.contains("work stress"));
        assert!(composed.contains(FACTS_HEADER));
        assert!(composed.contains(TOPICS_HEADER));
        // Empty collection gets no header at all
        assert!(!composed.contains(PREFERENCES_HEADER));
    }

    #[test]
    fn test_all_sections_present_when_populated() {
        let memory = memory(&["fact"], &["pref"], &["topic"]);
        let composed = compose_system_prompt("base", &memory);

        assert!(composed.contains(MEMORY_SECTION_DELIMITER));
        assert!(composed.contains(FACTS_HEADER));
        assert!(composed.contains(PREFERENCES_HEADER));
        assert!(composed.contains(TOPICS_HEADER));
        assert!(composed.contains("naturally relate"));
    }

    #[test]
    fn test_entries_rendered_as_bullets() {
        let memory = memory(&["first fact", "second fact"], &[], &[]);
        let composed = compose_system_prompt("base", &memory);

        assert!(composed.contains("\n- first fact"));
        assert!(composed.contains("\n- second fact"));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let memory = memory(&["a", "b"], &["c"], &["d"]);
        let first = compose_system_prompt("base", &memory);
        let second = compose_system_prompt("base", &memory);
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_prompt_sets_expectations() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("SHORT"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("USING MEMORY"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("emotional support"));
    }
}
