//! Prompt text that teaches a model how hand-offs work.

/// Prefix for instructions of agents that take part in hand-offs.
pub const RECOMMENDED_PROMPT_PREFIX: &str = "# System context\n\
You are part of a multi-agent system designed to make agent coordination and execution easy. \
The system uses two primary abstractions: **Agents** and **Handoffs**. An agent encompasses \
instructions and tools and can hand off a conversation to another agent when appropriate. \
Handoffs are achieved by calling a handoff function, generally named `transfer_to_<agent_name>`. \
Transfers between agents are handled seamlessly in the background; do not mention or draw \
attention to these transfers in your conversation with the user.\n";

/// `instructions` with [`RECOMMENDED_PROMPT_PREFIX`] prepended.
pub fn prompt_with_handoff_instructions(instructions: &str) -> String {
    format!("{RECOMMENDED_PROMPT_PREFIX}\n\n{instructions}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_prefix() {
        let prompt = prompt_with_handoff_instructions("Route billing questions.");
        assert!(prompt.starts_with("# System context"));
        assert!(prompt.ends_with("Route billing questions."));
        assert!(prompt.contains("transfer_to_<agent_name>"));
    }
}
