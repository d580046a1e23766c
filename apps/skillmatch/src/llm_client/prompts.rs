// Shared prompt constants.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Instruction that keeps a classifier inside the vocabulary it was given.
pub const CLOSED_VOCABULARY_INSTRUCTION: &str = "\
    CRITICAL: Only use skill names that appear verbatim in the input lists. \
    Do NOT invent, merge, rename or translate skills. \
    If the input does not support a match, report the requirement as missing.";
