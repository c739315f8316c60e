//! Prompt configuration, field merge, and deterministic prompt assembly.
//!
//! The platform default is an explicit [`PromptConfig`] value handed to
//! [`EffectiveConfig::resolve`] by the caller; there is no module-level
//! default, so merge behavior is unit-testable with injected defaults.

use serde::{Deserialize, Serialize};

use crate::chat::ChatTurn;
use crate::document::RetrievedChunk;

/// Number of trailing history turns included in the rendered prompt.
pub const HISTORY_WINDOW: usize = 6;

/// A prompt field: a single string or an ordered list of strings.
/// Lists are newline-joined at render time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptField {
    /// One string.
    Single(String),
    /// Ordered fragments, rendered one per line.
    Many(Vec<String>),
}

impl PromptField {
    /// Renders the field to its final text.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Many(parts) => parts.join("\n"),
        }
    }
}

impl From<&str> for PromptField {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

/// Tenant- or platform-defined prompt template, field by field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Who the assistant is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PromptField>,

    /// What the assistant should do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<PromptField>,

    /// Standing background the assistant answers from. Retrieved chunks
    /// are always appended to this field, never replacing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PromptField>,

    /// Hard limits on behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PromptField>,

    /// Tone and voice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<PromptField>,

    /// Shape of the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<PromptField>,

    /// Worked examples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<PromptField>,

    /// What the conversation is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<PromptField>,
}

/// Fully resolved prompt configuration for one request.
///
/// Precedence is decided once per request, not per field: a structured
/// tenant override wins, else a legacy single system-prompt string, else
/// the platform default alone. Within the chosen override, unset fields
/// fall back to the default field-by-field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Rendered role text, if any.
    pub role: Option<String>,
    /// Rendered instruction text, if any.
    pub instruction: Option<String>,
    /// Rendered standing context, if any.
    pub context: Option<String>,
    /// Rendered constraints, if any.
    pub constraints: Option<String>,
    /// Rendered style guidance, if any.
    pub style: Option<String>,
    /// Rendered output-format guidance, if any.
    pub output_format: Option<String>,
    /// Rendered examples, if any.
    pub examples: Option<String>,
    /// Rendered goal, if any.
    pub goal: Option<String>,
}

impl EffectiveConfig {
    /// Resolves the effective configuration from the platform default, an
    /// optional legacy system prompt, and an optional structured override.
    #[must_use]
    pub fn resolve(
        platform_default: &PromptConfig,
        legacy_system_prompt: Option<&str>,
        override_config: Option<&PromptConfig>,
    ) -> Self {
        if let Some(config) = override_config {
            return Self::merge(config, platform_default);
        }

        if let Some(prompt) = legacy_system_prompt {
            // A legacy prompt is a whole-instruction replacement; the
            // remaining fields still come from the platform default.
            let mut base = Self::merge(&PromptConfig::default(), platform_default);
            base.instruction = Some(prompt.to_string());
            return base;
        }

        Self::merge(&PromptConfig::default(), platform_default)
    }

    fn merge(config: &PromptConfig, fallback: &PromptConfig) -> Self {
        fn pick(field: &Option<PromptField>, fallback: &Option<PromptField>) -> Option<String> {
            field
                .as_ref()
                .or(fallback.as_ref())
                .map(PromptField::render)
        }

        Self {
            role: pick(&config.role, &fallback.role),
            instruction: pick(&config.instruction, &fallback.instruction),
            context: pick(&config.context, &fallback.context),
            constraints: pick(&config.constraints, &fallback.constraints),
            style: pick(&config.style, &fallback.style),
            output_format: pick(&config.output_format, &fallback.output_format),
            examples: pick(&config.examples, &fallback.examples),
            goal: pick(&config.goal, &fallback.goal),
        }
    }
}

/// Merges the effective configuration, retrieved context, conversation
/// history, and the user's current message into one generation prompt.
///
/// Pure and deterministic: the same inputs always render the same text.
/// Retrieved chunks become labeled `Source N` blocks appended to the
/// context field; the last [`HISTORY_WINDOW`] history turns render as
/// `role: content` lines; the user's message comes last.
#[must_use]
pub fn assemble(
    effective: &EffectiveConfig,
    retrieved: &[RetrievedChunk],
    history: &[ChatTurn],
    user_message: &str,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    let labeled = [
        ("Role", &effective.role),
        ("Goal", &effective.goal),
        ("Instructions", &effective.instruction),
        ("Constraints", &effective.constraints),
        ("Style", &effective.style),
        ("Output format", &effective.output_format),
        ("Examples", &effective.examples),
    ];
    for (label, value) in labeled {
        if let Some(text) = value {
            sections.push(format!("{label}:\n{text}"));
        }
    }

    let mut context_parts: Vec<String> = Vec::new();
    if let Some(context) = &effective.context {
        context_parts.push(context.clone());
    }
    for (index, chunk) in retrieved.iter().enumerate() {
        context_parts.push(format!("Source {}:\n{}", index + 1, chunk.text));
    }
    if !context_parts.is_empty() {
        sections.push(format!("Context:\n{}", context_parts.join("\n\n")));
    }

    if !history.is_empty() {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let lines: Vec<String> = history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect();
        sections.push(format!("Conversation so far:\n{}", lines.join("\n")));
    }

    sections.push(format!("User message:\n{user_message}"));
    sections.join("\n\n")
}
