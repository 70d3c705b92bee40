//! Prompt templates for the refine summarization loop.

use std::collections::HashMap;

use crate::RecapError;

/// Placeholder holding the chunk text.
pub const TEXT_VAR: &str = "text";

/// Placeholder holding the running summary in the refine template.
pub const EXISTING_ANSWER_VAR: &str = "existing_answer";

/// Prompt for the first chunk of a transcript.
pub const DEFAULT_INITIAL_TEMPLATE: &str = "\
Write a concise summary of the following youtube transcript with key takeaways for the audience:
\"{text}\"
CONCISE SUMMARY:";

/// Prompt that folds one more chunk into the running summary.
pub const DEFAULT_REFINE_TEMPLATE: &str = "\
Your job is to produce a final key takeaways summary.
We have provided an existing summary up to a certain point: {existing_answer}

We have the opportunity to refine the existing summary (only if needed) with some more context below.
------------
{text}
------------
Given the new context, refine the original summary with new key takeaways.
If the context isn't useful, return the original summary.";

/// A prompt with `{name}` placeholders.
///
/// Placeholders other than the declared ones are left untouched, so literal
/// braces in user templates survive rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<&'static str>,
}

impl PromptTemplate {
    /// Build a template that must reference every name in `variables`.
    pub fn new(template: impl Into<String>, variables: &[&'static str]) -> crate::Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(RecapError::Configuration(
                "prompt template is empty".to_string(),
            ));
        }
        for var in variables {
            if !template.contains(&placeholder(var)) {
                return Err(RecapError::Configuration(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder(var)
                )));
            }
        }
        Ok(Self {
            template,
            variables: variables.to_vec(),
        })
    }

    /// Template consuming one chunk of text.
    pub fn initial(template: impl Into<String>) -> crate::Result<Self> {
        Self::new(template, &[TEXT_VAR])
    }

    /// Template consuming the running summary and one chunk of text.
    pub fn refine(template: impl Into<String>) -> crate::Result<Self> {
        Self::new(template, &[EXISTING_ANSWER_VAR, TEXT_VAR])
    }

    /// Substitute values for the declared placeholders.
    ///
    /// Substitution happens in a single left-to-right pass, so a value that
    /// itself contains `{text}` is never expanded again.
    pub fn render(&self, values: &HashMap<&str, &str>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let replaced = after.find('}').and_then(|close| {
                let name = &after[..close];
                self.variables
                    .iter()
                    .any(|var| *var == name)
                    .then(|| values.get(name))
                    .flatten()
                    .map(|value| (*value, close))
            });

            match replaced {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn placeholder(var: &str) -> String {
    format!("{{{}}}", var)
}

/// Render the prompt for the first chunk.
pub fn build_initial_prompt(template: &PromptTemplate, text: &str) -> String {
    template.render(&HashMap::from([(TEXT_VAR, text)]))
}

/// Render the prompt that folds `text` into `existing_answer`.
pub fn build_refine_prompt(template: &PromptTemplate, existing_answer: &str, text: &str) -> String {
    template.render(&HashMap::from([
        (EXISTING_ANSWER_VAR, existing_answer),
        (TEXT_VAR, text),
    ]))
}
