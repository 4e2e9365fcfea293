pub mod agents;
pub mod parse;
pub mod prompt;

use serde::{Serialize, de::DeserializeOwned};

use crate::openai::{CollaboratorError, CompletionRequest, TextGenerator};
use parse::{clean_text, parse_structured};
use prompt::{Prompt, render};

pub fn build_request<T: Serialize>(
    system_message: &str,
    prompt: Prompt,
    data: &T,
) -> Result<CompletionRequest, CollaboratorError> {
    let user_message =
        render(prompt, data).map_err(|e| CollaboratorError::Prompt(format!("{}: {}", prompt, e)))?;
    Ok(CompletionRequest::new(system_message, user_message))
}

/// Sends the request and runs the answer through the structured
/// parse pipeline.
pub async fn ask_structured<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    request: &CompletionRequest,
) -> Result<T, CollaboratorError> {
    let raw = generator.generate(request).await?;
    tracing::debug!("Structured response: {}", raw);
    Ok(parse_structured(&raw)?)
}

/// Sends the request and returns the answer as plain text.
pub async fn ask_text(
    generator: &dyn TextGenerator,
    request: &CompletionRequest,
) -> Result<String, CollaboratorError> {
    let raw = generator.generate(request).await?;
    let text = clean_text(&raw);
    if text.is_empty() {
        return Err(CollaboratorError::MissingContent(raw));
    }
    Ok(text)
}
