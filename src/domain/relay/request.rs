use crate::domain::completion::CompletionRequest;
use crate::domain::DomainError;

/// A chat request flattened into what the cache and upstream need
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub model: String,
    /// All message contents joined with single spaces, in order
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl RelayRequest {
    /// Flatten message contents into a single prompt.
    ///
    /// Rejects a missing model and an empty message list.
    pub fn from_messages<I, S>(
        model: impl Into<String>,
        contents: I,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(DomainError::validation("model is required"));
        }

        let parts: Vec<S> = contents.into_iter().collect();
        if parts.is_empty() {
            return Err(DomainError::validation("messages cannot be empty"));
        }

        let prompt = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ");

        Ok(Self {
            model,
            prompt,
            temperature,
            max_tokens,
        })
    }

    /// Build the upstream completion request
    pub fn to_completion_request(&self) -> CompletionRequest {
        let mut request = CompletionRequest::new(self.model.clone(), self.prompt.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}
