use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

/// Sends a single-turn prompt and returns the trimmed answer.
///
/// There is no retry; a failed or timed-out call is reported to the caller,
/// which decides on a fallback.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Result<String, LlmError> {
    debug!(target: TARGET_LLM_REQUEST, "Sending LLM request to {} with prompt: {}", params.model, prompt);

    let response = match timeout(params.timeout, send_request(prompt, params)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
            return Err(e);
        }
        Err(_) => {
            warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {:?}", params.timeout);
            return Err(LlmError::Timeout(params.timeout));
        }
    };

    let response = response.trim();
    if response.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response);
    Ok(response.to_string())
}

async fn send_request(prompt: &str, params: &LLMParams) -> Result<String, LlmError> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));

            ollama
                .generate(request)
                .await
                .map(|response| response.response)
                .map_err(|e| LlmError::Request(e.to_string()))
        }
        LLMClient::OpenAI(client) => {
            let message = ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| LlmError::Request(e.to_string()))?;
            let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];

            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.as_str())
                .temperature(params.temperature)
                .messages(messages)
                .build()
                .map_err(|e| LlmError::Request(e.to_string()))?;

            let response = client
                .chat()
                .create(request)
                .await
                .map_err(|e| LlmError::Request(e.to_string()))?;

            Ok(response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default())
        }
    }
}
