//! LLM 모듈 - OpenAI 호환 Chat Completions 클라이언트
//!
//! 질문 정규화, 재구성, 답변 생성에 공통으로 사용하는
//! LLM 프로바이더입니다. 일반 완성과 SSE 스트리밍을 모두 지원합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let llm = OpenAiChat::from_env(None)?;
//! let answer = llm.complete(&messages).await?;
//! ```

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Chat Completions API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/chat
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 기본 모델
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 요청 타임아웃 (스트리밍 포함)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Error
// ============================================================================

/// LLM 서비스 에러
///
/// 재시도하지 않고 호출자에게 그대로 전파됩니다.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM 요청 실패: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API 에러 ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM 응답 파싱 실패: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM 스트림 에러: {0}")]
    Stream(String),

    #[error("LLM 응답이 비어 있습니다")]
    Empty,
}

// ============================================================================
// Types
// ============================================================================

/// 채팅 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// 채팅 메시지 (프롬프트 단위)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// 스트리밍 응답 청크 시퀀스
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

// ============================================================================
// LlmProvider Trait
// ============================================================================

/// LLM 프로바이더 트레이트
///
/// 메시지 목록을 받아 완성 텍스트 또는 청크 스트림을 반환합니다.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 단일 완성 (전체 응답을 한 번에 반환)
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// 스트리밍 완성 (청크 단위로 점진적 반환)
    async fn stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream, LlmError>;

    /// 모델 식별자
    fn model(&self) -> &str;
}

// ============================================================================
// OpenAI Chat Completions
// ============================================================================

/// OpenAI 호환 Chat Completions 구현체
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChat {
    /// 새 인스턴스 생성
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    ///
    /// `model`이 None이면 기본 모델(gpt-4o-mini)을 사용합니다.
    pub fn from_env(model: Option<String>) -> anyhow::Result<Self> {
        let api_key = get_api_key()?;
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model)?)
    }

    /// 엔드포인트 교체 (테스트/프록시용)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let response = self.send(messages, false).await?;
        let body: ChatResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::Empty)
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream, LlmError> {
        let response = self.send(messages, true).await?;
        let mut events = response.bytes_stream().eventsource();

        // SSE 이벤트를 텍스트 청크로 변환
        // source(형식): https://platform.openai.com/docs/api-reference/chat-streaming
        Ok(Box::pin(async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;

                // 종료 마커
                if event.data == "[DONE]" {
                    break;
                }

                let chunk: StreamChunk = serde_json::from_str(&event.data)?;
                for choice in &chunk.choices {
                    if let Some(ref text) = choice.delta.content {
                        if !text.is_empty() {
                            yield text.clone();
                        }
                    }
                }
            }
        }))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// API 에러 응답 본문
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
pub fn get_api_key() -> anyhow::Result<String> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }

    anyhow::bail!(
        "API 키가 설정되지 않았습니다. OPENAI_API_KEY 환경변수를 설정하세요.\n\
         설정: export OPENAI_API_KEY=your-api-key"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    std::env::var("OPENAI_API_KEY")
        .map(|key| !key.is_empty())
        .unwrap_or(false)
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! 파이프라인 테스트용 Mock LLM

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// 스크립트된 응답을 순서대로 반환하는 Mock 프로바이더
    ///
    /// 준비된 응답이 소진되면 마지막 user 메시지를 그대로 돌려줍니다
    /// (정규화/재구성 단계의 "변경 없음" 경로 테스트용).
    pub struct MockLlm {
        replies: Mutex<VecDeque<String>>,
        chunks: Vec<String>,
        fail_after: Option<usize>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
        stream_calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl MockLlm {
        pub fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                chunks: vec!["소득세법 (제55조)에 따르면 ".to_string(), "누진세율이 적용됩니다.".to_string()],
                fail_after: None,
                calls: Mutex::new(Vec::new()),
                stream_calls: Mutex::new(Vec::new()),
            }
        }

        /// complete() 호출에 대한 응답 추가 (호출 순서대로 소비)
        pub fn with_reply(self, reply: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back(reply.into());
            self
        }

        /// stream() 청크 교체
        pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
            self.chunks = chunks.iter().map(|c| c.to_string()).collect();
            self
        }

        /// n개 청크 후 스트림 실패
        pub fn failing_after(mut self, n: usize) -> Self {
            self.fail_after = Some(n);
            self
        }

        /// complete() 호출 횟수
        pub fn complete_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// 마지막 stream() 호출의 메시지 목록
        pub fn last_stream_messages(&self) -> Vec<ChatMessage> {
            self.stream_calls.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());

            if let Some(reply) = self.replies.lock().unwrap().pop_front() {
                return Ok(reply);
            }

            messages
                .iter()
                .rev()
                .find(|m| m.role == ChatRole::User)
                .map(|m| m.content.clone())
                .ok_or(LlmError::Empty)
        }

        async fn stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream, LlmError> {
            self.stream_calls.lock().unwrap().push(messages.to_vec());

            let chunks = self.chunks.clone();
            let fail_after = self.fail_after;

            Ok(Box::pin(async_stream::try_stream! {
                for (i, chunk) in chunks.into_iter().enumerate() {
                    if fail_after == Some(i) {
                        Err(LlmError::Stream("연결이 끊어졌습니다".to_string()))?;
                    }
                    yield chunk;
                }
            }))
        }

        fn model(&self) -> &str {
            "mock"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::user("안녕하세요");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let msg = ChatMessage::system("지시문");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"system\""));
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let data = r#"{"choices":[{"delta":{"content":"소득세"}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("소득세"));

        // 마지막 청크는 content가 없을 수 있음
        let data = r#"{"choices":[{"delta":{}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }

    #[test]
    fn test_api_error_parsing() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Invalid API key");
    }

    #[tokio::test]
    async fn test_mock_llm_replies_in_order() {
        use super::testing::MockLlm;

        let llm = MockLlm::new().with_reply("첫 번째").with_reply("두 번째");
        let messages = [ChatMessage::user("질문")];

        assert_eq!(llm.complete(&messages).await.unwrap(), "첫 번째");
        assert_eq!(llm.complete(&messages).await.unwrap(), "두 번째");
        // 소진 후에는 user 메시지를 그대로 반환
        assert_eq!(llm.complete(&messages).await.unwrap(), "질문");
        assert_eq!(llm.complete_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_llm_stream_failure() {
        use futures::StreamExt;

        use super::testing::MockLlm;

        let llm = MockLlm::new()
            .with_chunks(&["하나", "둘", "셋"])
            .failing_after(1);

        let mut stream = llm.stream(&[ChatMessage::user("q")]).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "하나");
        assert!(stream.next().await.unwrap().is_err());
    }
}
