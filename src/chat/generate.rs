//! 답변 생성 - 프롬프트 조립 및 스트리밍
//!
//! 전문가 페르소나 + Few-shot 예시 + 검색 문맥 + 대화 기록 +
//! 현재 질문으로 프롬프트를 조립하고, 답변을 청크 단위로
//! 스트리밍합니다. 청크 사이마다 취소 토큰을 확인하므로
//! 클라이언트가 중간에 끊어도 깔끔하게 종료됩니다.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::llm::{ChatMessage, ChunkStream, LlmError, LlmProvider};

use super::examples::ANSWER_EXAMPLES;
use super::session::{Role, Turn};

/// 전문가 페르소나 프롬프트
///
/// `{context}` 자리에 검색된 문맥이 삽입됩니다.
const ANSWER_SYSTEM_PROMPT: &str =
    "당신은 소득세법 전문가입니다. \
     사용자의 소득세법 관련 질문에 아래 제공된 검색된 문맥을 사용하여 답변하세요. \
     답을 모르는 경우, 모른다고 말하세요. \
     답변을 제공할 때는 소득세법 (XX조)에 따르면 이라고 시작하면서 답변해주시고, \
     아래 예시들을 참고하여 비슷한 형식과 톤으로 답변해주세요.\n\n{context}";

// ============================================================================
// PromptContext
// ============================================================================

/// 요청 단위 프롬프트 재료
///
/// 요청마다 새로 구성되고 사용 후 폐기됩니다.
#[derive(Debug, Clone)]
pub struct PromptContext {
    /// 포맷팅된 검색 문맥 (조각 구분자로 연결됨)
    pub context: String,
    /// 이전 대화 턴
    pub history: Vec<Turn>,
    /// 현재 질문 (재구성된 독립형)
    pub question: String,
}

/// 프롬프트 메시지 조립
///
/// 순서: 시스템(문맥 포함) → Few-shot 예시 → 대화 기록 → 현재 질문
pub fn build_messages(ctx: &PromptContext) -> Vec<ChatMessage> {
    let mut messages =
        Vec::with_capacity(2 + ANSWER_EXAMPLES.len() * 2 + ctx.history.len());

    messages.push(ChatMessage::system(
        ANSWER_SYSTEM_PROMPT.replace("{context}", &ctx.context),
    ));

    for example in ANSWER_EXAMPLES {
        messages.push(ChatMessage::user(example.input));
        messages.push(ChatMessage::assistant(example.answer));
    }

    for turn in &ctx.history {
        messages.push(match turn.role {
            Role::User => ChatMessage::user(&turn.content),
            Role::Assistant => ChatMessage::assistant(&turn.content),
        });
    }

    messages.push(ChatMessage::user(&ctx.question));
    messages
}

// ============================================================================
// AnswerGenerator
// ============================================================================

/// 답변 생성기
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// 답변 스트리밍 시작
    ///
    /// 반환된 스트림은 청크 사이마다 취소 토큰을 확인합니다.
    /// 중간 실패 시 재시도 없이 에러가 전파되어 스트림이 중단됩니다.
    pub async fn generate(
        &self,
        ctx: &PromptContext,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, LlmError> {
        let messages = build_messages(ctx);
        let mut inner = self.llm.stream(&messages).await?;

        Ok(Box::pin(async_stream::try_stream! {
            while let Some(chunk) = inner.next().await {
                if cancel.is_cancelled() {
                    tracing::debug!("답변 스트림 취소됨");
                    break;
                }
                let text = chunk?;
                yield text;
            }
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::llm::ChatRole;

    fn sample_context() -> PromptContext {
        PromptContext {
            context: "소득세법 제55조 (세율) ...".to_string(),
            history: vec![Turn::user("이전 질문"), Turn::assistant("이전 답변")],
            question: "거주자의 소득세 계산방법은?".to_string(),
        }
    }

    #[test]
    fn test_message_assembly_order() {
        let ctx = sample_context();
        let messages = build_messages(&ctx);

        // 시스템 + 예시*2 + 히스토리 2 + 질문 1
        assert_eq!(messages.len(), 1 + ANSWER_EXAMPLES.len() * 2 + 2 + 1);

        // 시스템 프롬프트에 검색 문맥이 삽입됨
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("소득세법 제55조"));
        assert!(!messages[0].content.contains("{context}"));

        // Few-shot 예시는 user/assistant 쌍
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, ANSWER_EXAMPLES[0].input);
        assert_eq!(messages[2].role, ChatRole::Assistant);

        // 마지막은 현재 질문
        let last = messages.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert_eq!(last.content, "거주자의 소득세 계산방법은?");
    }

    #[tokio::test]
    async fn test_generate_streams_chunks() {
        let llm = Arc::new(MockLlm::new().with_chunks(&["소득세법 ", "(제55조)에 ", "따르면"]));
        let generator = AnswerGenerator::new(llm);

        let stream = generator
            .generate(&sample_context(), CancellationToken::new())
            .await
            .unwrap();

        let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.join(""), "소득세법 (제55조)에 따르면");
    }

    #[tokio::test]
    async fn test_cancellation_ends_stream_early() {
        let llm = Arc::new(MockLlm::new().with_chunks(&["하나", "둘", "셋"]));
        let generator = AnswerGenerator::new(llm);

        let cancel = CancellationToken::new();
        let mut stream = generator
            .generate(&sample_context(), cancel.clone())
            .await
            .unwrap();

        // 첫 청크를 받은 뒤 취소
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, "하나");
        cancel.cancel();

        // 이후 청크 없이 스트림 종료
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_midstream_failure_propagates() {
        let llm = Arc::new(MockLlm::new().with_chunks(&["하나", "둘"]).failing_after(1));
        let generator = AnswerGenerator::new(llm);

        let mut stream = generator
            .generate(&sample_context(), CancellationToken::new())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
    }
}
