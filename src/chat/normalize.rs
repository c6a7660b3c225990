//! 질문 정규화 - 키워드 사전 기반 재작성
//!
//! 사용자 질문의 일상 표현을 소득세법 용어로 바꿉니다.
//! 단순 문자열 치환 대신 LLM 완성 호출 한 번으로 문맥을 보고
//! 적용하므로, 사전이 열거하지 못한 변형 표현도 처리됩니다.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::llm::{ChatMessage, LlmProvider};

use super::examples::format_dictionary;

/// 질문 정규화기
pub struct QueryNormalizer {
    llm: Arc<dyn LlmProvider>,
}

impl QueryNormalizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// 키워드 사전을 참고하여 질문 재작성
    ///
    /// 변경할 필요가 없으면 질문이 그대로 반환됩니다.
    /// LLM 호출 실패는 그대로 전파됩니다 (로컬 폴백 없음).
    pub async fn normalize(&self, question: &str) -> Result<String> {
        let prompt = format!(
            "사용자의 질문을 보고, 키워드 사전을 참고해서 사용자의 질문을 변경해주세요. \
             만약 변경할 필요가 없다고 판단된다면, 사용자의 질문을 변경하지 않아도 됩니다. \
             그런 경우에는 질문만 리턴해주세요.\n\
             사전: {}\n\
             사용자의 질문: {}",
            format_dictionary(),
            question
        );

        let rewritten = self
            .llm
            .complete(&[ChatMessage::user(prompt)])
            .await
            .context("질문 정규화 실패")?;

        tracing::debug!("질문 정규화: {} -> {}", question, rewritten);

        Ok(rewritten)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;

    #[tokio::test]
    async fn test_normalize_applies_dictionary() {
        let llm = Arc::new(MockLlm::new().with_reply("거주자의 소득세는 얼마인가요?"));
        let normalizer = QueryNormalizer::new(llm.clone());

        let result = normalizer
            .normalize("직장인의 소득세는 얼마인가요?")
            .await
            .unwrap();

        assert_eq!(result, "거주자의 소득세는 얼마인가요?");
        assert_eq!(llm.complete_calls(), 1);
    }

    #[tokio::test]
    async fn test_normalize_passes_through_canonical_input() {
        // MockLlm은 준비된 응답이 없으면 user 메시지를 그대로 반환하지만,
        // 프롬프트 전체가 아닌 정규화 결과만 확인하기 위해 명시적 응답 사용
        let llm = Arc::new(MockLlm::new().with_reply("거주자의 소득세는?"));
        let normalizer = QueryNormalizer::new(llm);

        let result = normalizer.normalize("거주자의 소득세는?").await.unwrap();
        assert_eq!(result, "거주자의 소득세는?");
    }
}
