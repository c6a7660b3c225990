//! 대화 히스토리 기반 질문 재구성
//!
//! "그럼 비거주자는?"처럼 이전 대화를 참조하는 질문을
//! 히스토리 없이도 이해할 수 있는 독립 질문으로 재구성합니다.
//! 히스토리가 비어 있으면 모델 호출 없이 질문을 그대로 반환합니다.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::llm::{ChatMessage, LlmProvider};

use super::session::{Role, Turn};

/// 재구성 시스템 프롬프트
const CONTEXTUALIZE_SYSTEM_PROMPT: &str =
    "이전 대화 기록과 가장 최근에 입력된 사용자 질문이 주어집니다. \
     이 질문은 대화 기록의 맥락을 참조할 수 있습니다. \
     대화 기록 없이도 이해할 수 있는 독립적인 질문으로 만들어주세요. \
     질문에 답변하지 말고, 필요한 경우에만 질문을 재구성하고 \
     필요하지 않으면 원래 질문을 그대로 반환하세요.";

/// 히스토리 재구성기
pub struct HistoryContextualizer {
    llm: Arc<dyn LlmProvider>,
}

impl HistoryContextualizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// 질문을 독립형으로 재구성
    ///
    /// 히스토리가 비어 있으면 불필요한 모델 호출을 피하고
    /// 질문을 변경 없이 반환합니다. 단발성 호출이며
    /// 재시도/자가수정 루프는 없습니다.
    pub async fn contextualize(&self, question: &str, history: &[Turn]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let messages = build_messages(question, history);

        let standalone = self
            .llm
            .complete(&messages)
            .await
            .context("질문 재구성 실패")?;

        tracing::debug!("질문 재구성: {} -> {}", question, standalone);

        Ok(standalone)
    }
}

/// 시스템 프롬프트 + 히스토리 + 현재 질문 순서로 메시지 구성
fn build_messages(question: &str, history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(CONTEXTUALIZE_SYSTEM_PROMPT));

    for turn in history {
        messages.push(match turn.role {
            Role::User => ChatMessage::user(&turn.content),
            Role::Assistant => ChatMessage::assistant(&turn.content),
        });
    }

    messages.push(ChatMessage::user(question));
    messages
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::llm::ChatRole;

    #[tokio::test]
    async fn test_empty_history_short_circuits() {
        let llm = Arc::new(MockLlm::new());
        let contextualizer = HistoryContextualizer::new(llm.clone());

        let result = contextualizer
            .contextualize("거주자의 소득세 계산방법은?", &[])
            .await
            .unwrap();

        assert_eq!(result, "거주자의 소득세 계산방법은?");
        // 모델 호출이 없어야 함
        assert_eq!(llm.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_rewrites_with_history() {
        let llm = Arc::new(MockLlm::new().with_reply("비거주자의 소득세 계산방법은?"));
        let contextualizer = HistoryContextualizer::new(llm.clone());

        let history = vec![
            Turn::user("거주자의 소득세 계산방법은?"),
            Turn::assistant("소득세법 (제55조)에 따르면 ..."),
        ];

        let result = contextualizer
            .contextualize("그럼 비거주자는?", &history)
            .await
            .unwrap();

        assert_eq!(result, "비거주자의 소득세 계산방법은?");
        assert_eq!(llm.complete_calls(), 1);
    }

    #[test]
    fn test_message_order() {
        let history = vec![Turn::user("질문1"), Turn::assistant("답변1")];
        let messages = build_messages("질문2", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "질문1");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[3].content, "질문2");
    }
}
