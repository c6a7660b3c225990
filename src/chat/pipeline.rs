//! 파이프라인 오케스트레이션
//!
//! 정규화 → (히스토리 유무에 따라) 재구성 → 검색 → 생성 순서로
//! 단계를 연결하고, 세션 식별자를 따라 대화 기록을 읽고 씁니다.
//!
//! 사용자 턴은 생성 시작 전에 기록되고, 어시스턴트 턴은 스트림이
//! 성공적으로 끝난 뒤 `record_answer`로만 기록됩니다. 따라서 생성
//! 중 실패하면 사용자 턴만 남습니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::index::{format_fragments, VectorIndex};
use crate::llm::{ChunkStream, LlmProvider};

use super::contextualize::HistoryContextualizer;
use super::generate::{AnswerGenerator, PromptContext};
use super::normalize::QueryNormalizer;
use super::session::{SessionStore, Turn};

/// 검색 조각 수 (고정)
pub const TOP_K: usize = 3;

/// 채팅 파이프라인
pub struct ChatPipeline {
    normalizer: QueryNormalizer,
    contextualizer: HistoryContextualizer,
    generator: AnswerGenerator,
    index: Arc<dyn VectorIndex>,
    sessions: SessionStore,
}

impl ChatPipeline {
    /// 새 파이프라인 생성
    pub fn new(llm: Arc<dyn LlmProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            normalizer: QueryNormalizer::new(llm.clone()),
            contextualizer: HistoryContextualizer::new(llm.clone()),
            generator: AnswerGenerator::new(llm),
            index,
            sessions: SessionStore::new(),
        }
    }

    /// 질문 처리 후 답변 스트림 반환
    ///
    /// 1. 키워드 사전으로 질문 정규화
    /// 2. 히스토리가 있으면 독립형 질문으로 재구성 (없으면 그대로)
    /// 3. 재구성된 질문으로 상위 3개 조각 검색
    /// 4. 프롬프트 조립 후 스트리밍 생성 시작
    ///
    /// 사용자 턴(정규화된 질문)은 스트림 반환 전에 기록됩니다.
    pub async fn ask(
        &mut self,
        session_id: &str,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        // 1. 질문 정규화
        let normalized = self.normalizer.normalize(question).await?;

        // 2. 이전 턴 스냅샷 (현재 질문 기록 전)
        let history = self.sessions.history(session_id).to_vec();

        // 사용자 턴 기록 - 이후 단계가 실패해도 질문은 남음
        self.sessions.append(session_id, Turn::user(normalized.clone()));

        // 3. 히스토리 기반 재구성 (빈 히스토리는 단락)
        let standalone = self
            .contextualizer
            .contextualize(&normalized, &history)
            .await?;

        // 4. 벡터 검색 - 재구성된 질문 사용
        let fragments = self
            .index
            .search(&standalone, TOP_K)
            .await
            .context("문서 검색 실패")?;

        tracing::info!(
            "검색 완료: {} 조각 (세션: {}, 질문: {})",
            fragments.len(),
            session_id,
            standalone
        );

        // 5. 프롬프트 조립 및 생성 시작
        let prompt_ctx = PromptContext {
            context: format_fragments(&fragments),
            history,
            question: standalone,
        };

        let stream = self.generator.generate(&prompt_ctx, cancel).await?;

        Ok(stream)
    }

    /// 완성된 답변을 어시스턴트 턴으로 기록
    ///
    /// 스트림이 끝까지 소진된 뒤에만 호출해야 합니다.
    pub fn record_answer(&mut self, session_id: &str, answer: impl Into<String>) {
        self.sessions.append(session_id, Turn::assistant(answer));
    }

    /// 세션 대화 기록 조회
    pub fn history(&mut self, session_id: &str) -> &[Turn] {
        self.sessions.history(session_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
