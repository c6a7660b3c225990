//! 임베딩 모듈 - OpenAI API를 통한 텍스트 벡터화
//!
//! 검색 쿼리를 벡터로 변환하는 임베딩 프로바이더입니다.
//! 벡터 인덱스 질의 전에 한 번 호출됩니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_env()?;
//! let embedding = embedder.embed("거주자의 소득세는?").await?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::get_api_key;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/embeddings
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// 임베딩 모델 (벡터 인덱스 구축 시 사용한 모델과 일치해야 함)
const EMBED_MODEL: &str = "text-embedding-3-large";

/// text-embedding-3-large 기본 차원
pub const EMBEDDING_DIMENSION: usize = 3072;

/// OpenAI 임베딩 구현체
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbedding {
    /// 새 인스턴스 생성
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self { api_key, client })
    }

    /// 환경변수(OPENAI_API_KEY)에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }
}

/// 임베딩 API 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// 임베딩 API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트는 API 호출 없이 영벡터 반환
        if text.trim().is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIMENSION]);
        }

        let request = EmbedRequest {
            model: EMBED_MODEL,
            input: text,
        };

        let response = self
            .client
            .post(OPENAI_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("임베딩 요청 전송 실패")?;

        let status = response.status();
        let body = response.text().await.context("임베딩 응답 읽기 실패")?;

        if !status.is_success() {
            anyhow::bail!("임베딩 API 에러 ({}): {}", status, body);
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).context("임베딩 응답 파싱 실패")?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("임베딩 응답에 데이터가 없습니다"))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn name(&self) -> &str {
        EMBED_MODEL
    }
}

// ============================================================================
// Tests
// ============================================================================
