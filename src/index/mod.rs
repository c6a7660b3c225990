//! 벡터 인덱스 모듈 - 외부 관리형 인덱스 질의
//!
//! 소득세법 문서가 저장된 외부 벡터 인덱스(Pinecone)에
//! 유사도 검색을 위임합니다. 인덱스 구축/유지보수는 이 시스템의
//! 범위 밖이며, 순위도 인덱스가 반환한 그대로 사용합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::{EmbeddingProvider, OpenAiEmbedding};

// ============================================================================
// Types
// ============================================================================

/// 검색된 문서 조각
///
/// 인덱스가 반환한 텍스트 조각입니다. 요청 하나의 수명 동안만 사용됩니다.
#[derive(Debug, Clone)]
pub struct RetrievedFragment {
    /// 조각 텍스트
    pub text: String,
    /// 인덱스 유사도 스코어
    pub score: f32,
}

/// 프롬프트 조립용 조각 구분자
pub const FRAGMENT_SEPARATOR: &str = "\n\n---\n\n";

/// 검색된 조각들을 하나의 컨텍스트 문자열로 포맷팅
pub fn format_fragments(fragments: &[RetrievedFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 트레이트
///
/// 쿼리 텍스트로 상위 k개의 조각을 검색하는 인터페이스입니다.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 유사도 검색 (인덱스 순위 그대로, 최대 k개)
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedFragment>>;
}

// ============================================================================
// Pinecone Index
// ============================================================================

/// Pinecone 인덱스 클라이언트
///
/// 쿼리를 임베딩한 뒤 인덱스 호스트에 질의합니다.
/// source: https://docs.pinecone.io/reference/api/data-plane/query
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    host: String,
    embedder: OpenAiEmbedding,
}

impl PineconeIndex {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Pinecone API 키
    /// * `host` - 인덱스 호스트 URL (예: https://index-2-xxxx.svc.pinecone.io)
    pub fn new(api_key: String, host: String, embedder: OpenAiEmbedding) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self {
            client,
            api_key,
            host,
            embedder,
        })
    }

    /// 환경변수에서 설정을 읽어 생성
    ///
    /// `PINECONE_API_KEY`, `PINECONE_INDEX_HOST`가 필요합니다.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .context("PINECONE_API_KEY 환경변수가 설정되지 않았습니다")?;
        let host = std::env::var("PINECONE_INDEX_HOST")
            .context("PINECONE_INDEX_HOST 환경변수가 설정되지 않았습니다")?;
        let embedder = OpenAiEmbedding::from_env()?;

        Self::new(api_key, host, embedder)
    }
}

/// Pinecone query 요청 본문
#[derive(Debug, Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

/// Pinecone query 응답
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

/// 인덱스 구축 시 문서 본문은 metadata.text에 저장됨
#[derive(Debug, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedFragment>> {
        // 1. 쿼리 임베딩
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("쿼리 임베딩 실패")?;

        // 2. 인덱스 질의
        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
        };

        let url = format!("{}/query", self.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("벡터 인덱스 질의 실패")?;

        let status = response.status();
        let body = response.text().await.context("인덱스 응답 읽기 실패")?;

        if !status.is_success() {
            anyhow::bail!("벡터 인덱스 에러 ({}): {}", status, body);
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).context("인덱스 응답 파싱 실패")?;

        // 3. 인덱스 순위 그대로 변환 (재정렬 없음)
        let fragments = parsed
            .matches
            .into_iter()
            .filter_map(|m| {
                let score = m.score;
                m.metadata
                    .and_then(|meta| meta.text)
                    .map(|text| RetrievedFragment { text, score })
            })
            .collect();

        Ok(fragments)
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
