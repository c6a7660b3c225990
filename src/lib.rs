//! sodeukse-chat - 소득세법 RAG 챗봇
//!
//! 키워드 사전 정규화 → 히스토리 기반 재구성 → 벡터 검색 →
//! Few-shot 스트리밍 생성으로 이어지는 RAG 파이프라인과
//! 터미널 채팅 서피스입니다.

pub mod chat;
pub mod cli;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod surface;

// Re-exports
pub use chat::{
    AnswerGenerator, ChatPipeline, FewShotExample, HistoryContextualizer, PromptContext,
    QueryNormalizer, Role, SessionStore, Turn, ANSWER_EXAMPLES, KEYWORD_DICTIONARY, TOP_K,
};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding, EMBEDDING_DIMENSION};
pub use index::{format_fragments, PineconeIndex, RetrievedFragment, VectorIndex};
pub use llm::{
    get_api_key, has_api_key, ChatMessage, ChatRole, ChunkStream, LlmError, LlmProvider,
    OpenAiChat, DEFAULT_MODEL,
};
pub use surface::{ChatSurface, TerminalSurface};
