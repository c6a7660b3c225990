//! 채팅 도메인 모듈
//!
//! 세션 기록, 질문 정규화/재구성, 프롬프트 조립, 답변 스트리밍과
//! 이를 연결하는 파이프라인 오케스트레이션을 포함합니다.

pub mod contextualize;
pub mod examples;
pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod session;

pub use contextualize::HistoryContextualizer;
pub use examples::{format_dictionary, FewShotExample, ANSWER_EXAMPLES, KEYWORD_DICTIONARY};
pub use generate::{AnswerGenerator, PromptContext};
pub use normalize::QueryNormalizer;
pub use pipeline::{ChatPipeline, TOP_K};
pub use session::{Role, SessionStore, Turn, DEFAULT_SESSION_CAPACITY};
