//! CLI 모듈
//!
//! sodeukse-chat 명령어 정의 및 구현

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::chat::ChatPipeline;
use crate::index::PineconeIndex;
use crate::llm::{has_api_key, OpenAiChat, DEFAULT_MODEL};
use crate::surface::{ChatSurface, TerminalSurface};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "sodeukse-chat")]
#[command(version, about = "소득세법 RAG 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 대화형 챗봇 시작
    Chat {
        /// LLM 모델 식별자
        #[arg(short, long)]
        model: Option<String>,
    },

    /// 단일 질문 후 종료
    Ask {
        /// 질문
        question: String,

        /// LLM 모델 식별자
        #[arg(short, long)]
        model: Option<String>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat { model } => cmd_chat(model).await,
        Commands::Ask { question, model } => cmd_ask(&question, model).await,
        Commands::Status => cmd_status(),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 파이프라인 초기화 (환경변수 확인 포함)
fn build_pipeline(model: Option<String>) -> Result<ChatPipeline> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export OPENAI_API_KEY=your-api-key"
        );
    }

    let llm = Arc::new(OpenAiChat::from_env(model).context("LLM 클라이언트 초기화 실패")?);
    let index = Arc::new(PineconeIndex::from_env().context("벡터 인덱스 초기화 실패")?);

    Ok(ChatPipeline::new(llm, index))
}

/// 종료 명령 여부
fn is_exit_command(input: &str) -> bool {
    matches!(input, "exit" | "quit" | "종료")
}

/// 대화형 챗봇 (chat)
async fn cmd_chat(model: Option<String>) -> Result<()> {
    let mut pipeline = build_pipeline(model)?;
    let mut surface = TerminalSurface::new();

    // 세션 식별자는 실행마다 새로 생성 (고정 리터럴 공유 금지)
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!("세션 시작: {}", session_id);

    println!("소득세 챗봇");
    println!("소득세 관련 질문을 해보세요. (종료: exit)");
    println!();

    // 기존 채팅 기록 출력 (재시작 시에는 항상 비어 있음)
    let history = pipeline.history(&session_id).to_vec();
    surface.render_history(&history);

    loop {
        let Some(input) = surface.read_input().await else {
            break;
        };

        // 빈 입력은 제출하지 않음 (턴이 생성되지 않음)
        if input.is_empty() {
            continue;
        }

        if is_exit_command(&input) {
            break;
        }

        println!("[*] 답변을 준비하는 중입니다...");

        let stream = match pipeline
            .ask(&session_id, &input, CancellationToken::new())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                println!("[!] 오류: {:#}", e);
                println!();
                continue;
            }
        };

        match surface.render_stream(stream).await {
            Ok(answer) => pipeline.record_answer(&session_id, answer),
            Err(e) => {
                // 답변 턴은 기록하지 않음 - 질문 턴만 남음
                println!("[!] 오류: {:#}", e);
                println!();
            }
        }
    }

    println!("챗봇을 종료합니다.");
    Ok(())
}

/// 단일 질문 (ask)
async fn cmd_ask(question: &str, model: Option<String>) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("질문이 비어 있습니다");
    }

    let mut pipeline = build_pipeline(model)?;
    let mut surface = TerminalSurface::new();

    let session_id = uuid::Uuid::new_v4().to_string();

    println!("[*] 답변을 준비하는 중입니다...");

    let stream = pipeline
        .ask(&session_id, question, CancellationToken::new())
        .await?;

    let answer = surface.render_stream(stream).await?;
    pipeline.record_answer(&session_id, answer);

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status() -> Result<()> {
    println!("sodeukse-chat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // LLM API 키
    if has_api_key() {
        println!("[OK] OPENAI_API_KEY: 설정됨");
    } else {
        println!("[!] OPENAI_API_KEY: 미설정");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    // 벡터 인덱스 설정
    for var in ["PINECONE_API_KEY", "PINECONE_INDEX_HOST"] {
        match std::env::var(var) {
            Ok(v) if !v.is_empty() => println!("[OK] {}: 설정됨", var),
            _ => {
                println!("[!] {}: 미설정", var);
                println!("    설정: export {}=...", var);
            }
        }
    }

    println!();
    println!("[*] 기본 모델: {}", DEFAULT_MODEL);
    println!("[*] 검색 조각 수: {}", crate::chat::TOP_K);
    println!("[*] Few-shot 예시: {} 건", crate::chat::ANSWER_EXAMPLES.len());
    println!("[*] 키워드 사전: {} 건", crate::chat::KEYWORD_DICTIONARY.len());

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
