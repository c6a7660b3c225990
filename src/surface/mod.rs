//! 채팅 서피스 - 인터랙티브 입출력
//!
//! 파이프라인이 소비하는 표시/입력 프리미티브입니다.
//! 터미널 구현체는 메시지를 역할 라벨과 함께 출력하고
//! 답변 청크를 도착하는 대로 렌더링합니다.

use std::io::Write as _;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::chat::session::{Role, Turn};
use crate::llm::ChunkStream;

// ============================================================================
// ChatSurface Trait
// ============================================================================

/// 채팅 서피스 트레이트
#[async_trait]
pub trait ChatSurface: Send {
    /// 기존 대화 기록 출력
    fn render_history(&mut self, turns: &[Turn]);

    /// 사용자 입력 읽기 (EOF 시 None)
    async fn read_input(&mut self) -> Option<String>;

    /// 완성된 메시지 출력
    fn render_message(&mut self, role: Role, content: &str);

    /// 답변 스트림을 점진적으로 렌더링하고 최종 텍스트 반환
    ///
    /// 스트림 중간 실패 시 지금까지의 출력은 화면에 남고
    /// 에러가 반환됩니다.
    async fn render_stream(&mut self, stream: ChunkStream) -> Result<String>;
}

// ============================================================================
// TerminalSurface
// ============================================================================

/// 터미널 서피스 구현체
pub struct TerminalSurface {
    stdin: Lines<BufReader<Stdin>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            stdin: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "[질문]",
        Role::Assistant => "[답변]",
    }
}

#[async_trait]
impl ChatSurface for TerminalSurface {
    fn render_history(&mut self, turns: &[Turn]) {
        for turn in turns {
            self.render_message(turn.role, &turn.content);
        }
    }

    async fn read_input(&mut self) -> Option<String> {
        print!("질문을 입력하세요 > ");
        let _ = std::io::stdout().flush();

        match self.stdin.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            _ => None,
        }
    }

    fn render_message(&mut self, role: Role, content: &str) {
        println!("{} {}", role_label(role), content);
        println!();
    }

    async fn render_stream(&mut self, mut stream: ChunkStream) -> Result<String> {
        print!("{} ", role_label(Role::Assistant));
        let _ = std::io::stdout().flush();

        let mut answer = String::new();

        while let Some(chunk) = stream.next().await {
            let text = chunk.context("답변 생성 중 오류가 발생했습니다")?;
            print!("{}", text);
            let _ = std::io::stdout().flush();
            answer.push_str(&text);
        }

        println!();
        println!();

        Ok(answer)
    }
}

// ============================================================================
// Tests
// ============================================================================
