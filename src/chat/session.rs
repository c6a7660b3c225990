//! 세션 저장소 - 세션별 대화 기록
//!
//! 세션 식별자 → 턴 시퀀스 매핑입니다. 첫 참조 시 빈 세션이
//! 생성되며, 프로세스 재시작 시 유지되지 않습니다.
//!
//! 용량 제한을 두고 가장 오래 사용되지 않은 세션을 제거합니다.
//! (무제한 증가는 리소스 누수이므로 상한을 둡니다.)

use std::collections::HashMap;

// ============================================================================
// Types
// ============================================================================

/// 턴 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// 대화 턴 (생성 후 불변)
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// 기본 세션 용량
pub const DEFAULT_SESSION_CAPACITY: usize = 64;

struct SessionEntry {
    turns: Vec<Turn>,
    /// LRU 제거용 논리 시계 값
    last_used: u64,
}

/// 세션 저장소
///
/// 턴은 삽입 순서를 엄격히 유지하며, 재정렬/중복 제거하지 않습니다.
/// 하나의 논리 세션은 한 인터랙션 루프 안에서 순차적으로만 접근됩니다.
pub struct SessionStore {
    sessions: HashMap<String, SessionEntry>,
    capacity: usize,
    clock: u64,
}

impl SessionStore {
    /// 기본 용량으로 생성
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }

    /// 용량을 지정하여 생성
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// 세션 대화 기록 조회
    ///
    /// 존재하지 않는 세션은 빈 기록으로 생성됩니다 (에러 아님).
    pub fn history(&mut self, session_id: &str) -> &[Turn] {
        self.touch(session_id);
        &self.sessions[session_id].turns
    }

    /// 세션에 턴 추가 (append-only)
    pub fn append(&mut self, session_id: &str, turn: Turn) {
        self.touch(session_id);
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.turns.push(turn);
        }
    }

    /// 세션 개수
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 세션 존재 여부 (생성하지 않음)
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// 세션을 최신으로 표시하고, 없으면 생성
    ///
    /// 용량 초과 시 가장 오래 사용되지 않은 세션을 제거합니다.
    fn touch(&mut self, session_id: &str) {
        self.clock += 1;
        let clock = self.clock;

        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.last_used = clock;
            return;
        }

        // 신규 세션 생성 전 용량 확보
        if self.sessions.len() >= self.capacity {
            if let Some(oldest) = self
                .sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone())
            {
                tracing::debug!("세션 용량 초과, 제거: {}", oldest);
                self.sessions.remove(&oldest);
            }
        }

        self.sessions.insert(
            session_id.to_string(),
            SessionEntry {
                turns: Vec::new(),
                last_used: clock,
            },
        );
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
