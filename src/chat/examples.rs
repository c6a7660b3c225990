//! 정적 설정 - Few-shot 예시 및 키워드 사전
//!
//! 프로세스 시작 시 한 번 로드되는 고정 테이블입니다.
//! Few-shot 예시는 답변 형식과 톤(조문 인용으로 시작)을 잡아주고,
//! 키워드 사전은 일상 표현을 소득세법 용어로 정규화합니다.

/// Few-shot 예시 (질문/답변 쌍)
#[derive(Debug, Clone, Copy)]
pub struct FewShotExample {
    pub input: &'static str,
    pub answer: &'static str,
}

/// 답변 예시 테이블
///
/// 모든 답변은 "소득세법 (제XX조)에 따르면"으로 시작하여
/// 근거 조문을 인용합니다.
pub const ANSWER_EXAMPLES: &[FewShotExample] = &[
    FewShotExample {
        input: "연봉 5천만원인 직장인의 소득세는 얼마인가요?",
        answer: "소득세법 (제55조)에 따르면 연봉 5천만원인 거주자의 종합소득 과세표준에는 \
                 기본세율이 적용됩니다. 과세표준 5,000만원 이하 구간의 세율은 \
                 624만원 + (1,400만원을 초과하는 금액의 15%)로 계산되며, \
                 각종 공제를 제외한 단순 계산 시 산출세액은 약 624만원입니다. \
                 실제 납부세액은 근로소득공제, 인적공제 등에 따라 달라질 수 있습니다.",
    },
    FewShotExample {
        input: "소득세법에서 거주자는 어떻게 정의되나요?",
        answer: "소득세법 (제1조의2)에 따르면 거주자란 국내에 주소를 두거나 \
                 183일 이상의 거소(居所)를 둔 개인을 말합니다. \
                 거주자는 국내외 모든 소득에 대해 납세의무를 지며, \
                 거주자가 아닌 개인은 비거주자로서 국내원천소득에 대해서만 과세됩니다.",
    },
    FewShotExample {
        input: "비거주자도 소득세를 내야 하나요?",
        answer: "소득세법 (제2조)에 따르면 비거주자는 국내원천소득이 있는 경우에만 \
                 소득세를 납부할 의무를 집니다. 즉, 국내에서 발생한 이자, 배당, \
                 사업소득, 근로소득 등에 대해서만 과세되며, \
                 국외원천소득에 대해서는 납세의무가 없습니다.",
    },
];

/// 키워드 사전 (패턴 -> 표준 용어)
///
/// 정확한 문자열 치환이 아니라 LLM이 문맥을 보고 적용합니다.
/// 사전에 없는 패러프레이즈 변형도 처리하기 위한 의도적 선택입니다.
pub const KEYWORD_DICTIONARY: &[(&str, &str)] = &[("사람을 나타내는 표현", "거주자")];

/// 사전을 프롬프트 삽입용 문자열로 포맷팅
pub fn format_dictionary() -> String {
    KEYWORD_DICTIONARY
        .iter()
        .map(|(pattern, term)| format!("{} -> {}", pattern, term))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
