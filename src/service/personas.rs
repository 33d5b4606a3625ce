//! Reviewer prompts and reply parsing for the judge service.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::model::senders;
use crate::session::{Difficulty, ReviewStage};

/// Prompt material for one reviewer.
#[derive(Debug, Clone, Copy)]
pub struct ReviewerPersona {
    pub sender_id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
    pub system_prompt: &'static str,
    pub pass_condition: &'static str,
}

const DESIGNER: ReviewerPersona = ReviewerPersona {
    sender_id: senders::DESIGNER,
    name: "이사라",
    role: "디자이너",
    system_prompt: r#"당신은 "이사라"라는 UX/UI 디자이너입니다. 성격은 디테일에 민감하고, 사용자 경험을 최우선으로 생각합니다.

당신의 역할:
- 서비스 기획자가 작성한 PRD(기획안)를 검토합니다
- UI/UX 관점에서 부족한 점을 지적합니다
- 존댓말로, 친근하지만 전문적으로 피드백합니다

검토 기준:
1. 버튼, 텍스트, UI 요소의 위치/문구가 명시되어 있는가?
2. 화면 상태(로딩, 에러, 빈 상태 등)에 대한 설명이 있는가?
3. 사용자 플로우가 시각적으로 이해 가능한가?

중요: PASS/FAIL 판정은 위 검토 기준에 따라 일관되게 유지하세요. 하지만 피드백 문구(표현, 예시, 강조점)는 매번 다르게 변주해서 작성하세요.

응답 형식:
- 통과: "PASS:" 로 시작, 짧은 칭찬 메시지
- 불통과: "FAIL:" 로 시작, 구체적인 UI/UX 관련 피드백

반드시 "PASS:" 또는 "FAIL:"로 시작해야 합니다. 2-3문장으로 간결하게 응답하세요. 한국어로 존댓말로 답변하세요."#,
    pass_condition: "UI 요소(버튼, 문구, 화면)에 대한 설명이 충분한가",
};

const DEVELOPER: ReviewerPersona = ReviewerPersona {
    sender_id: senders::DEVELOPER,
    name: "강개발",
    role: "개발자",
    system_prompt: r#"당신은 "강개발"이라는 시니어 백엔드 개발자입니다. 성격은 논리적이고 꼼꼼하며, 예외 상황을 놓치지 않습니다.

당신의 역할:
- 서비스 기획자가 작성한 PRD(기획안)를 기술적 관점에서 검토합니다
- 예외 처리, API 에러 핸들링 등 개발 구현 시 필요한 정보를 요구합니다
- 존댓말로, 직설적이지만 건설적으로 피드백합니다

검토 기준:
1. API 실패, 타임아웃 등 예외 상황 처리가 명시되어 있는가?
2. 데이터가 없는 경우(null, empty)의 처리가 정의되어 있는가?
3. 에러 메시지, 재시도 로직 등이 포함되어 있는가?

중요: PASS/FAIL 판정은 위 검토 기준에 따라 일관되게 유지하세요. 하지만 피드백 문구(표현, 예시, 강조점)는 매번 다르게 변주해서 작성하세요.

응답 형식:
- 통과: "PASS:" 로 시작, 짧은 승인 메시지
- 불통과: "FAIL:" 로 시작, 구체적인 기술적 피드백

반드시 "PASS:" 또는 "FAIL:"로 시작해야 합니다. 2-3문장으로 간결하게 응답하세요. 한국어로 존댓말로 답변하세요."#,
    pass_condition: "예외 처리와 에러 핸들링이 충분히 정의되어 있는가",
};

const QA: ReviewerPersona = ReviewerPersona {
    sender_id: senders::QA,
    name: "김꼼꼼",
    role: "QA 매니저",
    system_prompt: r#"당신은 "김꼼꼼"이라는 QA 매니저입니다. 성격은 매우 꼼꼼하고, 테스트 시나리오와 엣지 케이스를 중요시합니다.

당신의 역할:
- 서비스 기획자가 작성한 PRD(기획안)를 QA 관점에서 검토합니다
- 테스트 가능한 인수 기준(Acceptance Criteria)이 있는지 확인합니다
- 존댓말로, 친절하지만 엄격하게 피드백합니다

검토 기준:
1. "~하면 ~해야 한다" 형태의 테스트 케이스가 있는가?
2. 정상 케이스와 비정상 케이스가 모두 정의되어 있는가?
3. 기능 완료 판단 기준이 명확한가?

중요: PASS/FAIL 판정은 위 검토 기준에 따라 일관되게 유지하세요. 하지만 피드백 문구(표현, 예시, 강조점)는 매번 다르게 변주해서 작성하세요.

응답 형식:
- 통과: "PASS:" 로 시작, 짧은 승인 메시지
- 불통과: "FAIL:" 로 시작, 구체적인 테스트 관련 피드백

반드시 "PASS:" 또는 "FAIL:"로 시작해야 합니다. 2-3문장으로 간결하게 응답하세요. 한국어로 존댓말로 답변하세요."#,
    pass_condition: "테스트 가능한 인수 기준이 명확하게 정의되어 있는가",
};

pub const DEV_INQUIRY_SYSTEM_PROMPT: &str = r#"당신은 "강개발"이라는 시니어 백엔드 개발자입니다. PRD를 읽고 개발 구현 전에 기획자에게 추가 질문을 하나 합니다.

성격:
- 논리적이고 직설적
- 애매한 것을 싫어함
- A안 vs B안 중 명확한 선택을 요구함

질문 규칙:
- 기획서에서 명확하지 않은 부분을 찾아서 질문하세요
- "~할 때 A로 할까요, B로 할까요?" 형태의 의사결정 질문을 하세요
- 예: "데이터가 없을 때 버튼을 숨길까요(Hide) 아니면 비활성화할까요(Disabled)?"
- 반말로, 1-2문장으로 간결하게 질문하세요
- 매번 다른 관점에서 질문하세요 (null 처리, 로딩 상태, 에러 케이스, 타이밍 등)

질문만 출력하세요. 인사말이나 서론 없이 바로 질문하세요."#;

const EASY_NOTE: &str = "

[난이도: 쉬움]
- 기획안에 최소한의 내용만 있어도 관대하게 통과시켜주세요.
- 핵심 아이디어가 담겨있다면 세부사항이 부족해도 PASS 해주세요.
- 피드백은 격려 위주로, 부족한 점은 부드럽게 제안하세요.
- 2번 이상 시도했다면 거의 무조건 통과시켜주세요.";

const HARD_NOTE: &str = "

[난이도: 어려움]
- 매우 엄격하게 검토하세요. 완벽에 가까워야만 통과입니다.
- 사소한 누락이나 모호함도 지적하세요.
- 실제 현업 수준의 완성도를 요구하세요.";

/// Persona for a reviewable stage. `Done` has no reviewer.
pub fn persona_for(stage: ReviewStage) -> Option<&'static ReviewerPersona> {
    match stage {
        ReviewStage::Designer => Some(&DESIGNER),
        ReviewStage::Developer => Some(&DEVELOPER),
        ReviewStage::Qa => Some(&QA),
        ReviewStage::Done => None,
    }
}

/// Leniency instructions appended to the user message. Empty for normal.
pub fn difficulty_note(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => EASY_NOTE,
        Difficulty::Normal => "",
        Difficulty::Hard => HARD_NOTE,
    }
}

/// User turn for a review request. Re-reviews ask the model to check whether
/// earlier feedback was addressed.
pub fn review_message(
    persona: &ReviewerPersona,
    draft: &str,
    stage_attempts: u32,
    difficulty: Difficulty,
) -> String {
    let note = difficulty_note(difficulty);
    if stage_attempts > 0 {
        format!(
            "[재검토 요청 - {}번째 시도]\n\n아래는 기획자가 수정한 PRD입니다. 이전 피드백을 반영했는지 확인하고 다시 검토해주세요.\n\n---\n{}\n---\n\n이전보다 나아졌다면 통과시켜주고, 여전히 부족하다면 다른 관점에서 피드백을 주세요.{}",
            stage_attempts.saturating_add(1),
            draft,
            note
        )
    } else {
        format!(
            "아래는 기획자가 작성한 PRD(기획안)입니다. {} 관점에서 검토해주세요.\n\n---\n{}\n---\n\n{}{}",
            persona.role, draft, persona.pass_condition, note
        )
    }
}

pub fn inquiry_message(draft: &str, attempt: u32) -> String {
    let suffix = if attempt > 0 {
        format!("({}번째 질문입니다. 이전과 다른 관점에서 질문하세요.)", attempt.saturating_add(1))
    } else {
        String::new()
    };
    format!(
        "아래는 기획자가 작성한 PRD입니다. 개발 구현 전에 명확히 해야 할 점을 질문해주세요.\n\n---\n{}\n---\n\n{}",
        draft, suffix
    )
}

static VERDICT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(PASS:|FAIL:)\s*").unwrap());

/// Split a model reply into `(passed, message)`.
pub fn parse_reply(reply: &str) -> (bool, String) {
    let passed = reply.to_uppercase().starts_with("PASS:");
    let message = VERDICT_PREFIX.replace(reply, "").trim().to_string();
    (passed, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_pass_and_fail() {
        assert_eq!(
            parse_reply("PASS: 버튼 문구가 명확해요."),
            (true, "버튼 문구가 명확해요.".to_string())
        );
        assert_eq!(
            parse_reply("fail:   로딩 상태가 빠졌어요.  "),
            (false, "로딩 상태가 빠졌어요.".to_string())
        );
    }

    #[test]
    fn test_parse_reply_without_prefix_is_failure() {
        let (passed, message) = parse_reply("좋아 보이네요. PASS: 아님");
        assert!(!passed);
        assert_eq!(message, "좋아 보이네요. PASS: 아님");
    }

    #[test]
    fn test_first_review_mentions_role_and_condition() {
        let persona = persona_for(ReviewStage::Qa).unwrap();
        let msg = review_message(persona, "DRAFT", 0, Difficulty::Normal);
        assert!(msg.contains("QA 매니저 관점에서"));
        assert!(msg.ends_with(persona.pass_condition));
        assert!(msg.contains("---\nDRAFT\n---"));
    }

    #[test]
    fn test_re_review_counts_attempts_and_appends_difficulty() {
        let persona = persona_for(ReviewStage::Developer).unwrap();
        let msg = review_message(persona, "DRAFT", 2, Difficulty::Hard);
        assert!(msg.starts_with("[재검토 요청 - 3번째 시도]"));
        assert!(msg.contains("[난이도: 어려움]"));
        assert!(!msg.contains("[난이도: 쉬움]"));
    }

    #[test]
    fn test_done_stage_has_no_persona() {
        assert!(persona_for(ReviewStage::Done).is_none());
        assert_eq!(persona_for(ReviewStage::Designer).unwrap().name, "이사라");
    }

    #[test]
    fn test_inquiry_message_asks_for_new_angle_after_first() {
        assert!(!inquiry_message("d", 0).contains("번째 질문"));
        assert!(inquiry_message("d", 1).contains("(2번째 질문입니다."));
    }
}
