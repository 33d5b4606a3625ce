//! Static help tips keyed by lifecycle step and review stage.

use serde::Serialize;

use super::model::Step;
use super::stage::ReviewStage;

/// Guidance shown to a stuck planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HelpTip {
    pub title: &'static str,
    pub concept: &'static str,
    pub guide: &'static str,
}

const DESIGNER_TIP: HelpTip = HelpTip {
    title: "디자이너를 위한 기획",
    concept: "디자이너는 '데이터'보다 '화면'을 그립니다.",
    guide: "버튼의 위치, 텍스트 문구, 그리고 상태(활성/비활성)에 대해 묘사해주세요. 예: '장바구니 하단에 [쿠폰 적용] 버튼 노출'",
};

const DEVELOPER_TIP: HelpTip = HelpTip {
    title: "개발자를 위한 예외처리",
    concept: "Happy Path(성공 케이스)만 있는 기획서는 반쪽짜리입니다.",
    guide: "API가 실패하거나, 타임아웃이 발생했을 때 얼럿(Alert)을 띄울까요? 아니면 조용히 넘어갈까요? '예외' 항목을 추가하세요.",
};

const QA_TIP: HelpTip = HelpTip {
    title: "QA를 위한 인수 기준",
    concept: "기능이 완료되었다고 판단하는 기준(Acceptance Criteria)이 필요합니다.",
    guide: "예: '쿠폰이 있는 경우 -> 자동 적용', '쿠폰이 없는 경우 -> 버튼 비활성화' 처럼 케이스별 예상 결과를 명시하세요.",
};

const DECISION_TIP: HelpTip = HelpTip {
    title: "명확한 의사결정",
    concept: "개발자는 A안과 B안 중 하나를 확정해주길 원합니다.",
    guide: "버튼을 아예 숨길지(Hide), 흐리게 보여줄지(Disabled) 결정해서 알려주세요.",
};

/// Pick the tip for the current position. Pure and idempotent.
pub fn tip_for(step: Step, stage: ReviewStage) -> HelpTip {
    match (step, stage) {
        (Step::Task, ReviewStage::Designer) => DESIGNER_TIP,
        (Step::Task, ReviewStage::Developer) => DEVELOPER_TIP,
        (Step::Task, ReviewStage::Qa | ReviewStage::Done) => QA_TIP,
        _ => DECISION_TIP,
    }
}
