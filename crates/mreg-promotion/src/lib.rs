mod promoter;
mod selector;
mod types;
mod workflow;

pub use promoter::promote;
pub use selector::{find_latest, select_best};
pub use types::{
    write_promotion_report_json, Direction, PromotionError, PromotionOutcome, PromotionReport,
    PromotionTarget, Selection, SelectionCriterion, DEFAULT_LINK_ALIAS, DEFAULT_METRIC,
    STAGE_BEST_ALIASES,
};
pub use workflow::{latest_model_name, link_latest_model, link_model, stage_best_model, StagedBest};
