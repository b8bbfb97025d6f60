pub mod flags;
pub mod overlay;
pub mod rules;
pub mod update_record;

pub use flags::{is_truthy, FlagColumns, TRUTHY_VALUES};
pub use overlay::{map_golden_to_internal, overlay_golden, GoldenField, OverlayReport};
pub use rules::{consolidate_records, BaseSelection, ConsolidatedRecord};
pub use update_record::{build_update_record, Scenario, UpdateColumns, UpdateRecord};
