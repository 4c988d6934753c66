pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{context_header, decision_block, empty, failure, label, rebuilt, section};
pub use table::{DecisionTable, LinkTable};
pub use theme::{theme, Theme};
