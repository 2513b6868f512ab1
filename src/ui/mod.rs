pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{commit_line, header, info, link_line, section, success, summary_row, sync_summary, warn};
pub use progress::Spinner;
pub use table::{links_table, stats_table};
pub use theme::{theme, Theme};
