mod comparison;
pub mod history;
mod order;
pub mod paths;
pub mod selectors;
mod single;
pub mod state;
pub mod tab;

pub use comparison::DetachPlacement;
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use paths::{
    determine_directory, file_name, get_sorted_image_files, is_image_file, natural_cmp,
    DirEntryInfo, DirectoryLister, FsLister, InMemoryLister, PathError, IMAGE_EXTENSIONS,
};
pub use selectors::{active_single_tab, tab_label, vertical_tabs, TabRow};
pub use state::{ComparisonTabSeed, InvariantViolation, SingleTabSeed, TabState};
pub use tab::{
    ComparisonTab, PanOffset, SingleTab, SingleTabPatch, Tab, TabId, TabLimits,
    MAX_COMPARISON_CHILDREN, MAX_ZOOM, MIN_COMPARISON_CHILDREN, MIN_ZOOM,
};
