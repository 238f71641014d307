pub mod editor;
pub mod replay;
pub mod skills;
pub mod timeline;

pub use editor::FileEditor;
pub use replay::reconstruct;
pub use skills::extract_skill_paths;
pub use timeline::{fold, ItemBody, TimelineItem};
