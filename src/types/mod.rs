mod chat;

pub use chat::{
    default_json_object, ChatEvent, EntryKind, SessionEntry, SessionSummary, ToolRecord,
};
