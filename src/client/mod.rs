pub mod api;
pub mod render;
pub mod state;
pub mod storage;

pub use api::{GradeApi, HttpGradeApi};
pub use render::render_markdown;
pub use state::{GraderSession, Phase};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
