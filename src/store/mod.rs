//! Progress persistence: Supabase client, progress table and background writer

pub mod progress;
pub mod supabase;
pub mod writer;

pub use progress::{ProgressRecord, ProgressStore, StoreError};
pub use writer::{spawn_progress_writer, ProgressJob};
