pub mod candidate;
pub mod history;
pub mod process;
pub mod remote;

pub use candidate::{Attachment, Candidate};
pub use history::StageHistoryEntry;
pub use process::{DocumentCategory, Process, Stage};
pub use remote::{RemoteFile, RemoteFolder};
