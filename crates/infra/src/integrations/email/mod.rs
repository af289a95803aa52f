//! Mail providers: Outlook through Graph and Gmail

pub mod gmail;
pub mod graph;
mod mime;

pub use gmail::GmailProvider;
pub use graph::GraphEmailProvider;
