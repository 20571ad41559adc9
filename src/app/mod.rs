pub mod report;
pub mod rpc;
pub mod runner;

pub use report::ReportWriter;
pub use rpc::{dispatch, execute, ActionOutput, RpcReply, RpcRequest, SyncAction, ValidatedRequest};
