pub mod adapter;
pub mod audit;
pub mod authz;
pub mod channels;
pub mod config;
pub mod error;
pub mod logging;
pub mod roles;

pub use audit::{AuditRecorder, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use authz::{ActorContext, GrantTable, PermissionChecker};
pub use channels::ChannelAdmin;
pub use config::AppConfig;
pub use error::ApiError;
pub use roles::RoleAuthority;
