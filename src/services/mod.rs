pub mod config;
pub mod mcp;
pub mod provider;
pub mod template;
pub mod update;

pub use config::{BackupInfo, ConfigService};
pub use mcp::McpService;
pub use provider::{MoveDirection, ProviderService};
pub use template::{Template, TemplateCategory, TemplateService, TemplateTarget};
pub use update::UpdateCheckInfo;
