//! ufwguard 조정 엔진
//!
//! 실행 중인 관리 컨테이너 집합과 ufw 규칙 집합을 일치시킵니다.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ReconcilerError`)
//! - [`rule`]: Managed rule grammar (`ManagedRule`, `Direction`)
//! - [`firewall`]: ufw command abstraction (`Firewall` trait, `UfwFirewall`)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`report`]: Injectable observability sink (`Reporter`, `ReconcileEvent`)
//! - [`cleanup`]: Orphaned rule removal (`ReconciliationEngine`, `reconcile`)
//! - [`sync`]: Managed container discovery (`ContainerSync`)
//!
//! # Architecture
//!
//! ```text
//! ContainerSync.sync() ──ContainerDetail──mpsc──> rule installer (external)
//!
//! ReconciliationEngine.cleanup()
//!     ├── Firewall.list_rules()
//!     ├── DockerClient.inspect_container()  (once per container ID)
//!     └── Firewall.delete_rule()            (every rule of an orphaned ID)
//! ```

pub mod cleanup;
pub mod docker;
pub mod error;
pub mod firewall;
pub mod report;
pub mod rule;
pub mod sync;

// --- Public API Re-exports ---

// Cleanup
pub use cleanup::{
    CleanupSummary, OrphanedRules, ReconciliationEngine, RuleGroups, group_rules, reconcile,
};

// Sync
pub use sync::{ContainerSync, SyncSummary};

// Error
pub use error::ReconcilerError;

// Rules
pub use rule::{Direction, ManagedRule, is_managed_rule};

// Firewall
pub use firewall::{Firewall, UfwFirewall};

// Docker API
pub use docker::{BollardDockerClient, DockerClient};

// Reporting
pub use report::{ReconcileEvent, RecordingReporter, Reporter, TracingReporter};
