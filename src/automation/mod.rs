//! Boundary to the UI automation backend.
//!
//! The session service never walks a UI tree or synthesizes input itself. It
//! talks to an [`AutomationProvider`], which owns the real automation objects;
//! the service only holds [`ElementHandle`]s, non-owning runtime identifiers that
//! can be proven stale through [`LivenessProbe::is_alive`].
//!
//! Two providers ship with the crate:
//! - **Fixture (`fixture.rs`)**: an in-memory desktop loaded from YAML/JSON, used by
//!   tests and demos.
//! - **Unavailable (`unavailable.rs`)**: fallback when no backend exists for the
//!   current platform; every call fails with [`ProviderError::Unsupported`].

pub mod fixture;
pub mod unavailable;

pub use fixture::FixtureProvider;
pub use unavailable::UnavailableProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Non-owning reference to an automation element.
///
/// Wraps the backend's runtime identifier. Holding a handle does not keep the
/// element alive; the backend (and ultimately the target process) owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(Vec<i64>);

impl ElementHandle {
    pub fn new(runtime_id: Vec<i64>) -> Self {
        Self(runtime_id)
    }

    pub fn runtime_id(&self) -> &[i64] {
        &self.0
    }
}

/// Process descriptor returned by `process.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub process_id: u32,
    pub process_name: String,
    pub main_window_title: Option<String>,
}

/// How `connect` selects its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachTarget {
    Pid(u32),
    Name(String),
}

impl std::fmt::Display for AttachTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachTarget::Pid(pid) => write!(f, "pid {}", pid),
            AttachTarget::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

/// A process the provider attached to, with the root of its automation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedProcess {
    pub process_id: u32,
    pub process_name: String,
    pub root: ElementHandle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Snapshot of an element's identifying properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub name: String,
    pub automation_id: String,
    pub control_type: String,
    pub class_name: String,
    pub is_enabled: bool,
    pub is_offscreen: bool,
    pub bounds: Bounds,
}

/// Search conditions for `element.find` and `wait.element`. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindCriteria {
    pub automation_id: Option<String>,
    pub name: Option<String>,
    pub control_type: Option<String>,
    pub class_name: Option<String>,
}

impl FindCriteria {
    pub fn is_empty(&self) -> bool {
        self.automation_id.is_none()
            && self.name.is_none()
            && self.control_type.is_none()
            && self.class_name.is_none()
    }

    /// Control types compare case-insensitively, everything else exactly.
    pub fn matches(&self, info: &ElementInfo) -> bool {
        self.automation_id
            .as_deref()
            .is_none_or(|aid| aid == info.automation_id)
            && self.name.as_deref().is_none_or(|name| name == info.name)
            && self
                .control_type
                .as_deref()
                .is_none_or(|ty| ty.eq_ignore_ascii_case(&info.control_type))
            && self
                .class_name
                .as_deref()
                .is_none_or(|class| class == info.class_name)
    }
}

/// Input and pattern operations a handler can ask the provider to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click,
    RightClick,
    DoubleClick,
    Clear,
    Check,
    Uncheck,
    Toggle,
    Expand,
    Collapse,
    Invoke,
    Type(String),
    Press(String),
    Select(String),
}

/// Readable element properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Text,
    Value,
    State,
    Patterns,
}

/// Errors reported by an automation backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),
    #[error("Element is no longer available")]
    ElementUnavailable,
    #[error("Element is not enabled")]
    NotEnabled,
    #[error("Operation not supported: {0}")]
    Unsupported(String),
    #[error("{0}")]
    Backend(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Cheap validity check used by the identity cache.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns false once the element behind `handle` no longer exists.
    async fn is_alive(&self, handle: &ElementHandle) -> bool;
}

/// The external UI automation capability.
#[async_trait]
pub trait AutomationProvider: LivenessProbe {
    async fn list_processes(&self) -> ProviderResult<Vec<ProcessInfo>>;

    async fn attach(&self, target: &AttachTarget) -> ProviderResult<AttachedProcess>;

    async fn is_process_running(&self, pid: u32) -> bool;

    /// Top-level windows under an attached root.
    async fn windows(&self, root: &ElementHandle) -> ProviderResult<Vec<ElementHandle>>;

    async fn main_window(&self, root: &ElementHandle) -> ProviderResult<Option<ElementHandle>>;

    async fn describe(&self, handle: &ElementHandle) -> ProviderResult<ElementInfo>;

    async fn children(&self, handle: &ElementHandle) -> ProviderResult<Vec<ElementHandle>>;

    /// Descendants of `scope` (excluding `scope`) matching `criteria`, in tree order.
    async fn find_descendants(
        &self,
        scope: &ElementHandle,
        criteria: &FindCriteria,
        first_only: bool,
    ) -> ProviderResult<Vec<ElementHandle>>;

    async fn focus(&self, handle: &ElementHandle) -> ProviderResult<()>;

    async fn perform(&self, handle: &ElementHandle, action: &Action) -> ProviderResult<()>;

    async fn read(&self, handle: &ElementHandle, property: Property) -> ProviderResult<Value>;

    /// PNG bytes of the element, or of the whole desktop when `handle` is `None`.
    async fn capture(&self, handle: Option<&ElementHandle>) -> ProviderResult<Vec<u8>>;

    /// Releases backend resources; called once when the session terminates.
    async fn release(&self);
}
