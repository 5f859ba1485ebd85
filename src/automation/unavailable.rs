//! Provider used when no automation backend exists for the current platform.

use super::{
    Action, AttachTarget, AttachedProcess, AutomationProvider, ElementHandle, ElementInfo,
    FindCriteria, LivenessProbe, ProcessInfo, Property, ProviderError, ProviderResult,
};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProvider;

fn unsupported<T>() -> ProviderResult<T> {
    Err(ProviderError::Unsupported(format!(
        "no UI automation backend is available on {}; start the service with --fixture",
        std::env::consts::OS
    )))
}

#[async_trait]
impl LivenessProbe for UnavailableProvider {
    async fn is_alive(&self, _handle: &ElementHandle) -> bool {
        false
    }
}

#[async_trait]
impl AutomationProvider for UnavailableProvider {
    async fn list_processes(&self) -> ProviderResult<Vec<ProcessInfo>> {
        unsupported()
    }

    async fn attach(&self, _target: &AttachTarget) -> ProviderResult<AttachedProcess> {
        unsupported()
    }

    async fn is_process_running(&self, _pid: u32) -> bool {
        false
    }

    async fn windows(&self, _root: &ElementHandle) -> ProviderResult<Vec<ElementHandle>> {
        unsupported()
    }

    async fn main_window(&self, _root: &ElementHandle) -> ProviderResult<Option<ElementHandle>> {
        unsupported()
    }

    async fn describe(&self, _handle: &ElementHandle) -> ProviderResult<ElementInfo> {
        unsupported()
    }

    async fn children(&self, _handle: &ElementHandle) -> ProviderResult<Vec<ElementHandle>> {
        unsupported()
    }

    async fn find_descendants(
        &self,
        _scope: &ElementHandle,
        _criteria: &FindCriteria,
        _first_only: bool,
    ) -> ProviderResult<Vec<ElementHandle>> {
        unsupported()
    }

    async fn focus(&self, _handle: &ElementHandle) -> ProviderResult<()> {
        unsupported()
    }

    async fn perform(&self, _handle: &ElementHandle, _action: &Action) -> ProviderResult<()> {
        unsupported()
    }

    async fn read(&self, _handle: &ElementHandle, _property: Property) -> ProviderResult<Value> {
        unsupported()
    }

    async fn capture(&self, _handle: Option<&ElementHandle>) -> ProviderResult<Vec<u8>> {
        unsupported()
    }

    async fn release(&self) {}
}
