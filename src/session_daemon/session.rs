//! Per-process session state.
//!
//! A single [`SessionContext`] lives for the whole service process. It is owned
//! by the request-processing path and handed to handlers by `&mut`, so there is
//! no locking around the attached target or the identity cache.

use super::errors::HandlerError;
use super::identity_cache::IdentityCache;
use crate::automation::{
    AttachTarget, AutomationProvider, ElementHandle, ElementInfo, ProviderError,
};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The application the session is currently attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedTarget {
    pub process_id: u32,
    pub process_name: String,
    pub root: ElementHandle,
}

/// An element as reported to clients: its cache id plus its properties.
#[derive(Debug, Clone, Serialize)]
pub struct ElementDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub info: ElementInfo,
}

/// A node of `element.tree` output.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub element: ElementDescriptor,
    pub children: Vec<TreeNode>,
}

pub struct SessionContext {
    provider: Box<dyn AutomationProvider>,
    target: Option<AttachedTarget>,
    cache: IdentityCache,
    screenshot_dir: PathBuf,
    shutdown_requested: bool,
    closed: bool,
}

impl SessionContext {
    pub fn new(provider: Box<dyn AutomationProvider>, screenshot_dir: PathBuf) -> Self {
        Self {
            provider,
            target: None,
            cache: IdentityCache::new(),
            screenshot_dir,
            shutdown_requested: false,
            closed: false,
        }
    }

    pub fn provider(&self) -> &dyn AutomationProvider {
        self.provider.as_ref()
    }

    pub fn target(&self) -> Option<&AttachedTarget> {
        self.target.as_ref()
    }

    pub fn require_target(&self) -> Result<AttachedTarget, HandlerError> {
        self.target.clone().ok_or(HandlerError::NotConnected)
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    #[cfg(test)]
    pub fn cached_elements(&self) -> usize {
        self.cache.len()
    }

    /// Attaches to `target`, replacing any previous target.
    ///
    /// On failure the previous target and its ids stay valid.
    pub async fn attach(
        &mut self,
        target: &AttachTarget,
    ) -> Result<AttachedTarget, HandlerError> {
        let attached = self.provider.attach(target).await?;
        let target = AttachedTarget {
            process_id: attached.process_id,
            process_name: attached.process_name,
            root: attached.root,
        };
        self.cache.clear();
        tracing::info!(
            pid = target.process_id,
            name = %target.process_name,
            "attached to application"
        );
        self.target = Some(target.clone());
        Ok(target)
    }

    /// Drops the current target. Returns whether one was attached.
    pub fn detach(&mut self) -> bool {
        self.cache.clear();
        match self.target.take() {
            Some(target) => {
                tracing::info!(pid = target.process_id, "detached from application");
                true
            }
            None => false,
        }
    }

    /// Clears the session when the attached process has exited.
    pub async fn refresh_target(&mut self) {
        let Some(pid) = self.target.as_ref().map(|t| t.process_id) else {
            return;
        };
        if !self.provider.is_process_running(pid).await {
            tracing::info!(pid, "attached application exited");
            self.detach();
        }
    }

    /// Maps an id to a live handle, requiring an attached target.
    pub async fn resolve(&mut self, id: &str) -> Result<ElementHandle, HandlerError> {
        self.require_target()?;
        self.cache
            .resolve(id, self.provider.as_ref())
            .await
            .ok_or_else(|| HandlerError::ElementNotFound(id.to_string()))
    }

    /// Like [`resolve`](Self::resolve) but reports "gone" instead of failing.
    pub async fn probe(&mut self, id: &str) -> Result<Option<ElementHandle>, HandlerError> {
        self.require_target()?;
        Ok(self.cache.resolve(id, self.provider.as_ref()).await)
    }

    pub fn register(&mut self, handle: &ElementHandle) -> String {
        self.cache.get_or_create_id(handle)
    }

    pub async fn describe(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<ElementDescriptor, HandlerError> {
        let info = self.provider.describe(handle).await?;
        Ok(ElementDescriptor {
            id: self.register(handle),
            info,
        })
    }

    /// Describes an id-addressed element, evicting it if it vanished after the
    /// liveness probe.
    pub async fn describe_id(&mut self, id: &str) -> Result<ElementDescriptor, HandlerError> {
        let handle = self.resolve(id).await?;
        match self.describe(&handle).await {
            Err(HandlerError::Provider(ProviderError::ElementUnavailable)) => {
                self.cache.evict(id);
                Err(HandlerError::ElementNotFound(id.to_string()))
            }
            other => other,
        }
    }

    pub async fn describe_all(
        &mut self,
        handles: &[ElementHandle],
    ) -> Result<Vec<ElementDescriptor>, HandlerError> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            match self.describe(handle).await {
                Ok(descriptor) => out.push(descriptor),
                // Vanished between listing and describing.
                Err(HandlerError::Provider(ProviderError::ElementUnavailable)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Snapshot of the subtree under `handle`, `depth` levels deep.
    pub fn tree<'a>(
        &'a mut self,
        handle: ElementHandle,
        depth: u32,
    ) -> BoxFuture<'a, Result<TreeNode, HandlerError>> {
        async move {
            let element = self.describe(&handle).await?;
            let mut children = Vec::new();
            if depth > 0 {
                for child in self.provider.children(&handle).await? {
                    match self.tree(child, depth - 1).await {
                        Ok(node) => children.push(node),
                        Err(HandlerError::Provider(ProviderError::ElementUnavailable)) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            Ok(TreeNode { element, children })
        }
        .boxed()
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Releases the provider and forgets all ids. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.target = None;
        self.cache.clear();
        self.provider.release().await;
        tracing::debug!("session closed");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
