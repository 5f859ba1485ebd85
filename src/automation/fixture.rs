//! In-memory desktop used in place of a platform automation backend.
//!
//! A fixture is a list of processes, each with a tree of windows and controls,
//! loaded from YAML or JSON:
//!
//! ```yaml
//! processes:
//!   - pid: 4242
//!     name: notepad
//!     windows:
//!       - name: Untitled - Notepad
//!         controlType: Window
//!         children:
//!           - automationId: editor
//!             controlType: Edit
//!             value: ""
//! ```
//!
//! Every element gets a fresh runtime id when it is inserted. Removing an element
//! (or terminating its process) makes its handles fail the liveness probe, and an
//! element added later never reuses an old runtime id.

use super::{
    Action, AttachTarget, AttachedProcess, AutomationProvider, Bounds, ElementHandle, ElementInfo,
    FindCriteria, LivenessProbe, ProcessInfo, Property, ProviderError, ProviderResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// First component of every fixture runtime id.
const RUNTIME_ID_PREFIX: i64 = 42;

/// Most recent actions kept by a fixture desktop.
const ACTION_LOG_CAPACITY: usize = 256;

/// 1x1 transparent PNG returned by `capture`.
const BLANK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDesktop {
    #[serde(default)]
    pub processes: Vec<FixtureProcess>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureProcess {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub windows: Vec<FixtureElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ToggleState {
    On,
    Off,
    Indeterminate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureElement {
    pub name: String,
    pub automation_id: String,
    pub control_type: String,
    pub class_name: String,
    pub enabled: bool,
    pub offscreen: bool,
    pub bounds: Bounds,
    pub text: Option<String>,
    pub value: Option<String>,
    pub toggle_state: Option<ToggleState>,
    pub expanded: Option<bool>,
    pub selected: Option<String>,
    pub patterns: Vec<String>,
    pub children: Vec<FixtureElement>,
}

impl Default for FixtureElement {
    fn default() -> Self {
        Self {
            name: String::new(),
            automation_id: String::new(),
            control_type: "Pane".to_string(),
            class_name: String::new(),
            enabled: true,
            offscreen: false,
            bounds: Bounds::default(),
            text: None,
            value: None,
            toggle_state: None,
            expanded: None,
            selected: None,
            patterns: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl FixtureDesktop {
    /// Loads a fixture file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let desktop = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse fixture: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse fixture: {}", path.display()))?
        };
        Ok(desktop)
    }
}

struct Node {
    element: FixtureElement,
    pid: u32,
    children: Vec<u64>,
}

struct ProcessEntry {
    pid: u32,
    name: String,
    root: u64,
    running: bool,
}

#[derive(Default)]
struct DesktopState {
    nodes: HashMap<u64, Node>,
    processes: Vec<ProcessEntry>,
    next_id: u64,
    focused: Option<u64>,
    action_log: VecDeque<String>,
    released: bool,
}

impl DesktopState {
    /// Appends to the action log, dropping the oldest entries past the cap.
    fn record(&mut self, entry: String) {
        tracing::debug!(action = %entry, "fixture action");
        if self.action_log.len() == ACTION_LOG_CAPACITY {
            self.action_log.pop_front();
        }
        self.action_log.push_back(entry);
    }

    fn insert(&mut self, pid: u32, mut element: FixtureElement) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let children = std::mem::take(&mut element.children);
        self.nodes.insert(
            id,
            Node {
                element,
                pid,
                children: Vec::new(),
            },
        );
        let child_ids: Vec<u64> = children
            .into_iter()
            .map(|child| self.insert(pid, child))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        id
    }

    fn add_process(&mut self, process: FixtureProcess) {
        let root = FixtureElement {
            name: process.name.clone(),
            ..FixtureElement::default()
        };
        let root_id = self.insert(process.pid, root);
        let window_ids: Vec<u64> = process
            .windows
            .into_iter()
            .map(|window| self.insert(process.pid, window))
            .collect();
        if let Some(node) = self.nodes.get_mut(&root_id) {
            node.children = window_ids;
        }
        self.processes.push(ProcessEntry {
            pid: process.pid,
            name: process.name,
            root: root_id,
            running: true,
        });
    }

    fn process(&self, pid: u32) -> Option<&ProcessEntry> {
        self.processes.iter().find(|p| p.pid == pid && p.running)
    }

    fn handle_for(&self, id: u64) -> Option<ElementHandle> {
        let node = self.nodes.get(&id)?;
        Some(ElementHandle::new(vec![
            RUNTIME_ID_PREFIX,
            i64::from(node.pid),
            id as i64,
        ]))
    }

    /// Resolves a handle to a live node id.
    fn resolve(&self, handle: &ElementHandle) -> Option<u64> {
        let [prefix, pid, id] = handle.runtime_id() else {
            return None;
        };
        if *prefix != RUNTIME_ID_PREFIX {
            return None;
        }
        let id = u64::try_from(*id).ok()?;
        let node = self.nodes.get(&id)?;
        if i64::from(node.pid) != *pid {
            return None;
        }
        self.process(node.pid)?;
        Some(id)
    }

    fn node(&self, handle: &ElementHandle) -> ProviderResult<(u64, &Node)> {
        let id = self.resolve(handle).ok_or(ProviderError::ElementUnavailable)?;
        let node = self
            .nodes
            .get(&id)
            .ok_or(ProviderError::ElementUnavailable)?;
        Ok((id, node))
    }

    fn info(&self, node: &Node) -> ElementInfo {
        let element = &node.element;
        ElementInfo {
            name: element.name.clone(),
            automation_id: element.automation_id.clone(),
            control_type: element.control_type.clone(),
            class_name: element.class_name.clone(),
            is_enabled: element.enabled,
            is_offscreen: element.offscreen,
            bounds: element.bounds,
        }
    }

    /// Pre-order walk of the subtree under `id`, excluding `id` itself.
    fn descendants(&self, id: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack: Vec<u64> = self
            .nodes
            .get(&id)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// First live element with the given automation id, in process then tree order.
    #[cfg(test)]
    fn find_by_automation_id(&self, automation_id: &str) -> Option<u64> {
        self.processes
            .iter()
            .filter(|p| p.running)
            .flat_map(|p| self.descendants(p.root))
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.element.automation_id == automation_id)
            })
    }

    #[cfg(test)]
    fn remove_subtree(&mut self, id: u64) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for other in self.nodes.values_mut() {
            other.children.retain(|child| *child != id);
        }
        for child in node.children {
            self.remove_subtree(child);
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    fn label(node: &Node) -> &str {
        if node.element.automation_id.is_empty() {
            &node.element.name
        } else {
            &node.element.automation_id
        }
    }
}

/// Shared, cloneable in-memory desktop.
///
/// Clones observe the same state, so a test can keep one clone to mutate the
/// desktop while the session service owns another.
#[derive(Clone)]
pub struct FixtureProvider {
    state: Arc<Mutex<DesktopState>>,
}

impl FixtureProvider {
    pub fn new(desktop: FixtureDesktop) -> Self {
        let mut state = DesktopState::default();
        for process in desktop.processes {
            state.add_process(process);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(FixtureDesktop::from_file(path)?))
    }
}

/// Hooks tests use to change the desktop under a running session.
#[cfg(test)]
impl FixtureProvider {
    /// Removes the first element with `automation_id` and its subtree.
    pub async fn remove_element(&self, automation_id: &str) -> bool {
        let mut state = self.state.lock().await;
        match state.find_by_automation_id(automation_id) {
            Some(id) => {
                state.remove_subtree(id);
                true
            }
            None => false,
        }
    }

    /// Appends `element` under the first element with `parent_automation_id`.
    pub async fn add_child(&self, parent_automation_id: &str, element: FixtureElement) -> bool {
        let mut state = self.state.lock().await;
        let Some(parent) = state.find_by_automation_id(parent_automation_id) else {
            return false;
        };
        let Some(pid) = state.nodes.get(&parent).map(|n| n.pid) else {
            return false;
        };
        let child = state.insert(pid, element);
        if let Some(node) = state.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        true
    }

    pub async fn set_enabled(&self, automation_id: &str, enabled: bool) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = state.find_by_automation_id(automation_id) else {
            return false;
        };
        match state.nodes.get_mut(&id) {
            Some(node) => {
                node.element.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Marks a process as exited; all of its elements stop resolving.
    pub async fn terminate_process(&self, pid: u32) {
        let mut state = self.state.lock().await;
        for process in state.processes.iter_mut().filter(|p| p.pid == pid) {
            process.running = false;
        }
    }

    pub async fn value_of(&self, automation_id: &str) -> Option<String> {
        let state = self.state.lock().await;
        let id = state.find_by_automation_id(automation_id)?;
        state.nodes.get(&id)?.element.value.clone()
    }

    pub async fn action_log(&self) -> Vec<String> {
        self.state.lock().await.action_log.iter().cloned().collect()
    }

    pub async fn is_released(&self) -> bool {
        self.state.lock().await.released
    }
}

#[async_trait]
impl LivenessProbe for FixtureProvider {
    async fn is_alive(&self, handle: &ElementHandle) -> bool {
        self.state.lock().await.resolve(handle).is_some()
    }
}

#[async_trait]
impl AutomationProvider for FixtureProvider {
    async fn list_processes(&self) -> ProviderResult<Vec<ProcessInfo>> {
        let state = self.state.lock().await;
        Ok(state
            .processes
            .iter()
            .filter(|p| p.running)
            .map(|p| ProcessInfo {
                process_id: p.pid,
                process_name: p.name.clone(),
                main_window_title: main_window_id(&state, p.root)
                    .and_then(|id| state.nodes.get(&id))
                    .map(|n| n.element.name.clone()),
            })
            .collect())
    }

    async fn attach(&self, target: &AttachTarget) -> ProviderResult<AttachedProcess> {
        let state = self.state.lock().await;
        let process = state
            .processes
            .iter()
            .filter(|p| p.running)
            .find(|p| match target {
                AttachTarget::Pid(pid) => p.pid == *pid,
                AttachTarget::Name(name) => {
                    let wanted = name.strip_suffix(".exe").unwrap_or(name);
                    p.name.eq_ignore_ascii_case(wanted)
                }
            })
            .ok_or_else(|| ProviderError::ProcessNotFound(target.to_string()))?;
        let root = state
            .handle_for(process.root)
            .ok_or(ProviderError::ElementUnavailable)?;
        Ok(AttachedProcess {
            process_id: process.pid,
            process_name: process.name.clone(),
            root,
        })
    }

    async fn is_process_running(&self, pid: u32) -> bool {
        self.state.lock().await.process(pid).is_some()
    }

    async fn windows(&self, root: &ElementHandle) -> ProviderResult<Vec<ElementHandle>> {
        let state = self.state.lock().await;
        let (_, node) = state.node(root)?;
        Ok(node
            .children
            .iter()
            .filter_map(|id| state.handle_for(*id))
            .collect())
    }

    async fn main_window(&self, root: &ElementHandle) -> ProviderResult<Option<ElementHandle>> {
        let state = self.state.lock().await;
        let (root_id, _) = state.node(root)?;
        Ok(main_window_id(&state, root_id).and_then(|id| state.handle_for(id)))
    }

    async fn describe(&self, handle: &ElementHandle) -> ProviderResult<ElementInfo> {
        let state = self.state.lock().await;
        let (_, node) = state.node(handle)?;
        Ok(state.info(node))
    }

    async fn children(&self, handle: &ElementHandle) -> ProviderResult<Vec<ElementHandle>> {
        let state = self.state.lock().await;
        let (_, node) = state.node(handle)?;
        Ok(node
            .children
            .iter()
            .filter_map(|id| state.handle_for(*id))
            .collect())
    }

    async fn find_descendants(
        &self,
        scope: &ElementHandle,
        criteria: &FindCriteria,
        first_only: bool,
    ) -> ProviderResult<Vec<ElementHandle>> {
        let state = self.state.lock().await;
        let (scope_id, _) = state.node(scope)?;
        let mut found = Vec::new();
        for id in state.descendants(scope_id) {
            let Some(node) = state.nodes.get(&id) else {
                continue;
            };
            if criteria.matches(&state.info(node)) {
                if let Some(handle) = state.handle_for(id) {
                    found.push(handle);
                }
                if first_only {
                    break;
                }
            }
        }
        Ok(found)
    }

    async fn focus(&self, handle: &ElementHandle) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        let (id, node) = state.node(handle)?;
        if !node.element.enabled {
            return Err(ProviderError::NotEnabled);
        }
        let entry = format!("focus {}", DesktopState::label(node));
        state.focused = Some(id);
        state.record(entry);
        Ok(())
    }

    async fn perform(&self, handle: &ElementHandle, action: &Action) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        let (id, node) = state.node(handle)?;
        if !node.element.enabled {
            return Err(ProviderError::NotEnabled);
        }
        let label = DesktopState::label(node).to_string();
        let item_names: Vec<String> = node
            .children
            .iter()
            .filter_map(|child| state.nodes.get(child))
            .map(|child| child.element.name.clone())
            .collect();
        let Some(node) = state.nodes.get_mut(&id) else {
            return Err(ProviderError::ElementUnavailable);
        };
        let element = &mut node.element;
        let entry = match action {
            Action::Click => format!("click {}", label),
            Action::RightClick => format!("rightclick {}", label),
            Action::DoubleClick => format!("doubleclick {}", label),
            Action::Invoke => format!("invoke {}", label),
            Action::Clear => {
                element.value = Some(String::new());
                format!("clear {}", label)
            }
            Action::Check | Action::Uncheck | Action::Toggle => {
                let current = element
                    .toggle_state
                    .ok_or_else(|| ProviderError::Unsupported("Toggle".to_string()))?;
                let next = match (action, current) {
                    (Action::Check, _) => ToggleState::On,
                    (Action::Uncheck, _) => ToggleState::Off,
                    (_, ToggleState::On) => ToggleState::Off,
                    (_, _) => ToggleState::On,
                };
                element.toggle_state = Some(next);
                format!("toggle {} {:?}", label, next)
            }
            Action::Expand | Action::Collapse => {
                if element.expanded.is_none() {
                    return Err(ProviderError::Unsupported("ExpandCollapse".to_string()));
                }
                let expand = matches!(action, Action::Expand);
                element.expanded = Some(expand);
                format!("{} {}", if expand { "expand" } else { "collapse" }, label)
            }
            Action::Type(text) => {
                element.value.get_or_insert_with(String::new).push_str(text);
                format!("type {} {}", label, text)
            }
            Action::Press(key) => format!("press {} {}", label, key),
            Action::Select(item) => {
                if !item_names.iter().any(|name| name == item) {
                    return Err(ProviderError::Backend(format!("Item not found: {}", item)));
                }
                element.selected = Some(item.clone());
                format!("select {} {}", label, item)
            }
        };
        state.record(entry);
        Ok(())
    }

    async fn read(&self, handle: &ElementHandle, property: Property) -> ProviderResult<Value> {
        let state = self.state.lock().await;
        let (id, node) = state.node(handle)?;
        let element = &node.element;
        let value = match property {
            Property::Text => json!(element
                .text
                .clone()
                .or_else(|| element.value.clone())
                .unwrap_or_else(|| element.name.clone())),
            Property::Value => match &element.value {
                Some(value) => json!(value),
                None => return Err(ProviderError::Unsupported("Value".to_string())),
            },
            Property::State => {
                let mut state_json = json!({
                    "enabled": element.enabled,
                    "offscreen": element.offscreen,
                    "focused": state.focused == Some(id),
                });
                if let Some(toggle) = element.toggle_state {
                    state_json["toggleState"] = json!(toggle);
                }
                if let Some(expanded) = element.expanded {
                    state_json["expanded"] = json!(expanded);
                }
                if let Some(selected) = &element.selected {
                    state_json["selected"] = json!(selected);
                }
                state_json
            }
            Property::Patterns => json!(patterns_of(element)),
        };
        Ok(value)
    }

    async fn capture(&self, handle: Option<&ElementHandle>) -> ProviderResult<Vec<u8>> {
        if let Some(handle) = handle {
            let state = self.state.lock().await;
            state.node(handle)?;
        }
        base64::engine::general_purpose::STANDARD
            .decode(BLANK_PNG_BASE64)
            .map_err(|e| ProviderError::Backend(e.to_string()))
    }

    async fn release(&self) {
        let mut state = self.state.lock().await;
        if state.released {
            return;
        }
        state.released = true;
        state.focused = None;
        tracing::debug!(actions = state.action_log.len(), "fixture desktop released");
    }
}

/// First visible `Window` child of a process root, falling back to the first child.
fn main_window_id(state: &DesktopState, root: u64) -> Option<u64> {
    let children = &state.nodes.get(&root)?.children;
    children
        .iter()
        .copied()
        .find(|id| {
            state.nodes.get(id).is_some_and(|n| {
                n.element.control_type.eq_ignore_ascii_case("Window") && !n.element.offscreen
            })
        })
        .or_else(|| children.first().copied())
}

fn patterns_of(element: &FixtureElement) -> Vec<String> {
    let mut patterns = element.patterns.clone();
    if element.value.is_some() {
        patterns.push("Value".to_string());
    }
    if element.toggle_state.is_some() {
        patterns.push("Toggle".to_string());
    }
    if element.expanded.is_some() {
        patterns.push("ExpandCollapse".to_string());
    }
    patterns.sort();
    patterns.dedup();
    patterns
}

#[cfg(test)]
#[path = "tests/fixture_tests.rs"]
mod tests;
