use super::*;
use crate::test_support::{sample_provider, CALC_PID, NOTEPAD_PID};

async fn attach_notepad(provider: &FixtureProvider) -> AttachedProcess {
    provider
        .attach(&AttachTarget::Pid(NOTEPAD_PID))
        .await
        .expect("notepad should attach")
}

async fn find_one(provider: &FixtureProvider, root: &ElementHandle, aid: &str) -> ElementHandle {
    let criteria = FindCriteria {
        automation_id: Some(aid.to_string()),
        ..FindCriteria::default()
    };
    let mut found = provider
        .find_descendants(root, &criteria, true)
        .await
        .unwrap();
    assert_eq!(found.len(), 1, "expected exactly one '{}'", aid);
    found.remove(0)
}

#[tokio::test]
async fn test_list_processes_reports_main_window_title() {
    let provider = sample_provider();
    let processes = provider.list_processes().await.unwrap();
    assert_eq!(processes.len(), 2);
    assert_eq!(processes[0].process_id, NOTEPAD_PID);
    assert_eq!(
        processes[0].main_window_title.as_deref(),
        Some("Untitled - Notepad")
    );
}

#[tokio::test]
async fn test_attach_by_name_ignores_case_and_exe_suffix() {
    let provider = sample_provider();
    let attached = provider
        .attach(&AttachTarget::Name("Calc.exe".to_string()))
        .await
        .unwrap();
    assert_eq!(attached.process_id, CALC_PID);
    assert_eq!(attached.process_name, "calc");
}

#[tokio::test]
async fn test_attach_unknown_pid_fails() {
    let provider = sample_provider();
    let err = provider.attach(&AttachTarget::Pid(1)).await.unwrap_err();
    assert!(matches!(err, ProviderError::ProcessNotFound(_)));
}

#[tokio::test]
async fn test_main_window_skips_offscreen_windows() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let windows = provider.windows(&attached.root).await.unwrap();
    assert_eq!(windows.len(), 2);

    let main = provider.main_window(&attached.root).await.unwrap().unwrap();
    let info = provider.describe(&main).await.unwrap();
    assert_eq!(info.automation_id, "MainWindow");
    assert_eq!(info.bounds.width, 800);
}

#[tokio::test]
async fn test_find_descendants_by_control_type() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let criteria = FindCriteria {
        control_type: Some("button".to_string()),
        ..FindCriteria::default()
    };
    let all = provider
        .find_descendants(&attached.root, &criteria, false)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let first = provider
        .find_descendants(&attached.root, &criteria, true)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0], all[0]);
}

#[tokio::test]
async fn test_removed_element_fails_liveness_probe() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let save = find_one(&provider, &attached.root, "saveButton").await;
    assert!(provider.is_alive(&save).await);

    assert!(provider.remove_element("saveButton").await);
    assert!(!provider.is_alive(&save).await);
    assert_eq!(
        provider.describe(&save).await.unwrap_err(),
        ProviderError::ElementUnavailable
    );
}

#[tokio::test]
async fn test_readded_element_gets_new_runtime_id() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let old = find_one(&provider, &attached.root, "saveButton").await;

    provider.remove_element("saveButton").await;
    let readded = FixtureElement {
        automation_id: "saveButton".to_string(),
        name: "Save".to_string(),
        control_type: "Button".to_string(),
        ..FixtureElement::default()
    };
    assert!(provider.add_child("MainWindow", readded).await);

    let new = find_one(&provider, &attached.root, "saveButton").await;
    assert_ne!(old, new);
    assert!(!provider.is_alive(&old).await);
    assert!(provider.is_alive(&new).await);
}

#[tokio::test]
async fn test_terminated_process_invalidates_elements() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let editor = find_one(&provider, &attached.root, "editor").await;

    provider.terminate_process(NOTEPAD_PID).await;
    assert!(!provider.is_process_running(NOTEPAD_PID).await);
    assert!(!provider.is_alive(&editor).await);
    assert!(provider.attach(&AttachTarget::Pid(NOTEPAD_PID)).await.is_err());
}

#[tokio::test]
async fn test_type_and_clear_update_value() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let editor = find_one(&provider, &attached.root, "editor").await;

    provider
        .perform(&editor, &Action::Type("hello".to_string()))
        .await
        .unwrap();
    assert_eq!(provider.value_of("editor").await.as_deref(), Some("hello"));
    assert_eq!(
        provider.read(&editor, Property::Value).await.unwrap(),
        json!("hello")
    );

    provider.perform(&editor, &Action::Clear).await.unwrap();
    assert_eq!(provider.value_of("editor").await.as_deref(), Some(""));
}

#[tokio::test]
async fn test_toggle_cycle_and_unsupported_toggle() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let wrap = find_one(&provider, &attached.root, "wordWrap").await;

    provider.perform(&wrap, &Action::Toggle).await.unwrap();
    let state = provider.read(&wrap, Property::State).await.unwrap();
    assert_eq!(state["toggleState"], "On");

    provider.perform(&wrap, &Action::Uncheck).await.unwrap();
    let state = provider.read(&wrap, Property::State).await.unwrap();
    assert_eq!(state["toggleState"], "Off");

    let save = find_one(&provider, &attached.root, "saveButton").await;
    let err = provider.perform(&save, &Action::Check).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unsupported(_)));
}

#[tokio::test]
async fn test_disabled_element_rejects_actions() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let print = find_one(&provider, &attached.root, "printButton").await;

    let err = provider.perform(&print, &Action::Click).await.unwrap_err();
    assert_eq!(err, ProviderError::NotEnabled);

    provider.set_enabled("printButton", true).await;
    provider.perform(&print, &Action::Click).await.unwrap();
    assert_eq!(provider.action_log().await, vec!["click printButton"]);
}

#[tokio::test]
async fn test_select_requires_existing_item() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let fonts = find_one(&provider, &attached.root, "fontList").await;

    provider
        .perform(&fonts, &Action::Select("Consolas".to_string()))
        .await
        .unwrap();
    let state = provider.read(&fonts, Property::State).await.unwrap();
    assert_eq!(state["selected"], "Consolas");

    let err = provider
        .perform(&fonts, &Action::Select("Comic Sans".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Backend(_)));
}

#[tokio::test]
async fn test_patterns_include_derived_capabilities() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let menu = find_one(&provider, &attached.root, "formatMenu").await;
    let patterns = provider.read(&menu, Property::Patterns).await.unwrap();
    assert_eq!(patterns, json!(["ExpandCollapse"]));
}

#[tokio::test]
async fn test_capture_returns_png() {
    let provider = sample_provider();
    let png = provider.capture(None).await.unwrap();
    assert_eq!(&png[..4], b"\x89PNG");
}

#[tokio::test]
async fn test_release_is_observable() {
    let provider = sample_provider();
    assert!(!provider.is_released().await);
    provider.release().await;
    assert!(provider.is_released().await);
}

#[test]
fn test_fixture_json_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desktop.json");
    std::fs::write(
        &path,
        r#"{"processes":[{"pid":7,"name":"app","windows":[{"name":"Main","controlType":"Window"}]}]}"#,
    )
    .unwrap();
    let desktop = FixtureDesktop::from_file(&path).unwrap();
    assert_eq!(desktop.processes.len(), 1);
    assert_eq!(desktop.processes[0].windows[0].control_type, "Window");
    assert!(desktop.processes[0].windows[0].enabled);
}

#[tokio::test]
async fn test_value_without_value_pattern_is_unsupported() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let save = find_one(&provider, &attached.root, "saveButton").await;

    let err = provider.read(&save, Property::Value).await.unwrap_err();
    assert_eq!(err, ProviderError::Unsupported("Value".to_string()));
}

#[tokio::test]
async fn test_action_log_keeps_most_recent_entries() {
    let provider = sample_provider();
    let attached = attach_notepad(&provider).await;
    let editor = find_one(&provider, &attached.root, "editor").await;

    let total = ACTION_LOG_CAPACITY + 44;
    for i in 0..total {
        provider
            .perform(&editor, &Action::Type(i.to_string()))
            .await
            .unwrap();
    }
    let log = provider.action_log().await;
    assert_eq!(log.len(), ACTION_LOG_CAPACITY);
    assert_eq!(log.first().map(String::as_str), Some("type editor 44"));
    assert_eq!(
        log.last().cloned(),
        Some(format!("type editor {}", total - 1))
    );
}
