//! Shared fixtures for unit tests.

use crate::automation::fixture::FixtureDesktop;
use crate::automation::FixtureProvider;

pub const NOTEPAD_PID: u32 = 4242;
pub const CALC_PID: u32 = 5151;

const SAMPLE_DESKTOP: &str = r#"
processes:
  - pid: 4242
    name: notepad
    windows:
      - name: Untitled - Notepad
        automationId: MainWindow
        controlType: Window
        className: Notepad
        bounds: { x: 0, y: 0, width: 800, height: 600 }
        children:
          - automationId: editor
            name: Text Editor
            controlType: Edit
            className: Edit
            value: ""
          - automationId: saveButton
            name: Save
            controlType: Button
            className: Button
          - automationId: wordWrap
            name: Word Wrap
            controlType: CheckBox
            className: Button
            toggleState: Off
          - automationId: formatMenu
            name: Format
            controlType: MenuItem
            expanded: false
          - automationId: fontList
            name: Font
            controlType: ComboBox
            children:
              - name: Arial
                controlType: ListItem
              - name: Consolas
                controlType: ListItem
          - automationId: printButton
            name: Print
            controlType: Button
            className: Button
            enabled: false
      - name: About Notepad
        automationId: AboutDialog
        controlType: Window
        offscreen: true
  - pid: 5151
    name: calc
    windows:
      - name: Calculator
        automationId: CalcWindow
        controlType: Window
        children:
          - automationId: num1Button
            name: One
            controlType: Button
"#;

pub fn sample_desktop() -> FixtureDesktop {
    serde_yaml::from_str(SAMPLE_DESKTOP).expect("sample desktop must parse")
}

pub fn sample_provider() -> FixtureProvider {
    FixtureProvider::new(sample_desktop())
}
