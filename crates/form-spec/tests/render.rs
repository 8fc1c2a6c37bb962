use form_spec::{
    CategorySpec, ChoiceStyle, ControlKind, ControlStatus, FieldValue, FileHandle, FormState,
    RenderError, RenderStatus, build_render_payload, render_json_ui, render_text,
};

fn fixture() -> CategorySpec {
    serde_json::from_str(include_str!("fixtures/internship.json")).expect("deserialize")
}

#[test]
fn controls_follow_order_and_skip_hidden_or_unknown_fields() {
    let state = FormState::for_category(&fixture());
    let ids = state
        .controls()
        .into_iter()
        .map(|control| control.field_id)
        .collect::<Vec<_>>();
    // f-stack and f-city are conditional, f-legacy has an unrecognized type.
    assert_eq!(ids, vec!["f-name", "f-resume", "f-track", "f-years", "f-relocate"]);
}

#[test]
fn control_kinds_match_field_types() {
    let mut state = FormState::for_category(&fixture());
    state
        .on_change("f-track", FieldValue::Text("backend".into()))
        .expect("change");
    let controls = state.controls();
    let kind_of = |id: &str| {
        controls
            .iter()
            .find(|control| control.field_id == id)
            .map(|control| control.kind.clone())
            .expect("control present")
    };

    assert_eq!(kind_of("f-resume"), ControlKind::Input { input_type: "url" });
    assert!(matches!(
        kind_of("f-track"),
        ControlKind::SingleChoice { style: ChoiceStyle::Radio, .. }
    ));
    assert_eq!(
        kind_of("f-years"),
        ControlKind::Numeric {
            min: Some(0.0),
            max: Some(40.0),
            step: None,
            slider: false
        }
    );
    assert_eq!(kind_of("f-relocate"), ControlKind::Toggle { checked: false });
    assert!(matches!(kind_of("f-stack"), ControlKind::MultiChoice { .. }));
}

#[test]
fn chips_follow_selection_order() {
    let mut state = FormState::for_category(&fixture());
    state
        .on_change("f-track", FieldValue::Text("backend".into()))
        .expect("change");
    for option in ["kafka", "rust", "postgres"] {
        assert!(state.toggle_option("f-stack", option).expect("toggle"));
    }
    assert!(!state.toggle_option("f-stack", "rust").expect("toggle"));

    let chips = state
        .controls()
        .into_iter()
        .find_map(|control| match control.kind {
            ControlKind::MultiChoice { chips, .. } => Some(chips),
            _ => None,
        })
        .expect("multiselect control");
    assert_eq!(chips, vec!["kafka", "postgres"]);

    assert_eq!(
        state.toggle_option("f-stack", "cobol"),
        Err(RenderError::UnknownOption {
            field_id: "f-stack".into(),
            option: "cobol".into()
        })
    );
    assert_eq!(
        state.toggle_option("f-track", "backend"),
        Err(RenderError::NotMultiselect("f-track".into()))
    );
}

#[test]
fn status_moves_from_pristine_to_invalid_only_after_submit() {
    let mut state = FormState::for_category(&fixture());
    assert_eq!(state.status("f-name"), ControlStatus::Pristine);

    state
        .on_change("f-resume", FieldValue::Text("notaurl".into()))
        .expect("change");
    assert_eq!(state.status("f-resume"), ControlStatus::Touched);
    assert!(state.error("f-resume").is_none());

    let result = state.submit().expect_err("invalid form");
    assert_eq!(result.field_errors().len(), 2);
    assert_eq!(state.status("f-name"), ControlStatus::Invalid);
    assert_eq!(state.status("f-resume"), ControlStatus::Invalid);
    assert_eq!(state.status("f-years"), ControlStatus::Valid);
    // Entered values survive a failed submit.
    assert_eq!(
        state.values().get("f-resume"),
        Some(&FieldValue::Text("notaurl".into()))
    );

    state
        .on_change("f-resume", FieldValue::Text("https://example.com/cv.pdf".into()))
        .expect("change");
    assert_eq!(state.status("f-resume"), ControlStatus::Touched);
    assert!(state.error("f-resume").is_none());
    assert_eq!(state.error("f-name"), Some("This field is required"));
}

#[test]
fn submit_returns_only_visible_values() {
    let mut state = FormState::for_category(&fixture());
    state
        .on_change("f-name", FieldValue::Text("Ada Lovelace".into()))
        .expect("change");
    state
        .on_change("f-track", FieldValue::Text("backend".into()))
        .expect("change");
    state.toggle_option("f-stack", "rust").expect("toggle");
    // Switching track hides the stack field; its stale value must not be submitted.
    state
        .on_change("f-track", FieldValue::Text("data".into()))
        .expect("change");

    let submitted = state.submit().expect("valid form");
    assert!(submitted.contains("f-name"));
    assert!(submitted.contains("f-track"));
    assert!(!submitted.contains("f-stack"));
}

#[test]
fn unknown_field_changes_are_rejected() {
    let mut state = FormState::for_category(&fixture());
    assert_eq!(
        state.on_change("nope", FieldValue::Boolean(true)),
        Err(RenderError::UnknownField("nope".into()))
    );
}

#[test]
fn payload_renders_as_text_and_json() {
    let category = fixture();
    let mut state = FormState::for_category(&category);
    state
        .on_change("f-relocate", FieldValue::Boolean(true))
        .expect("change");

    let payload = build_render_payload(&category, &state);
    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.progress.total, 6);
    assert_eq!(payload.progress.answered, 1);

    let text = render_text(&payload);
    assert!(text.contains("Category: Internship (internship)"));
    assert!(text.contains("Preferred City [dropdown: Berlin | Lagos | Lima] *"));

    let ui = render_json_ui(&payload);
    assert_eq!(ui["category_id"], "internship");
    let controls = ui["controls"].as_array().expect("controls");
    let city = controls
        .iter()
        .find(|control| control["field_id"] == "f-city")
        .expect("city control");
    assert_eq!(city["control"]["style"], "dropdown");
    assert_eq!(city["status"], "pristine");
    assert!(ui["schema"]["properties"]["f-city"].is_object());

    state.submit().expect_err("city missing");
    let payload = build_render_payload(&category, &state);
    assert_eq!(payload.status, RenderStatus::Invalid);
    let ui = render_json_ui(&payload);
    let name = ui["controls"]
        .as_array()
        .and_then(|controls| controls.iter().find(|c| c["field_id"] == "f-name"))
        .expect("name control");
    assert_eq!(name["flagged"], true);
    assert_eq!(name["error"], "This field is required");
}

#[test]
fn file_values_render_as_picker_selection() {
    let category: CategorySpec = serde_json::from_value(serde_json::json!({
        "id": "scholarship",
        "name": "Scholarship",
        "fields": [
            { "id": "transcript", "label": "Transcript", "type": "file", "required": true }
        ]
    }))
    .expect("deserialize");
    let mut state = FormState::for_category(&category);
    state
        .on_change("transcript", FieldValue::File(FileHandle::named("grades.pdf")))
        .expect("change");
    let control = state.controls().remove(0);
    assert_eq!(
        control.kind,
        ControlKind::FilePicker {
            selected: Some("grades.pdf".into())
        }
    );
    assert!(state.submit().is_ok());
}
