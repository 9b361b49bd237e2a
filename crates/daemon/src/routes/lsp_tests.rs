use super::*;

#[test]
fn default_language_is_python() {
    assert_eq!(default_language(), "python");
}

#[test]
fn error_message_is_a_json_text_frame() {
    let message = error_message("boom");
    match message {
        Message::Text(text) => {
            assert!(text.contains("\"type\":\"error\""));
            assert!(text.contains("boom"));
        }
        other => panic!("expected a text frame, got {other:?}"),
    }
}
