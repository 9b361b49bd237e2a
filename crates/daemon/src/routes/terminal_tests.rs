use xoblas_wire::terminal::TerminalClientMessage;

#[test]
fn command_message_round_trips_through_json() {
    let original = TerminalClientMessage::Command { command: "ls -la".to_string() };
    let json = serde_json::to_string(&original).unwrap();
    let decoded: TerminalClientMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(original, decoded);
}

#[test]
fn resize_message_carries_geometry() {
    let json = r#"{"type":"resize","cols":120,"rows":40}"#;
    let decoded: TerminalClientMessage = serde_json::from_str(json).unwrap();
    assert_eq!(decoded, TerminalClientMessage::Resize { cols: 120, rows: 40 });
}
