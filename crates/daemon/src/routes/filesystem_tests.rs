use xoblas_wire::filesystem::{ClientOperation, TranslatedFileChange};

use super::*;

#[test]
fn change_message_wraps_a_single_event_as_a_one_element_batch() {
    let event = ChangeEvent {
        operation: ClientOperation::Create,
        file: TranslatedFileChange {
            operation: ClientOperation::Create,
            path: "/home/termuser/root/a.py".to_string(),
            is_directory: false,
            content: Some("x=1".to_string()),
            content_type: Some("text".to_string()),
            file_info: None,
            old_path: None,
        },
        timestamp: 1_700_000_000.0,
    };

    let message = change_message(event);
    match message {
        FilesystemServerMessage::FilesystemChangeFromContainer { operation, files, source, .. } => {
            assert_eq!(operation, ClientOperation::Create);
            assert_eq!(files.len(), 1);
            assert_eq!(source, "container");
        }
        other => panic!("expected FilesystemChangeFromContainer, got {other:?}"),
    }
}

#[test]
fn now_secs_is_monotonically_reasonable() {
    let a = now_secs();
    let b = now_secs();
    assert!(b >= a);
    assert!(a > 0.0);
}
