//! Message builders shared by the unit tests.

use chatmine_shared::{AppConfig, ManagerIdentity, Message};
use chatmine_transcript::{Classifier, RawEntry};

pub(crate) fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.managers = vec![
        ManagerIdentity {
            id: "nevo".into(),
            display_name: Some("נבו פרץ".into()),
            names: vec!["Nevo Perets".into()],
        },
        ManagerIdentity {
            id: "hila".into(),
            display_name: None,
            names: vec!["Hila".into()],
        },
    ];
    config
}

pub(crate) fn classifier() -> Classifier {
    Classifier::new(&config()).expect("classifier")
}

pub(crate) fn dated(date: &str, sender: &str, text: &str) -> Message {
    classifier().classify(RawEntry {
        date: date.into(),
        time: "10:00:00".into(),
        sender: sender.into(),
        text: text.into(),
    })
}

/// A message from `sender`; role follows the configured identities.
pub(crate) fn msg(sender: &str, text: &str) -> Message {
    dated("1.2.24", sender, text)
}

/// Same as [`msg`], named for readability at manager call sites.
pub(crate) fn manager(sender: &str, text: &str) -> Message {
    let m = msg(sender, text);
    assert!(m.is_manager, "{sender} is not a configured manager");
    m
}

pub(crate) fn media_msg(sender: &str, filename: &str) -> Message {
    msg(sender, &format!("<מצורף: {filename}>"))
}
