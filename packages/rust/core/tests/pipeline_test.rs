//! End-to-end runs of the mine pipeline against the fixture transcript.

use std::path::{Path, PathBuf};

use chatmine_core::{
    ExtractionMode, MergePolicy, MineConfig, SilentProgress, compute_stats, load_transcript,
    run_mine,
};
use chatmine_shared::{AppConfig, KnowledgeItem, KnowledgeType, ManagerIdentity};
use chatmine_transcript::Classifier;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("chatmine-pipeline-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.managers = vec![
        ManagerIdentity {
            id: "nevo".into(),
            display_name: Some("נבו פרץ".into()),
            names: vec!["Nevo Perets".into()],
        },
        ManagerIdentity {
            id: "hila".into(),
            display_name: Some("הילה".into()),
            names: vec!["Hila".into()],
        },
    ];
    config
}

fn mine_config(dir: &Path, policy: MergePolicy) -> MineConfig {
    let kb = dir.join("whatsapp-faqs.json");
    std::fs::copy(fixture("knowledge.fixture.json"), &kb).unwrap();
    MineConfig {
        transcript: fixture("sample_chat.txt"),
        knowledge_base: kb,
        mode: ExtractionMode::All,
        policy,
        analytics: Some(dir.join("all-conversations.json")),
        dry_run: false,
    }
}

fn read_items(path: &Path) -> Vec<KnowledgeItem> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn parses_fixture_transcript() {
    let config = app_config();
    let classifier = Classifier::new(&config).unwrap();
    let report = load_transcript(&fixture("sample_chat.txt"), &config, &classifier).unwrap();

    assert_eq!(report.messages.len(), 17);
    assert_eq!(report.suppressed, 2);
    assert_eq!(report.skipped_lines, 1);
    assert_eq!(report.manager_messages(), 8);

    let instructions = &report.messages[7];
    assert_eq!(
        instructions.text,
        "הנחיות לסגירת משמרת ערב:\n1. לספור את הקופה\n2. לנעול את המחסן"
    );

    let media = &report.messages[4];
    assert_eq!(
        media.media.as_ref().and_then(|m| m.filename.as_deref()),
        Some("price-list.pdf")
    );

    let stats = compute_stats(&report, &config, 5);
    assert_eq!(stats.first_date.as_deref(), Some("1.3.24"));
    assert_eq!(stats.last_date.as_deref(), Some("3.3.24"));
    assert_eq!(stats.messages_per_manager[0].id, "nevo");
    assert_eq!(stats.messages_per_manager[0].messages, 7);
}

#[test]
fn mine_appends_new_items_and_keeps_existing() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Append);

    let result = run_mine(&config, &app_config(), &SilentProgress).unwrap();

    assert_eq!(result.messages, 17);
    assert_eq!(result.pairs, 8);
    assert_eq!(
        result.candidates,
        vec![
            (ExtractionMode::RepeatedAnswers, 2),
            (ExtractionMode::Instructions, 3),
            (ExtractionMode::OperationalFaq, 6),
        ]
    );
    assert_eq!(result.merge.retained, 2);
    assert_eq!(result.merge.added, 8);
    assert_eq!(result.merge.duplicates, 3);
    assert_eq!(result.total_items, 10);

    let items = read_items(&config.knowledge_base);
    assert_eq!(items.len(), 10);

    // Curated upload survives byte-for-byte (as JSON).
    let original: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture("knowledge.fixture.json")).unwrap())
            .unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.knowledge_base).unwrap()).unwrap();
    assert_eq!(written[0], original[0]);
    assert_eq!(written[1], original[1]);

    let receipt = items
        .iter()
        .find(|i| i.kind == KnowledgeType::Instruction && i.frequency == Some(3))
        .expect("repeated instruction");
    assert_eq!(receipt.title, "נא לשלוח קבלה בסוף משמרת");

    let price_list = items
        .iter()
        .find(|i| i.answer_type.as_deref() == Some("document"))
        .expect("media answer");
    assert_eq!(price_list.kind, KnowledgeType::RepeatedAnswer);
    assert_eq!(price_list.manager_name.as_deref(), Some("מנהלים שונים"));
    assert_eq!(price_list.frequency, Some(2));

    let summary = result.knowledge_base.expect("written");
    assert_eq!(summary.sha256.len(), 64);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn second_run_changes_nothing() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Append);

    let first = run_mine(&config, &app_config(), &SilentProgress).unwrap();
    let second = run_mine(&config, &app_config(), &SilentProgress).unwrap();

    assert_eq!(second.merge.added, 0);
    assert_eq!(second.total_items, first.total_items);
    assert_eq!(
        second.knowledge_base.map(|s| s.sha256),
        first.knowledge_base.map(|s| s.sha256)
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn rebuild_keeps_only_curated_existing_items() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Rebuild);

    let result = run_mine(&config, &app_config(), &SilentProgress).unwrap();
    assert_eq!(result.merge.retained, 1);
    assert_eq!(result.merge.dropped, 1);
    assert_eq!(result.merge.added, 9);

    let items = read_items(&config.knowledge_base);
    assert_eq!(items[0].kind, KnowledgeType::Document);
    assert_eq!(items[1].kind, KnowledgeType::RepeatedAnswer);
    assert_eq!(items[1].frequency, Some(3));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analytics_lists_every_manager_pair() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Append);
    run_mine(&config, &app_config(), &SilentProgress).unwrap();

    let path = config.analytics.as_ref().unwrap();
    let log: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(log["total"], 8);
    assert_eq!(log["conversations"][0]["id"], "conv-1");
    assert_eq!(
        log["conversations"][0]["question"],
        "מה עושים עם הקבלות של הבוקר?"
    );
    assert_eq!(log["conversations"][1]["isMedia"], true);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn dry_run_writes_nothing() {
    let dir = temp_dir();
    let mut config = mine_config(&dir, MergePolicy::Append);
    config.dry_run = true;
    let before = std::fs::read_to_string(&config.knowledge_base).unwrap();

    let result = run_mine(&config, &app_config(), &SilentProgress).unwrap();
    assert!(result.knowledge_base.is_none());
    assert_eq!(result.merge.added, 8);
    assert_eq!(std::fs::read_to_string(&config.knowledge_base).unwrap(), before);
    assert!(!config.analytics.as_ref().unwrap().exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn no_managers_mines_nothing() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Append);

    let result = run_mine(&config, &AppConfig::default(), &SilentProgress).unwrap();
    assert_eq!(result.pairs, 0);
    assert_eq!(result.merge.added, 0);
    assert_eq!(result.total_items, 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn corrupt_knowledge_base_aborts_without_writing() {
    let dir = temp_dir();
    let config = mine_config(&dir, MergePolicy::Append);
    std::fs::write(&config.knowledge_base, "[{\"title\": ").unwrap();

    let err = run_mine(&config, &app_config(), &SilentProgress).unwrap_err();
    assert!(err.to_string().contains("whatsapp-faqs.json"));
    assert_eq!(
        std::fs::read_to_string(&config.knowledge_base).unwrap(),
        "[{\"title\": "
    );

    std::fs::remove_dir_all(&dir).ok();
}
