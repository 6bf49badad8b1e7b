use ssh_connect_core::{
    FileBackend, MemoryBackend, ProfileDraft, ProfileStore, ValidationError,
};

mod common;
use common::{fake_backend::FakeBackend, init_test_logging};

fn draft(ip: &str, user: &str) -> ProfileDraft {
    ProfileDraft::new(ip, user)
}

#[test]
fn new_profiles_are_listed_first() {
    init_test_logging();
    let mut store = ProfileStore::open(Box::new(FakeBackend::new()));

    let first = store.add(draft("10.0.0.1", "alice")).unwrap();
    let second = store.add(draft("10.0.0.2", "bob")).unwrap();
    let third = store.add(draft("10.0.0.3", "carol")).unwrap();

    let ids: Vec<&str> = store.list().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(
        ids,
        [third.id.as_str(), second.id.as_str(), first.id.as_str()]
    );
}

#[test]
fn rejected_drafts_leave_the_store_untouched() {
    init_test_logging();
    let backend = FakeBackend::new();
    let mut store = ProfileStore::open(Box::new(backend.clone()));
    store.add(draft("10.0.0.1", "root")).unwrap();

    let err = store.add(draft("999.1.1.1", "root")).unwrap_err();

    assert!(matches!(err, ValidationError::MalformedAddress(_)));
    assert_eq!(store.list().len(), 1);
    assert_eq!(backend.save_history().len(), 1, "nothing persisted on rejection");
}

#[test]
fn remove_deletes_only_the_matching_profile() {
    init_test_logging();
    let mut store = ProfileStore::open(Box::new(FakeBackend::new()));
    let keep = store.add(draft("10.0.0.1", "alice")).unwrap();
    let gone = store.add(draft("10.0.0.2", "bob")).unwrap();

    store.remove(&gone.id);

    assert!(store.list().iter().all(|p| p.id != gone.id));
    assert_eq!(store.list(), std::slice::from_ref(&keep));
    assert!(store.get(&gone.id).is_none());
}

#[test]
fn removing_an_unknown_id_is_a_no_op() {
    init_test_logging();
    let mut store = ProfileStore::open(Box::new(FakeBackend::new()));
    store.add(draft("10.0.0.1", "alice")).unwrap();
    let before = store.list().to_vec();

    store.remove("does-not-exist");
    store.remove("does-not-exist");

    assert_eq!(store.list(), before.as_slice());
}

#[test]
fn every_mutation_persists_the_whole_list() {
    init_test_logging();
    let backend = FakeBackend::new();
    let mut store = ProfileStore::open(Box::new(backend.clone()));

    let a = store.add(draft("10.0.0.1", "alice")).unwrap();
    store.add(draft("10.0.0.2", "bob")).unwrap();
    store.remove(&a.id);

    let history = backend.save_history();
    assert_eq!(history.len(), 3);

    let sizes: Vec<usize> = history
        .iter()
        .map(|payload| {
            serde_json::from_str::<Vec<serde_json::Value>>(payload)
                .expect("payload is a JSON array")
                .len()
        })
        .collect();
    assert_eq!(sizes, [1, 2, 1]);
}

#[test]
fn persisted_records_use_camel_case_and_rfc3339_timestamps() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let mut store = ProfileStore::open(Box::new(backend.clone()));
    let profile = store.add(draft("192.168.1.100", "root")).unwrap();

    let payload = backend.payload().expect("list was persisted");
    let records: Vec<serde_json::Value> = serde_json::from_str(&payload).unwrap();
    let record = &records[0];

    assert_eq!(record["id"], profile.id.as_str());
    assert_eq!(record["name"], "root@192.168.1.100");
    assert_eq!(record["ipAddress"], "192.168.1.100");
    assert_eq!(record["username"], "root");
    assert_eq!(record["port"], 22);
    let created_at = record["createdAt"].as_str().expect("timestamp is a string");
    assert_eq!(
        chrono::DateTime::parse_from_rfc3339(created_at).unwrap(),
        profile.created_at
    );
}

#[test]
fn reopening_restores_identical_profiles() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let saved = {
        let mut store = ProfileStore::open(Box::new(backend.clone()));
        store.add(draft("10.0.0.1", "alice").with_port(2022)).unwrap();
        store
            .add(draft("10.0.0.2", "bob").with_name("staging"))
            .unwrap();
        store.list().to_vec()
    };

    let reopened = ProfileStore::open(Box::new(backend));

    assert_eq!(reopened.list(), saved.as_slice());
    assert_eq!(reopened.list()[0].created_at, saved[0].created_at);
}

#[test]
fn file_backend_round_trip() -> anyhow::Result<()> {
    init_test_logging();
    let dir = tempfile::tempdir()?;

    let saved = {
        let mut store = ProfileStore::open(Box::new(FileBackend::in_dir(dir.path())?));
        store.add(draft("172.16.0.9", "ops"))?;
        store.list().to_vec()
    };

    let backend = FileBackend::in_dir(dir.path())?;
    assert!(backend.path().ends_with("ssh-connections.json"));
    assert!(backend.path().exists());

    let reopened = ProfileStore::open(Box::new(backend));
    assert_eq!(reopened.list(), saved.as_slice());
    Ok(())
}

#[test]
fn missing_file_means_empty_store() -> anyhow::Result<()> {
    init_test_logging();
    let dir = tempfile::tempdir()?;
    let store = ProfileStore::open(Box::new(FileBackend::in_dir(dir.path().join("fresh"))?));
    assert!(store.list().is_empty());
    Ok(())
}

#[test]
fn corrupt_payloads_fail_soft() {
    init_test_logging();
    for payload in ["", "not json", "{\"id\":\"x\"}", "[{\"id\":"] {
        let store = ProfileStore::open(Box::new(FakeBackend::with_payload(payload)));
        assert!(store.list().is_empty(), "payload {payload:?} should load empty");
    }
}

#[test]
fn unreadable_backend_fails_soft() {
    init_test_logging();
    let store = ProfileStore::open(Box::new(FakeBackend::failing_reads()));
    assert!(store.list().is_empty());
}

#[test]
fn malformed_and_duplicate_records_are_skipped() {
    init_test_logging();
    let payload = r#"[
        {"id":"a","name":"web","ipAddress":"10.0.0.1","username":"root","port":22,"createdAt":"2024-05-01T09:30:00Z"},
        {"id":"b","name":"broken","ipAddress":"10.0.0.2","username":"root","port":22,"createdAt":"yesterday"},
        {"id":"a","name":"dupe","ipAddress":"10.0.0.3","username":"root","port":22,"createdAt":"2024-05-02T09:30:00Z"},
        {"id":"p","name":"port zero","ipAddress":"10.0.0.5","username":"root","port":0,"createdAt":"2024-05-01T09:30:00Z"},
        {"id":"i","name":"bad address","ipAddress":"999.1.1.1","username":"root","port":22,"createdAt":"2024-05-01T09:30:00Z"},
        {"id":"u","name":"no user","ipAddress":"10.0.0.6","username":"  ","port":22,"createdAt":"2024-05-01T09:30:00Z"},
        {"id":"x","name":"all wrong","ipAddress":"999.1.1.1","username":"","port":0,"createdAt":"2024-05-01T09:30:00Z"},
        {"id":"c","name":"db","ipAddress":"10.0.0.4","username":"admin","port":2222,"createdAt":"2024-04-30T12:00:00.123Z"}
    ]"#;

    let store = ProfileStore::open(Box::new(FakeBackend::with_payload(payload)));

    let names: Vec<&str> = store.list().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["web", "db"]);
    assert_eq!(store.list()[1].port, 2222);
    assert_eq!(
        store.list()[1].created_at.to_rfc3339(),
        "2024-04-30T12:00:00.123+00:00"
    );
}

#[test]
fn records_without_a_port_load_with_the_default() {
    init_test_logging();
    let payload = r#"[{"id":"old","name":"legacy","ipAddress":"10.9.8.7","username":"pi","createdAt":"2023-01-01T00:00:00Z"}]"#;

    let store = ProfileStore::open(Box::new(FakeBackend::with_payload(payload)));

    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].port, 22);
}

#[test]
fn write_failures_keep_the_in_memory_list() {
    init_test_logging();
    let backend = FakeBackend::failing_writes();
    let mut store = ProfileStore::open(Box::new(backend.clone()));

    let profile = store
        .add(draft("10.0.0.1", "root"))
        .expect("a failed write is not a validation error");

    assert_eq!(store.list()[0], profile);
    assert_eq!(backend.save_history().len(), 1);
    assert!(backend.payload().is_none());
}

#[test]
fn find_matches_id_then_name() {
    init_test_logging();
    let mut store = ProfileStore::open(Box::new(FakeBackend::new()));
    let old = store.add(draft("10.0.0.1", "root").with_name("box")).unwrap();
    let new = store.add(draft("10.0.0.2", "root").with_name("box")).unwrap();

    assert_eq!(store.find(&old.id), Some(&old));
    assert_eq!(store.find("box"), Some(&new), "newest profile wins on name");
    assert_eq!(store.find("nope"), None);
}
