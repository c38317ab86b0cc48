use super::*;
use crate::limits::*;

const H: Ms = 3_600_000; // 1 hour in ms
const NOW: Ms = 1_700_000_000_000;

fn test_journal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("listwise_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn list(title: &str, codes: &str) -> ProductList {
    let mut list = ProductList::new(Ulid::new());
    list.title = title.into();
    list.canonical_codes = codes.into();
    list
}

fn action(start: Ms, stop: Ms) -> ScheduledAction {
    let mut action = ScheduledAction::new(Ulid::new(), "log");
    action.start_at = Some(start);
    action.stop_at = Some(stop);
    action
}

// ── Lists ────────────────────────────────────────────────

#[tokio::test]
async fn save_and_load_list() {
    let engine = Engine::new(test_journal_path("save_list.journal")).unwrap();
    let l = list("spring", "A,B");
    engine.save_list(l.clone()).await.unwrap();

    assert_eq!(engine.get_list(&l.id), Some(l.clone()));
    assert_eq!(engine.find_list_by_title("spring"), Some(l.clone()));
    assert_eq!(engine.list_ids(), vec![l.id]);
    assert_eq!(engine.list_count(), 1);
}

#[tokio::test]
async fn blank_title_rejected() {
    let engine = Engine::new(test_journal_path("blank_title.journal")).unwrap();
    let result = engine.save_list(list("  ", "")).await;
    assert!(matches!(result, Err(EngineError::Configuration(_))));
    assert_eq!(engine.list_count(), 0);
}

#[tokio::test]
async fn overlong_title_rejected() {
    let engine = Engine::new(test_journal_path("long_title.journal")).unwrap();
    let result = engine.save_list(list(&"t".repeat(MAX_TITLE_LEN + 1), "")).await;
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
}

#[tokio::test]
async fn title_owned_by_another_list_is_taken() {
    let engine = Engine::new(test_journal_path("title_taken.journal")).unwrap();
    let first = list("spring", "A");
    engine.save_list(first.clone()).await.unwrap();

    let result = engine.save_list(list("spring", "B")).await;
    assert!(matches!(result, Err(EngineError::TitleTaken(t)) if t == "spring"));
    assert_eq!(engine.find_list_by_title("spring").unwrap().id, first.id);
}

#[tokio::test]
async fn renaming_releases_old_title() {
    let engine = Engine::new(test_journal_path("rename.journal")).unwrap();
    let mut l = list("spring", "A");
    engine.save_list(l.clone()).await.unwrap();

    l.title = "summer".into();
    engine.save_list(l.clone()).await.unwrap();
    assert!(engine.find_list_by_title("spring").is_none());
    assert_eq!(engine.find_list_by_title("summer").unwrap().id, l.id);

    // The old title is free for someone else now.
    engine.save_list(list("spring", "B")).await.unwrap();
}

#[tokio::test]
async fn delete_list_frees_title() {
    let engine = Engine::new(test_journal_path("delete_list.journal")).unwrap();
    let l = list("spring", "A");
    engine.save_list(l.clone()).await.unwrap();
    engine.delete_list(l.id).await.unwrap();

    assert!(engine.get_list(&l.id).is_none());
    assert!(engine.find_list_by_title("spring").is_none());
    assert!(matches!(
        engine.delete_list(l.id).await,
        Err(EngineError::NotFound(id)) if id == l.id
    ));
}

#[tokio::test]
async fn delete_locked_list_rejected() {
    let engine = Engine::new(test_journal_path("delete_locked.journal")).unwrap();
    let mut l = list("frozen", "A");
    l.locked = true;
    engine.save_list(l.clone()).await.unwrap();

    assert!(matches!(
        engine.delete_list(l.id).await,
        Err(EngineError::Configuration(_))
    ));
    assert!(engine.get_list(&l.id).is_some());
}

// ── Actions ──────────────────────────────────────────────

#[tokio::test]
async fn save_and_delete_action() {
    let engine = Engine::new(test_journal_path("save_action.journal")).unwrap();
    let a = action(NOW, NOW + H);
    engine.save_action(a.clone()).await.unwrap();
    assert_eq!(engine.get_action(&a.id), Some(a.clone()));
    assert_eq!(engine.action_count(), 1);

    engine.delete_action(a.id).await.unwrap();
    assert!(engine.get_action(&a.id).is_none());
    assert!(matches!(
        engine.delete_action(a.id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn stopped_without_start_is_unrepresentable() {
    let engine = Engine::new(test_journal_path("f_t.journal")).unwrap();
    let mut a = action(NOW, NOW + H);
    a.stopped = true;
    assert!(matches!(
        engine.save_action(a).await,
        Err(EngineError::Configuration(_))
    ));
    assert_eq!(engine.action_count(), 0);
}

#[tokio::test]
async fn action_limits() {
    let engine = Engine::new(test_journal_path("action_limits.journal")).unwrap();

    let mut bad_kind = action(NOW, NOW + H);
    bad_kind.kind = String::new();
    assert!(matches!(
        engine.save_action(bad_kind).await,
        Err(EngineError::LimitExceeded(_))
    ));

    let ancient = action(0, NOW);
    assert!(matches!(
        engine.save_action(ancient).await,
        Err(EngineError::LimitExceeded(_))
    ));

    let mut crowded = action(NOW, NOW + H);
    for _ in 0..=MAX_AFFECTED_LISTS {
        crowded.affected_lists.insert(Ulid::new());
    }
    assert!(matches!(
        engine.save_action(crowded).await,
        Err(EngineError::LimitExceeded(_))
    ));
}

#[tokio::test]
async fn startable_and_stoppable_filters() {
    let engine = Engine::new(test_journal_path("filters.journal")).unwrap();

    let pending_now = action(NOW - H, NOW + H);
    let pending_future = action(NOW + H, NOW + 2 * H);
    let mut active_now = action(NOW - H, NOW + H);
    active_now.started = true;
    let mut active_past = action(NOW - 2 * H, NOW - H);
    active_past.started = true;
    let pending_past = action(NOW - 2 * H, NOW - H);
    let mut ended = action(NOW - 2 * H, NOW - H);
    ended.started = true;
    ended.stopped = true;
    let mut not_ready = action(NOW + H, NOW - H);
    not_ready.force_start_now = true;

    for a in [
        &pending_now,
        &pending_future,
        &active_now,
        &active_past,
        &pending_past,
        &ended,
        &not_ready,
    ] {
        engine.save_action(a.clone()).await.unwrap();
    }

    let startable: Vec<Ulid> = engine.actions_startable_at(NOW).iter().map(|a| a.id).collect();
    assert_eq!(startable, vec![pending_now.id]);

    let mut stoppable: Vec<Ulid> = engine.actions_stoppable_at(NOW).iter().map(|a| a.id).collect();
    stoppable.sort();
    let mut expected = vec![active_past.id, pending_past.id];
    expected.sort();
    assert_eq!(stoppable, expected);
}

#[tokio::test]
async fn actions_for_list_filter() {
    let engine = Engine::new(test_journal_path("for_list.journal")).unwrap();
    let list_id = Ulid::new();
    let mut attached = action(NOW, NOW + H);
    attached.affected_lists.insert(list_id);
    engine.save_action(attached.clone()).await.unwrap();
    engine.save_action(action(NOW, NOW + H)).await.unwrap();

    let found = engine.actions_for_list(&list_id);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, attached.id);
}

// ── Durability ───────────────────────────────────────────

#[tokio::test]
async fn state_survives_restart() {
    let path = test_journal_path("restart.journal");
    let kept = list("kept", "A,B");
    let gone = list("gone", "C");
    let mut a = action(NOW, NOW + H);
    a.affected_lists.insert(kept.id);
    {
        let engine = Engine::new(path.clone()).unwrap();
        engine.save_list(kept.clone()).await.unwrap();
        engine.save_list(gone.clone()).await.unwrap();
        engine.delete_list(gone.id).await.unwrap();
        engine.save_action(a.clone()).await.unwrap();
        a.started = true;
        engine.save_action(a.clone()).await.unwrap();
    }

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.get_list(&kept.id), Some(kept));
    assert!(engine.get_list(&gone.id).is_none());
    assert!(engine.find_list_by_title("gone").is_none());
    assert_eq!(engine.get_action(&a.id), Some(a));
}

#[tokio::test]
async fn compaction_keeps_state_and_resets_counter() {
    let path = test_journal_path("compact.journal");
    let mut l = list("v0", "A");
    {
        let engine = Engine::new(path.clone()).unwrap();
        for i in 1..=5 {
            l.title = format!("v{i}");
            engine.save_list(l.clone()).await.unwrap();
        }
        assert_eq!(engine.appends_since_compact().await.unwrap(), 5);
        engine.compact().await.unwrap();
        assert_eq!(engine.appends_since_compact().await.unwrap(), 0);
        assert_eq!(engine.snapshot().len(), 1);

        l.canonical_codes = "A,B".into();
        engine.save_list(l.clone()).await.unwrap();
    }

    assert_eq!(crate::journal::Journal::replay(&path).unwrap().len(), 2);
    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.get_list(&l.id), Some(l));
    assert_eq!(engine.find_list_by_title("v5").map(|x| x.canonical_codes), Some("A,B".into()));
}

#[tokio::test]
async fn concurrent_saves_share_the_journal() {
    let path = test_journal_path("concurrent.journal");
    let engine = std::sync::Arc::new(Engine::new(path.clone()).unwrap());
    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.save_list(list(&format!("list-{i}"), "A")).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(engine.list_count(), 32);
    assert_eq!(crate::journal::Journal::replay(&path).unwrap().len(), 32);
}
