use student_records::{
    validate, Change, History, RawStudent, StoreError, Student, StudentChanges, StudentDraft,
    StudentStore,
};

fn draft(roll: &str, name: &str, marks: &str) -> StudentDraft {
    validate(&RawStudent {
        roll: roll.to_string(),
        name: name.to_string(),
        course: "MCA".to_string(),
        marks: marks.to_string(),
    })
    .expect("valid draft")
}

fn create(store: &StudentStore, history: &mut History, roll: &str, name: &str) -> Student {
    let student = store.create(&draft(roll, name, "70")).expect("create");
    history.record(Change::Created(student.clone()));
    student
}

#[test]
fn undo_and_redo_of_a_create() {
    let store = StudentStore::open_in_memory().expect("store");
    let mut history = History::new();
    let asha = create(&store, &mut history, "101", "Asha");

    let undone = history.undo(&store).expect("undo");
    assert_eq!(undone, Change::Created(asha.clone()));
    assert!(matches!(store.read("101"), Err(StoreError::NotFound(_))));

    history.redo(&store).expect("redo");
    assert_eq!(store.read("101").expect("read"), asha);
}

#[test]
fn undo_of_an_update_restores_every_field() {
    let store = StudentStore::open_in_memory().expect("store");
    let mut history = History::new();
    let before = create(&store, &mut history, "101", "Asha");

    let changes = StudentChanges::between(&before, &draft("101", "Asha Rao", "88")).expect("diff");
    let after = store.update("101", &changes).expect("update");
    history.record(Change::Updated {
        before: before.clone(),
        after: after.clone(),
    });

    history.undo(&store).expect("undo");
    assert_eq!(store.read("101").expect("read"), before);

    history.redo(&store).expect("redo");
    assert_eq!(store.read("101").expect("read"), after);
}

#[test]
fn undo_of_a_delete_keeps_the_creation_time() {
    let store = StudentStore::open_in_memory().expect("store");
    let mut history = History::new();
    let asha = create(&store, &mut history, "101", "Asha");

    store.delete("101").expect("delete");
    history.record(Change::Deleted(asha.clone()));

    history.undo(&store).expect("undo");
    let restored = store.read("101").expect("read");
    assert_eq!(restored.created_at, asha.created_at);
    assert_eq!(restored, asha);
}

#[test]
fn undo_walks_back_through_several_changes() {
    let store = StudentStore::open_in_memory().expect("store");
    let mut history = History::new();
    create(&store, &mut history, "1", "Asha");
    create(&store, &mut history, "2", "Bilal");
    create(&store, &mut history, "3", "Chen");

    while history.can_undo() {
        history.undo(&store).expect("undo");
    }
    assert_eq!(store.count().expect("count"), 0);
    assert!(matches!(history.undo(&store), Err(StoreError::NothingToUndo)));

    while history.can_redo() {
        history.redo(&store).expect("redo");
    }
    assert_eq!(store.count().expect("count"), 3);
    assert!(matches!(history.redo(&store), Err(StoreError::NothingToRedo)));
}

#[test]
fn undo_fails_cleanly_when_the_roll_was_reused() {
    let store = StudentStore::open_in_memory().expect("store");
    let mut history = History::new();
    let asha = create(&store, &mut history, "101", "Asha");
    store.delete("101").expect("delete");
    history.record(Change::Deleted(asha));

    // Someone else takes the roll number outside of the history.
    store
        .create(&draft("101", "Imposter", "10"))
        .expect("create");

    assert!(matches!(
        history.undo(&store),
        Err(StoreError::DuplicateKey(_))
    ));
    assert!(history.can_undo());
    assert_eq!(store.read("101").expect("read").name, "Imposter");
}
