use tempfile::TempDir;

use student_records::{
    validate, RawStudent, StoreError, StudentChanges, StudentDraft, StudentStore,
};

fn draft(roll: &str, name: &str, course: &str, marks: &str) -> StudentDraft {
    validate(&RawStudent::from_fields([
        ("roll", roll),
        ("name", name),
        ("course", course),
        ("marks", marks),
    ]))
    .expect("valid draft")
}

fn seeded(rows: &[(&str, &str, &str, &str)]) -> StudentStore {
    let store = StudentStore::open_in_memory().expect("store");
    for (roll, name, course, marks) in rows {
        store
            .create(&draft(roll, name, course, marks))
            .expect("create");
    }
    store
}

#[test]
fn create_read_count_delete_walkthrough() {
    let store = StudentStore::open_in_memory().expect("store");

    store
        .create(&draft("101", "Asha", "MCA", "75"))
        .expect("create");
    let asha = store.read("101").expect("read");
    assert_eq!(asha.roll, "101");
    assert_eq!(asha.name, "Asha");
    assert_eq!(store.count().expect("count"), 1);

    assert_eq!(store.delete("101").expect("delete"), 1);
    assert!(matches!(store.read("101"), Err(StoreError::NotFound(roll)) if roll == "101"));
    assert_eq!(store.count().expect("count"), 0);
}

#[test]
fn created_record_reads_back_normalized() {
    let store = StudentStore::open_in_memory().expect("store");
    let created = store
        .create(&draft(" 0042 ", "  Ravi   Kumar ", " B.Sc ", "07"))
        .expect("create");

    let read = store.read("0042").expect("read");
    assert_eq!(created, read);
    assert_eq!(read.name, "Ravi Kumar");
    assert_eq!(read.course, "B.Sc");
    assert_eq!(read.marks, 7);
    assert!(!read.created_at.is_empty());
}

#[test]
fn duplicate_roll_is_rejected_and_store_unchanged() {
    let store = seeded(&[("101", "Asha", "MCA", "75")]);

    let err = store
        .create(&draft("101", "Bilal", "BBA", "40"))
        .expect_err("duplicate");
    assert!(matches!(err, StoreError::DuplicateKey(ref roll) if roll == "101"));

    assert_eq!(store.count().expect("count"), 1);
    assert_eq!(store.read("101").expect("read").name, "Asha");
}

#[test]
fn update_of_missing_roll_is_not_found() {
    let store = seeded(&[("101", "Asha", "MCA", "75")]);
    let changes = StudentChanges::from_draft("999", &draft("999", "Nobody", "MCA", "10"))
        .expect("changes");

    let err = store.update("999", &changes).expect_err("missing");
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(store.count().expect("count"), 1);
    assert_eq!(store.read("101").expect("read").name, "Asha");
}

#[test]
fn update_writes_only_changed_fields() {
    let store = seeded(&[("101", "Asha", "MCA", "75")]);
    let before = store.read("101").expect("read");

    let changes =
        StudentChanges::between(&before, &draft("101", "Asha", "M.Tech", "75")).expect("changes");
    assert_eq!(changes.name(), None);
    assert_eq!(changes.course(), Some("M.Tech"));

    let after = store.update("101", &changes).expect("update");
    assert_eq!(after.course, "M.Tech");
    assert_eq!(after.name, before.name);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn changes_for_a_different_roll_are_refused() {
    let err = StudentChanges::from_draft("101", &draft("102", "Asha", "MCA", "75"))
        .expect_err("roll mismatch");
    assert!(err.for_field(student_records::Field::Roll).is_some());
}

#[test]
fn delete_of_missing_roll_is_not_found() {
    let store = StudentStore::open_in_memory().expect("store");
    assert!(matches!(store.delete("5"), Err(StoreError::NotFound(_))));
}

#[test]
fn search_matches_name_case_insensitively() {
    let store = seeded(&[
        ("1", "Alice", "MCA", "80"),
        ("2", "Kalinda", "BBA", "55"),
        ("3", "Bob", "MCA", "61"),
        ("4", "ALISON", "B.Sc", "90"),
    ]);

    let names: Vec<String> = store
        .search("ali")
        .expect("search")
        .into_iter()
        .map(|student| student.name)
        .collect();
    assert_eq!(names, ["Alice", "ALISON", "Kalinda"]);
}

#[test]
fn search_matches_roll_numbers_and_ignores_course() {
    let store = seeded(&[
        ("1001", "Asha", "MCA", "80"),
        ("2002", "Bilal", "MCA", "55"),
    ]);

    let by_roll = store.search("100").expect("search");
    assert_eq!(by_roll.len(), 1);
    assert_eq!(by_roll[0].roll, "1001");

    assert!(store.search("mca").expect("search").is_empty());
    assert_eq!(store.search("   ").expect("search").len(), 2);
}

#[test]
fn listing_is_ordered_by_name_then_roll() {
    let store = seeded(&[
        ("3", "bob", "MCA", "10"),
        ("2", "Asha", "MCA", "20"),
        ("1", "Bob", "MCA", "30"),
    ]);

    let rolls: Vec<String> = store
        .all()
        .expect("all")
        .into_iter()
        .map(|student| student.roll)
        .collect();
    assert_eq!(rolls, ["2", "1", "3"]);
}

#[test]
fn pages_split_results_and_clamp_past_the_end() {
    let rows: Vec<(String, String)> = (0..7)
        .map(|i| (format!("{}", 10 + i), format!("Student {}", char::from(b'a' + i))))
        .collect();
    let store = StudentStore::open_in_memory().expect("store");
    for (roll, name) in &rows {
        store.create(&draft(roll, name, "MCA", "50")).expect("create");
    }

    let first = store.page("", 0, 3).expect("page");
    assert_eq!(first.page_count, 3);
    assert_eq!(first.total, 7);
    assert_eq!(first.students.len(), 3);

    let clamped = store.page("", 10, 3).expect("page");
    assert_eq!(clamped.page, 2);
    assert_eq!(clamped.students.len(), 1);
    assert_eq!(clamped.students[0].roll, "16");

    let empty = store.page("nobody", 0, 3).expect("page");
    assert_eq!(empty.page_count, 1);
    assert!(empty.students.is_empty());
}

#[test]
fn stats_summarise_courses_and_marks() {
    let store = seeded(&[
        ("1", "Asha", "MCA", "100"),
        ("2", "Bilal", "MCA", "95"),
        ("3", "Chen", "BBA", "40"),
        ("4", "Dana", "B.Sc", "0"),
    ]);

    let stats = store.stats().expect("stats");
    assert_eq!(stats.total, 4);
    assert_eq!(stats.average_marks, Some(58.75));

    let courses: Vec<(&str, usize)> = stats
        .per_course
        .iter()
        .map(|entry| (entry.course.as_str(), entry.students))
        .collect();
    assert_eq!(courses, [("B.Sc", 1), ("BBA", 1), ("MCA", 2)]);

    assert_eq!(stats.marks_histogram[0], 1);
    assert_eq!(stats.marks_histogram[4], 1);
    assert_eq!(stats.marks_histogram[9], 2);
    assert_eq!(stats.marks_histogram.iter().sum::<usize>(), 4);
}

#[test]
fn stats_of_an_empty_store() {
    let store = StudentStore::open_in_memory().expect("store");
    let stats = store.stats().expect("stats");
    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_marks, None);
    assert!(stats.per_course.is_empty());
}

#[test]
fn records_survive_close_and_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("nested").join("students.sqlite");

    let store = StudentStore::open(&path).expect("open");
    store
        .create(&draft("101", "Asha", "MCA", "75"))
        .expect("create");
    assert_eq!(store.path(), Some(path.as_path()));
    store.close().expect("close");

    let reopened = StudentStore::open(&path).expect("reopen");
    assert_eq!(reopened.read("101").expect("read").name, "Asha");
}
