use proptest::prelude::*;

use student_records::{validate, Field, RawStudent, StoreError, StudentStore};

fn roll_strategy() -> impl Strategy<Value = String> {
    "[0-9]{1,12}"
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z .-]{0,40}"
}

fn course_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 .]{0,30}"
}

fn valid_student() -> impl Strategy<Value = RawStudent> {
    (
        roll_strategy(),
        name_strategy(),
        course_strategy(),
        0u8..=100,
    )
        .prop_map(|(roll, name, course, marks)| RawStudent {
            roll,
            name,
            course,
            marks: marks.to_string(),
        })
}

fn field_strategy() -> impl Strategy<Value = Field> {
    prop_oneof![
        Just(Field::Roll),
        Just(Field::Name),
        Just(Field::Course),
        Just(Field::Marks),
    ]
}

proptest! {
    #[test]
    fn valid_field_sets_always_validate(raw in valid_student()) {
        let draft = validate(&raw).expect("valid input");
        prop_assert_eq!(draft.roll(), raw.roll.as_str());
        prop_assert_eq!(draft.marks().to_string(), raw.marks.clone());
        prop_assert!(!draft.name().starts_with(' '));
        prop_assert!(!draft.name().ends_with(' '));
        prop_assert!(!draft.name().contains("  "));
    }

    #[test]
    fn a_blank_required_field_is_reported(
        raw in valid_student(),
        field in field_strategy(),
        blank in "[ \t]{0,3}",
    ) {
        let mut raw = raw;
        *raw.value_mut(field) = blank;

        let errors = validate(&raw).expect_err("missing field");
        prop_assert!(errors.for_field(field).is_some());
        prop_assert_eq!(errors.errors().len(), 1);
    }

    #[test]
    fn marks_above_the_limit_are_rejected(raw in valid_student(), marks in 101u32..100_000) {
        let mut raw = raw;
        raw.marks = marks.to_string();
        let errors = validate(&raw).expect_err("out of range");
        prop_assert!(errors.for_field(Field::Marks).is_some());
    }

    #[test]
    fn create_then_read_round_trips(raw in valid_student()) {
        let store = StudentStore::open_in_memory().expect("store");
        let draft = validate(&raw).expect("valid input");

        let created = store.create(&draft).expect("create");
        let read = store.read(draft.roll()).expect("read");
        prop_assert_eq!(&created, &read);
        prop_assert_eq!(read.name.as_str(), draft.name());
        prop_assert_eq!(read.course.as_str(), draft.course());
        prop_assert_eq!(read.marks, draft.marks());

        let again = store.create(&draft);
        prop_assert!(matches!(again, Err(StoreError::DuplicateKey(_))));
        prop_assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn search_agrees_with_a_plain_filter(
        names in prop::collection::vec(name_strategy(), 1..12),
        query in "[a-zA-Z]{1,3}",
    ) {
        let store = StudentStore::open_in_memory().expect("store");
        for (idx, name) in names.iter().enumerate() {
            let raw = RawStudent {
                roll: (idx + 1).to_string(),
                name: name.clone(),
                course: "MCA".to_string(),
                marks: "50".to_string(),
            };
            store.create(&validate(&raw).expect("valid")).expect("create");
        }

        let needle = query.to_lowercase();
        let mut expected: Vec<String> = store
            .all()
            .expect("all")
            .into_iter()
            .filter(|student| student.name.to_lowercase().contains(&needle))
            .map(|student| student.roll)
            .collect();
        let mut found: Vec<String> = store
            .search(&query)
            .expect("search")
            .into_iter()
            .map(|student| student.roll)
            .collect();
        expected.sort();
        found.sort();
        prop_assert_eq!(found, expected);
    }
}
