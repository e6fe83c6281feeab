use chrono::{DateTime, Duration, TimeZone, Utc};
use remember_core::{
    ContactStore, MemoryKvRepository, NewContact, NewInteraction, StoreError,
};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

fn stepping_clock(start: DateTime<Utc>, step_seconds: i64) -> impl Fn() -> DateTime<Utc> {
    let ticks = Rc::new(Cell::new(0_i64));
    move || {
        let tick = ticks.get();
        ticks.set(tick + 1);
        start + Duration::seconds(tick * step_seconds)
    }
}

#[test]
fn newest_interaction_is_first() {
    let store = ContactStore::new(MemoryKvRepository::new());
    let ana = store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();

    let first = store
        .add_interaction(&ana.id, NewInteraction::new("2024-05-01", "first trim"))
        .unwrap();
    let second = store
        .add_interaction(&ana.id, NewInteraction::new("2024-06-01", "second trim"))
        .unwrap();

    let reloaded = store.get_contact(&ana.id).unwrap();
    let order = reloaded
        .interactions
        .iter()
        .map(|interaction| interaction.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(order, vec![second.id.clone(), first.id]);
    assert_eq!(reloaded.last_interaction().map(|i| i.id.as_str()), Some(second.id.as_str()));
    assert_eq!(reloaded.interaction_count(), 2);
}

#[test]
fn interaction_ids_are_unique_within_contact() {
    let store = ContactStore::new(MemoryKvRepository::new());
    let ana = store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();

    let ids = (0..30)
        .map(|n| {
            store
                .add_interaction(&ana.id, NewInteraction::new("2024-05-01", format!("visit {n}")))
                .unwrap()
                .id
        })
        .collect::<HashSet<_>>();
    assert_eq!(ids.len(), 30);
}

#[test]
fn interaction_keeps_date_notes_and_tags_verbatim() {
    let store = ContactStore::new(MemoryKvRepository::new());
    let ana = store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();

    let mut fields = NewInteraction::new("2024-05-01", "  talked about her trip  ");
    fields.tags = Some(vec!["travel".to_string()]);
    let logged = store.add_interaction(&ana.id, fields).unwrap();

    assert_eq!(logged.date, "2024-05-01");
    assert_eq!(logged.notes, "  talked about her trip  ");
    assert_eq!(logged.tags.as_deref(), Some(&["travel".to_string()][..]));
}

#[test]
fn add_interaction_to_missing_contact_writes_nothing() {
    let store = ContactStore::new(MemoryKvRepository::new());
    store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();
    let before = store.list_contacts();

    let err = store
        .add_interaction("missing", NewInteraction::new("2024-05-01", "hello"))
        .unwrap_err();
    assert!(matches!(err, StoreError::ContactNotFound(_)));
    assert_eq!(store.list_contacts(), before);
}

#[test]
fn delete_interaction_distinguishes_missing_targets() {
    let store = ContactStore::new(MemoryKvRepository::new());
    let ana = store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();
    let kept = store
        .add_interaction(&ana.id, NewInteraction::new("2024-05-01", "kept"))
        .unwrap();
    let dropped = store
        .add_interaction(&ana.id, NewInteraction::new("2024-05-02", "dropped"))
        .unwrap();

    store.delete_interaction(&ana.id, &dropped.id).unwrap();
    let reloaded = store.get_contact(&ana.id).unwrap();
    assert_eq!(reloaded.interactions, vec![kept]);

    let err = store.delete_interaction(&ana.id, &dropped.id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InteractionNotFound { ref interaction_id, .. } if *interaction_id == dropped.id
    ));

    let err = store.delete_interaction("missing", &dropped.id).unwrap_err();
    assert!(matches!(err, StoreError::ContactNotFound(_)));
}

#[test]
fn every_mutation_advances_updated_at() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let store =
        ContactStore::new(MemoryKvRepository::new()).with_clock(stepping_clock(start, 60));
    let ana = store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap();
    assert_eq!(ana.created_at, "2024-05-01T09:00:00.000Z");

    let logged = store
        .add_interaction(&ana.id, NewInteraction::new("2024-05-01", "trim"))
        .unwrap();
    let after_add = store.get_contact(&ana.id).unwrap();
    assert_eq!(after_add.updated_at, "2024-05-01T09:01:00.000Z");

    store.delete_interaction(&ana.id, &logged.id).unwrap();
    let after_delete = store.get_contact(&ana.id).unwrap();
    assert_eq!(after_delete.updated_at, "2024-05-01T09:02:00.000Z");
    assert_eq!(after_delete.created_at, ana.created_at);
}

#[test]
fn updated_at_does_not_regress_when_clock_goes_back() {
    let late = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let repo = MemoryKvRepository::new();
    let id = {
        let store = ContactStore::new(&repo).with_clock(move || late);
        store.create_contact(NewContact::new("Ana", "Barber", "")).unwrap().id
    };

    let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let store = ContactStore::new(&repo).with_clock(move || early);
    store
        .add_interaction(&id, NewInteraction::new("2020-01-01", "time travel"))
        .unwrap();

    assert_eq!(
        store.get_contact(&id).unwrap().updated_at,
        "2030-01-01T00:00:00.000Z"
    );
}
