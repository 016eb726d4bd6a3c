use agenticlaw_core::{NodeId, Observation, ObservationContent, Message, ProjectId};
use agenticlaw_storage::{SqliteStorage, StorageBackend, StorageError};
use std::collections::BTreeMap;

fn store() -> SqliteStorage {
    SqliteStorage::open_in_memory().expect("open in-memory store")
}

#[tokio::test]
async fn kg_entity_relationship_round_trip() {
    let store = store();
    let project_id = ProjectId::generate();
    let node_id = NodeId::generate();
    let kg_id = store.kg_ensure(&project_id, &node_id).await.unwrap();

    let mut props = BTreeMap::new();
    props.insert("role".to_string(), "protagonist".to_string());
    store.kg_add_entity(kg_id, "Alice", &props).await.unwrap();
    store.kg_add_entity(kg_id, "Bob", &BTreeMap::new()).await.unwrap();

    // duplicate entity rejected
    let err = store.kg_add_entity(kg_id, "Alice", &BTreeMap::new()).await;
    assert!(matches!(err, Err(StorageError::DuplicateEntity)));

    store
        .kg_add_relationship(kg_id, "Alice", "knows", "Bob", &BTreeMap::new())
        .await
        .unwrap();

    // duplicate relationship rejected
    let err = store
        .kg_add_relationship(kg_id, "Alice", "knows", "Bob", &BTreeMap::new())
        .await;
    assert!(matches!(err, Err(StorageError::DuplicateRelationship)));

    // relationship referencing unknown entity rejected
    let err = store
        .kg_add_relationship(kg_id, "Alice", "knows", "Carol", &BTreeMap::new())
        .await;
    assert!(matches!(err, Err(StorageError::EntityNotFound)));

    let snapshot = store
        .kg_load_full(&project_id, &node_id)
        .await
        .unwrap()
        .expect("kg exists");
    assert_eq!(snapshot.entities.len(), 2);
    assert_eq!(snapshot.relationships.len(), 1);

    store.kg_remove_entity(kg_id, "Alice").await.unwrap();
    let snapshot = store.kg_load_full(&project_id, &node_id).await.unwrap().unwrap();
    assert_eq!(snapshot.entities.len(), 1);
    assert_eq!(snapshot.relationships.len(), 0, "incident relationship cascades");
}

#[tokio::test]
async fn memory_stream_search_and_accessed_refresh() {
    let store = store();
    let project_id = ProjectId::generate();
    let node_id = NodeId::generate();
    let ms_id = store.ms_ensure(&project_id, &node_id).await.unwrap();

    let obs_a = Observation::new(
        ObservationContent::Message(Message::new("user", "the cat sat on the mat")),
        vec![1.0, 0.0, 0.0],
        0.5,
    );
    let obs_b = Observation::new(
        ObservationContent::Message(Message::new("user", "quarterly revenue report")),
        vec![0.0, 1.0, 0.0],
        0.5,
    );
    let id_a = store.ms_add_observation(ms_id, &obs_a).await.unwrap();
    let _id_b = store.ms_add_observation(ms_id, &obs_b).await.unwrap();

    let results = store
        .ms_search(ms_id, &[1.0, 0.0, 0.0], 1, None, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, Some(id_a));

    let recent = store.ms_get_recent(ms_id, 10).await.unwrap();
    assert_eq!(recent.len(), 2, "both observations retained chronologically");

    store.ms_update_accessed(&[id_a]).await.unwrap();
}

#[tokio::test]
async fn kg_entity_not_found_on_missing_update() {
    let store = store();
    let project_id = ProjectId::generate();
    let node_id = NodeId::generate();
    let kg_id = store.kg_ensure(&project_id, &node_id).await.unwrap();
    let err = store
        .kg_update_entity_properties(kg_id, "Nobody", &BTreeMap::new())
        .await;
    assert!(matches!(err, Err(StorageError::EntityNotFound)));
}

#[tokio::test]
async fn project_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("project.db");

    let project_id = ProjectId::generate();
    {
        let store = SqliteStorage::open(&db_path).unwrap();
        let mut project = agenticlaw_core::Project::default();
        project.id = project_id.clone();
        project.name = "Persisted".to_string();
        store.save_project(&project).await.unwrap();
    }

    let store = SqliteStorage::open(&db_path).unwrap();
    let loaded = store.get_project(&project_id).await.unwrap().expect("project persisted");
    assert_eq!(loaded.name, "Persisted");
}

#[tokio::test]
async fn delete_project_cascades_kg_and_memory() {
    let store = store();
    let project_id = ProjectId::generate();
    let node_id = NodeId::generate();

    let kg_id = store.kg_ensure(&project_id, &node_id).await.unwrap();
    store
        .kg_add_entity(kg_id, "Solo", &BTreeMap::new())
        .await
        .unwrap();

    let ms_id = store.ms_ensure(&project_id, &node_id).await.unwrap();
    let obs = Observation::new(
        ObservationContent::Message(Message::new("user", "hello")),
        vec![1.0, 0.0],
        0.1,
    );
    store.ms_add_observation(ms_id, &obs).await.unwrap();

    store.delete_project(&project_id).await.unwrap();

    assert!(!store.project_exists(&project_id).await.unwrap());
    assert!(store
        .kg_load_full(&project_id, &node_id)
        .await
        .unwrap()
        .is_none());
}
