use resource_sample::clients::{AnimalClient, AnimalError, UserClient};
use resource_sample::getters::animals::GET_ANIMAL;
use resource_sample::lifecycle::ResourceSystem;
use resource_sample::model::{User, ANIMALS, RETRIEVE_ONE, RETRIEVE_USERS, USERS};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use with_resources::mock::MockDataManager;
use with_resources::{
    AjaxPayload, Cargo, FetchError, GlobalState, OperationDescriptor, OperationOptions,
    OperationState, OperationStatus, RegisterOptions, ResourceBinding, ResourceClient,
    ResourceType, Settings,
};

fn animals() -> ResourceType {
    ResourceType::from(ANIMALS)
}

fn users() -> ResourceType {
    ResourceType::from(USERS)
}

fn fox() -> Cargo {
    AnimalClient::cargo("fox")
}

fn mocked_system(animals: &MockDataManager, users: &MockDataManager) -> ResourceSystem {
    ResourceSystem::from_config(
        ResourceSystem::config(Settings::default())
            .data_manager(ANIMALS, animals.clone())
            .data_manager(USERS, users.clone()),
    )
    .expect("Failed to configure system")
}

fn descriptor(resource_type: &str, cargo: &Cargo) -> OperationDescriptor {
    OperationDescriptor::new(resource_type, cargo.method.clone(), cargo.input.clone())
}

async fn settle(binding: &mut ResourceBinding) {
    while binding.status().loading != Some(false) {
        binding.changed().await.expect("Store closed");
    }
}

fn operation(state: &GlobalState, resource_type: &ResourceType, cargo: &Cargo) -> Option<OperationState> {
    state
        .get_operation(resource_type, &cargo.method, &cargo.input)
        .cloned()
}

/// Full end-to-end run against the sample data managers.
#[tokio::test(start_paused = true)]
async fn test_fox_binding_transitions() {
    let system = ResourceSystem::new(Settings::default()).expect("Failed to start system");
    assert!(system.resources.getters_loaded().await);

    let mut binding = system.binding(vec![descriptor(ANIMALS, &fox()).autorun()]);
    let before = binding.status();
    assert_eq!(before.loading, Some(true));
    assert_eq!(before.success, None);

    binding.mount().await.expect("Failed to mount");
    let loading = operation(&system.store.state(), &animals(), &fox()).expect("Operation missing");
    assert_eq!(loading.status, OperationStatus::loading());
    assert_eq!(loading.meta.render_count, 1);

    settle(&mut binding).await;
    let status = binding.status();
    assert_eq!(status.success, Some(true));
    assert_eq!(status.error, "");

    let done = operation(&system.store.state(), &animals(), &fox()).expect("Operation missing");
    assert_eq!(done.status, OperationStatus::succeeded());
    assert_eq!(done.data, Some(json!({ "image": "fox.png" })));
    assert!(done.meta.last_ajax_success.is_some());

    let getters = system.resources.getters_of(&animals()).expect("Getters missing");
    assert_eq!(
        getters.get(GET_ANIMAL, &system.store.state(), &fox().input),
        Some(json!("fox.png"))
    );

    binding.unmount().await.expect("Failed to unmount");
    system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test(start_paused = true)]
async fn test_two_bindings_share_one_fetch() {
    let animals_dm = MockDataManager::new();
    let users_dm = MockDataManager::new();
    users_dm
        .expect_fetch(RETRIEVE_USERS)
        .delay(Duration::from_millis(100))
        .return_ok(json!({ "users": [{ "firstName": "John", "lastName": "Smith", "email": "john.smith@withResources.com" }] }));
    let system = mocked_system(&animals_dm, &users_dm);

    let page = UserClient::cargo(1, 10);
    let mut first = system.binding(vec![descriptor(USERS, &page).autorun()]);
    let mut second = system.binding(vec![descriptor(USERS, &page).autorun()]);
    first.mount().await.unwrap();
    second.mount().await.unwrap();

    settle(&mut first).await;
    settle(&mut second).await;
    assert_eq!(first.status().success, Some(true));
    assert_eq!(second.status().success, Some(true));

    let shared = operation(&system.store.state(), &users(), &page).unwrap();
    assert_eq!(shared.meta.render_count, 2);
    let users: Vec<User> = serde_json::from_value(shared.data.unwrap()["users"].clone()).unwrap();
    assert_eq!(users[0].first_name, "John");

    assert_eq!(users_dm.calls(), 1);
    users_dm.verify();

    first.unmount().await.unwrap();
    second.unmount().await.unwrap();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejection_is_recorded_as_failure() {
    let animals_dm = MockDataManager::new();
    animals_dm
        .expect_fetch(RETRIEVE_ONE)
        .return_err(FetchError::failed("timeout"));
    let system = mocked_system(&animals_dm, &MockDataManager::new());

    let mut binding = system.binding(vec![descriptor(ANIMALS, &fox()).autorun()]);
    binding.mount().await.unwrap();
    settle(&mut binding).await;

    let failed = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(failed.status.loading, Some(false));
    assert_eq!(failed.status.success, Some(false));
    assert_eq!(failed.status.error.as_deref(), Some("timeout"));
    assert_eq!(failed.data, None);

    let status = binding.status();
    assert_eq!(status.success, Some(false));
    assert_eq!(status.error, "Got error in animals.retrieveOne");

    // The store keeps serving after a failed fetch.
    assert!(system.store.get_state().await.is_ok());
    let getters = system.resources.getters_of(&animals()).unwrap();
    assert!(system.resources.getters_loaded().await);
    assert_eq!(
        getters.get(GET_ANIMAL, &system.store.state(), &fox().input),
        Some(json!(" "))
    );

    binding.unmount().await.unwrap();
    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_typed_client_reports_fetch_errors() {
    let animals_dm = MockDataManager::new();
    animals_dm
        .expect_fetch(RETRIEVE_ONE)
        .return_err(FetchError::failed("timeout"));
    let system = mocked_system(&animals_dm, &MockDataManager::new());

    let result = system.animal_client.retrieve_one("fox").await;
    assert_eq!(result, Err(AnimalError::Fetch("timeout".to_string())));
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_clear_cache_forces_a_fresh_call() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox-1.png" }));
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox-2.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let client = &system.animal_client;

    assert_eq!(client.retrieve_one("fox").await.unwrap(), "fox-1.png");
    // Memoized: no second call.
    assert_eq!(client.retrieve_one("fox").await.unwrap(), "fox-1.png");
    assert_eq!(animals_dm.calls(), 1);

    client.clear_cache(None).await.unwrap();
    assert_eq!(client.retrieve_one("fox").await.unwrap(), "fox-2.png");
    assert_eq!(animals_dm.calls(), 2);

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_register_keeps_mounted_state() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let creators = system.resources.action_creators_of(&animals()).unwrap();

    system
        .store
        .dispatch(creators.register(fox(), RegisterOptions::default()))
        .await
        .unwrap();
    let settled = system.animal_client.wait_settled(&fox()).await.unwrap();
    assert_eq!(settled.status, OperationStatus::succeeded());

    system
        .store
        .dispatch(creators.register(fox(), RegisterOptions::default()))
        .await
        .unwrap();
    let again = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(again.status, OperationStatus::succeeded());
    assert_eq!(again.data, settled.data);
    assert_eq!(again.meta.render_count, 2);

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hot_register_fetches_again_when_asked() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox-2.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let creators = system.resources.action_creators_of(&animals()).unwrap();
    let options = RegisterOptions {
        ajax_on_hot_register: true,
        ..RegisterOptions::default()
    };

    system.store.dispatch(creators.register(fox(), options)).await.unwrap();
    let first = system.animal_client.wait_settled(&fox()).await.unwrap();
    assert_eq!(first.data, Some(json!({ "image": "fox.png" })));

    system.store.dispatch(creators.register(fox(), options)).await.unwrap();
    let refetching = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(refetching.status, OperationStatus::loading());
    assert_eq!(refetching.meta.render_count, 2);

    let second = system.animal_client.wait_settled(&fox()).await.unwrap();
    assert_eq!(second.data, Some(json!({ "image": "fox-2.png" })));
    assert_eq!(animals_dm.calls(), 2);

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_register_after_failure_fetches_again() {
    let animals_dm = MockDataManager::new();
    animals_dm
        .expect_fetch(RETRIEVE_ONE)
        .return_err(FetchError::failed("timeout"));
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let creators = system.resources.action_creators_of(&animals()).unwrap();

    system
        .store
        .dispatch(creators.register(fox(), RegisterOptions::default()))
        .await
        .unwrap();
    let failed = system.animal_client.wait_settled(&fox()).await.unwrap();
    assert_eq!(failed.status, OperationStatus::failed("timeout"));

    system
        .store
        .dispatch(creators.register(fox(), RegisterOptions::default()))
        .await
        .unwrap();
    let recovered = system.animal_client.wait_settled(&fox()).await.unwrap();
    assert_eq!(recovered.status, OperationStatus::succeeded());
    assert_eq!(recovered.meta.render_count, 2);
    assert_eq!(animals_dm.calls(), 2);

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_input_change_onto_mounted_operation_does_not_refetch() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "cat.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let cat = AnimalClient::cargo("cat");
    let options = OperationOptions {
        autorun: true,
        run_on_input_change: true,
        ..OperationOptions::default()
    };

    let mut foxes = system.binding(vec![descriptor(ANIMALS, &fox()).autorun()]);
    foxes.mount().await.unwrap();
    settle(&mut foxes).await;

    let mut picker = system.binding(vec![descriptor(ANIMALS, &cat).with_options(options)]);
    picker.mount().await.unwrap();
    settle(&mut picker).await;
    assert_eq!(animals_dm.calls(), 2);

    picker
        .update(vec![descriptor(ANIMALS, &fox()).with_options(options)])
        .await
        .unwrap();
    let shared = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(shared.status, OperationStatus::succeeded());
    assert_eq!(shared.meta.render_count, 2);
    assert_eq!(picker.status().success, Some(true));
    assert_eq!(picker.status().loading, Some(false));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(animals_dm.calls(), 2);
    animals_dm.verify();

    foxes.unmount().await.unwrap();
    picker.unmount().await.unwrap();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_last_deregister_resets_once() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());
    let creators = system.resources.action_creators_of(&animals()).unwrap();
    let options = RegisterOptions {
        reset_on_last_deregister: true,
        ..RegisterOptions::default()
    };

    let registrations = vec![creators.register(fox(), options); 3];
    system.store.dispatch_all(registrations).await.unwrap();
    system.animal_client.wait_settled(&fox()).await.unwrap();

    let deregistrations = vec![creators.deregister(fox(), options); 2];
    system.store.dispatch_all(deregistrations).await.unwrap();
    let still_mounted = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(still_mounted.meta.render_count, 1);
    assert_eq!(still_mounted.meta.last_reset, None);
    assert!(still_mounted.data.is_some());

    system
        .store
        .dispatch(creators.deregister(fox(), options))
        .await
        .unwrap();
    let reset = operation(&system.store.state(), &animals(), &fox()).unwrap();
    assert_eq!(reset.meta.render_count, 0);
    assert!(reset.meta.last_reset.is_some());
    assert_eq!(reset.status, OperationStatus::default());
    assert_eq!(reset.data, None);

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_result_after_reset_is_discarded() {
    let animals_dm = MockDataManager::new();
    animals_dm
        .expect_fetch(RETRIEVE_ONE)
        .delay(Duration::from_secs(1))
        .return_ok(json!({ "image": "fox.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());

    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let payload = AjaxPayload::new(fox()).on_success(move |_| flag.store(true, Ordering::SeqCst));
    system.animal_client.ajax(payload).await.unwrap();
    system.animal_client.reset(fox()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    // Round trip through the mailbox so the late result has been processed.
    let state = system.store.get_state().await.unwrap();
    let entry = operation(&state, &animals(), &fox()).unwrap();
    assert_eq!(entry.status, OperationStatus::default());
    assert_eq!(entry.data, None);
    assert!(entry.meta.last_reset.is_some());
    assert!(!called.load(Ordering::SeqCst));

    animals_dm.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_success_callback_sees_committed_data() {
    let animals_dm = MockDataManager::new();
    animals_dm.expect_fetch(RETRIEVE_ONE).return_ok(json!({ "image": "fox.png" }));
    let system = mocked_system(&animals_dm, &MockDataManager::new());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let store = system.store.clone();
    let payload = AjaxPayload::new(fox()).on_success(move |event| {
        let committed = operation(&store.state(), &animals(), &event.cargo);
        let _ = tx.send((event.data, committed));
    });
    system.animal_client.ajax(payload).await.unwrap();

    let (data, committed) = rx.recv().await.expect("Callback never ran");
    assert_eq!(data, json!({ "retrieveOne": { "image": "fox.png" } }));
    let committed = committed.expect("Result not committed before callback");
    assert_eq!(committed.status, OperationStatus::succeeded());
    assert_eq!(committed.data, Some(json!({ "image": "fox.png" })));

    drop(rx);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unmount_deregisters_each_operation_once() {
    let animals_dm = MockDataManager::new();
    let users_dm = MockDataManager::new();
    let system = mocked_system(&animals_dm, &users_dm);

    let page = UserClient::cargo(1, 10);
    let manual = OperationOptions::default();
    let mut binding = system.binding(vec![
        descriptor(ANIMALS, &fox()).with_options(manual),
        descriptor(USERS, &page).with_options(manual),
        descriptor(USERS, &page).with_options(manual),
    ]);
    binding.mount().await.unwrap();

    let state = system.store.state();
    assert_eq!(operation(&state, &animals(), &fox()).unwrap().meta.render_count, 1);
    assert_eq!(operation(&state, &users(), &page).unwrap().meta.render_count, 1);

    binding.unmount().await.unwrap();
    let state = system.store.state();
    assert_eq!(operation(&state, &animals(), &fox()).unwrap().meta.render_count, 0);
    assert_eq!(operation(&state, &users(), &page).unwrap().meta.render_count, 0);

    // Non-autorun operations never fetch.
    assert_eq!(animals_dm.calls() + users_dm.calls(), 0);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropped_binding_still_deregisters() {
    let system = mocked_system(&MockDataManager::new(), &MockDataManager::new());

    let mut binding = system.binding(vec![descriptor(ANIMALS, &fox())]);
    binding.mount().await.unwrap();
    drop(binding);

    let state = system
        .store
        .wait_for(|state| {
            state
                .get_operation(&animals(), RETRIEVE_ONE, &fox().input)
                .is_some_and(|op| op.meta.render_count == 0)
        })
        .await
        .unwrap();
    assert!(operation(&state, &animals(), &fox()).is_some());
    system.shutdown().await.unwrap();
}
