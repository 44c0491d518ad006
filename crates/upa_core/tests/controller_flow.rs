use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use upa_core::{
    Confirmation, DirectoryError, DraftField, Edition, ErrorKind, GatewayError, GatewayResult,
    IdentifierKind, LocalGateway, MessageTone, NewUser, UserDirectoryController, UserDraft,
    UserGateway, UserId, UserRecord, UserUpdate, GENERIC_FAILURE,
};

/// Local store that records every call and can be told to fail one operation.
#[derive(Debug)]
struct ScriptedGateway {
    inner: LocalGateway,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, GatewayError>>,
}

impl ScriptedGateway {
    fn seeded(records: Vec<UserRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalGateway::with_records(records),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        })
    }

    fn fail(&self, operation: &'static str, err: GatewayError) {
        self.failures.lock().unwrap().insert(operation, err);
    }

    fn heal(&self, operation: &'static str) {
        self.failures.lock().unwrap().remove(operation);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, operation: &'static str) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(operation);
        match self.failures.lock().unwrap().get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UserGateway for ScriptedGateway {
    async fn list(&self) -> GatewayResult<Vec<UserRecord>> {
        self.enter("list")?;
        self.inner.list().await
    }

    async fn create(&self, user: &NewUser) -> GatewayResult<Confirmation> {
        self.enter("create")?;
        self.inner.create(user).await
    }

    async fn update(&self, update: &UserUpdate) -> GatewayResult<Confirmation> {
        self.enter("update")?;
        self.inner.update(update).await
    }

    async fn delete(&self, id: UserId) -> GatewayResult<Confirmation> {
        self.enter("delete")?;
        self.inner.delete(id).await
    }
}

fn record(id: UserId, name: &str, login: &str) -> UserRecord {
    UserRecord {
        id,
        name: name.to_string(),
        login: login.to_string(),
        role: None,
        created_at: None,
    }
}

fn seed() -> Vec<UserRecord> {
    vec![
        record(1, "Ana Silva", "ana.silva"),
        record(2, "Joao Souza", "joao"),
        record(7, "Maria Lima", "maria.lima"),
    ]
}

async fn controller_with(
    records: Vec<UserRecord>,
) -> (Arc<ScriptedGateway>, UserDirectoryController<ScriptedGateway>) {
    let gateway = ScriptedGateway::seeded(records);
    let controller = UserDirectoryController::init(gateway.clone(), IdentifierKind::Login).await;
    (gateway, controller)
}

fn fill(controller: &UserDirectoryController<ScriptedGateway>, name: &str, login: &str, credential: &str) {
    controller.update_field(DraftField::Name, name);
    controller.update_field(DraftField::Login, login);
    controller.update_field(DraftField::Credential, credential);
}

#[tokio::test]
async fn init_loads_records_newest_first() {
    let (gateway, controller) = controller_with(seed()).await;

    let snapshot = controller.snapshot();
    let ids = snapshot.records.iter().map(|r| r.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![7, 2, 1]);
    assert!(!snapshot.loading);
    assert!(snapshot.message.is_none());
    assert_eq!(gateway.calls(), vec!["list"]);
}

#[tokio::test]
async fn empty_required_field_never_reaches_the_gateway() {
    let (gateway, controller) = controller_with(seed()).await;

    for (name, login, credential) in [
        ("", "carla", "12345678"),
        ("Carla", "   ", "12345678"),
        ("Carla", "carla", ""),
    ] {
        controller.cancel_edit();
        fill(&controller, name, login, credential);
        let err = controller.save().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let message = controller.snapshot().message.unwrap();
        assert_eq!(message.tone, MessageTone::Failure);
        assert_eq!(message.title, "Could not save");
    }

    assert_eq!(gateway.calls(), vec!["list"]);
}

#[tokio::test]
async fn first_violated_rule_is_reported() {
    let (gateway, controller) = controller_with(seed()).await;
    fill(&controller, "Al", "ab", "1234567");

    let err = controller.save().await.unwrap_err();
    assert_eq!(
        err,
        DirectoryError::Validation(upa_core::ValidationError::NameTooShort)
    );
    let message = controller.snapshot().message.unwrap();
    assert!(message.description.contains("at least 3"));
    assert_eq!(gateway.calls(), vec!["list"]);
}

#[tokio::test]
async fn login_collision_is_rejected_after_normalization() {
    let (gateway, controller) = controller_with(seed()).await;
    fill(&controller, "Another Ana", "  ANA.SILVA ", "12345678");

    let err = controller.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uniqueness);
    let snapshot = controller.snapshot();
    assert!(snapshot.message.unwrap().is_failure());
    assert_eq!(snapshot.draft.login, "  ANA.SILVA ");
    assert_eq!(gateway.calls(), vec!["list"]);
}

#[tokio::test]
async fn editing_keeps_own_login_without_collision() {
    let (gateway, controller) = controller_with(seed()).await;
    let ana = controller.snapshot().records.into_iter().find(|r| r.id == 1).unwrap();

    controller.start_edit(&ana);
    controller.update_field(DraftField::Name, "Ana Maria Silva");
    controller.save().await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.edition, Edition::Creating);
    let updated = snapshot.records.iter().find(|r| r.id == 1).unwrap();
    assert_eq!(updated.name, "Ana Maria Silva");
    assert_eq!(updated.login, "ana.silva");
    assert_eq!(gateway.calls(), vec!["list", "update", "list"]);
}

#[tokio::test]
async fn editing_into_another_records_login_is_rejected() {
    let (gateway, controller) = controller_with(seed()).await;
    let ana = controller.snapshot().records.into_iter().find(|r| r.id == 1).unwrap();

    controller.start_edit(&ana);
    controller.update_field(DraftField::Login, "Joao");
    let err = controller.save().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Uniqueness);
    assert_eq!(controller.snapshot().edition, Edition::Editing(1));
    assert_eq!(gateway.calls(), vec!["list"]);
}

#[tokio::test]
async fn successful_create_resets_form_and_resynchronizes() {
    let (gateway, controller) = controller_with(seed()).await;
    fill(&controller, "  Carla Dias ", "Carla.Dias", "s3cret-pass");
    controller.update_field(DraftField::Role, " nurse ");

    let confirmation = controller.save().await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.draft, UserDraft::default());
    assert_eq!(snapshot.edition, Edition::Creating);
    let message = snapshot.message.unwrap();
    assert_eq!(message.tone, MessageTone::Success);
    assert_eq!(message.description, confirmation.message);

    let created = snapshot
        .records
        .iter()
        .find(|r| r.id == confirmation.id)
        .unwrap();
    assert_eq!(created.name, "Carla Dias");
    assert_eq!(created.login, "carla.dias");
    assert_eq!(created.role.as_deref(), Some("nurse"));
    assert_eq!(gateway.calls(), vec!["list", "create", "list"]);
}

#[tokio::test]
async fn gateway_failure_on_save_keeps_draft_for_retry() {
    let (gateway, controller) = controller_with(seed()).await;
    gateway.fail("create", GatewayError::Storage("disk I/O error".to_string()));
    fill(&controller, "Carla Dias", "carla.dias", "s3cret-pass");

    let err = controller.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gateway);

    let snapshot = controller.snapshot();
    let message = snapshot.message.unwrap();
    assert_eq!(message.description, GENERIC_FAILURE);
    assert!(!message.description.contains("disk"));
    assert_eq!(snapshot.draft.login, "carla.dias");
    assert_eq!(snapshot.edition, Edition::Creating);
    assert_eq!(snapshot.records.len(), 3);

    gateway.heal("create");
    controller.save().await.unwrap();
    assert_eq!(controller.snapshot().records.len(), 4);
}

#[tokio::test]
async fn rejected_save_surfaces_gateway_text_verbatim() {
    let (gateway, controller) = controller_with(seed()).await;
    gateway.fail("create", GatewayError::Rejected("Invalid data".to_string()));
    fill(&controller, "Carla Dias", "carla.dias", "s3cret-pass");

    controller.save().await.unwrap_err();
    assert_eq!(controller.snapshot().message.unwrap().description, "Invalid data");
}

#[tokio::test]
async fn start_edit_blanks_credential_and_clears_message() {
    let (_gateway, controller) = controller_with(seed()).await;
    fill(&controller, "", "", "");
    controller.save().await.unwrap_err();
    assert!(controller.snapshot().message.is_some());

    let mut maria = record(7, "Maria Lima", "maria.lima");
    maria.role = Some("admin".to_string());
    controller.update_field(DraftField::Credential, "left-over-secret");
    controller.start_edit(&maria);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.edition, Edition::Editing(7));
    assert_eq!(snapshot.draft.name, "Maria Lima");
    assert_eq!(snapshot.draft.role, "admin");
    assert!(snapshot.draft.credential.is_empty());
    assert!(snapshot.message.is_none());
    assert_eq!(snapshot.form_title(), "Edit user");
    assert_eq!(snapshot.submit_label(), "Update");
}

#[tokio::test]
async fn cancel_edit_restores_empty_draft_regardless_of_record() {
    let (_gateway, controller) = controller_with(seed()).await;
    let records = controller.snapshot().records;

    for target in &records {
        controller.start_edit(target);
        controller.update_field(DraftField::Credential, "new-password");
        controller.cancel_edit();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.draft, UserDraft::default());
        assert_eq!(snapshot.edition, Edition::Creating);
        assert_eq!(snapshot.records, records);
        assert_eq!(snapshot.form_title(), "Create user");
    }
}

#[tokio::test]
async fn cancel_edit_does_not_touch_the_message() {
    let (_gateway, controller) = controller_with(seed()).await;
    fill(&controller, "Al", "", "");
    controller.save().await.unwrap_err();
    let message = controller.snapshot().message;
    assert!(message.is_some());

    controller.cancel_edit();
    assert_eq!(controller.snapshot().message, message);

    controller.clear_message();
    assert!(controller.snapshot().message.is_none());
}

#[tokio::test]
async fn remove_of_edited_record_leaves_edit_mode() {
    let (gateway, controller) = controller_with(seed()).await;
    controller.start_edit(&record(2, "Joao Souza", "joao"));

    controller.remove(2).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.edition, Edition::Creating);
    assert_eq!(snapshot.draft, UserDraft::default());
    assert!(snapshot.records.iter().all(|r| r.id != 2));
    let message = snapshot.message.unwrap();
    assert_eq!(message.tone, MessageTone::Success);
    assert_eq!(message.title, "User removed");
    assert_eq!(gateway.calls(), vec!["list", "delete", "list"]);
}

#[tokio::test]
async fn remove_of_other_record_keeps_edit_mode() {
    let (_gateway, controller) = controller_with(seed()).await;
    controller.start_edit(&record(2, "Joao Souza", "joao"));

    controller.remove(1).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.edition, Edition::Editing(2));
    assert_eq!(snapshot.draft.login, "joao");
}

#[tokio::test]
async fn failed_delete_leaves_records_untouched() {
    let (gateway, controller) = controller_with(seed()).await;
    gateway.fail("delete", GatewayError::Transport("channel closed".to_string()));
    let before = controller.snapshot().records;

    let err = controller.remove(7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gateway);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.records, before);
    let message = snapshot.message.unwrap();
    assert_eq!(message.tone, MessageTone::Failure);
    assert!(message.description.contains("maria.lima"));
    assert!(message.description.contains(GENERIC_FAILURE));
    assert!(!message.description.contains("channel closed"));
}

#[tokio::test]
async fn delete_of_unknown_id_reports_not_found() {
    let (_gateway, controller) = controller_with(seed()).await;

    let err = controller.remove(99).await.unwrap_err();
    assert_eq!(err, DirectoryError::Gateway(GatewayError::NotFound(99)));
    let message = controller.snapshot().message.unwrap();
    assert!(message.description.contains("#99"));
    assert!(message.description.contains("was not found"));
}

#[tokio::test]
async fn failed_load_keeps_previous_records() {
    let (gateway, controller) = controller_with(seed()).await;
    let before = controller.snapshot().records;
    gateway.fail("list", GatewayError::Storage("database is locked".to_string()));

    controller.load().await.unwrap_err();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.records, before);
    assert!(!snapshot.loading);
    let message = snapshot.message.unwrap();
    assert_eq!(message.title, "Could not load users");
    assert_eq!(message.description, GENERIC_FAILURE);
}

#[tokio::test]
async fn failed_initial_load_leaves_empty_collection_usable() {
    let gateway = ScriptedGateway::seeded(seed());
    gateway.fail("list", GatewayError::Transport("offline".to_string()));
    let controller = UserDirectoryController::init(gateway.clone(), IdentifierKind::Login).await;

    assert!(controller.snapshot().records.is_empty());
    assert!(controller.snapshot().message.unwrap().is_failure());

    gateway.heal("list");
    controller.load().await.unwrap();
    assert_eq!(controller.snapshot().records.len(), 3);
}

#[tokio::test]
async fn subscribers_see_changes_and_dropping_them_is_harmless() {
    let (_gateway, controller) = controller_with(seed()).await;
    let mut receiver = controller.subscribe();

    controller.update_field(DraftField::Name, "Bea");
    assert!(receiver.has_changed().unwrap());
    assert_eq!(receiver.borrow_and_update().draft.name, "Bea");

    drop(receiver);
    controller.update_field(DraftField::Name, "Beatriz");
    controller.load().await.unwrap();
    assert_eq!(controller.snapshot().draft.name, "Beatriz");
}

#[tokio::test]
async fn email_directories_validate_email_shape() {
    let gateway = Arc::new(LocalGateway::with_records(vec![record(
        1,
        "Ana Silva",
        "ana.silva@exemplo.com",
    )]));
    let controller = UserDirectoryController::init(gateway, IdentifierKind::Email).await;

    controller.update_field(DraftField::Name, "Joao Souza");
    controller.update_field(DraftField::Login, "joao.souza");
    controller.update_field(DraftField::Credential, "12345678");
    let err = controller.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    controller.update_field(DraftField::Login, "Ana.Silva@Exemplo.com");
    let err = controller.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uniqueness);

    controller.update_field(DraftField::Login, "Joao.Souza@Exemplo.com");
    controller.save().await.unwrap();
    assert!(controller
        .snapshot()
        .records
        .iter()
        .any(|r| r.login == "joao.souza@exemplo.com"));
}
