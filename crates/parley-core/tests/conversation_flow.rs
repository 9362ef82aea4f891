use parley_core::test_support::MockAssistantClient;
use parley_core::{
    ChatStateRepository, ConversationController, InMemoryStore, JsonFileStore, RequestError,
    RequestStatus, Role, Settlement, SidebarState, Theme,
};

fn in_memory_controller() -> ConversationController {
    ConversationController::load(ChatStateRepository::new(InMemoryStore::new()))
}

fn transcript(ctrl: &ConversationController) -> Vec<(Role, String)> {
    ctrl.current_chat()
        .map(|c| {
            c.messages
                .iter()
                .map(|m| (m.role, m.content.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_hello_scenario() {
    let client = MockAssistantClient::replying("Hi there");
    let mut ctrl = in_memory_controller();

    ctrl.create_new_chat();
    let outgoing = ctrl.send_message("Hello").unwrap();
    let settlement = ctrl.dispatch(&client, outgoing).await;

    assert_eq!(settlement, Settlement::Resolved);
    let chat = ctrl.current_chat().unwrap();
    assert_eq!(chat.title, "Hello");
    assert_eq!(
        transcript(&ctrl),
        vec![
            (Role::User, "Hello".to_string()),
            (Role::Assistant, "Hi there".to_string())
        ]
    );

    let sent = client.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "Hello");
    assert_eq!(sent[0].history.len(), 1);
    assert_eq!(sent[0].history[0].role, Role::User);
}

#[tokio::test]
async fn test_alternating_order_over_several_turns() {
    let client = MockAssistantClient::new();
    let mut ctrl = in_memory_controller();

    for turn in 0..4 {
        client.push_reply(format!("reply {turn}"));
        let outgoing = ctrl.send_message(&format!("question {turn}")).unwrap();
        ctrl.dispatch(&client, outgoing).await;
    }

    let roles: Vec<Role> = transcript(&ctrl).into_iter().map(|(r, _)| r).collect();
    assert_eq!(roles.len(), 8);
    for (i, role) in roles.iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(*role, expected);
    }
    assert_eq!(ctrl.current_chat().unwrap().title, "question 0");
    // The last request carried the full history
    assert_eq!(client.requests()[3].history.len(), 7);
}

#[tokio::test]
async fn test_server_error_then_retry() {
    let client = MockAssistantClient::new();
    client.push_failure(RequestError::Status(500));
    client.push_reply("Recovered answer");
    let mut ctrl = in_memory_controller();

    let outgoing = ctrl.send_message("Hello").unwrap();
    assert_eq!(ctrl.dispatch(&client, outgoing).await, Settlement::Failed);

    let chat = ctrl.current_chat().unwrap();
    assert_eq!(chat.messages.len(), 2);
    let error = &chat.messages[1];
    assert_eq!(error.role, Role::Assistant);
    assert_eq!(error.error, Some(true));
    assert!(error.content.contains("HTTP error! status: 500"));
    assert_eq!(
        ctrl.request_status(),
        &RequestStatus::Failed("HTTP error! status: 500".to_string())
    );

    let retry = ctrl.retry_last_message().unwrap();
    assert_eq!(ctrl.dispatch(&client, retry).await, Settlement::Resolved);

    let chat = ctrl.current_chat().unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].content, "Recovered answer");
    assert_eq!(chat.messages[1].error, None);

    // The retry re-sent the user message with the error removed from history
    let retried = &client.requests()[1];
    assert_eq!(retried.message, "Hello");
    assert_eq!(retried.history.len(), 1);
}

#[tokio::test]
async fn test_cancelled_request_appends_nothing() {
    let client = MockAssistantClient::new();
    client.push_hang();
    let mut ctrl = in_memory_controller();

    let outgoing = ctrl.send_message("Long question").unwrap();
    let ticket_id = outgoing.ticket.id();
    let task_client = client.clone();
    let task = tokio::spawn(async move {
        ConversationController::execute(&task_client, outgoing).await
    });

    assert!(ctrl.cancel_request());
    let completion = task.await.unwrap();
    assert_eq!(completion.ticket_id, ticket_id);
    assert_eq!(completion.result, Err(RequestError::Cancelled));

    let settlement = ctrl.complete_request(completion.ticket_id, completion.result);
    assert_eq!(settlement, Settlement::Stale);
    assert_eq!(transcript(&ctrl).len(), 1);
    assert!(ctrl.drain_notifications().is_empty());
    assert_eq!(ctrl.request_status(), &RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_switching_chats_discards_late_reply() {
    let client = MockAssistantClient::new();
    client.push_hang();
    let mut ctrl = in_memory_controller();

    let other = ctrl.create_new_chat();
    ctrl.create_new_chat();
    let outgoing = ctrl.send_message("Where does this go?").unwrap();
    let origin = outgoing.ticket.chat_id().clone();

    let task_client = client.clone();
    let task = tokio::spawn(async move {
        ConversationController::execute(&task_client, outgoing).await
    });

    assert!(ctrl.select_chat(&other));
    let completion = task.await.unwrap();
    ctrl.complete_request(completion.ticket_id, completion.result);

    assert_eq!(ctrl.chat(&origin).unwrap().messages.len(), 1);
    assert!(ctrl.chat(&other).unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_and_edit_flow() {
    let client = MockAssistantClient::replying("Answer");
    let mut ctrl = in_memory_controller();
    let outgoing = ctrl.send_message("Questoin").unwrap();
    ctrl.dispatch(&client, outgoing).await;

    let chat = ctrl.current_chat().unwrap().clone();
    let (user_id, reply_id) = (chat.messages[0].id.clone(), chat.messages[1].id.clone());

    ctrl.like_message(&reply_id);
    ctrl.dislike_message(&reply_id);
    let reply = ctrl.current_chat().unwrap().messages[1].clone();
    assert_eq!((reply.liked, reply.disliked), (Some(false), Some(true)));

    ctrl.like_message(&reply_id);
    let reply = ctrl.current_chat().unwrap().messages[1].clone();
    assert_eq!((reply.liked, reply.disliked), (Some(true), Some(false)));

    assert!(!ctrl.edit_message(&user_id, ""));
    assert_eq!(transcript(&ctrl)[0].1, "Questoin");
    assert!(ctrl.edit_message(&user_id, "Question"));
    assert_eq!(transcript(&ctrl)[0].1, "Question");
}

#[tokio::test]
async fn test_state_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let client = MockAssistantClient::replying("Persisted reply");

    let (chats_before, current_before) = {
        let store = JsonFileStore::open(tmp.path()).unwrap();
        let mut ctrl = ConversationController::load(ChatStateRepository::new(store));
        let outgoing = ctrl.send_message("Remember me").unwrap();
        ctrl.dispatch(&client, outgoing).await;
        let reply_id = ctrl.current_chat().unwrap().messages[1].id.clone();
        ctrl.like_message(&reply_id);
        ctrl.create_new_chat();
        ctrl.toggle_theme();
        ctrl.toggle_sidebar();
        (ctrl.chats().to_vec(), ctrl.current_chat_id().cloned())
    };

    let store = JsonFileStore::open(tmp.path()).unwrap();
    let ctrl = ConversationController::load(ChatStateRepository::new(store));

    assert_eq!(ctrl.chats().to_vec(), chats_before);
    assert_eq!(ctrl.current_chat_id().cloned(), current_before);
    assert_eq!(ctrl.theme(), Theme::Light);
    assert_eq!(ctrl.sidebar(), SidebarState::Closed);

    let remembered = &ctrl.chats()[1];
    assert_eq!(remembered.title, "Remember me");
    assert!(remembered.messages[1].is_liked());
}

#[tokio::test]
async fn test_delete_all_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let client = MockAssistantClient::replying("bye");

    {
        let store = JsonFileStore::open(tmp.path()).unwrap();
        let mut ctrl = ConversationController::load(ChatStateRepository::new(store));
        let outgoing = ctrl.send_message("hi").unwrap();
        ctrl.dispatch(&client, outgoing).await;
        ctrl.delete_all_chats();
    }

    let store = JsonFileStore::open(tmp.path()).unwrap();
    let ctrl = ConversationController::load(ChatStateRepository::new(store));
    assert!(ctrl.chats().is_empty());
    assert!(ctrl.current_chat().is_none());
}

#[tokio::test]
async fn test_quota_failure_keeps_session_running() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(tmp.path()).unwrap().with_quota(128);
    let mut ctrl = ConversationController::load(ChatStateRepository::new(store));
    let client = MockAssistantClient::replying("x".repeat(500));

    let outgoing = ctrl.send_message("tell me something long").unwrap();
    assert_eq!(ctrl.dispatch(&client, outgoing).await, Settlement::Resolved);
    assert_eq!(transcript(&ctrl).len(), 2);
    assert_eq!(ctrl.drain_notifications()[0].message, "Response received!");
}
