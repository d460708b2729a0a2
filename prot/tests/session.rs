//! Sessions driven over a real WebSocket against a scripted in-process server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use message::{Change, DirectLevelChange, Question};
use prot::{
    ChangeForm, Environment, GenerateForm, Launcher, Notice, QuestionBook, SessionState, Update,
    Updates, FALLBACK_ERROR, INTERRUPTED_ERROR, NORMAL_CLOSURE,
};

const TIMEOUT: Duration = Duration::from_secs(5);

enum Step {
    Send(Value),
    Close(CloseCode),
    Hangup,
}

#[derive(Debug)]
struct Seen {
    uri: String,
    request: Value,
    close: Option<u16>,
}

/// Accepts one connection per script, in order.
async fn serve(scripts: Vec<Vec<Step>>) -> (String, mpsc::UnboundedReceiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for script in scripts {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(handle(stream, script, seen_tx.clone()));
        }
    });

    (url, seen_rx)
}

async fn handle(stream: TcpStream, script: Vec<Step>, seen_tx: mpsc::UnboundedSender<Seen>) {
    let (uri_tx, uri_rx) = oneshot::channel();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let _ = uri_tx.send(req.uri().to_string());
        Ok(resp)
    };
    let mut ws = accept_hdr_async(stream, callback).await.unwrap();
    let uri = uri_rx.await.unwrap();

    let request = match ws.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected the request, got {:?}", other),
    };
    let mut seen = Seen {
        uri,
        request,
        close: None,
    };

    for step in script {
        match step {
            Step::Send(value) => ws.send(Message::Text(value.to_string().into())).await.unwrap(),
            Step::Close(code) => ws
                .close(Some(CloseFrame {
                    code,
                    reason: "".into(),
                }))
                .await
                .unwrap(),
            Step::Hangup => {
                drop(ws);
                let _ = seen_tx.send(seen);
                return;
            }
        }
    }

    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Close(frame) = msg {
            seen.close = frame.map(|f| u16::from(f.code));
            break;
        }
    }
    let _ = seen_tx.send(seen);
}

/// Collects updates until the session reports its final state.
async fn finish(updates: &mut Updates) -> (Vec<Update>, SessionState) {
    let mut seen = Vec::new();
    loop {
        let update = timeout(TIMEOUT, updates.recv())
            .await
            .expect("timed out waiting for updates")
            .expect("session ended without a final state");
        if let Update::Finished(state) = update {
            return (seen, state);
        }
        seen.push(update);
    }
}

fn partial(id: &str) -> Step {
    Step::Send(json!({
        "action": "partialQuestionGenerated",
        "partialResponse": { "response": {
            "questionId": id,
            "content": format!("Questão {}", id),
            "options": [{ "text": "A", "correct": true }, { "text": "B", "correct": false }]
        }}
    }))
}

fn text_form() -> GenerateForm {
    GenerateForm {
        custom_input: Some("Camadas do modelo OSI".to_owned()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_generation_streams_questions() {
    let (url, mut seen_rx) = serve(vec![vec![
        Step::Send(json!({
            "action": "questionnaireDetails",
            "questionnaireDetails": { "questionnaireId": "qn-1", "questionnaireStatement": "OSI" }
        })),
        partial("q-1"),
        Step::Send(json!({ "action": "somethingNew" })),
        partial("q-2"),
        partial("q-3"),
        Step::Send(json!({ "action": "questionnaireGenerated" })),
    ]])
    .await;

    let mut launcher = Launcher::new(url, Environment::default());
    let mut updates = launcher.generate(&text_form()).unwrap();
    let (seen_updates, state) = finish(&mut updates).await;

    assert!(!state.in_flight);
    assert_eq!(state.error, None);
    let ids: Vec<_> = state.questions.iter().filter_map(Question::id).collect();
    assert_eq!(ids, ["q-1", "q-2", "q-3"]);
    assert_eq!(state.questionnaire_id.as_deref(), Some("qn-1"));

    assert!(seen_updates.contains(&Update::Notice(Notice::Connected)));
    assert!(seen_updates.contains(&Update::QuestionnaireId("qn-1".to_owned())));
    assert!(seen_updates.contains(&Update::Notice(Notice::QuestionGenerated(3))));
    assert!(seen_updates.contains(&Update::Notice(Notice::Generated)));

    let seen = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
    let key = seen.request["key"].as_str().unwrap();
    assert!(key.starts_with("key-"));
    assert!(seen.uri.ends_with(&format!("?key={}", key)));
    assert_eq!(seen.request["action"], "generateQuestionnaire");
    assert_eq!(seen.request["customInput"], "Camadas do modelo OSI");
    assert_eq!(seen.close, Some(NORMAL_CLOSURE));

    // The session task ends without another final state.
    while let Ok(Some(update)) = timeout(TIMEOUT, updates.recv()).await {
        assert!(!matches!(update, Update::Finished(_)), "{:?}", update);
    }
}

#[tokio::test]
async fn test_service_error_closes_channel() {
    let (url, mut seen_rx) = serve(vec![vec![Step::Send(
        json!({ "action": "error", "message": "bad input" }),
    )]])
    .await;

    let mut launcher = Launcher::new(url, Environment::default());
    let mut updates = launcher.generate(&text_form()).unwrap();
    let (seen_updates, state) = finish(&mut updates).await;

    assert_eq!(state.error.as_deref(), Some("bad input"));
    assert!(!state.in_flight);
    assert!(seen_updates.contains(&Update::Notice(Notice::Failed("bad input".to_owned()))));

    let seen = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(seen.close, Some(NORMAL_CLOSURE));
}

#[tokio::test]
async fn test_abnormal_close_reports_interruption() {
    let (url, _seen_rx) = serve(vec![vec![partial("q-1"), Step::Close(CloseCode::Error)]]).await;

    let mut launcher = Launcher::new(url, Environment::default());
    let mut updates = launcher.generate(&text_form()).unwrap();
    let (_, state) = finish(&mut updates).await;

    assert_eq!(state.error.as_deref(), Some(INTERRUPTED_ERROR));
    assert_eq!(state.questions.len(), 1);
    assert!(!state.in_flight);
}

#[tokio::test]
async fn test_hangup_without_close_frame() {
    let (url, _seen_rx) = serve(vec![vec![Step::Hangup]]).await;

    let mut launcher = Launcher::new(url, Environment::default());
    let mut updates = launcher.generate(&text_form()).unwrap();
    let (_, state) = finish(&mut updates).await;

    assert!(state.error.is_some_and(|e| !e.is_empty()));
    assert!(!state.in_flight);
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    drop(listener);

    let mut launcher = Launcher::new(url, Environment::default());
    let mut updates = launcher.generate(&text_form()).unwrap();
    let (seen_updates, state) = finish(&mut updates).await;

    assert!(!seen_updates.contains(&Update::Notice(Notice::Connected)));
    assert_eq!(state.error.as_deref(), Some(FALLBACK_ERROR));
    assert!(!state.in_flight);
}

#[tokio::test]
async fn test_change_question_merges_by_id() {
    let updated = json!({ "questionId": "q-2", "content": "Versão mais difícil" });
    let (url, mut seen_rx) = serve(vec![vec![
        Step::Send(json!({ "action": "questionChangedSuccess" })),
        Step::Send(json!({ "action": "questionChanged", "question": updated })),
    ]])
    .await;

    let mut book = QuestionBook::new(vec![
        Question::new(json!({ "questionId": "q-1", "content": "um" })),
        Question::new(json!({ "questionId": "q-2", "content": "dois" })),
    ]);

    let mut launcher = Launcher::new(url, Environment::default());
    let form = ChangeForm {
        question_id: "q-2".to_owned(),
        questionnaire_id: "qn-1".to_owned(),
        change: Change::Direct(DirectLevelChange::Harder),
    };
    let mut updates = launcher.change(&form).unwrap();
    let (seen_updates, state) = finish(&mut updates).await;

    assert_eq!(state.error, None);
    assert!(seen_updates.contains(&Update::Acknowledged));
    for update in &seen_updates {
        if let Update::QuestionChanged(q) = update {
            assert!(book.merge(q));
        }
    }
    assert_eq!(book.get("q-2").unwrap().content(), Some("Versão mais difícil"));
    assert_eq!(book.get("q-1").unwrap().content(), Some("um"));

    let seen = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(seen.request["action"], "changeQuestion");
    assert_eq!(seen.request["directLevelChange"], "harder");
    assert_eq!(seen.request["levelChange"], "");
}

#[tokio::test]
async fn test_new_operation_closes_previous_session() {
    let (url, mut seen_rx) = serve(vec![
        vec![],
        vec![partial("q-1"), Step::Send(json!({ "action": "questionnaireGenerated" }))],
    ])
    .await;

    let mut launcher = Launcher::new(url, Environment::default());

    let mut first = launcher.generate(&text_form()).unwrap();
    let first_key = launcher.current().unwrap().key().clone();
    let connected = timeout(TIMEOUT, first.recv()).await.unwrap().unwrap();
    assert_eq!(connected, Update::Notice(Notice::Connected));

    let mut second = launcher.generate(&text_form()).unwrap();
    let second_key = launcher.current().unwrap().key().clone();
    assert_ne!(first_key, second_key);

    let (_, first_state) = finish(&mut first).await;
    assert!(!first_state.in_flight);
    assert_eq!(first_state.error, None);

    let (_, second_state) = finish(&mut second).await;
    assert_eq!(second_state.questions.len(), 1);
    assert!(first_state.questions.is_empty());

    for _ in 0..2 {
        let seen = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(seen.close, Some(NORMAL_CLOSURE), "{:?}", seen);
    }

    launcher.shutdown().await;
}
