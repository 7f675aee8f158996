//! End-to-end protocol scenarios driven through the public `Session` API.

use warroom_core::{SchedulerState, Session, SessionConfig};
use warroom_proto::{
    BusError, MessageDraft, MessageType, ParticipantId, ParticipantState, QuestionStatus,
    Recipient,
};

fn session() -> Session {
    Session::new(SessionConfig::default()).unwrap()
}

fn intro(from: ParticipantId) -> MessageDraft {
    MessageDraft::new(
        from,
        Recipient::All,
        MessageType::Introduction,
        format!("{from} joining the war room"),
    )
}

fn introduce_all(session: &Session) {
    for id in ParticipantId::AGENTS {
        session.submit(intro(id)).unwrap();
    }
}

#[test]
fn first_five_non_system_messages_are_ordered_introductions() {
    let session = session();

    session
        .submit(MessageDraft::new(
            ParticipantId::System,
            Recipient::All,
            MessageType::System,
            "session opened",
        ))
        .unwrap();

    introduce_all(&session);

    let non_system: Vec<_> = session
        .transcript()
        .into_iter()
        .filter(|m| m.from != ParticipantId::System)
        .collect();
    assert_eq!(non_system.len(), 5);

    let expected = [
        ParticipantId::Market,
        ParticipantId::Strategy,
        ParticipantId::Risk,
        ParticipantId::Executor,
        ParticipantId::Explainer,
    ];
    for (message, expected_from) in non_system.iter().zip(expected) {
        assert_eq!(message.kind, MessageType::Introduction);
        assert_eq!(message.from, expected_from);
    }
}

#[test]
fn introduction_question_scenario() {
    let session = session();

    // Market introduces itself with a question for the user.
    let msg = session
        .submit(intro(ParticipantId::Market).with_question(Some(vec![
            "aggressive".to_string(),
            "conservative".to_string(),
        ])))
        .unwrap();
    let question = msg.question.expect("embedded question");

    assert_eq!(session.state(), SchedulerState::AwaitingAnswer);

    // Progression is blocked until the answer arrives.
    let err = session.submit(intro(ParticipantId::Strategy)).unwrap_err();
    assert!(matches!(err, BusError::Rejected(_)));

    let answered = session.answer(question.id, "aggressive").unwrap();
    assert_eq!(answered.status, QuestionStatus::Answered);
    assert_eq!(session.state(), SchedulerState::Introduction);

    // Risk before strategy is still out of order.
    let err = session.submit(intro(ParticipantId::Risk)).unwrap_err();
    assert!(matches!(err, BusError::Rejected(_)));

    session.submit(intro(ParticipantId::Strategy)).unwrap();
}

#[test]
fn hold_on_interrupt_scenario() {
    let session = session();
    introduce_all(&session);
    assert_eq!(session.state(), SchedulerState::OpenDiscussion);

    session
        .submit(MessageDraft::new(
            ParticipantId::User,
            Recipient::All,
            MessageType::UserInput,
            "hold on, I want lower risk",
        ))
        .unwrap();

    for id in ParticipantId::AGENTS {
        assert_eq!(
            session.participant_state(id).unwrap(),
            ParticipantState::Paused
        );
    }

    let risk_note = MessageDraft::new(
        ParticipantId::Risk,
        Recipient::All,
        MessageType::RiskAssessment,
        "rebalancing toward bonds",
    );
    let err = session.submit(risk_note.clone()).unwrap_err();
    assert!(matches!(err, BusError::Rejected(_)));

    session.resume().unwrap();
    session.submit(risk_note).unwrap();
}

#[test]
fn resume_without_pause_is_an_error() {
    let session = session();
    introduce_all(&session);

    let err = session.resume().unwrap_err();
    assert!(matches!(err, BusError::NotPaused));
    assert_eq!(session.state(), SchedulerState::OpenDiscussion);
}

#[test]
fn double_interrupt_holds_a_single_pause() {
    let session = session();
    introduce_all(&session);

    session.interrupt(ParticipantId::User).unwrap();
    session.interrupt(ParticipantId::User).unwrap();

    session.resume().unwrap();
    assert_eq!(session.state(), SchedulerState::OpenDiscussion);

    // The second interrupt was a no-op, so a second resume has nothing left.
    let err = session.resume().unwrap_err();
    assert!(matches!(err, BusError::NotPaused));
}

#[test]
fn question_answer_is_one_to_one() {
    let session = session();
    let msg = session
        .submit(intro(ParticipantId::Market).with_question(None))
        .unwrap();
    let qid = msg.question.unwrap().id;

    session.answer(qid, "proceed").unwrap();

    let err = session.answer(qid, "proceed again").unwrap_err();
    assert!(matches!(err, BusError::QuestionNotFound(_)));
    assert_eq!(
        session.question(qid).unwrap().response.as_deref(),
        Some("proceed")
    );
}

#[test]
fn polling_is_exactly_once() {
    let session = session();
    session.submit(intro(ParticipantId::Market)).unwrap();

    let first = session.read_since(1);
    let second = session.read_since(1);
    assert!(first.is_empty());
    assert_eq!(first, second);

    session.submit(intro(ParticipantId::Strategy)).unwrap();
    let after = session.read_since(1);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, 2);
}

#[test]
fn transcript_order_is_identical_for_all_observers() {
    let session = session();
    introduce_all(&session);

    let a: Vec<u64> = session.transcript().iter().map(|m| m.id).collect();
    let b: Vec<u64> = session.read_since(0).iter().map(|m| m.id).collect();
    assert_eq!(a, b);
    assert!(a.windows(2).all(|w| w[1] == w[0] + 1));
}
