//! Integration tests for the conversation facade's event subscriptions.
//!
//! Subscribers receive every mutation of the conversations they watch —
//! message additions, status transitions, typing changes — without
//! polling, and stop receiving once unsubscribed.

use std::sync::Arc;
use std::time::Duration;

use chirp::chat::{ChatConfig, ChatEvent, ChatService};
use chirp::identity::LocalIdentity;
use chirp::timer::TimerRegistry;
use chirp::transport::mock::MockTransport;
use chirp_core::message::{ConversationId, MessageStatus, SenderId};

type Service = Arc<ChatService<MockTransport, LocalIdentity>>;

fn setup() -> (Service, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new(Duration::from_millis(10)));
    let service = ChatService::new(
        Arc::clone(&transport),
        LocalIdentity::new("u1", "Alice"),
        TimerRegistry::new(),
        ChatConfig {
            typing_timeout: Duration::from_millis(100),
            event_buffer: 64,
        },
    );
    (service, transport)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

#[tokio::test]
async fn full_send_lifecycle_reaches_subscriber() {
    let (service, _transport) = setup();
    let conversation = ConversationId::new("c1");
    let (_sub, mut rx) = service.subscribe(&conversation);

    let msg = service.send(&conversation, "Hello").unwrap();
    settle().await;

    assert_eq!(
        rx.try_recv().unwrap(),
        ChatEvent::MessageAdded {
            message: msg.clone()
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        ChatEvent::StatusChanged {
            message_id: msg.id,
            status: MessageStatus::Sent,
        }
    );
    assert!(rx.try_recv().is_err(), "no extra events expected");
}

#[tokio::test]
async fn failed_delivery_emits_failed_status() {
    let (service, transport) = setup();
    let conversation = ConversationId::new("c1");
    transport.fail_next(1);
    let (_sub, mut rx) = service.subscribe(&conversation);

    let msg = service.send(&conversation, "doomed").unwrap();
    settle().await;

    let _added = rx.try_recv().unwrap();
    assert_eq!(
        rx.try_recv().unwrap(),
        ChatEvent::StatusChanged {
            message_id: msg.id,
            status: MessageStatus::Failed,
        }
    );
}

#[tokio::test]
async fn retry_emits_added_then_sent_for_the_new_message() {
    let (service, transport) = setup();
    let conversation = ConversationId::new("c1");
    transport.fail_next(1);

    let msg = service.send(&conversation, "bounce").unwrap();
    settle().await;

    let (_sub, mut rx) = service.subscribe(&conversation);
    let retried = service.retry(&conversation, &msg.id).unwrap();
    settle().await;

    assert_eq!(
        rx.try_recv().unwrap(),
        ChatEvent::MessageAdded {
            message: retried.clone()
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        ChatEvent::StatusChanged {
            message_id: retried.id,
            status: MessageStatus::Sent,
        }
    );
}

#[tokio::test]
async fn subscriptions_are_scoped_to_their_conversation() {
    let (service, _transport) = setup();
    let c1 = ConversationId::new("c1");
    let c2 = ConversationId::new("c2");
    let (_sub, mut rx) = service.subscribe(&c1);

    service.send(&c2, "elsewhere").unwrap();
    settle().await;

    assert!(rx.try_recv().is_err(), "event leaked across conversations");
}

#[tokio::test]
async fn unsubscribe_is_effective_and_idempotent() {
    let (service, _transport) = setup();
    let conversation = ConversationId::new("c1");
    let (sub, mut rx) = service.subscribe(&conversation);

    service.unsubscribe(&conversation, sub);
    service.unsubscribe(&conversation, sub);

    service.send(&conversation, "unseen").unwrap();
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn multiple_subscribers_each_get_events() {
    let (service, _transport) = setup();
    let conversation = ConversationId::new("c1");
    let (_sub_a, mut rx_a) = service.subscribe(&conversation);
    let (_sub_b, mut rx_b) = service.subscribe(&conversation);

    let msg = service.send(&conversation, "fan out").unwrap();

    let expected = ChatEvent::MessageAdded { message: msg };
    assert_eq!(rx_a.try_recv().unwrap(), expected);
    assert_eq!(rx_b.try_recv().unwrap(), expected);
}

#[tokio::test]
async fn dropped_receiver_does_not_break_other_subscribers() {
    let (service, _transport) = setup();
    let conversation = ConversationId::new("c1");

    let (_sub_a, rx_a) = service.subscribe(&conversation);
    let (_sub_b, mut rx_b) = service.subscribe(&conversation);
    drop(rx_a);

    let msg = service.send(&conversation, "still flowing").unwrap();
    assert_eq!(
        rx_b.try_recv().unwrap(),
        ChatEvent::MessageAdded { message: msg }
    );
}

#[tokio::test]
async fn typing_transitions_arrive_as_events() {
    let (service, _transport) = setup();
    let conversation = ConversationId::new("c1");
    let (_sub, mut rx) = service.subscribe(&conversation);

    service.on_typing_start(&conversation);
    service.on_typing_start(&conversation); // debounce, no extra event

    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut transitions = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ChatEvent::TypingChanged { is_typing } = event {
            transitions.push(is_typing);
        }
    }
    assert_eq!(transitions, vec![true, false]);
}

#[tokio::test]
async fn slow_subscriber_drops_events_instead_of_blocking() {
    let transport = Arc::new(MockTransport::new(Duration::from_millis(1)));
    let service = ChatService::new(
        Arc::clone(&transport),
        LocalIdentity::new("u1", "Alice"),
        TimerRegistry::new(),
        ChatConfig {
            typing_timeout: Duration::from_millis(100),
            event_buffer: 2,
        },
    );
    let conversation = ConversationId::new("c1");
    let (_sub, mut rx) = service.subscribe(&conversation);

    // More events than the buffer holds; sends must not block or fail.
    for i in 0..10 {
        service.send(&conversation, &format!("m{i}")).unwrap();
    }

    let mut received = 0;
    while rx.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 2, "buffer bounds how much a lagging consumer sees");
    assert_eq!(service.get_messages(&conversation).len(), 10);
}
