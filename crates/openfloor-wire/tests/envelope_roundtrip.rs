//! End-to-end: build an envelope, push it through JSON text and a file, and
//! read it back as an agent would.

use openfloor_types::{
    Capability, Conversant, Conversation, DialogEvent, DialogHistory, Envelope, Event, EventType,
    Feature, FeatureMap, Identification, Manifest, PersistentState, Record, Sender, Span, To,
    Token, ValidationError,
};
use openfloor_wire::{from_json, load_record, save_record, to_json, Codec, CodecConfig};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("openfloor_wire=debug")
        .with_test_writer()
        .try_init();
}

fn bot() -> Identification {
    Identification::new("tag:bot1", "https://x/bot1").with_conversational_name("Bot One")
}

fn hello_event() -> DialogEvent {
    let text = Feature::new(
        "text/plain",
        vec![Token::from_value("hello bot").unwrap().with_confidence(0.9).unwrap()],
    )
    .unwrap()
    .with_lang("en");
    let features: FeatureMap = vec![("text", text)].into_iter().collect();
    DialogEvent::new(
        "de:1",
        "tag:user",
        Span::starting_at("2025-03-01T10:00:00+00:00"),
        features,
    )
    .unwrap()
}

fn sample_envelope() -> Envelope {
    let mut state = PersistentState::new();
    state.insert("greeted", json!(false));
    let conversation = Conversation::new(None, vec![])
        .with_conversant(Conversant::new(bot()).with_persistent_state(state));
    Envelope::new(conversation, Sender::new("tag:user"))
        .with_event(Event::utterance(&hello_event()).unwrap())
}

#[test]
fn test_envelope_through_text() {
    init_tracing();
    let envelope = sample_envelope();
    let text = to_json(&envelope).unwrap();

    let raw: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(raw["schema"]["version"], "1.0.0");
    assert_eq!(raw["conversation"]["conversants"][0]["identification"]["speakerUri"], "tag:bot1");
    assert_eq!(raw["events"][0]["eventType"], "utterance");
    assert_eq!(raw["events"][0]["parameters"]["dialogEvent"]["id"], "de:1");
    assert!(raw["events"][0].get("to").is_none());

    let back: Envelope = from_json(&text).unwrap();
    assert_eq!(back, envelope);
    assert_eq!(back.schema.version, "1.0.0");
}

#[test]
fn test_envelope_through_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("envelope.json");
    let envelope = sample_envelope();

    let codec = Codec::new(CodecConfig::compact()).unwrap();
    save_record(&codec, &path, &envelope).unwrap();
    let back: Envelope = load_record(&codec, &path).unwrap();
    assert_eq!(back, envelope);
    assert_eq!(back.schema.version, "1.0.0");

    let me = bot();
    let mine: Vec<&Event> = back.events_for(&me).collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].kind(), EventType::Utterance);
    let dialog_event = mine[0].dialog_event().unwrap().unwrap();
    assert_eq!(
        dialog_event.feature("text").unwrap().text_values(),
        vec!["hello bot"]
    );
}

#[test]
fn test_incoming_document_from_another_agent() {
    init_tracing();
    let text = r#"{
        "conversation": {
            "id": "conv:abc",
            "conversants": [
                {"identification": {"speakerUri": "tag:bot1", "serviceUrl": "https://x/bot1"}}
            ]
        },
        "sender": {"speakerUri": "tag:convener", "serviceUrl": "https://x/convener"},
        "events": [
            {"eventType": "invite", "to": {"serviceUrl": "https://x/bot1"}},
            {"eventType": "getManifests", "to": {"speakerUri": "tag:other", "private": true}},
            {"eventType": "context", "parameters": {"dialogHistory": []}}
        ]
    }"#;

    let envelope: Envelope = from_json(text).unwrap();
    assert_eq!(envelope.schema.version, "1.0.0");
    assert_eq!(envelope.conversation.id, "conv:abc");
    assert!(envelope.conversation.conversant("tag:bot1").is_some());

    let kinds: Vec<EventType> = envelope.events_for(&bot()).map(Event::kind).collect();
    assert_eq!(kinds, vec![EventType::Invite, EventType::Context]);

    let history: DialogHistory = envelope.events[2].dialog_history().unwrap().unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_reply_with_manifests() {
    let manifest = Manifest::new(
        bot(),
        vec![Capability::new(["greeting"], ["Says hello"]).with_languages(["en-us"])],
    );
    let reply = Envelope::new(Conversation::new(Some("conv:abc".into()), vec![]), Sender::from(&bot()))
        .with_event(Event::publish_manifests(&[manifest.clone()], &[]).unwrap())
        .with_event(Event::bye().with_to(To::speaker("tag:convener")));

    let back: Envelope = from_json(&to_json(&reply).unwrap()).unwrap();
    assert_eq!(back.events[0].servicing_manifests().unwrap(), vec![manifest]);
    let projected = back.events[0].project().unwrap();
    assert_eq!(
        projected["parameters"]["servicingManifests"][0]["capabilities"][0]["supportedLayers"],
        json!({"input": ["text"], "output": ["text"]})
    );
}

#[test]
fn test_invalid_nested_record_is_reported() {
    let text = r#"{
        "conversation": {},
        "sender": {"speakerUri": "tag:user"},
        "events": [{"eventType": "utterance", "to": {"private": true}}]
    }"#;
    let err = from_json::<Envelope>(text).unwrap_err();
    assert_eq!(err.validation(), Some(&ValidationError::NoAddress));
}
