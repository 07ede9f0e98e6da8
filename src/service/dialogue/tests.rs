use std::{sync::Arc, time::Duration};

use super::*;
use crate::{
    service::{
        channel::MessageRef,
        generator::GeneratorError,
        settings::{Model, Quantity, Settings, Size},
    },
    utils::test::{CountingStore, RecordingChannel, Sent, StubGenerator},
};

const USER: UserId = UserId(100);
const NAME: &str = "Alice";

struct Harness {
    service: DialogueService,
    channel: Arc<RecordingChannel>,
    store: Arc<CountingStore>,
    generator: Arc<StubGenerator>,
}

impl Harness {
    fn new(generator: StubGenerator) -> Self {
        let channel = Arc::new(RecordingChannel::new());
        let store = Arc::new(CountingStore::new());
        let generator = Arc::new(generator);
        let policy = GenerationPolicy {
            timeout: Duration::from_secs(1),
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        };

        let service = DialogueService::new(
            SessionRegistry::new(16),
            store.clone(),
            generator.clone(),
            channel.clone(),
            policy,
            "en",
        );

        Self {
            service,
            channel,
            store,
            generator,
        }
    }

    async fn registered(generator: StubGenerator) -> Self {
        let harness = Self::new(generator);
        assert_eq!(harness.command(Command::Start).await, Outcome::Handled);
        harness.channel.clear();
        harness
    }

    async fn command(&self, command: Command) -> Outcome {
        self.service.handle(Event::command(USER, NAME, command)).await
    }

    async fn text(&self, text: &str) -> Outcome {
        self.service.handle(Event::text(USER, NAME, text)).await
    }

    async fn press(&self, token: &str, origin: MessageRef) -> Outcome {
        self.service
            .handle(Event::button(USER, NAME, token, Some(origin)))
            .await
    }

    /// State of the user's session, `Idle` when no session exists.
    fn state(&self) -> DialogueState {
        self.service.registry().peek(USER).unwrap_or_default()
    }

    fn anchor(&self) -> MessageRef {
        self.channel.last_text_ref().unwrap()
    }

    async fn settings(&self) -> Settings {
        self.store.get_settings(USER).await.unwrap().unwrap()
    }
}

fn inner_error() -> String {
    t!("messages.inner_error", locale = "en").to_string()
}

fn last_edit(channel: &RecordingChannel) -> (MessageRef, String, Option<menu::Keyboard>) {
    channel
        .sent()
        .into_iter()
        .rev()
        .find_map(|sent| match sent {
            Sent::Edit {
                message,
                text,
                keyboard,
            } => Some((message, text, keyboard)),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_start_registers_user_once() {
    let harness = Harness::new(StubGenerator::default());

    assert_eq!(harness.command(Command::Start).await, Outcome::Handled);
    assert_eq!(harness.command(Command::Start).await, Outcome::Handled);

    let user = harness.store.get_user(USER).await.unwrap().unwrap();
    assert_eq!(user.name, NAME);
    assert_eq!(user.settings, Settings::default());

    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[0], Sent::Text { text, keyboard: None, .. } if text.contains(NAME)));
    assert_eq!(harness.state(), DialogueState::Idle);
}

#[tokio::test]
async fn test_start_escapes_name() {
    let harness = Harness::new(StubGenerator::default());

    harness
        .service
        .handle(Event::command(USER, "<b>Eve</b>", Command::Start))
        .await;

    let Sent::Text { text, .. } = &harness.channel.sent()[0] else {
        panic!("expected a text message");
    };
    assert!(text.contains("&lt;b&gt;Eve&lt;/b&gt;"));
}

#[tokio::test]
async fn test_help_keeps_state() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Generate).await;

    assert_eq!(harness.command(Command::Help).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::AwaitingGenerateConfirm);
}

#[tokio::test]
async fn test_failed_help_keeps_menu_open() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();
    harness.channel.fail_text(&t!("messages.help", locale = "en"));

    assert_eq!(harness.command(Command::Help).await, Outcome::Failed);

    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseModel));
    assert!(matches!(
        harness.channel.sent().last(),
        Some(Sent::Text { text, .. }) if *text == inner_error()
    ));
    assert_eq!(harness.press("choose_model dall-e-3", anchor).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseSize));
}

#[tokio::test]
async fn test_failed_start_keeps_prompt_pending() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png"])).await;
    awaiting_prompt(&harness).await;
    harness.store.set_unavailable(true);

    assert_eq!(harness.command(Command::Start).await, Outcome::Failed);
    assert_eq!(harness.state(), DialogueState::AwaitingPrompt);

    harness.store.set_unavailable(false);
    assert_eq!(harness.text("a quiet forest").await, Outcome::Handled);
    assert_eq!(harness.generator.attempts(), 1);
}

#[tokio::test]
async fn test_unknown_user_generate() {
    let harness = Harness::new(StubGenerator::default());

    assert_eq!(harness.command(Command::Generate).await, Outcome::Failed);

    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Text { text, .. } if *text == inner_error()));
    assert_eq!(harness.state(), DialogueState::Idle);
    assert_eq!(harness.store.writes(), 0);
    assert!(harness.service.registry().is_empty());
}

#[tokio::test]
async fn test_unknown_user_settings() {
    let harness = Harness::new(StubGenerator::default());

    assert_eq!(harness.command(Command::Settings).await, Outcome::Failed);
    assert_eq!(harness.state(), DialogueState::Idle);
    assert_eq!(harness.store.writes(), 0);
}

#[tokio::test]
async fn test_settings_wizard_cycle() {
    let harness = Harness::registered(StubGenerator::default()).await;

    harness.command(Command::Settings).await;
    let anchor = harness.anchor();
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseModel));

    assert_eq!(harness.press("choose_model dall-e-3", anchor).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseSize));
    let settings = harness.settings().await;
    assert_eq!(settings.model, Model::Dalle3);
    assert_eq!(settings.size, Size::S1024);

    let (message, _, keyboard) = last_edit(&harness.channel);
    assert_eq!(message, anchor);
    assert_eq!(keyboard, menu::render(WizardStep::ChooseSize, &settings, "en").keyboard);

    assert_eq!(harness.press("choose_size 1792x1024", anchor).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseQuantity));

    assert_eq!(harness.press("choose_quantity 4", anchor).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseModel));

    let settings = harness.settings().await;
    assert_eq!(
        settings,
        Settings {
            model: Model::Dalle3,
            size: Size::S1792x1024,
            quantity: Quantity::new(4).unwrap(),
        }
    );

    // Every screen is an edit of the one anchor message.
    let texts = harness
        .channel
        .sent()
        .iter()
        .filter(|sent| matches!(sent, Sent::Text { .. }))
        .count();
    assert_eq!(texts, 1);
}

#[tokio::test]
async fn test_model_change_resets_size() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();

    harness.press("choose_model dall-e-2", anchor).await;
    harness.press("choose_size 512x512", anchor).await;
    harness.press("back_to sizes", anchor).await;
    harness.press("back_to models", anchor).await;
    harness.press("choose_model dall-e-3", anchor).await;

    let settings = harness.settings().await;
    assert_eq!(settings.model, Model::Dalle3);
    assert_eq!(settings.size, Size::S1024);
}

#[tokio::test]
async fn test_illegal_size_is_ignored() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();
    harness.press("choose_model dall-e-2", anchor).await;
    let writes = harness.store.writes();
    harness.channel.clear();

    assert_eq!(harness.press("choose_size 1792x1024", anchor).await, Outcome::Ignored);

    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseSize));
    assert_eq!(harness.store.writes(), writes);
    assert!(harness.channel.sent().is_empty());
}

#[tokio::test]
async fn test_back_to_renders_same_screen() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();
    harness.press("choose_model dall-e-3", anchor).await;
    harness.press("choose_size 1024x1792", anchor).await;
    let writes = harness.store.writes();

    assert_eq!(harness.press("back_to sizes", anchor).await, Outcome::Handled);
    let first = last_edit(&harness.channel);
    assert_eq!(harness.press("back_to sizes", anchor).await, Outcome::Handled);
    let second = last_edit(&harness.channel);

    assert_eq!(first, second);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseSize));
    assert_eq!(harness.store.writes(), writes);
}

#[tokio::test]
async fn test_close_removes_menu() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();

    assert_eq!(harness.press("close", anchor).await, Outcome::Handled);

    assert_eq!(harness.channel.sent().last(), Some(&Sent::Delete(anchor)));
    assert_eq!(harness.state(), DialogueState::Idle);
    assert!(harness.service.registry().is_empty());
}

#[tokio::test]
async fn test_stale_anchor_is_ignored() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let old_anchor = harness.anchor();
    harness.command(Command::Settings).await;
    harness.channel.clear();

    assert_eq!(harness.press("choose_model dall-e-3", old_anchor).await, Outcome::Ignored);
    assert_eq!(
        harness
            .service
            .handle(Event::button(USER, NAME, "close", None))
            .await,
        Outcome::Ignored
    );

    assert!(harness.channel.sent().is_empty());
    assert_eq!(harness.settings().await, Settings::default());
}

#[tokio::test]
async fn test_out_of_state_buttons_are_ignored() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();

    assert_eq!(harness.press("generate_accept", anchor).await, Outcome::Ignored);
    assert_eq!(harness.press("choose_quantity 2", anchor).await, Outcome::Ignored);
    assert_eq!(harness.press("choose_quantity 9", anchor).await, Outcome::Ignored);
    assert_eq!(harness.press("download now", anchor).await, Outcome::Ignored);
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseModel));
}

#[tokio::test]
async fn test_text_outside_prompt_is_ignored() {
    let harness = Harness::registered(StubGenerator::default()).await;

    assert_eq!(harness.text("hello").await, Outcome::Ignored);
    assert!(harness.channel.sent().is_empty());
    assert_eq!(harness.generator.attempts(), 0);
}

#[tokio::test]
async fn test_unknown_command_outside_prompt() {
    let harness = Harness::registered(StubGenerator::default()).await;

    assert_eq!(harness.text("/imagine a cat").await, Outcome::Handled);

    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        Sent::Text { text, .. } if *text == t!("messages.unknown_command", locale = "en")
    ));
    assert_eq!(harness.generator.attempts(), 0);
}

#[tokio::test]
async fn test_slash_prompt_is_generated() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png"])).await;
    awaiting_prompt(&harness).await;

    assert_eq!(harness.text("/imagine a cat").await, Outcome::Handled);

    assert_eq!(harness.generator.requests()[0].prompt, "/imagine a cat");
    assert!(!harness.channel.sent().iter().any(
        |sent| matches!(sent, Sent::Text { text, .. } if *text == t!("messages.unknown_command", locale = "en"))
    ));
}

async fn awaiting_prompt(harness: &Harness) -> MessageRef {
    harness.command(Command::Generate).await;
    let anchor = harness.anchor();
    assert_eq!(harness.press("generate_accept", anchor).await, Outcome::Handled);
    assert_eq!(harness.state(), DialogueState::AwaitingPrompt);

    let (message, text, keyboard) = last_edit(&harness.channel);
    assert_eq!(message, anchor);
    assert_eq!(text, t!("messages.generate.send_prompt", locale = "en"));
    assert_eq!(keyboard.unwrap().rows[0][0].action, Action::Cancel);

    harness.channel.clear();
    anchor
}

#[tokio::test]
async fn test_generation_delivers_group() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png", "https://img/2.png"])).await;
    let anchor = awaiting_prompt(&harness).await;

    assert_eq!(harness.text("  a cat in a hat  ").await, Outcome::Handled);

    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 4);
    assert!(matches!(&sent[0], Sent::Edit { message, keyboard: None, .. } if *message == anchor));
    let Sent::Text { message: placeholder, text, .. } = &sent[1] else {
        panic!("expected placeholder, got {:?}", sent[1]);
    };
    assert_eq!(*text, t!("messages.generate.generating", locale = "en"));
    assert_eq!(
        sent[2],
        Sent::ImageGroup {
            user: USER,
            urls: vec!["https://img/1.png".to_string(), "https://img/2.png".to_string()],
        }
    );
    assert_eq!(sent[3], Sent::Delete(*placeholder));

    let requests = harness.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "a cat in a hat");
    assert_eq!(requests[0].model, Model::Dalle2);
    assert_eq!(harness.state(), DialogueState::Idle);
    assert!(harness.service.registry().is_empty());
}

#[tokio::test]
async fn test_generation_uses_current_settings() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png"])).await;
    harness.command(Command::Settings).await;
    let menu_anchor = harness.anchor();
    harness.press("choose_model dall-e-3", menu_anchor).await;
    harness.press("choose_size 1024x1792", menu_anchor).await;

    awaiting_prompt(&harness).await;
    harness.text("a harbour at dawn").await;

    let request = &harness.generator.requests()[0];
    assert_eq!(request.model, Model::Dalle3);
    assert_eq!(request.size, Size::S1024x1792);
    assert_eq!(request.quantity.get(), 1);
}

#[tokio::test]
async fn test_generation_delivers_single_image() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/only.png"])).await;
    awaiting_prompt(&harness).await;

    assert_eq!(harness.text("a lighthouse").await, Outcome::Handled);

    let sent = harness.channel.sent();
    assert!(sent.contains(&Sent::Image {
        user: USER,
        url: "https://img/only.png".to_string()
    }));
    assert!(!sent.iter().any(|sent| matches!(sent, Sent::ImageGroup { .. })));
}

#[tokio::test]
async fn test_zero_images_is_failure() {
    let harness = Harness::registered(StubGenerator::urls(&[])).await;
    awaiting_prompt(&harness).await;

    assert_eq!(harness.text("nothing").await, Outcome::Failed);

    let sent = harness.channel.sent();
    let Sent::Text { message: placeholder, .. } = &sent[1] else {
        panic!("expected placeholder");
    };
    assert!(matches!(&sent[2], Sent::Text { text, .. } if *text == inner_error()));
    assert_eq!(sent[3], Sent::Delete(*placeholder));
    assert_eq!(harness.state(), DialogueState::Idle);
}

#[tokio::test]
async fn test_generator_error_is_reported() {
    let rejected = GeneratorError::Api {
        status: 400,
        message: "content policy violation".to_string(),
    };
    let harness = Harness::registered(StubGenerator::new(vec![Err(rejected)])).await;
    awaiting_prompt(&harness).await;

    assert_eq!(harness.text("something forbidden").await, Outcome::Failed);

    let sent = harness.channel.sent();
    assert!(sent.iter().any(|sent| matches!(sent, Sent::Text { text, .. } if *text == inner_error())));
    assert!(matches!(sent.last(), Some(Sent::Delete(_))));
    assert_eq!(harness.state(), DialogueState::Idle);
}

#[tokio::test]
async fn test_delivery_failure_is_reported() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png", "https://img/2.png"])).await;
    awaiting_prompt(&harness).await;
    harness.channel.fail_media();

    assert_eq!(harness.text("two dogs").await, Outcome::Failed);

    let sent = harness.channel.sent();
    assert!(sent.iter().any(|sent| matches!(sent, Sent::Text { text, .. } if *text == inner_error())));
    assert!(!sent.iter().any(|sent| matches!(sent, Sent::ImageGroup { .. })));
}

#[tokio::test]
async fn test_empty_prompt_keeps_waiting() {
    let harness = Harness::registered(StubGenerator::urls(&["https://img/1.png"])).await;
    awaiting_prompt(&harness).await;

    assert_eq!(harness.text("   ").await, Outcome::Handled);
    assert_eq!(harness.text("").await, Outcome::Handled);

    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(
        &sent[0],
        Sent::Text { text, .. } if *text == t!("messages.generate.invalid_prompt", locale = "en")
    ));
    assert_eq!(harness.state(), DialogueState::AwaitingPrompt);
    assert_eq!(harness.generator.attempts(), 0);

    assert_eq!(harness.text("now a real prompt").await, Outcome::Handled);
    assert_eq!(harness.generator.attempts(), 1);
}

#[tokio::test]
async fn test_cancel_returns_to_idle() {
    let harness = Harness::registered(StubGenerator::default()).await;
    let anchor = awaiting_prompt(&harness).await;

    assert_eq!(harness.press("cancel", anchor).await, Outcome::Handled);

    let (message, text, keyboard) = last_edit(&harness.channel);
    assert_eq!(message, anchor);
    assert_eq!(text, t!("messages.cancelled", locale = "en"));
    assert!(keyboard.is_none());
    assert_eq!(harness.state(), DialogueState::Idle);

    assert_eq!(harness.text("too late").await, Outcome::Ignored);
    assert_eq!(harness.generator.attempts(), 0);
}

#[tokio::test]
async fn test_new_command_replaces_session() {
    let harness = Harness::registered(StubGenerator::default()).await;
    let prompt_anchor = awaiting_prompt(&harness).await;

    harness.command(Command::Settings).await;
    assert_eq!(harness.state(), DialogueState::SettingsMenu(WizardStep::ChooseModel));

    assert_eq!(harness.press("cancel", prompt_anchor).await, Outcome::Ignored);
    assert_eq!(harness.text("a prompt").await, Outcome::Ignored);
    assert_eq!(harness.service.registry().len(), 1);
}

#[tokio::test]
async fn test_store_unavailable_aborts_to_idle() {
    let harness = Harness::registered(StubGenerator::default()).await;
    harness.command(Command::Settings).await;
    let anchor = harness.anchor();
    harness.store.set_unavailable(true);
    harness.channel.clear();

    assert_eq!(harness.press("choose_model dall-e-3", anchor).await, Outcome::Failed);

    assert_eq!(harness.state(), DialogueState::Idle);
    let sent = harness.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Text { text, .. } if *text == inner_error()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_users_are_independent() {
    let harness = Arc::new(Harness::new(StubGenerator::default()));

    let mut handles = Vec::new();
    for id in 1..=20 {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            let user = UserId(id);
            harness.service.handle(Event::command(user, "user", Command::Start)).await;
            harness
                .service
                .handle(Event::command(user, "user", Command::Settings))
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Outcome::Handled);
    }

    assert_eq!(harness.service.registry().len(), 20);
    for id in 1..=20 {
        assert_eq!(
            harness.service.registry().peek(UserId(id)),
            Some(DialogueState::SettingsMenu(WizardStep::ChooseModel))
        );
    }
}
