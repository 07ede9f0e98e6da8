use std::sync::Arc;

use teloxide::utils::html;

use crate::service::{
    channel::{ChatChannel, MessageRef},
    generator::{GenerationRequest, GeneratorError, ImageGenerator},
    menu::{self, Action, WizardStep},
    settings::{Settings, SettingsPatch, SettingsStore, UserId},
};

mod error;
mod event;
mod generation;
mod model;
mod registry;
#[cfg(test)]
mod tests;

pub use error::DialogueError;
pub use event::{Command, Event, EventKind, Outcome};
pub use generation::GenerationPolicy;
pub use model::{DialogueState, Session};
pub use registry::{SessionGuard, SessionRegistry};

/// Per-user conversation engine.
///
/// Every event is handled while holding the user's session slot, so a user's events never
/// interleave. Failures are reported to the user as one generic message and end the flow, unless
/// the event was `/start` or `/help`.
#[derive(Clone)]
pub struct DialogueService {
    registry: SessionRegistry,
    store: Arc<dyn SettingsStore>,
    generator: Arc<dyn ImageGenerator>,
    channel: Arc<dyn ChatChannel>,
    policy: GenerationPolicy,
    locale: String,
}

impl DialogueService {
    pub fn new(
        registry: SessionRegistry,
        store: Arc<dyn SettingsStore>,
        generator: Arc<dyn ImageGenerator>,
        channel: Arc<dyn ChatChannel>,
        policy: GenerationPolicy,
        locale: &str,
    ) -> Self {
        Self {
            registry,
            store,
            generator,
            channel,
            policy,
            locale: locale.to_string(),
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub async fn handle(&self, event: Event) -> Outcome {
        let mut session = self.registry.acquire(event.user).await;

        match self.transition(&mut session, &event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.recover(&mut session, &event, e).await;
                Outcome::Failed
            }
        }
    }

    async fn transition(&self, session: &mut SessionGuard, event: &Event) -> Result<Outcome, DialogueError> {
        match &event.kind {
            EventKind::Command(command) => self.on_command(session, &event.name, *command).await,
            EventKind::Text(text) => match session.state {
                DialogueState::AwaitingPrompt => self.on_prompt(session, text).await,
                _ if text.starts_with('/') => {
                    info!("Unknown command from user {}", session.user());
                    let reply = t!("messages.unknown_command", locale = self.locale());
                    self.channel.send_text(session.user(), &reply, None).await?;
                    Ok(Outcome::Handled)
                }
                state => {
                    debug!("Ignoring text from user {} in state {:?}", session.user(), state);
                    Ok(Outcome::Ignored)
                }
            },
            EventKind::Button { token, origin } => self.on_button(session, token, *origin).await,
        }
    }

    async fn on_command(
        &self,
        session: &mut SessionGuard,
        name: &str,
        command: Command,
    ) -> Result<Outcome, DialogueError> {
        let user = session.user();
        info!("Handling command {:?} from user {}", command, user);

        match command {
            Command::Start => {
                self.store.create_user(user, name).await?;
                let text = t!("messages.start", locale = self.locale(), name = html::escape(name));
                self.channel.send_text(user, &text, None).await?;
            }
            Command::Help => {
                self.channel
                    .send_text(user, &t!("messages.help", locale = self.locale()), None)
                    .await?;
            }
            Command::Generate => {
                let account = self.store.get_user(user).await?.ok_or(DialogueError::UserNotFound(user))?;
                let screen = menu::status_screen(&account.settings, self.locale());
                let anchor = self
                    .channel
                    .send_text(user, &screen.text, screen.keyboard.as_ref())
                    .await?;
                session.enter(DialogueState::AwaitingGenerateConfirm, anchor);
            }
            Command::Settings => {
                let account = self.store.get_user(user).await?.ok_or(DialogueError::UserNotFound(user))?;
                let screen = menu::render(WizardStep::ChooseModel, &account.settings, self.locale());
                let anchor = self
                    .channel
                    .send_text(user, &screen.text, screen.keyboard.as_ref())
                    .await?;
                session.enter(DialogueState::SettingsMenu(WizardStep::ChooseModel), anchor);
            }
        }

        Ok(Outcome::Handled)
    }

    async fn on_button(
        &self,
        session: &mut SessionGuard,
        token: &str,
        origin: Option<MessageRef>,
    ) -> Result<Outcome, DialogueError> {
        let user = session.user();

        let action = match token.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                debug!("Ignoring button {:?} from user {}: {}", token, user, e);
                return Ok(Outcome::Ignored);
            }
        };

        let Some(anchor) = session.anchor.filter(|_| session.is_anchored_on(origin)) else {
            debug!("Ignoring stale button {:?} from user {}", token, user);
            return Ok(Outcome::Ignored);
        };

        info!("Handling button {:?} from user {} in state {:?}", token, user, session.state);

        match (session.state, action) {
            (DialogueState::AwaitingGenerateConfirm, Action::GenerateAccept) => {
                let screen = menu::prompt_screen(self.locale());
                self.channel
                    .edit_text(anchor, &screen.text, screen.keyboard.as_ref())
                    .await?;
                session.state = DialogueState::AwaitingPrompt;
                Ok(Outcome::Handled)
            }
            (DialogueState::AwaitingPrompt, Action::Cancel) => {
                self.channel
                    .edit_text(anchor, &t!("messages.cancelled", locale = self.locale()), None)
                    .await?;
                session.reset();
                Ok(Outcome::Handled)
            }
            (DialogueState::SettingsMenu(WizardStep::ChooseModel), Action::ChooseModel(model)) => {
                self.choose(session, anchor, WizardStep::ChooseModel, SettingsPatch::model(model))
                    .await
            }
            (DialogueState::SettingsMenu(WizardStep::ChooseSize), Action::ChooseSize(size)) => {
                self.choose(session, anchor, WizardStep::ChooseSize, SettingsPatch::size(size))
                    .await
            }
            (DialogueState::SettingsMenu(WizardStep::ChooseQuantity), Action::ChooseQuantity(quantity)) => {
                self.choose(
                    session,
                    anchor,
                    WizardStep::ChooseQuantity,
                    SettingsPatch::quantity(quantity),
                )
                .await
            }
            (DialogueState::SettingsMenu(_), Action::BackTo(step)) => {
                let settings = self
                    .store
                    .get_settings(user)
                    .await?
                    .ok_or(DialogueError::UserNotFound(user))?;
                self.show_step(session, anchor, step, &settings).await
            }
            (DialogueState::SettingsMenu(_), Action::Close) => {
                self.channel.delete_message(anchor).await?;
                session.reset();
                Ok(Outcome::Handled)
            }
            (state, action) => {
                debug!("Ignoring {} from user {} in state {:?}", action, user, state);
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Persists the value chosen on `step` and moves the wizard forward.
    async fn choose(
        &self,
        session: &mut SessionGuard,
        anchor: MessageRef,
        step: WizardStep,
        patch: SettingsPatch,
    ) -> Result<Outcome, DialogueError> {
        let user = session.user();

        if let Some(size) = patch.size {
            let current = self
                .store
                .get_settings(user)
                .await?
                .ok_or(DialogueError::UserNotFound(user))?;
            if !current.model.supports(size) {
                debug!("Ignoring size {} for model {} from user {}", size, current.model, user);
                return Ok(Outcome::Ignored);
            }
        }

        let settings = self
            .store
            .update_settings(user, patch)
            .await?
            .ok_or(DialogueError::UserNotFound(user))?;

        self.show_step(session, anchor, step.forward(), &settings).await
    }

    async fn show_step(
        &self,
        session: &mut SessionGuard,
        anchor: MessageRef,
        step: WizardStep,
        settings: &Settings,
    ) -> Result<Outcome, DialogueError> {
        let screen = menu::render(step, settings, self.locale());
        self.channel
            .edit_text(anchor, &screen.text, screen.keyboard.as_ref())
            .await?;
        session.state = DialogueState::SettingsMenu(step);

        Ok(Outcome::Handled)
    }

    async fn on_prompt(&self, session: &mut SessionGuard, text: &str) -> Result<Outcome, DialogueError> {
        let user = session.user();
        let prompt = text.trim();

        if prompt.is_empty() {
            info!("Empty prompt from user {}", user);
            self.channel
                .send_text(user, &t!("messages.generate.invalid_prompt", locale = self.locale()), None)
                .await?;
            return Ok(Outcome::Handled);
        }

        info!(
            "Generating for user {}: {:?}",
            user,
            prompt.chars().take(32).collect::<String>()
        );

        let anchor = session.anchor;
        session.reset();

        if let Some(anchor) = anchor {
            let text = t!("messages.generate.send_prompt", locale = self.locale());
            if let Err(e) = self.channel.edit_text(anchor, &text, None).await {
                warn!("Failed to remove cancel control for user {}: {}", user, e);
            }
        }

        let placeholder = self
            .channel
            .send_text(user, &t!("messages.generate.generating", locale = self.locale()), None)
            .await?;

        let outcome = match self.generate_and_deliver(user, prompt).await {
            Ok(count) => {
                info!("Delivered {} image(s) to user {}", count, user);
                Outcome::Handled
            }
            Err(e) => {
                warn!("Generation for user {} failed: {}", user, e);
                self.send_inner_error(user).await;
                Outcome::Failed
            }
        };

        if let Err(e) = self.channel.delete_message(placeholder).await {
            error!("Failed to delete placeholder for user {}: {}", user, e);
        }

        Ok(outcome)
    }

    async fn generate_and_deliver(&self, user: UserId, prompt: &str) -> Result<usize, DialogueError> {
        let settings = self
            .store
            .get_settings(user)
            .await?
            .ok_or(DialogueError::UserNotFound(user))?;

        let request = GenerationRequest::new(prompt, &settings);
        let urls = self.policy.run(self.generator.as_ref(), &request).await?;

        match urls.as_slice() {
            [] => return Err(GeneratorError::EmptyResult.into()),
            [url] => self.channel.send_image(user, url).await?,
            urls => self.channel.send_image_group(user, urls).await?,
        }

        Ok(urls.len())
    }

    async fn recover(&self, session: &mut SessionGuard, event: &Event, error: DialogueError) {
        let user = session.user();
        match &error {
            DialogueError::UserNotFound(_) => warn!("User {} is not registered", user),
            _ => error!("Handling {:?} for user {} failed: {}", event.kind, user, error),
        }

        if !event.keeps_session() {
            session.reset();
        }
        self.send_inner_error(user).await;
    }

    async fn send_inner_error(&self, user: UserId) {
        let text = t!("messages.inner_error", locale = self.locale());
        if let Err(e) = self.channel.send_text(user, &text, None).await {
            error!("Failed to report error to user {}: {}", user, e);
        }
    }
}
