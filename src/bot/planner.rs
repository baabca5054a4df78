//! Planner — routes inbound events to the dialog, the confirmation gate
//! and the task service, and renders the replies.
//!
//! Text dispatch order: cancel, menu alias, command, pending confirmation,
//! open dialog, fallback hint. A confirmation coexists with an open dialog
//! and takes priority over it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bot::callback::CallbackData;
use crate::bot::{keyboards, replies, system_clock, Clock};
use crate::channels::{Channel, IncomingMessage, OutgoingMessage, Payload, Sender};
use crate::config::DigestSchedule;
use crate::conversation::draft::is_cancel;
use crate::conversation::{Action, Interaction, Prompt, Reply, Resolution, Step, Transition};
use crate::error::{Error, TaskError};
use crate::tasks::format::category_names;
use crate::tasks::listing::render_task_list;
use crate::tasks::model::{TaskDraft, UserIdentity};
use crate::tasks::service::is_already_done;
use crate::tasks::{DigestComposer, TaskService};

/// The chat and stored user an event belongs to.
#[derive(Debug, Clone, Copy)]
struct Turn {
    chat_id: i64,
    user_id: i64,
}

impl Turn {
    fn plain(&self, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::plain(self.chat_id, text)
    }

    fn html(&self, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::html(self.chat_id, text)
    }
}

/// Handles every inbound event of the bot.
pub struct Planner {
    channel: Arc<dyn Channel>,
    service: TaskService,
    composer: DigestComposer,
    interaction: Interaction,
    utc_offset: FixedOffset,
    schedule: watch::Sender<DigestSchedule>,
    clock: Clock,
}

impl Planner {
    pub fn new(
        channel: Arc<dyn Channel>,
        service: TaskService,
        utc_offset: FixedOffset,
        schedule: watch::Sender<DigestSchedule>,
    ) -> Self {
        Self {
            channel,
            composer: DigestComposer::new(service.clone()),
            service,
            interaction: Interaction::new(),
            utc_offset,
            schedule,
            clock: system_clock(),
        }
    }

    /// Replace the wall clock (tests pin "now" with this).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    fn now(&self) -> DateTime<FixedOffset> {
        (self.clock)().with_timezone(&self.utc_offset)
    }

    /// Process one inbound event.
    ///
    /// Domain failures are reported to the user and do not surface here;
    /// the error is a transport failure while replying.
    pub async fn handle(&self, msg: IncomingMessage) -> Result<(), Error> {
        let user = match self.service.register_user(&identity_of(&msg.sender)).await {
            Ok(user) => user,
            Err(e) => {
                error!(telegram_id = msg.sender.id, error = %e, "Failed to register user");
                if let Payload::Callback { query_id, .. } = &msg.payload {
                    self.ack(query_id, None).await;
                }
                return self
                    .send(OutgoingMessage::plain(msg.chat_id, replies::GENERIC_FAILURE))
                    .await;
            }
        };

        let turn = Turn {
            chat_id: msg.chat_id,
            user_id: user.id,
        };
        match &msg.payload {
            Payload::Text(text) => self.handle_text(turn, text).await,
            Payload::Callback { query_id, data } => {
                self.handle_callback(turn, query_id, data).await
            }
        }
    }

    // ── Text ────────────────────────────────────────────────────────

    async fn handle_text(&self, turn: Turn, text: &str) -> Result<(), Error> {
        if is_cancel(text) {
            return self.cancel(turn).await;
        }

        let text = keyboards::menu_command(text).unwrap_or(text);
        if text.starts_with('/') {
            return self.handle_command(turn, text).await;
        }

        let resolution = self.interaction.resolve(turn.user_id, text);
        if resolution != Resolution::Idle {
            return self.apply_resolution(turn, resolution).await;
        }

        if self.interaction.has_conversation(turn.user_id) {
            return self.handle_dialog_input(turn, text).await;
        }

        self.send(turn.plain(replies::NOT_UNDERSTOOD).with_keyboard(keyboards::main_menu()))
            .await
    }

    async fn handle_command(&self, turn: Turn, text: &str) -> Result<(), Error> {
        let mut parts = text.split_whitespace();
        let head = parts.next().unwrap_or_default();
        // "/tasks@my_bot" in group-style mentions
        let command = head.split('@').next().unwrap_or(head).to_lowercase();
        let arg = parts.next();
        debug!(user_id = turn.user_id, command = %command, "Command");

        match command.as_str() {
            "/start" => {
                self.send(turn.plain(replies::GREETING).with_keyboard(keyboards::main_menu()))
                    .await
            }
            "/help" => {
                self.send(turn.html(replies::HELP).with_keyboard(keyboards::main_menu()))
                    .await
            }
            "/newtask" => self.begin_dialog(turn).await,
            "/tasks" => self.send_task_list(turn).await,
            "/complete" => self.guarded_command(turn, Action::Complete, arg).await,
            "/delete" => self.guarded_command(turn, Action::Delete, arg).await,
            "/categories" => self.send_categories(turn).await,
            "/digest" => self.send_digest(turn).await,
            "/interval" => self.interval(turn, arg).await,
            "/cancel" => self.cancel(turn).await,
            _ => self.send(turn.plain(replies::UNKNOWN_COMMAND)).await,
        }
    }

    async fn cancel(&self, turn: Turn) -> Result<(), Error> {
        let text = if self.interaction.reset(turn.user_id) {
            info!(user_id = turn.user_id, "Interaction cancelled");
            replies::CANCELLED
        } else {
            replies::NOTHING_TO_CANCEL
        };
        self.send(turn.plain(text).with_keyboard(keyboards::main_menu()))
            .await
    }

    // ── New-task dialog ─────────────────────────────────────────────

    async fn begin_dialog(&self, turn: Turn) -> Result<(), Error> {
        self.interaction.begin_conversation(turn.user_id);
        info!(user_id = turn.user_id, "Task dialog started");
        let prompt = Prompt::Title;
        self.send(turn.plain(replies::prompt(prompt)).with_keyboard(keyboards::for_prompt(prompt)))
            .await
    }

    async fn handle_dialog_input(&self, turn: Turn, text: &str) -> Result<(), Error> {
        match self.interaction.advance(turn.user_id, text) {
            Step::Missing => {
                warn!(user_id = turn.user_id, "Dialog vanished before input was applied");
                self.send(turn.plain(replies::DIALOG_RESET).with_keyboard(keyboards::main_menu()))
                    .await
            }
            Step::Applied(Transition::Advance(state, prompt)) => {
                debug!(user_id = turn.user_id, stage = %state.stage, "Dialog advanced");
                self.send(
                    turn.plain(replies::prompt(prompt))
                        .with_keyboard(keyboards::for_prompt(prompt)),
                )
                .await
            }
            Step::Applied(Transition::Reprompt(state, reason)) => {
                debug!(user_id = turn.user_id, stage = %state.stage, ?reason, "Dialog input rejected");
                self.send(
                    turn.plain(replies::reprompt(reason))
                        .with_keyboard(keyboards::for_prompt(state.stage.prompt())),
                )
                .await
            }
            Step::Applied(Transition::Cancel) => {
                self.send(turn.plain(replies::CANCELLED).with_keyboard(keyboards::main_menu()))
                    .await
            }
            Step::Applied(Transition::Submit(draft)) => self.finish_dialog(turn, draft).await,
        }
    }

    async fn finish_dialog(&self, turn: Turn, draft: TaskDraft) -> Result<(), Error> {
        let category = draft
            .category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        match self
            .service
            .create_task_at(turn.user_id, draft, (self.clock)())
            .await
        {
            Ok(task) => {
                self.send(
                    turn.html(replies::task_created(&task, category.as_deref()))
                        .with_keyboard(keyboards::main_menu()),
                )
                .await?;
                self.send_task_list(turn).await
            }
            Err(e) => self.report_failure(turn, e).await,
        }
    }

    // ── Guarded actions ─────────────────────────────────────────────

    async fn guarded_command(&self, turn: Turn, action: Action, arg: Option<&str>) -> Result<(), Error> {
        match parse_task_id(arg) {
            Some(task_id) => self.request_confirmation(turn, action, task_id).await,
            None => self.send(turn.plain(replies::usage(action))).await,
        }
    }

    /// Store a pending confirmation and ask the question.
    async fn request_confirmation(&self, turn: Turn, action: Action, task_id: i64) -> Result<(), Error> {
        let task = match self.service.get_task(turn.user_id, task_id).await {
            Ok(task) => task,
            Err(e) => return self.report_failure(turn, e).await,
        };

        if action == Action::Complete && is_already_done(&task, &self.now()) {
            return self.send(turn.html(replies::already_done(&task))).await;
        }

        self.interaction
            .request_confirmation(turn.user_id, task.id, action);
        info!(user_id = turn.user_id, task_id, %action, "Confirmation requested");

        self.send(
            turn.html(replies::confirm_question(action, &task))
                .with_keyboard(keyboards::confirmation(action, task.id)),
        )
        .await
    }

    async fn apply_resolution(&self, turn: Turn, resolution: Resolution) -> Result<(), Error> {
        match resolution {
            Resolution::Execute(pending) => {
                info!(
                    user_id = turn.user_id,
                    task_id = pending.task_id,
                    action = %pending.action,
                    "Confirmation accepted"
                );
                let outcome = match pending.action {
                    Action::Complete => self.complete(turn.user_id, pending.task_id).await,
                    Action::Delete => self.delete(turn.user_id, pending.task_id).await,
                };
                match outcome {
                    Ok(text) => {
                        self.send(turn.html(text).with_keyboard(keyboards::main_menu()))
                            .await?;
                        self.send_task_list(turn).await
                    }
                    Err(e) => self.report_failure(turn, e).await,
                }
            }
            Resolution::Dismissed => {
                self.send(turn.plain(replies::CANCELLED).with_keyboard(keyboards::main_menu()))
                    .await
            }
            Resolution::Reprompt(pending) => {
                self.send(
                    turn.plain(replies::confirm_reprompt(pending.action))
                        .with_keyboard(keyboards::confirmation(pending.action, pending.task_id)),
                )
                .await
            }
            Resolution::Idle => Ok(()),
        }
    }

    async fn complete(&self, user_id: i64, task_id: i64) -> Result<String, TaskError> {
        let task = self.service.get_task(user_id, task_id).await?;
        // The window may have been satisfied between the question and the answer.
        if is_already_done(&task, &self.now()) {
            return Ok(replies::already_done(&task));
        }
        let task = self
            .service
            .complete_task(user_id, task_id, (self.clock)())
            .await?;
        Ok(replies::completed(&task))
    }

    async fn delete(&self, user_id: i64, task_id: i64) -> Result<String, TaskError> {
        let task = self.service.get_task(user_id, task_id).await?;
        self.service.delete_task(user_id, task_id).await?;
        Ok(replies::deleted(&task))
    }

    // ── Callbacks ───────────────────────────────────────────────────

    async fn handle_callback(&self, turn: Turn, query_id: &str, data: &str) -> Result<(), Error> {
        let callback = match data.parse::<CallbackData>() {
            Ok(callback) => callback,
            Err(reason) => {
                warn!(user_id = turn.user_id, %reason, "Ignoring callback");
                self.ack(query_id, None).await;
                return Ok(());
            }
        };

        match callback {
            CallbackData::Request { action, task_id } => {
                self.ack(query_id, None).await;
                self.request_confirmation(turn, action, task_id).await
            }
            CallbackData::Confirm { action, task_id } => {
                self.resolve_button(turn, query_id, action, task_id, Reply::Affirmative)
                    .await
            }
            CallbackData::Cancel { action, task_id } => {
                self.resolve_button(turn, query_id, action, task_id, Reply::Negative)
                    .await
            }
        }
    }

    async fn resolve_button(
        &self,
        turn: Turn,
        query_id: &str,
        action: Action,
        task_id: i64,
        reply: Reply,
    ) -> Result<(), Error> {
        let resolution = self
            .interaction
            .resolve_inline(turn.user_id, task_id, action, reply);
        if resolution == Resolution::Idle {
            debug!(user_id = turn.user_id, task_id, %action, "Stale confirmation button");
            self.ack(query_id, Some(replies::STALE_PROMPT)).await;
            return Ok(());
        }
        self.ack(query_id, None).await;
        self.apply_resolution(turn, resolution).await
    }

    async fn ack(&self, query_id: &str, text: Option<&str>) {
        if let Err(e) = self.channel.answer_callback(query_id, text).await {
            warn!(error = %e, "Failed to answer callback query");
        }
    }

    // ── Views ───────────────────────────────────────────────────────

    async fn send_task_list(&self, turn: Turn) -> Result<(), Error> {
        let loaded = async {
            let tasks = self.service.list_actionable(turn.user_id).await?;
            let categories = self.service.list_categories(turn.user_id).await?;
            Ok::<_, TaskError>((tasks, categories))
        }
        .await;
        let (tasks, categories) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return self.report_failure(turn, e).await,
        };

        let view = render_task_list(&tasks, &category_names(&categories), self.now());
        let keyboard = (!view.is_empty()).then(|| keyboards::task_actions(&view.entries));
        let mut msg = turn.html(view.text);
        msg.keyboard = keyboard;
        self.send(msg).await
    }

    async fn send_categories(&self, turn: Turn) -> Result<(), Error> {
        match self.service.list_categories(turn.user_id).await {
            Ok(categories) => self.send(turn.html(replies::category_list(&categories))).await,
            Err(e) => self.report_failure(turn, e).await,
        }
    }

    async fn send_digest(&self, turn: Turn) -> Result<(), Error> {
        match self.composer.compose(turn.user_id, self.now()).await {
            Ok(text) => self.send(turn.html(text)).await,
            Err(e) => self.report_failure(turn, e).await,
        }
    }

    async fn interval(&self, turn: Turn, arg: Option<&str>) -> Result<(), Error> {
        let Some(raw) = arg else {
            let text = replies::interval_current(&*self.schedule.borrow());
            return self.send(turn.html(text)).await;
        };

        let every = raw
            .parse::<u64>()
            .ok()
            .filter(|hours| *hours > 0)
            .and_then(|hours| hours.checked_mul(3600))
            .map(Duration::from_secs);
        let Some(every) = every else {
            return self.send(turn.plain(replies::INTERVAL_USAGE)).await;
        };

        let schedule = DigestSchedule::Interval(every);
        let text = replies::interval_changed(&schedule);
        self.schedule.send_replace(schedule);
        info!(user_id = turn.user_id, hours = every.as_secs() / 3600, "Digest interval changed");
        self.send(turn.plain(text)).await
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Tell the user what went wrong; missing tasks and store failures
    /// also drop the user's dialog and confirmation.
    async fn report_failure(&self, turn: Turn, err: TaskError) -> Result<(), Error> {
        let text = match &err {
            TaskError::Validation(reason) => {
                warn!(user_id = turn.user_id, %reason, "Task rejected");
                format!("Could not save the task: {reason}")
            }
            TaskError::NotFound { task_id } => {
                warn!(user_id = turn.user_id, task_id, "Task not found");
                self.interaction.reset(turn.user_id);
                replies::TASK_NOT_FOUND.to_string()
            }
            TaskError::Store(e) => {
                error!(user_id = turn.user_id, error = %e, "Store failure");
                self.interaction.reset(turn.user_id);
                replies::GENERIC_FAILURE.to_string()
            }
        };
        self.send(turn.plain(text).with_keyboard(keyboards::main_menu()))
            .await
    }

    async fn send(&self, msg: OutgoingMessage) -> Result<(), Error> {
        Ok(self.channel.send(msg).await?)
    }
}

fn identity_of(sender: &Sender) -> UserIdentity {
    UserIdentity {
        telegram_id: sender.id,
        first_name: sender.first_name.clone().unwrap_or_default(),
        last_name: sender.last_name.clone().unwrap_or_default(),
        username: sender.username.clone().unwrap_or_default(),
    }
}

fn parse_task_id(arg: Option<&str>) -> Option<i64> {
    arg?.trim().parse::<i64>().ok().filter(|id| *id > 0)
}
