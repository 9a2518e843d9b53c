//! The synchronization session.
//!
//! A [`SyncClient`] is constructed once by the application root and owns
//! every piece of client state: the transport, the display-name gate, the
//! shared document, the presence count and the two scrollable panes.
//!
//! Everything runs on the caller's task. User input goes in through plain
//! methods; transport events and timers come out of
//! [`SyncClient::next_update`] one at a time, already applied, as
//! [`ClientUpdate`]s for the view to react to.
//!
//! ```text
//!   ConnectionManager ──events──┐
//!   restore / focus timers ─────┼──► SyncClient::next_update() ──► ClientUpdate
//!   user input ─────────────────┘         (session, document, presence, scroll)
//! ```

use std::collections::VecDeque;

use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::document::{DocumentSyncChannel, MarkdownRenderer};
use crate::identity::IdentityStore;
use crate::presence::PresenceTracker;
use crate::protocol::{Direction, RelayMessage};
use crate::scroll::{MirrorOutcome, ScrollSnapshot, ScrollSurface, ScrollSynchronizer};
use crate::session::{SessionError, SessionState};

/// What the application should currently show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Loading view while the relay is unreachable
    Connecting,
    /// Display-name prompt
    NameEntry,
    /// Editor and preview panes
    Editor,
}

impl View {
    /// Text of the loading view.
    pub const CONNECTING_MESSAGE: &'static str = "Connecting to server...";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    NameField,
    Editor,
}

/// Something the view must react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientUpdate {
    ViewChanged(View),
    /// The document was replaced by a remote update
    DocumentReplaced,
    PresenceChanged(u64),
    /// Saved scroll positions were reapplied after a reconnect
    ScrollRestored(ScrollSnapshot),
    Focus(FocusTarget),
}

pub struct SyncClient<E, P> {
    config: SyncConfig,
    connection: ConnectionManager,
    identity: Box<dyn IdentityStore>,
    session: SessionState,
    document: DocumentSyncChannel,
    presence: PresenceTracker,
    scroll: ScrollSynchronizer,
    editor: E,
    preview: P,
    /// Captured at disconnect, consumed by the restore timer
    saved_scroll: Option<ScrollSnapshot>,
    restore_at: Option<Instant>,
    focus_at: Option<Instant>,
    name_prompt_focused: bool,
    editor_focus_requested: bool,
    /// A join is waiting in the outgoing queue for the next socket
    join_queued: bool,
    updates: VecDeque<ClientUpdate>,
}

impl<E, P> SyncClient<E, P>
where
    E: ScrollSurface,
    P: ScrollSurface,
{
    /// Start a session against `config.relay_url`.
    ///
    /// Must be called within a tokio runtime. With a remembered name the join
    /// request is issued right away; otherwise the name prompt is shown once
    /// the relay is reachable.
    pub fn new(config: SyncConfig, identity: Box<dyn IdentityStore>, editor: E, preview: P) -> Self {
        let connection = ConnectionManager::connect(
            config.relay_url.clone(),
            config.reconnect.clone(),
            config.outgoing_capacity,
        );
        Self::with_connection(config, connection, identity, editor, preview)
    }

    fn with_connection(
        config: SyncConfig,
        connection: ConnectionManager,
        identity: Box<dyn IdentityStore>,
        editor: E,
        preview: P,
    ) -> Self {
        let stored = match identity.load() {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Could not read stored display name: {e}");
                None
            }
        };
        let session = SessionState::restore(stored);

        let mut client = Self {
            scroll: ScrollSynchronizer::new(config.suppress_cooldown),
            config,
            connection,
            identity,
            session,
            document: DocumentSyncChannel::new(),
            presence: PresenceTracker::new(),
            editor,
            preview,
            saved_scroll: None,
            restore_at: None,
            focus_at: None,
            name_prompt_focused: false,
            editor_focus_requested: false,
            join_queued: false,
            updates: VecDeque::new(),
        };

        if let Some(name) = client.session.display_name() {
            log::info!("Joining as remembered user {name}");
            let join = RelayMessage::join_room(name);
            client.connection.send(join);
            client.join_queued = true;
        }
        client
    }

    /// Wait for the next change the view must react to.
    ///
    /// Returns `None` after [`teardown`](Self::teardown) or if the transport
    /// stopped.
    pub async fn next_update(&mut self) -> Option<ClientUpdate> {
        loop {
            if let Some(update) = self.updates.pop_front() {
                return Some(update);
            }
            let deadline = self.next_deadline();
            tokio::select! {
                event = self.connection.next_event() => match event {
                    Some(event) => self.handle_event(event),
                    None => return None,
                },
                _ = sleep_until(deadline) => self.fire_timers(Instant::now()),
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.restore_at, self.focus_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        let now = Instant::now();
        match event {
            // The relay forgets membership with the old socket
            ConnectionEvent::Connected | ConnectionEvent::Reconnected => {
                if !std::mem::take(&mut self.join_queued) {
                    if let Some(name) = self.session.display_name() {
                        let join = RelayMessage::join_room(name);
                        self.connection.send(join);
                    }
                }
                self.on_connected(now);
            }
            ConnectionEvent::Disconnected => {
                let snapshot = self.scroll.capture(&self.editor, &self.preview);
                log::debug!("Saved scroll positions {snapshot:?}");
                self.saved_scroll = Some(snapshot);
                self.restore_at = None;
                self.focus_at = None;
                self.updates.push_back(ClientUpdate::ViewChanged(View::Connecting));
            }
            ConnectionEvent::Message(message) => self.handle_message(message, now),
        }
    }

    fn on_connected(&mut self, now: Instant) {
        let view = self.view();
        self.updates.push_back(ClientUpdate::ViewChanged(view));
        if view == View::NameEntry && !self.name_prompt_focused {
            self.name_prompt_focused = true;
            self.updates
                .push_back(ClientUpdate::Focus(FocusTarget::NameField));
        }
        if view == View::Editor && !self.editor_focus_requested {
            self.editor_focus_requested = true;
            self.focus_at = Some(now + self.config.focus_delay);
        }
        if self.saved_scroll.is_some() {
            self.restore_at = Some(now + self.config.restore_delay);
        }
    }

    fn handle_message(&mut self, message: RelayMessage, now: Instant) {
        if message.direction() != Direction::RelayToClient {
            log::warn!("Ignoring client-bound {} from relay", message.event_name());
            return;
        }
        match message {
            RelayMessage::UpdateMarkdown(content) => {
                self.document.on_remote_update(content);
                // Re-render changes pane heights; wait for it to settle
                if self.restore_at.is_some() {
                    self.restore_at = Some(now + self.config.restore_delay);
                }
                self.updates.push_back(ClientUpdate::DocumentReplaced);
            }
            RelayMessage::OnlineUsers(count) => {
                self.presence.on_count_update(count);
                self.updates.push_back(ClientUpdate::PresenceChanged(count));
            }
            RelayMessage::JoinRoom(_) | RelayMessage::MarkdownChange(_) => {}
        }
    }

    fn fire_timers(&mut self, now: Instant) {
        if self.restore_at.is_some_and(|at| at <= now) {
            self.restore_at = None;
            if let Some(snapshot) = self.saved_scroll.take() {
                self.scroll
                    .restore(snapshot, &mut self.editor, &mut self.preview, now);
                self.updates.push_back(ClientUpdate::ScrollRestored(snapshot));
            }
        }
        if self.focus_at.is_some_and(|at| at <= now) {
            self.focus_at = None;
            self.updates.push_back(ClientUpdate::Focus(FocusTarget::Editor));
        }
    }

    // ── Name entry ───────────────────────────────────────────────

    pub fn set_name_input(&mut self, text: impl Into<String>) {
        self.session.set_name_input(text);
    }

    /// Join with the name currently in the name field.
    ///
    /// On success the name is remembered, the join request is sent and the
    /// editor view follows; the editor takes focus shortly after. While the
    /// relay is unreachable the join waits for the next connection.
    pub fn submit(&mut self) -> Result<(), SessionError> {
        let name = self.session.submit()?.to_string();

        if let Err(e) = self.identity.save(&name) {
            log::warn!("Could not remember display name: {e}");
        }
        if !self.connection.is_connected() {
            log::info!("Not connected, joining as {name} once the relay is back");
            return Ok(());
        }
        log::info!("Joining as {name}");
        self.connection.send(RelayMessage::join_room(name));

        self.editor_focus_requested = true;
        self.focus_at = Some(Instant::now() + self.config.focus_delay);
        let view = self.view();
        self.updates.push_back(ClientUpdate::ViewChanged(view));
        Ok(())
    }

    /// Enter pressed in the name field.
    pub fn on_name_field_enter(&mut self) -> Result<(), SessionError> {
        self.submit()
    }

    // ── Document ─────────────────────────────────────────────────

    /// The user changed the editor content.
    ///
    /// Applied locally at once; sent to the relay only while connected.
    pub fn local_edit(&mut self, content: impl Into<String>) {
        let message = self.document.local_edit(content);
        if self.connection.is_connected() {
            self.connection.send(message);
        } else {
            log::debug!("Not connected, local edit not sent");
        }
    }

    pub fn content(&self) -> &str {
        self.document.content()
    }

    pub fn render_preview(&self, renderer: &dyn MarkdownRenderer) -> String {
        self.document.render(renderer)
    }

    // ── Scrolling ────────────────────────────────────────────────

    pub fn on_editor_scroll(&mut self) -> MirrorOutcome {
        self.scroll
            .editor_scrolled(&self.editor, &mut self.preview, Instant::now())
    }

    pub fn on_preview_scroll(&mut self) -> MirrorOutcome {
        self.scroll
            .preview_scrolled(&self.preview, &mut self.editor, Instant::now())
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable pane access, for metric changes after a re-render or resize.
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn preview(&self) -> &P {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut P {
        &mut self.preview
    }

    pub fn scroll(&self) -> &ScrollSynchronizer {
        &self.scroll
    }

    // ── State ────────────────────────────────────────────────────

    pub fn view(&self) -> View {
        if !self.connection.is_connected() {
            View::Connecting
        } else if !self.session.joined() {
            View::NameEntry
        } else {
            View::Editor
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn online_users(&self) -> u64 {
        self.presence.count()
    }

    pub fn identity(&self) -> &dyn IdentityStore {
        self.identity.as_ref()
    }

    /// Release the transport. Pending updates are discarded and
    /// [`next_update`](Self::next_update) returns `None` from here on.
    pub fn teardown(&mut self) {
        self.connection.shutdown();
        self.updates.clear();
        self.restore_at = None;
        self.focus_at = None;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
