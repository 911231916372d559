// Application state and orchestration logic.
//
// The central event loop owns the lifecycle, credentials, and chat log. User
// commands arrive from the TUI; gateway calls run on spawned tasks and report
// back over a channel. After every change a full snapshot goes to the UI.

use std::sync::Arc;

use companion_core::config::GatewayConfig;
use companion_core::credentials::{CredentialStore, Credentials};
use companion_gateway::{ChatTransport, Gateway, GatewayError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{enroll_passcode, Authenticator};
use crate::chat::{resend_in_order, ChatState};
use crate::lifecycle::{AppPhase, Lifecycle, LifecycleError};
use crate::protocol::{AppSnapshot, GatewayEvent, UiUpdate, UserCommand};

/// Builds the transport for the current credentials. Called at startup and
/// again after setup saves new ones.
pub type Connector =
    Box<dyn Fn(Option<Credentials>) -> Result<Arc<dyn ChatTransport>, GatewayError> + Send + Sync>;

/// Connector backed by the real HTTP gateway.
pub fn gateway_connector(config: GatewayConfig) -> Connector {
    Box::new(move |credentials| {
        let gateway = Gateway::connect(credentials, &config)?;
        Ok(Arc::new(gateway) as Arc<dyn ChatTransport>)
    })
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub lifecycle: Lifecycle,
    pub credentials: CredentialStore,
    pub chat: ChatState,
    pub authenticator: Arc<dyn Authenticator>,
    pub transport: Arc<dyn ChatTransport>,
    connector: Connector,
    /// Whether the lock screen should ask for a passcode.
    pub needs_passcode: bool,
    /// Sends spawned but not yet answered.
    pub in_flight: usize,
    pub flushing: bool,
    pub gateway_healthy: Option<bool>,
    gateway_tx: mpsc::Sender<GatewayEvent>,
}

impl AppState {
    pub fn new(
        credentials: CredentialStore,
        authenticator: Arc<dyn Authenticator>,
        connector: Connector,
        gateway_tx: mpsc::Sender<GatewayEvent>,
    ) -> Self {
        AppState {
            lifecycle: Lifecycle::new(),
            credentials,
            chat: ChatState::new(),
            authenticator,
            transport: Arc::new(Gateway::Unconfigured),
            connector,
            needs_passcode: false,
            in_flight: 0,
            flushing: false,
            gateway_healthy: None,
            gateway_tx,
        }
    }

    /// Load credentials, pick the first screen, and bind the transport.
    pub async fn start(&mut self) -> Result<AppPhase, LifecycleError> {
        let phase = self.lifecycle.initialize(&mut self.credentials)?;
        self.reconnect();
        if phase == AppPhase::Locked {
            self.needs_passcode = self.lifecycle.needs_prompt(self.authenticator.as_ref()).await;
        }
        Ok(phase)
    }

    fn reconnect(&mut self) {
        self.transport = match (self.connector)(self.credentials.credentials()) {
            Ok(transport) => transport,
            Err(e) => {
                warn!("failed to build gateway client: {e}");
                Arc::new(Gateway::Unconfigured)
            }
        };
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            phase: self.lifecycle.phase(),
            error: self.lifecycle.error().map(str::to_string),
            needs_passcode: self.needs_passcode,
            messages: self.chat.messages().to_vec(),
            pending_count: self.chat.pending_count(),
            in_flight: self.in_flight,
            flushing: self.flushing,
            gateway_healthy: self.gateway_healthy,
            gateway_url: self.credentials.credentials().map(|c| c.gateway_url),
        }
    }

    fn is_ready(&self) -> bool {
        self.lifecycle.phase() == AppPhase::Ready
    }

    // -- command handlers ---------------------------------------------------

    async fn unlock(&mut self, response: &str) {
        match self
            .lifecycle
            .authenticate(self.authenticator.as_ref(), response)
            .await
        {
            Ok(AppPhase::Ready) => self.needs_passcode = false,
            Ok(_) => {}
            Err(e) => warn!("ignoring unlock: {e}"),
        }
    }

    async fn submit_setup(&mut self, gateway_url: &str, token: &str, passcode: Option<&str>) {
        if let Err(e) = self
            .lifecycle
            .complete_setup(&mut self.credentials, gateway_url, token)
        {
            warn!("setup not saved: {e}");
            return;
        }

        if let Some(passcode) = passcode {
            if let Err(e) = enroll_passcode(self.credentials.secure_store().as_ref(), passcode) {
                warn!("failed to save unlock passcode: {e}");
            }
        }

        self.reconnect();
        self.needs_passcode = self.lifecycle.needs_prompt(self.authenticator.as_ref()).await;
    }

    /// Optimistically insert the message and hand the network call to a task.
    fn send(&mut self, text: &str) {
        if !self.is_ready() {
            warn!(phase = ?self.lifecycle.phase(), "ignoring send before unlock");
            return;
        }
        let Some(message) = self.chat.compose(text) else {
            return;
        };

        self.in_flight += 1;
        let transport = Arc::clone(&self.transport);
        let tx = self.gateway_tx.clone();
        tokio::spawn(async move {
            let result = transport
                .send_message(&message.content)
                .await
                .map_err(|e| e.to_string());
            let _ = tx
                .send(GatewayEvent::Reply {
                    user_id: message.id,
                    result,
                })
                .await;
        });
    }

    /// Start a flush unless one is running or nothing is queued. Returns
    /// whether a flush was started.
    fn start_flush(&mut self) -> bool {
        if !self.is_ready() || self.flushing {
            return false;
        }
        let queue = self.chat.pending();
        if queue.is_empty() {
            debug!("nothing queued to resend");
            return false;
        }

        info!(queued = queue.len(), "resending queued messages");
        self.flushing = true;
        let transport = Arc::clone(&self.transport);
        let tx = self.gateway_tx.clone();
        tokio::spawn(async move {
            let results = resend_in_order(transport.as_ref(), queue).await;
            let _ = tx.send(GatewayEvent::Flushed(results)).await;
        });
        true
    }

    fn test_connection(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let transport = Arc::clone(&self.transport);
        let tx = self.gateway_tx.clone();
        tokio::spawn(async move {
            let healthy = transport.test_connection().await;
            let _ = tx.send(GatewayEvent::Health(healthy)).await;
        });
        true
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until `Quit` or the command channel
/// closes.
pub async fn run(
    mut gateway_rx: mpsc::Receiver<GatewayEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    if let Err(e) = state.start().await {
        warn!("startup skipped: {e}");
    }
    push_snapshot(&state, &ui_tx).await;

    // Stop polling the gateway channel once it closes.
    let mut gateway_open = true;

    loop {
        tokio::select! {
            event = gateway_rx.recv(), if gateway_open => {
                match event {
                    Some(event) => handle_gateway_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Gateway channel closed");
                        gateway_open = false;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn handle_user_command(state: &mut AppState, cmd: UserCommand, ui_tx: &mpsc::Sender<UiUpdate>) {
    match cmd {
        UserCommand::Unlock { response } => state.unlock(&response).await,
        UserCommand::SubmitSetup {
            gateway_url,
            token,
            passcode,
        } => {
            state
                .submit_setup(&gateway_url, &token, passcode.as_deref())
                .await
        }
        UserCommand::Send(text) => {
            if text.trim().is_empty() {
                return;
            }
            state.send(&text);
        }
        UserCommand::RetryPending => {
            if !state.start_flush() {
                return;
            }
        }
        UserCommand::TestConnection => {
            if !state.test_connection() {
                return;
            }
            let _ = ui_tx
                .send(UiUpdate::Notice("Testing connection...".into()))
                .await;
            return;
        }
        UserCommand::Quit => return,
    }
    push_snapshot(state, ui_tx).await;
}

async fn handle_gateway_event(
    state: &mut AppState,
    event: GatewayEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        GatewayEvent::Reply { user_id, result } => {
            state.in_flight = state.in_flight.saturating_sub(1);
            match result {
                Ok(outcome) => state.chat.record_reply(&user_id, outcome),
                Err(e) => {
                    warn!(id = %user_id, "send failed: {e}");
                    let _ = ui_tx.send(UiUpdate::Notice(format!("Send failed: {e}"))).await;
                }
            }
        }
        GatewayEvent::Flushed(results) => {
            state.flushing = false;
            let report = state.chat.apply_flush(results);
            let notice = if report.remaining == 0 {
                format!("Delivered {} queued message(s)", report.delivered)
            } else {
                format!(
                    "Delivered {}, {} still pending",
                    report.delivered, report.remaining
                )
            };
            let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
        }
        GatewayEvent::Health(healthy) => {
            info!(healthy, "gateway health probe finished");
            state.gateway_healthy = Some(healthy);
            let notice = if healthy {
                "Gateway reachable"
            } else {
                "Gateway unreachable"
            };
            let _ = ui_tx.send(UiUpdate::Notice(notice.into())).await;
            if healthy {
                state.start_flush();
            }
        }
    }
    push_snapshot(state, ui_tx).await;
}

async fn push_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.snapshot())))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{delivered, failed, FakeAuthenticator, ScriptedTransport};
    use companion_core::message::Twin;
    use companion_core::store::{MemorySecureStore, SecureStore};
    use companion_gateway::FailureReason;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct Harness {
        cmd_tx: mpsc::Sender<UserCommand>,
        ui_rx: mpsc::Receiver<UiUpdate>,
        handle: JoinHandle<anyhow::Result<()>>,
    }

    impl Harness {
        /// Wait for a snapshot matching `pred`, skipping everything else.
        async fn wait_for(&mut self, pred: impl Fn(&AppSnapshot) -> bool) -> AppSnapshot {
            let wait = async {
                loop {
                    match self.ui_rx.recv().await {
                        Some(UiUpdate::Snapshot(snapshot)) if pred(&*snapshot) => return *snapshot,
                        Some(_) => continue,
                        None => panic!("ui channel closed"),
                    }
                }
            };
            tokio::time::timeout(Duration::from_secs(5), wait)
                .await
                .expect("timed out waiting for snapshot")
        }

        async fn wait_for_notice(&mut self) -> String {
            let wait = async {
                loop {
                    match self.ui_rx.recv().await {
                        Some(UiUpdate::Notice(text)) => return text,
                        Some(_) => continue,
                        None => panic!("ui channel closed"),
                    }
                }
            };
            tokio::time::timeout(Duration::from_secs(5), wait)
                .await
                .expect("timed out waiting for notice")
        }

        async fn send(&self, cmd: UserCommand) {
            self.cmd_tx.send(cmd).await.unwrap();
        }

        async fn quit(self) {
            self.cmd_tx.send(UserCommand::Quit).await.unwrap();
            let result = self.handle.await.unwrap();
            assert!(result.is_ok());
        }
    }

    fn configured_store() -> CredentialStore {
        let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
        CredentialStore::new(store.clone())
            .configure("https://gw.example", "tok")
            .unwrap();
        CredentialStore::new(store)
    }

    fn spawn_app(
        credentials: CredentialStore,
        authenticator: FakeAuthenticator,
        transport: Arc<ScriptedTransport>,
    ) -> Harness {
        let (gateway_tx, gateway_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, ui_rx) = mpsc::channel(64);

        let connector: Connector =
            Box::new(move |_| Ok(Arc::clone(&transport) as Arc<dyn ChatTransport>));
        let state = AppState::new(credentials, Arc::new(authenticator), connector, gateway_tx);
        let handle = tokio::spawn(run(gateway_rx, cmd_rx, ui_tx, state));

        Harness {
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    /// Configured app with no unlock gate, already in the chat screen.
    async fn ready_app(transport: Arc<ScriptedTransport>) -> Harness {
        let mut app = spawn_app(
            configured_store(),
            FakeAuthenticator::new(false, false, ""),
            transport,
        );
        app.wait_for(|s| s.phase == AppPhase::Locked).await;
        app.send(UserCommand::Unlock {
            response: String::new(),
        })
        .await;
        app.wait_for(|s| s.phase == AppPhase::Ready).await;
        app
    }

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let app = spawn_app(
            configured_store(),
            FakeAuthenticator::new(false, false, ""),
            Arc::new(ScriptedTransport::new(vec![])),
        );
        app.quit().await;
    }

    #[tokio::test]
    async fn event_loop_exits_when_command_channel_closes() {
        let app = spawn_app(
            configured_store(),
            FakeAuthenticator::new(false, false, ""),
            Arc::new(ScriptedTransport::new(vec![])),
        );
        drop(app.cmd_tx);
        let result = app.handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unconfigured_start_shows_setup() {
        let mut app = spawn_app(
            CredentialStore::new(Arc::new(MemorySecureStore::new())),
            FakeAuthenticator::new(true, false, ""),
            Arc::new(ScriptedTransport::new(vec![])),
        );
        let snapshot = app.wait_for(|s| s.phase != AppPhase::Loading).await;
        assert_eq!(snapshot.phase, AppPhase::Setup);
        assert!(snapshot.gateway_url.is_none());
        app.quit().await;
    }

    #[tokio::test]
    async fn setup_with_passcode_requires_unlock() {
        let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
        let mut app = spawn_app(
            CredentialStore::new(store.clone()),
            FakeAuthenticator::new(true, true, "2468"),
            Arc::new(ScriptedTransport::new(vec![])),
        );
        app.wait_for(|s| s.phase == AppPhase::Setup).await;

        app.send(UserCommand::SubmitSetup {
            gateway_url: "https://gw.example/".into(),
            token: "tok".into(),
            passcode: Some("2468".into()),
        })
        .await;
        let locked = app.wait_for(|s| s.phase == AppPhase::Locked).await;
        assert!(locked.needs_passcode);
        assert_eq!(locked.gateway_url.as_deref(), Some("https://gw.example"));
        assert_eq!(
            store.get(crate::auth::PASSCODE_KEY).unwrap().as_deref(),
            Some("2468")
        );

        app.send(UserCommand::Unlock {
            response: "0000".into(),
        })
        .await;
        let rejected = app
            .wait_for(|s| s.error.as_deref() == Some("Authentication failed"))
            .await;
        assert_eq!(rejected.phase, AppPhase::Locked);

        app.send(UserCommand::Unlock {
            response: "2468".into(),
        })
        .await;
        let ready = app.wait_for(|s| s.phase == AppPhase::Ready).await;
        assert!(ready.error.is_none());
        app.quit().await;
    }

    #[tokio::test]
    async fn incomplete_setup_stays_on_setup_with_error() {
        let mut app = spawn_app(
            CredentialStore::new(Arc::new(MemorySecureStore::new())),
            FakeAuthenticator::new(false, false, ""),
            Arc::new(ScriptedTransport::new(vec![])),
        );
        app.wait_for(|s| s.phase == AppPhase::Setup).await;

        app.send(UserCommand::SubmitSetup {
            gateway_url: "https://gw.example".into(),
            token: "".into(),
            passcode: None,
        })
        .await;
        let snapshot = app.wait_for(|s| s.error.is_some()).await;
        assert_eq!(snapshot.phase, AppPhase::Setup);
        app.quit().await;
    }

    #[tokio::test]
    async fn send_before_unlock_is_ignored() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut app = spawn_app(
            configured_store(),
            FakeAuthenticator::new(true, true, "2468"),
            Arc::clone(&transport),
        );
        app.wait_for(|s| s.phase == AppPhase::Locked).await;

        app.send(UserCommand::Send("hello".into())).await;
        let snapshot = app.wait_for(|_| true).await;
        assert!(snapshot.messages.is_empty());
        assert!(transport.sent().is_empty());
        app.quit().await;
    }

    #[tokio::test]
    async fn send_inserts_optimistically_then_appends_reply() {
        let transport = Arc::new(ScriptedTransport::with_delays(vec![(
            Duration::from_millis(50),
            delivered("r1", "hi", Some(Twin::Case)),
        )]));
        let mut app = ready_app(Arc::clone(&transport)).await;

        app.send(UserCommand::Send("  hello  ".into())).await;
        let optimistic = app.wait_for(|s| s.messages.len() == 1).await;
        assert_eq!(optimistic.messages[0].content, "hello");
        assert!(optimistic.is_busy());

        let answered = app.wait_for(|s| s.messages.len() == 2).await;
        assert_eq!(answered.messages[1].content, "hi");
        assert_eq!(answered.messages[1].twin, Some(Twin::Case));
        assert!(!answered.is_busy());
        assert_eq!(transport.sent(), vec!["hello".to_string()]);
        app.quit().await;
    }

    #[tokio::test]
    async fn failed_send_is_queued() {
        let transport = Arc::new(ScriptedTransport::new(vec![failed(FailureReason::Status(
            500,
        ))]));
        let mut app = ready_app(transport).await;

        app.send(UserCommand::Send("hello".into())).await;
        let snapshot = app.wait_for(|s| s.pending_count == 1).await;
        assert!(snapshot.messages[0].pending);
        assert_eq!(snapshot.in_flight, 0);
        app.quit().await;
    }

    #[tokio::test]
    async fn blank_send_is_dropped() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut app = ready_app(Arc::clone(&transport)).await;

        app.send(UserCommand::Send("   ".into())).await;
        app.send(UserCommand::TestConnection).await;
        // The probe's snapshot arrives after the blank send was processed.
        let snapshot = app.wait_for(|s| s.gateway_healthy.is_some()).await;
        assert!(snapshot.messages.is_empty());
        assert!(transport.sent().is_empty());
        app.quit().await;
    }

    #[tokio::test]
    async fn user_messages_keep_compose_order_when_replies_race() {
        let transport = Arc::new(ScriptedTransport::with_delays(vec![
            (Duration::from_millis(200), delivered("slow", "slow reply", None)),
            (Duration::ZERO, delivered("fast", "fast reply", None)),
        ]));
        let mut app = ready_app(transport).await;

        app.send(UserCommand::Send("one".into())).await;
        app.send(UserCommand::Send("two".into())).await;
        let snapshot = app.wait_for(|s| s.messages.len() == 4).await;

        let contents: Vec<&str> = snapshot.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[..2], &["one", "two"]);
        assert!(contents.contains(&"slow reply"));
        assert!(contents.contains(&"fast reply"));
        app.quit().await;
    }

    #[tokio::test]
    async fn retry_pending_flushes_queue() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            failed(FailureReason::Network("down".into())),
            delivered("r1", "back online", None),
        ]));
        let mut app = ready_app(Arc::clone(&transport)).await;

        app.send(UserCommand::Send("hello".into())).await;
        app.wait_for(|s| s.pending_count == 1).await;

        app.send(UserCommand::RetryPending).await;
        let snapshot = app
            .wait_for(|s| !s.flushing && s.pending_count == 0)
            .await;
        assert_eq!(snapshot.messages.len(), 2);
        assert!(!snapshot.messages[0].pending);
        assert_eq!(snapshot.messages[1].content, "back online");
        assert_eq!(
            transport.sent(),
            vec!["hello".to_string(), "hello".to_string()]
        );
        app.quit().await;
    }

    #[tokio::test]
    async fn flush_in_progress_is_not_restarted() {
        let transport = Arc::new(ScriptedTransport::with_delays(vec![
            (Duration::ZERO, failed(FailureReason::Network("down".into()))),
            (Duration::from_millis(300), delivered("r1", "late reply", None)),
        ]));
        let mut app = ready_app(Arc::clone(&transport)).await;

        app.send(UserCommand::Send("hello".into())).await;
        app.wait_for(|s| s.pending_count == 1).await;

        app.send(UserCommand::RetryPending).await;
        app.wait_for(|s| s.flushing).await;

        // Both would start a pass if the first one were not still running.
        app.send(UserCommand::RetryPending).await;
        app.send(UserCommand::TestConnection).await;
        assert_eq!(app.wait_for_notice().await, "Testing connection...");
        assert_eq!(app.wait_for_notice().await, "Gateway reachable");
        assert_eq!(
            app.wait_for_notice().await,
            "Delivered 1 queued message(s)"
        );

        let snapshot = app.wait_for(|s| !s.flushing).await;
        assert_eq!(snapshot.pending_count, 0);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(
            transport.sent(),
            vec!["hello".to_string(), "hello".to_string()]
        );
        app.quit().await;
    }

    #[tokio::test]
    async fn healthy_probe_flushes_queue() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            failed(FailureReason::Status(502)),
            delivered("r1", "ok now", None),
        ]));
        let mut app = ready_app(transport).await;

        app.send(UserCommand::Send("hello".into())).await;
        app.wait_for(|s| s.pending_count == 1).await;

        app.send(UserCommand::TestConnection).await;
        let snapshot = app
            .wait_for(|s| s.gateway_healthy == Some(true) && s.pending_count == 0 && !s.flushing)
            .await;
        assert_eq!(snapshot.messages[1].content, "ok now");
        app.quit().await;
    }

    #[tokio::test]
    async fn unhealthy_probe_reports_and_keeps_queue() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![failed(FailureReason::Status(502))]).unhealthy(),
        );
        let mut app = ready_app(Arc::clone(&transport)).await;

        app.send(UserCommand::Send("hello".into())).await;
        app.wait_for(|s| s.pending_count == 1).await;

        app.send(UserCommand::TestConnection).await;
        assert_eq!(app.wait_for_notice().await, "Testing connection...");
        assert_eq!(app.wait_for_notice().await, "Gateway unreachable");
        let snapshot = app.wait_for(|s| s.gateway_healthy.is_some()).await;
        assert_eq!(snapshot.gateway_healthy, Some(false));
        assert_eq!(snapshot.pending_count, 1);
        assert_eq!(transport.sent().len(), 1);
        app.quit().await;
    }
}
