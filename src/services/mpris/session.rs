use std::{
    env,
    path::PathBuf,
    process::Command,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use zbus::{
    Connection, Proxy, fdo,
    names::{OwnedBusName, UniqueName},
};

use crate::services::common::Property;

use super::{
    LoopStatus, MediaError, MediaEvent, MediaPlayer2PlayerProxy, MediaPlayer2Proxy,
    PlaybackStatus, PlayerId, PlayerState, SessionPhase, TrackMetadata,
};

const MEDIA_PLAYER_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// One live connection to a discovered media player.
///
/// Owns the two MPRIS proxies and keeps a normalized [`PlayerState`]
/// snapshot current. The session moves through
/// `AwaitingProxies → Ready → Closed`; losing the bus name owner on either
/// proxy closes it, and a closed session never comes back.
pub struct PlayerSession {
    id: PlayerId,
    identity: String,
    root_proxy: MediaPlayer2Proxy<'static>,
    player_proxy: MediaPlayer2PlayerProxy<'static>,

    phase: Property<SessionPhase>,
    state: Property<PlayerState>,
    events_tx: broadcast::Sender<MediaEvent>,

    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlayerSession {
    /// Connect to a player and start tracking its state.
    ///
    /// Both proxy handshakes run concurrently; if either fails the session
    /// is never created. If the bus name turns out to have no owner the
    /// session is returned already closed so the caller observes the
    /// normal close path.
    ///
    /// # Errors
    /// Returns error if the bus name is invalid or proxy creation fails
    #[instrument(skip(connection, events_tx), fields(bus_name = %id.bus_name()))]
    pub(crate) async fn spawn(
        connection: &Connection,
        id: PlayerId,
        events_tx: broadcast::Sender<MediaEvent>,
    ) -> Result<Arc<Self>, MediaError> {
        let bus_name = OwnedBusName::try_from(id.bus_name())
            .map_err(|e| MediaError::InitializationFailed(format!("Invalid bus name: {e}")))?;

        let root_builder = MediaPlayer2Proxy::builder(connection).destination(bus_name.clone())?;
        let player_builder =
            MediaPlayer2PlayerProxy::builder(connection).destination(bus_name.clone())?;

        let (root_proxy, player_proxy) =
            tokio::try_join!(root_builder.build(), player_builder.build())?;

        let identity = root_proxy
            .identity()
            .await
            .unwrap_or_else(|_| id.bus_name().to_string());

        let session = Arc::new(Self {
            id,
            identity,
            root_proxy,
            player_proxy,
            phase: Property::new(SessionPhase::AwaitingProxies),
            state: Property::new(PlayerState::default()),
            events_tx,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        });

        let dbus_proxy = fdo::DBusProxy::new(connection).await?;
        let has_owner = dbus_proxy
            .name_has_owner(bus_name.inner().clone())
            .await
            .unwrap_or(false);
        if !has_owner {
            debug!("bus name has no owner, closing session immediately");
            session.close();
            return Ok(session);
        }

        session.phase.set(SessionPhase::Ready);
        session.update_state().await;
        session.spawn_monitors(connection);

        Ok(session)
    }

    /// Unique player identifier.
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Human-readable player name, falling back to the bus name.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase.get()
    }

    /// Watch lifecycle phase transitions.
    ///
    /// Yields the current phase immediately, so a watcher attached after
    /// the session closed still observes `Closed`.
    pub fn phase_watch(&self) -> impl Stream<Item = SessionPhase> + Send + use<> {
        self.phase.watch()
    }

    /// Current normalized state snapshot.
    pub fn state(&self) -> PlayerState {
        self.state.get()
    }

    /// Watch state snapshot changes.
    pub fn state_watch(&self) -> impl Stream<Item = PlayerState> + Send + use<> {
        self.state.watch()
    }

    fn spawn_monitors(self: &Arc<Self>, connection: &Connection) {
        let owner_task = tokio::spawn(Self::watch_owners(
            Arc::downgrade(self),
            self.root_proxy.clone(),
            self.player_proxy.clone(),
        ));
        let properties_task = tokio::spawn(Self::watch_properties(
            Arc::downgrade(self),
            connection.clone(),
            self.id.clone(),
        ));

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(owner_task);
        tasks.push(properties_task);
    }

    /// Close the session once either proxy loses its name owner.
    ///
    /// Ownership is re-verified after the subscriptions are live; a name
    /// vacated between session setup and the subscriptions existing would
    /// otherwise never produce an event, leaving a ghost session.
    async fn watch_owners(
        session: Weak<PlayerSession>,
        root_proxy: MediaPlayer2Proxy<'static>,
        player_proxy: MediaPlayer2PlayerProxy<'static>,
    ) {
        let root_owner = match root_proxy.inner().receive_owner_changed().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Owner subscription failed: {e}");
                Self::close_weak(&session);
                return;
            }
        };
        let player_owner = match player_proxy.inner().receive_owner_changed().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Owner subscription failed: {e}");
                Self::close_weak(&session);
                return;
            }
        };

        if !name_still_owned(root_proxy.inner()).await {
            debug!("bus name vacated before the owner watch started");
            Self::close_weak(&session);
            return;
        }

        owner_vacated(root_owner, player_owner).await;
        Self::close_weak(&session);
    }

    /// Recompute the full snapshot on every property-change notification.
    async fn watch_properties(session: Weak<PlayerSession>, connection: Connection, id: PlayerId) {
        let properties_proxy = match Self::properties_proxy(&connection, &id).await {
            Ok(proxy) => proxy,
            Err(e) => {
                warn!("Properties proxy failed for {id}: {e}");
                return;
            }
        };

        let mut changes = match properties_proxy.receive_properties_changed().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Properties subscription failed for {id}: {e}");
                return;
            }
        };

        while let Some(signal) = changes.next().await {
            let Some(session) = session.upgrade() else {
                return;
            };

            let Ok(args) = signal.args() else {
                continue;
            };
            if args.interface_name().as_str() != PLAYER_INTERFACE {
                continue;
            }

            session.update_state().await;
        }
    }

    async fn properties_proxy(
        connection: &Connection,
        id: &PlayerId,
    ) -> Result<fdo::PropertiesProxy<'static>, MediaError> {
        let bus_name = OwnedBusName::try_from(id.bus_name())
            .map_err(|e| MediaError::InitializationFailed(format!("Invalid bus name: {e}")))?;

        let proxy = fdo::PropertiesProxy::builder(connection)
            .destination(bus_name)?
            .path(MEDIA_PLAYER_PATH)?
            .build()
            .await?;
        Ok(proxy)
    }

    fn close_weak(session: &Weak<PlayerSession>) {
        if let Some(session) = session.upgrade() {
            session.close();
        }
    }

    /// Re-read every property and publish a fresh normalized snapshot.
    ///
    /// Individual property failures fall back to the field defaults; a
    /// half-broken player still yields a usable snapshot.
    pub(crate) async fn update_state(&self) {
        let metadata = self.player_proxy.metadata().await.unwrap_or_default();
        let track = TrackMetadata::from(metadata);

        let playback_status = self
            .player_proxy
            .playback_status()
            .await
            .map(|status| PlaybackStatus::from(status.as_str()))
            .unwrap_or(PlaybackStatus::Unknown);
        let loop_status = self
            .player_proxy
            .loop_status()
            .await
            .map(|status| LoopStatus::from(status.as_str()))
            .unwrap_or(LoopStatus::Unknown);
        let shuffle = self.player_proxy.shuffle().await.unwrap_or(false);
        let volume = self.player_proxy.volume().await.unwrap_or(0.0);

        let can_go_next = self.player_proxy.can_go_next().await.unwrap_or(false);
        let can_go_previous = self.player_proxy.can_go_previous().await.unwrap_or(false);
        let can_play = self.player_proxy.can_play().await.unwrap_or(false);
        let can_pause = self.player_proxy.can_pause().await.unwrap_or(false);
        let can_raise = self.root_proxy.can_raise().await.unwrap_or(false);

        self.state.set(PlayerState {
            artists: track.artists,
            title: track.title,
            cover_url: track.cover_url,
            playback_status,
            shuffle,
            loop_status,
            volume,
            can_go_next,
            can_go_previous,
            can_play,
            can_pause,
            can_raise,
        });

        let _ = self
            .events_tx
            .send(MediaEvent::PlayerUpdated(self.id.clone()));
    }

    /// Tear the session down.
    ///
    /// Aborts the monitoring tasks (which drops their signal subscriptions)
    /// before the `Closed` phase becomes visible, so no notification can
    /// reach a half-destroyed session. Idempotent; the phase transition
    /// fires exactly once.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            for task in tasks.drain(..) {
                task.abort();
            }
        }

        self.phase.set(SessionPhase::Closed);
        debug!(player = %self.id, "player session closed");
    }

    /// Toggle play/pause.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn play_pause(&self) -> Result<(), MediaError> {
        self.player_proxy
            .play_pause()
            .await
            .map_err(|e| MediaError::ControlFailed(format!("PlayPause failed: {e}")))
    }

    /// Skip to next track.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn next(&self) -> Result<(), MediaError> {
        self.player_proxy
            .next()
            .await
            .map_err(|e| MediaError::ControlFailed(format!("Next failed: {e}")))
    }

    /// Go to previous track.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn previous(&self) -> Result<(), MediaError> {
        self.player_proxy
            .previous()
            .await
            .map_err(|e| MediaError::ControlFailed(format!("Previous failed: {e}")))
    }

    /// Write the negation of the last-read shuffle value.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn toggle_shuffle(&self) -> Result<(), MediaError> {
        let shuffle = self.state.get().shuffle;
        self.player_proxy
            .set_shuffle(!shuffle)
            .await
            .map_err(|e| MediaError::ControlFailed(format!("Set shuffle failed: {e}")))
    }

    /// Advance the loop status through None → Track → Playlist → None.
    ///
    /// A no-op when the last-read status was unrecognized.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn cycle_loop(&self) -> Result<(), MediaError> {
        let Some(next) = self.state.get().loop_status.cycled() else {
            return Ok(());
        };

        self.player_proxy
            .set_loop_status(next.into())
            .await
            .map_err(|e| MediaError::ControlFailed(format!("Set loop status failed: {e}")))
    }

    /// Write the volume exactly as given; no clamping.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the D-Bus operation fails
    pub async fn set_volume(&self, volume: f64) -> Result<(), MediaError> {
        self.player_proxy
            .set_volume(volume)
            .await
            .map_err(|e| MediaError::ControlFailed(format!("Set volume failed: {e}")))
    }

    /// Bring the player's window to the front.
    ///
    /// Prefers activating the application behind the root proxy's desktop
    /// entry; falls back to the remote `Raise` method when the player
    /// advertises `CanRaise`. When neither works this is a silent no-op.
    ///
    /// # Errors
    /// Returns `MediaError::ControlFailed` if the remote `Raise` call fails
    pub async fn raise(&self) -> Result<(), MediaError> {
        if let Ok(entry) = self.root_proxy.desktop_entry().await {
            if !entry.is_empty() {
                if let Some(path) = desktop_entry_path(&entry) {
                    match Command::new("gio").arg("launch").arg(&path).spawn() {
                        Ok(_) => return Ok(()),
                        Err(e) => debug!("Desktop entry activation failed: {e}"),
                    }
                }
            }
        }

        if self.root_proxy.can_raise().await.unwrap_or(false) {
            self.root_proxy
                .raise()
                .await
                .map_err(|e| MediaError::ControlFailed(format!("Raise failed: {e}")))?;
        }

        Ok(())
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Ask the bus daemon whether the proxy's destination still has an owner.
///
/// Errors lean towards `true`: with the owner subscriptions already live,
/// a real loss still arrives as an event.
async fn name_still_owned(proxy: &Proxy<'_>) -> bool {
    let dbus_proxy = match fdo::DBusProxy::new(proxy.connection()).await {
        Ok(dbus_proxy) => dbus_proxy,
        Err(e) => {
            warn!("Ownership re-check failed: {e}");
            return true;
        }
    };

    dbus_proxy
        .name_has_owner(proxy.destination().clone())
        .await
        .unwrap_or(true)
}

/// Resolve once either owner stream reports a vacated name or ends.
///
/// A `Some(Some(_))` item is an owner handover and keeps the wait alive;
/// `Some(None)` means the name was vacated and `None` means the stream
/// ended under us. Either of the latter two resolves.
async fn owner_vacated(
    mut root_owner: impl Stream<Item = Option<UniqueName<'static>>> + Unpin,
    mut player_owner: impl Stream<Item = Option<UniqueName<'static>>> + Unpin,
) {
    loop {
        let owner = tokio::select! {
            owner = root_owner.next() => owner,
            owner = player_owner.next() => owner,
        };

        match owner {
            Some(Some(_)) => continue,
            Some(None) | None => break,
        }
    }
}

/// Locate `<entry>.desktop` in the XDG data directories.
fn desktop_entry_path(entry: &str) -> Option<PathBuf> {
    desktop_entry_in(&xdg_data_dirs(), entry)
}

fn desktop_entry_in(dirs: &[PathBuf], entry: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join("applications").join(format!("{entry}.desktop")))
        .find(|path| path.is_file())
}

fn xdg_data_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    match env::var_os("XDG_DATA_HOME") {
        Some(dir) if !dir.is_empty() => dirs.push(PathBuf::from(dir)),
        _ => {
            if let Some(home) = env::var_os("HOME") {
                dirs.push(PathBuf::from(home).join(".local/share"));
            }
        }
    }

    let system = env::var("XDG_DATA_DIRS")
        .unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string());
    dirs.extend(env::split_paths(&system));

    dirs
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::fs;

    use futures::{FutureExt, stream};
    use tempfile::TempDir;

    use super::*;

    fn unique_name() -> UniqueName<'static> {
        UniqueName::try_from(":1.42").unwrap()
    }

    #[tokio::test]
    async fn name_loss_on_either_stream_resolves_the_owner_wait() {
        let root = stream::iter(vec![Some(unique_name()), None]);
        let player = stream::pending::<Option<UniqueName<'static>>>();
        owner_vacated(root, player).await;
    }

    #[tokio::test]
    async fn ended_streams_resolve_the_owner_wait() {
        let root = stream::iter(Vec::<Option<UniqueName<'static>>>::new());
        let player = stream::iter(Vec::new());
        owner_vacated(root, player).await;
    }

    #[tokio::test]
    async fn owner_handovers_keep_the_wait_alive() {
        let root = stream::iter(vec![Some(unique_name()), Some(unique_name())])
            .chain(stream::pending());
        let player = stream::pending::<Option<UniqueName<'static>>>();

        assert!(owner_vacated(root, player).now_or_never().is_none());
    }

    #[test]
    fn desktop_entry_found_in_later_directory() {
        let empty = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let applications = data.path().join("applications");
        fs::create_dir_all(&applications).unwrap();
        fs::write(applications.join("spotify.desktop"), "[Desktop Entry]").unwrap();

        let dirs = vec![empty.path().to_path_buf(), data.path().to_path_buf()];
        let found = desktop_entry_in(&dirs, "spotify").unwrap();
        assert_eq!(found, applications.join("spotify.desktop"));
    }

    #[test]
    fn missing_desktop_entry_resolves_to_none() {
        let data = TempDir::new().unwrap();
        let dirs = vec![data.path().to_path_buf()];
        assert!(desktop_entry_in(&dirs, "nonexistent").is_none());
    }
}
