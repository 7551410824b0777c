use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, instrument, warn};
use zbus::{Connection, fdo};

use super::MediaError;

/// Namespace prefix every MPRIS player bus name carries.
pub const MPRIS_BUS_PREFIX: &str = "org.mpris.MediaPlayer2.";

/// Watches the bus daemon for media player names.
///
/// Emits a bus name whenever one in the MPRIS namespace gains an owner:
/// once for every name present at startup, then for every
/// `NameOwnerChanged` event where a new owner appears without a previous
/// one. Owner losses are deliberately not reported here; each player
/// session watches its own proxies for that.
pub struct BusNameRegistry {
    connection: Connection,
}

impl BusNameRegistry {
    /// Create a registry on the given bus connection.
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Start watching and return the stream of discovered bus names.
    ///
    /// If the initial name enumeration fails the stream simply starts out
    /// empty; ownership-change events are still delivered. No retries.
    ///
    /// # Errors
    /// Returns error if D-Bus proxy creation or signal subscription fails
    #[instrument(skip(self))]
    pub async fn start(self) -> Result<UnboundedReceiverStream<String>, MediaError> {
        let dbus_proxy = fdo::DBusProxy::new(&self.connection)
            .await
            .map_err(|e| MediaError::InitializationFailed(format!("DBus proxy failed: {e}")))?;

        let mut name_owner_changed =
            dbus_proxy.receive_name_owner_changed().await.map_err(|e| {
                MediaError::InitializationFailed(format!("Signal subscription failed: {e}"))
            })?;

        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            match dbus_proxy.list_names().await {
                Ok(names) => {
                    for name in names {
                        if !name.as_str().starts_with(MPRIS_BUS_PREFIX) {
                            continue;
                        }
                        debug!(bus_name = %name, "found existing MPRIS player");
                        let _ = tx.send(name.to_string());
                    }
                }
                Err(e) => {
                    warn!("Bus name enumeration failed, starting with no players: {e}");
                }
            }

            while let Some(signal) = name_owner_changed.next().await {
                let Ok(args) = signal.args() else {
                    continue;
                };

                if !args.name().starts_with(MPRIS_BUS_PREFIX) {
                    continue;
                }

                if let (None, Some(_)) = (args.old_owner().as_deref(), args.new_owner().as_deref())
                {
                    info!(bus_name = %args.name(), "MPRIS player appeared on the bus");
                    if tx.send(args.name().to_string()).is_err() {
                        return;
                    }
                }
            }
        });

        Ok(UnboundedReceiverStream::new(rx))
    }
}
