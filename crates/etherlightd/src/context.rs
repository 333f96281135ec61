//! Application context
//!
//! Owns the configuration store, the State Acquirer and the Override
//! Store, and is the single handle command handlers operate through.

use etherlight_types::PortTable;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::acquirer::{DetectedSwitch, StateAcquirer};
use crate::compositor::Compositor;
use crate::config::{ConfigStore, EtherlightConfig, SyncMode};
use crate::error::{EtherlightError, Result};
use crate::led::LedSink;
use crate::overrides::{wall_clock_secs, FlashSpec, OverrideStore};
use crate::snmp::{SnmpTransport, UdpSnmpClient};
use crate::sync::run_sync;

/// Join handles of the spawned workers.
pub struct Workers<S> {
    pub acquirer: JoinHandle<()>,
    pub compositor: JoinHandle<S>,
    pub sync: Option<JoinHandle<()>>,
}

impl<S> Workers<S> {
    /// Waits for every worker to finish. Returns the LED sink the
    /// compositor handed back, if it exited cleanly.
    pub async fn join(self) -> Option<S> {
        if let Err(e) = self.acquirer.await {
            warn!(error = %e, "state acquirer task failed");
        }
        if let Some(sync) = self.sync {
            if let Err(e) = sync.await {
                warn!(error = %e, "sync task failed");
            }
        }
        match self.compositor.await {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!(error = %e, "compositor task failed");
                None
            }
        }
    }
}

/// Shared daemon state.
pub struct AppContext {
    config: ConfigStore,
    acquirer: Arc<StateAcquirer>,
    overrides: Arc<OverrideStore>,
    cancel: CancellationToken,
}

impl AppContext {
    pub fn new(config: EtherlightConfig, transport: Arc<dyn SnmpTransport>) -> Self {
        let config = ConfigStore::new(config);
        Self {
            acquirer: Arc::new(StateAcquirer::new(transport, config.clone())),
            config,
            overrides: Arc::new(OverrideStore::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Context talking SNMP to `device.switch_host`.
    pub fn with_udp_snmp(config: EtherlightConfig) -> Self {
        let snmp = &config.device.snmp;
        let client = UdpSnmpClient::new(
            &config.device.switch_host,
            snmp.port,
            &snmp.community,
            config.snmp_timeout(),
        );
        Self::new(config, Arc::new(client))
    }

    /// Starts the poller, the compositor driving `sink` and, unless sync
    /// is off, the VLAN color sync worker.
    pub fn spawn<S: LedSink + 'static>(&self, sink: S) -> Workers<S> {
        let acquirer = {
            let acquirer = Arc::clone(&self.acquirer);
            let cancel = self.cancel.clone();
            tokio::spawn(async move { acquirer.run(cancel).await })
        };

        let compositor = Compositor::new(
            self.config.clone(),
            self.acquirer.snapshot(),
            Arc::clone(&self.overrides),
            sink,
        );
        let compositor = tokio::spawn(compositor.run(self.cancel.clone()));

        let sync = match self.config.read_with(|c| c.sync.mode) {
            SyncMode::Off => None,
            _ => Some(tokio::spawn(run_sync(
                self.config.clone(),
                self.cancel.clone(),
            ))),
        };

        info!(sync = sync.is_some(), "workers started");
        Workers {
            acquirer,
            compositor,
            sync,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals every worker to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn acquirer(&self) -> &Arc<StateAcquirer> {
        &self.acquirer
    }

    pub fn overrides(&self) -> &Arc<OverrideStore> {
        &self.overrides
    }

    /// Deep copy of the current port table.
    pub fn state(&self) -> PortTable {
        self.acquirer.get_state()
    }

    pub fn switch_temperature(&self) -> Option<f64> {
        self.acquirer.switch_temperature()
    }

    /// Copy of the live configuration.
    pub fn config(&self) -> EtherlightConfig {
        self.config.read()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    /// Swaps in a new configuration after validating it. Workers pick it
    /// up on their next tick or cycle.
    pub fn replace_config(&self, config: EtherlightConfig) -> Result<()> {
        config.validate()?;
        self.config.replace(config);
        info!("configuration replaced");
        Ok(())
    }

    pub fn identify(&self) -> bool {
        self.overrides.identify()
    }

    pub fn set_identify(&self, on: bool) {
        self.overrides.set_identify(on);
    }

    pub fn toggle_identify(&self) -> bool {
        self.overrides.toggle_identify()
    }

    /// Flashes one port white for about `seconds`.
    pub fn blink_port(&self, port: u32, seconds: f64) -> Result<FlashSpec> {
        let max = self.config.read_with(|c| c.port_count());
        if port == 0 || port as usize > max {
            return Err(EtherlightError::InvalidPort { port, max });
        }
        Ok(self.overrides.blink_port(port, seconds, wall_clock_secs()))
    }

    /// Runs switch detection and writes the port count, model and system
    /// name into the live configuration.
    pub async fn detect_and_apply(&self) -> Result<DetectedSwitch> {
        let detected = self.acquirer.detect_switch().await?;
        self.config.update(|c| {
            if detected.guessed_port_count > 0 {
                c.device.ports.count = detected.guessed_port_count;
            }
            c.device.model_hint = Some(detected.model.clone());
            c.device.switch_name = Some(detected.system_name.clone());
        });
        info!(
            ports = detected.guessed_port_count,
            model = %detected.model,
            "detected switch applied to configuration"
        );
        Ok(detected)
    }
}
