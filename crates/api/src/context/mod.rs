//! Application context - dependency injection container

mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lorekeep_core::{
    ConnectionSampler, MonitoringHub, PoolStatsProvider, RateLimiterSet, RequestGate,
    SamplerSettings,
};
use lorekeep_domain::{Config, ConnectionHealthReport, LorekeepError, Result};
use lorekeep_infra::{
    DbManager, HealthScheduler, InstrumentedExecutor, MaintenanceConfig, MaintenanceScheduler,
    MaintenanceTasks, SchedulerError, SqliteHealthProbe,
};
pub use state::AppState;
use tokio::sync::Mutex;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub hub: MonitoringHub,
    pub limiters: Arc<RateLimiterSet>,
    pub gate: RequestGate,
    pub sampler: Arc<ConnectionSampler>,
    pub executor: InstrumentedExecutor,

    // Background work; stopped by `shutdown`
    health_scheduler: Mutex<HealthScheduler>,
    maintenance_scheduler: Mutex<MaintenanceScheduler>,
}

impl AppContext {
    /// Build the context from the layered configuration (defaults, file,
    /// environment).
    pub async fn new() -> Result<Self> {
        let config = lorekeep_infra::config::load()?;
        Self::new_with_config(config).await
    }

    /// Build the context from an explicit configuration and start the
    /// background schedulers.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let hub = MonitoringHub::from_retention(
            &config.retention,
            config.monitor.slow_query_ms as f64,
            Utc::now(),
        );

        let limiters = Arc::new(
            RateLimiterSet::from_config(&config.rate_limits)
                .map_err(|err| LorekeepError::Config(err.to_string()))?,
        );
        let gate = RequestGate::new(Arc::clone(&limiters), hub.clone());

        let probe = Arc::new(SqliteHealthProbe::new(Arc::clone(&db)));
        let pool: Arc<dyn PoolStatsProvider> = db.clone();
        let sampler = Arc::new(ConnectionSampler::new(
            probe,
            pool,
            hub.clone(),
            SamplerSettings {
                probe_timeout: Duration::from_millis(config.monitor.probe_timeout_ms),
                thresholds: config.thresholds.clone(),
            },
        ));

        let executor = InstrumentedExecutor::new(Arc::clone(&db), hub.clone());

        let mut health_scheduler = HealthScheduler::new(
            Arc::clone(&sampler),
            Duration::from_secs(config.monitor.sampling_interval_secs),
        );
        health_scheduler.start().map_err(|err| {
            tracing::error!(error = %err, "failed to start HealthScheduler");
            LorekeepError::from(err)
        })?;

        let maintenance_config = MaintenanceConfig::from_retention(&config.retention);
        let tasks =
            MaintenanceTasks::from_config(hub.clone(), Arc::clone(&limiters), &maintenance_config);
        let mut maintenance_scheduler = MaintenanceScheduler::new(maintenance_config, tasks);
        if let Err(err) = maintenance_scheduler.start().await {
            tracing::error!(error = %err, "failed to start MaintenanceScheduler");
            // Do not leave the sampler loop running behind a failed startup.
            let _ = health_scheduler.stop().await;
            return Err(err.into());
        }

        tracing::info!(
            db_path = %db.path().display(),
            pool_size = db.max_size(),
            sampling_interval_secs = config.monitor.sampling_interval_secs,
            "AppContext initialized"
        );

        Ok(Self {
            config,
            db,
            hub,
            limiters,
            gate,
            sampler,
            executor,
            health_scheduler: Mutex::new(health_scheduler),
            maintenance_scheduler: Mutex::new(maintenance_scheduler),
        })
    }

    /// State handed to the router and the gate middleware.
    pub fn state(&self) -> AppState {
        AppState {
            gate: self.gate.clone(),
            hub: self.hub.clone(),
            executor: self.executor.clone(),
            pool: self.db.clone(),
        }
    }

    /// Last published connection-pool health.
    pub fn health_check(&self) -> ConnectionHealthReport {
        self.hub.health.current().report()
    }

    /// Stop background work. Safe to call more than once.
    ///
    /// The sampler loop is cancelled first; an in-flight probe is abandoned
    /// rather than awaited.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("AppContext shutdown initiated");

        let health = stop_ignoring_idle(self.health_scheduler.lock().await.stop().await);
        let maintenance = stop_ignoring_idle(self.maintenance_scheduler.lock().await.stop().await);

        if let Err(err) = &health {
            tracing::error!(error = %err, "failed to stop HealthScheduler");
        }
        if let Err(err) = &maintenance {
            tracing::error!(error = %err, "failed to stop MaintenanceScheduler");
        }

        health?;
        maintenance?;
        tracing::info!("AppContext shutdown completed");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.health_scheduler.lock().await.is_running()
            && self.maintenance_scheduler.lock().await.is_running()
    }
}

fn stop_ignoring_idle(result: std::result::Result<(), SchedulerError>) -> Result<()> {
    match result {
        Ok(()) | Err(SchedulerError::NotRunning) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
