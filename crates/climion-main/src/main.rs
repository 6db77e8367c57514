// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of ClimION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod config;

use anyhow::Result;
use bevy_app::{ScheduleRunnerPlugin, TaskPoolPlugin, prelude::*};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use climion_core::{
    AsyncActionWriter, ClimateDataSourceResource, ClimionCorePlugin, ControlStatePersistence,
    CycleTimer, DebugModeConfig, LastRecommendation, PersistenceResource, ServiceSender,
    SnapshotReader, Supervisor,
};
use climion_ha::{HaClimateAdapter, HomeAssistantClient};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("ClimION - Adaptive Comfort Climate Automation");
                println!("Version: {VERSION}");
                println!();
                println!("Usage: climion [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{VERSION}");
                return Ok(());
            }
            _ => {}
        }
    }

    // Create tokio runtime for async HTTP operations
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    // Run the Bevy app in a blocking task so tokio can keep running async tasks
    runtime.block_on(async {
        tokio::task::spawn_blocking(initialize_and_run)
            .await
            .expect("Bevy task panicked")
    })
}

fn initialize_and_run() -> Result<()> {
    // Initialize tracing with env filter support (respects RUST_LOG)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = config::load_config()?;

    info!("🚀 Starting ClimION - Adaptive Comfort Climate Automation");
    info!("📋 Configuration Summary:");
    info!(
        "   Device: {} ({})",
        config.device.name, config.device.entity_id
    );
    info!(
        "   Sensors: indoor={}, outdoor={}",
        config.sensor_config.indoor_temp_entity, config.sensor_config.outdoor_temp_entity
    );
    info!(
        "   Comfort: category {}, clamps {:.1}-{:.1}°C, threshold {:.1}°C",
        config.comfort_config.comfort_category,
        config.comfort_config.min_comfort_temp,
        config.comfort_config.max_comfort_temp,
        config.comfort_config.temperature_change_threshold
    );
    info!(
        "   Occupancy: setback after {} min, shutdown after {} min",
        config.comfort_config.setback_delay_minutes, config.comfort_config.auto_shutdown_minutes
    );
    info!(
        "   Update interval: {}s",
        config.system_config.update_interval_secs
    );
    info!("   Debug mode: {}", config.system_config.debug_mode);

    // Initialize Home Assistant client
    let ha_client = if std::env::var("SUPERVISOR_TOKEN").is_ok() {
        info!("🏠 Initializing HA client using Supervisor API...");
        Arc::new(HomeAssistantClient::from_supervisor()?)
    } else {
        info!("🏠 Initializing HA client from configuration...");
        Arc::new(HomeAssistantClient::from_config(
            config.system_config.ha_base_url.clone(),
            config.system_config.ha_token.clone(),
        )?)
    };

    // Log the HA timezone for operator sanity; timers themselves run on UTC
    let runtime_handle = tokio::runtime::Handle::current();
    match runtime_handle.block_on(async { ha_client.get_timezone().await }) {
        Ok(timezone) => info!("🌍 Home Assistant timezone: {}", timezone),
        Err(e) => warn!("⚠️ Failed to fetch timezone from HA: {}", e),
    }

    // Create the climate data source
    let adapter = HaClimateAdapter::new(
        ha_client.clone(),
        config.device.clone(),
        config.sensor_config.clone(),
    );
    let source: Arc<dyn climion_core::ClimateDataSource> = Arc::new(adapter);
    info!("🔌 Climate data source: {}", source.name());

    // Load persisted control state (outdoor history, overrides, power latch)
    let persistence = ControlStatePersistence::new(&config.system_config.state_path);
    let persisted = match persistence.load() {
        Ok(state) => state,
        Err(e) => {
            warn!("⚠️ Failed to load control state, cold start: {e:#}");
            Default::default()
        }
    };

    let debug_config = if config.system_config.debug_mode {
        DebugModeConfig::enabled()
    } else {
        DebugModeConfig::disabled()
    };

    let cycle_timer = CycleTimer::new(config.system_config.update_interval_secs);
    let (service_sender, service_channel) = ServiceSender::new();

    info!("🎮 Starting ECS application...");

    let mut app = App::new();
    app.add_plugins(TaskPoolPlugin::default())
        .add_plugins(ScheduleRunnerPlugin::run_loop(Duration::from_millis(100)))
        .add_plugins(ClimionCorePlugin)
        .insert_resource(config)
        .insert_resource(debug_config)
        .insert_resource(cycle_timer)
        .insert_resource(ClimateDataSourceResource(source.clone()))
        .insert_resource(SnapshotReader::new(source.clone()))
        .insert_resource(AsyncActionWriter::new(source))
        .insert_resource(PersistenceResource(persistence))
        .insert_resource(persisted.outdoor_history.clone())
        .insert_resource(Supervisor::from_state(persisted.supervisor.clone()))
        .insert_resource(LastRecommendation(persisted.last_recommendation.clone()))
        .insert_resource(service_sender)
        .insert_resource(service_channel);

    info!("✅ Starting main loop...");
    app.run();

    Ok(())
}
