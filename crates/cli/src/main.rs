//! `medcall` - run one video consultation between a doctor and a patient
//!
//! Both parties live in this process and talk through an in-memory
//! signaling relay, loopback peer connections and fake capture devices.

use anyhow::{bail, Context, Result};
use clap::Parser;
use medcall_infra_common::logging::log_welcome;
use medcall_infra_common::{load_config, setup_logging, ConfigSource, LoggingConfig};
use medcall_session_core::prelude::*;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "medcall", version, about = "Run a doctor/patient video call in-process")]
struct Args {
    /// TOML file with `[call]` and `[logging]` sections
    #[arg(short, long, env = "MEDCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Appointment the consultation belongs to
    #[arg(long, default_value = "appt-1")]
    appointment: String,

    #[arg(long, default_value = "doc-1")]
    doctor: String,

    #[arg(long, default_value = "pat-7")]
    patient: String,

    /// Patient declines instead of answering
    #[arg(long)]
    decline: bool,

    /// Patient's handshake fails after answering
    #[arg(long)]
    fail_handshake: bool,

    /// Seconds to stay connected before the doctor hangs up
    #[arg(short, long, default_value = "1")]
    duration: u64,

    /// Overrides the configured log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    call: CallConfig,
    logging: LoggingConfig,
}

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut source = ConfigSource::new();
    if let Some(path) = &args.config {
        source = source.with_file(path);
    }
    let mut settings: Settings = load_config(&source).context("loading configuration")?;
    settings.call.validate().context("invalid call configuration")?;
    if let Some(level) = &args.log_level {
        settings.logging.level = level.clone();
    }
    if args.json_logs {
        settings.logging.json = true;
    }
    setup_logging(&settings.logging).context("setting up logging")?;
    log_welcome(&settings.logging.app_name, env!("CARGO_PKG_VERSION"));

    let appointment_for = |is_doctor| {
        AppointmentContext::new(&args.appointment, args.doctor.as_str(), args.patient.as_str(), is_doctor)
    };
    let doctor_view = appointment_for(true);
    let patient_view = appointment_for(false);

    let hub = InMemorySignalingHub::new();
    let doctor = party(&hub, &doctor_view, LoopbackPeerFactory::new(), &settings.call).await?;
    let patient_peers = LoopbackPeerFactory::new();
    if args.fail_handshake {
        patient_peers.set_fail_handshake(true);
    }
    let patient = party(&hub, &patient_view, patient_peers, &settings.call).await?;

    tokio::spawn(log_events("doctor", doctor.subscribe()));
    tokio::spawn(log_events("patient", patient.subscribe()));

    info!("Appointment {}: {} calling {}", args.appointment, args.doctor, args.patient);
    doctor.request_local_media().await?;
    doctor.wait_for_local_media(STEP_TIMEOUT).await?;
    doctor.place_call(doctor_view.remote_identity().clone()).await?;

    patient
        .wait_for_state(|s| s == CallState::IncomingRinging, STEP_TIMEOUT)
        .await
        .context("patient never rang")?;

    if args.decline {
        patient.decline_call().await?;
    } else {
        patient.request_local_media().await?;
        patient.wait_for_local_media(STEP_TIMEOUT).await?;
        patient.accept_call().await?;

        let state = doctor
            .wait_for_state(|s| s == CallState::Connected || s.is_terminal(), STEP_TIMEOUT)
            .await?;
        if state == CallState::Connected {
            info!("Consultation connected, holding for {}s", args.duration);
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        }
        doctor.end_call().await?;
    }

    // Without end notices the patient never hears about the doctor's hangup
    if settings.call.notify_remote_on_end {
        if let Err(e) = patient.wait_for_state(|s| s.is_terminal(), STEP_TIMEOUT).await {
            warn!("Patient did not observe the end of the call: {}", e);
        }
    }
    patient.end_call().await?;

    let doctor_final = doctor.state().await;
    let patient_final = patient.state().await;
    info!("Final states: doctor {}, patient {}", doctor_final, patient_final);

    doctor.shutdown().await?;
    patient.shutdown().await?;

    if matches!(doctor_final, CallState::Failed(_)) || matches!(patient_final, CallState::Failed(_)) {
        bail!("call failed (doctor {}, patient {})", doctor_final, patient_final);
    }
    Ok(())
}

async fn party(
    hub: &InMemorySignalingHub,
    appointment: &AppointmentContext,
    peers: LoopbackPeerFactory,
    config: &CallConfig,
) -> Result<CallSessionManager> {
    let identity = appointment.local_identity().clone();
    let manager = CallSessionManagerBuilder::new()
        .with_config(config.clone())
        .with_appointment(appointment)
        .with_signaling(hub.client(identity.clone()))
        .with_peer_factory(peers)
        .with_media_devices(FakeMediaDevices::new())
        .build()
        .await
        .with_context(|| format!("starting call session manager for {}", identity))?;
    Ok(manager)
}

async fn log_events(who: &'static str, mut events: broadcast::Receiver<CallEvent>) {
    loop {
        match events.recv().await {
            Ok(CallEvent::StateChanged { old_state, new_state, .. }) => {
                info!("[{}] {} -> {}", who, old_state, new_state)
            }
            Ok(CallEvent::CallFailed { reason, message, .. }) => {
                warn!("[{}] call failed: {} ({})", who, reason, message)
            }
            Ok(event) => info!("[{}] {:?}", who, event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("[{}] skipped {} events", who, skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
