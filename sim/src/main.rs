//! cane-sim — scripted demo driving the assistive-cane guidance pipeline
//! without hardware.
//!
//! Runs the same architecture a real deployment would: a `BleTransport`
//! feeding an `mpsc` channel, a `Pipeline` task consuming it and
//! broadcasting `PipelineEvent`s, and a `GuidanceExecutor` turning
//! `Instruction` events into speech through a `SpeechSynthesizer`. Here the
//! transport replays a scripted packet sequence and speech prints to the
//! console — grounded on the teacher's `main.rs` shape (parse CLI, init
//! tracing, spawn the processing loop, run to completion).

mod console_speech;
mod fake_transport;
mod scenario;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use cane_contracts::BleTransport;
use cane_core::snapshot::ImuSnapshot;
use cane_core::{GuidanceExecutor, Pipeline, PipelineConfig, PipelineEvent, Snapshot};

use console_speech::ConsoleSpeech;
use fake_transport::ScriptedTransport;
use scenario::ScenarioKind;

#[derive(Parser, Debug)]
#[command(name = "cane-sim", about = "Assistive cane guidance pipeline demo")]
struct Args {
    /// Which scripted scenario to play.
    #[arg(long, value_enum, default_value = "clear-path")]
    scenario: ScenarioKind,

    /// Milliseconds between scripted packets.
    #[arg(long, default_value = "200")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "cane_sim=info,cane_core=info".into()))
        .init();

    let args = Args::parse();
    info!("cane-sim starting — scenario = {:?}", args.scenario);

    let now_ms = 1_700_000_000_000_i64;
    let packets = scenario::generate(args.scenario, now_ms);

    let mut pipeline = Pipeline::new(PipelineConfig::default());
    if matches!(args.scenario, ScenarioKind::GpsGuidedWalk | ScenarioKind::GpsLoss) {
        pipeline.navigator_mut().load_destination(scenario::demo_route())?;
    }

    let (packet_tx, packet_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = broadcast::channel::<PipelineEvent>(64);

    let mut transport = ScriptedTransport::new(packets, Duration::from_millis(args.tick_ms));
    transport.connect().await?;

    let feeder = tokio::spawn(async move {
        while let Some(packet) = transport.next_packet().await {
            if packet_tx.send(packet).await.is_err() {
                break;
            }
        }
    });

    let speech: Arc<dyn cane_contracts::SpeechSynthesizer> = Arc::new(ConsoleSpeech::new());
    let mut executor = GuidanceExecutor::new(speech);

    let pipeline_task = tokio::spawn(async move {
        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
        // held for the task's lifetime; dropped (and with it, the stop
        // signal) once the scripted packet source closes and `run` returns.
        let _stop_tx = stop_tx;
        pipeline.run(packet_rx, event_tx, stop_rx).await
    });

    loop {
        match event_rx.recv().await {
            Ok(PipelineEvent::Instruction { instruction, snapshot }) => {
                if let Err(e) = executor.process(instruction, &snapshot).await {
                    warn!("executor: failed to process instruction: {e}");
                }
            }
            Ok(PipelineEvent::State(state)) => {
                let snapshot = Snapshot {
                    front: 0.0,
                    left: 0.0,
                    right: 0.0,
                    obstacle_high: false,
                    water_detected: false,
                    imu: ImuSnapshot {
                        yaw: state.packet.imu.yaw,
                        pitch: state.packet.imu.pitch,
                        roll: state.packet.imu.roll,
                    },
                    timestamp_ms: state.packet.timestamp_ms,
                    target_bearing: None,
                    heading_deviation: None,
                    distance_to_destination: None,
                    destination_name: None,
                    distance_to_next_waypoint: None,
                    next_waypoint_name: None,
                };
                if executor.is_tracking() {
                    if let Err(e) = executor.update_displacement(&snapshot).await {
                        warn!("executor: failed to update displacement: {e}");
                    }
                }
                if executor.is_stuck() {
                    warn!("executor: no displacement update for longer than the stuck timeout");
                }
            }
            Ok(PipelineEvent::WaypointReached(waypoint)) => {
                info!("waypoint reached: {:?}", waypoint.name);
            }
            Ok(PipelineEvent::DestinationReached) => {
                info!("destination reached");
            }
            Ok(PipelineEvent::Dropped(err)) => {
                warn!("packet dropped: {err}");
            }
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("event subscriber lagged by {n} events");
            }
        }
    }

    let _ = feeder.await;
    let final_pipeline = pipeline_task.await?;
    info!("cane-sim finished: {:?}", final_pipeline.get_stats());
    Ok(())
}
