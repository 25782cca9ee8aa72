//! Headless demo: plays synthetic recordings through the viewers and logs
//! what each one draws.

use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ev_core::NavigationEngine;
use ev_data::DataSource;
use ev_render::RecordingSink;
use ev_views::{Handled, Viewer};

mod demo;

const TICK: Duration = Duration::from_millis(16);
const TICKS: usize = 240;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting headless viewer demo");

    let signals: Arc<dyn DataSource> = Arc::new(demo::signal_source()?);
    let epochs: Arc<dyn DataSource> = Arc::new(demo::epoch_source()?);
    let spikes: Arc<dyn DataSource> = Arc::new(demo::spike_source()?);
    let sources = [("signals", signals), ("epochs", epochs), ("spikes", spikes)];

    let handle = tokio::runtime::Handle::current();
    let mut viewers = Vec::new();
    for (name, source) in &sources {
        info!(
            "Opening {} viewer: {} channels over [{:.1}, {:.1}]s",
            name,
            source.nb_channel(),
            source.t_start(),
            source.t_stop()
        );
        viewers.push((*name, Viewer::spawn(Arc::clone(source), &handle), RecordingSink::new()));
    }

    let engine = NavigationEngine::new(0.0, demo::DURATION);
    engine.set_speed(8.0);
    engine.play();

    let mut last = Instant::now();
    for tick in 0..TICKS {
        tokio::time::sleep(TICK).await;
        let now = Instant::now();
        engine.advance(now - last);
        last = now;

        // Halfway through, scrub backwards in a burst like a dragged slider
        if tick == TICKS / 2 {
            for step in 0..50 {
                engine.seek_to(30.0 - step as f64 * 0.2);
            }
        }

        if let Some(t) = engine.take_pending(now) {
            for (name, viewer, _) in viewers.iter_mut() {
                if let Err(e) = viewer.navigate(t) {
                    warn!("{} viewer could not navigate to {:.3}: {}", name, t, e);
                }
            }
        }

        for (_, viewer, sink) in viewers.iter_mut() {
            viewer.poll(sink);
        }
    }

    // Restyle the epoch viewer: recolor and hide the state channel
    if let Some((_, viewer, sink)) = viewers.iter_mut().find(|(name, _, _)| *name == "epochs") {
        {
            let params = viewer.params();
            let mut params = params.write();
            params.set_color(0, egui::Color32::from_rgb(255, 128, 0))?;
            params.set_visible(1, false)?;
        }
        viewer.style_changed(sink)?;
        // Skip results of navigations issued before the restyle
        while let Some(handled) = viewer.next(sink).await {
            if handled != Handled::Stale {
                info!("Epoch viewer after restyle: {:?}", handled);
                break;
            }
        }
    }

    for (name, viewer, sink) in &viewers {
        let controller = viewer.controller();
        info!(
            "{} viewer: cursor {:?}, {} frames rendered, {} primitives on screen, failure: {}",
            name,
            controller.cursor(),
            controller.frames_rendered(),
            sink.current_primitives().len(),
            controller.last_failure().map_or("none".to_string(), |f| f.error.to_string())
        );
    }

    Ok(())
}
