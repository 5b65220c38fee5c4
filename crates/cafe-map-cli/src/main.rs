//! Headless driver for the café map engine.
//!
//! Loads a café dataset, reconstructs the viewport from persisted state (when
//! fresh), runs a reconcile pass against an in-memory map surface and prints
//! the resulting rendering set. With `--query` it additionally exercises the
//! search/selection path, including the follow-up reconcile after the fly.

mod settings;

use cafe_map_lib::{
    BoundingBox, CafeStore, FileStorage, HeadlessSurface, MapError, MapSurface, MarkerDescriptor,
    MarkerReconciler, RenderMode, Result, SelectionController, Viewport, load_map_state, now_ms,
    save_map_state,
};
use clap::Parser;
use geo::Point;
use std::sync::Arc;

use settings::Settings;

fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn main() -> Result<()> {
    setup_logging();
    let settings = Settings::parse();

    let storage = FileStorage::new_with_path(settings.state_file.clone())?;

    // Persisted viewport wins over the CLI defaults when present and fresh
    let (mut center, mut zoom) = (Point::new(settings.lng, settings.lat), settings.zoom);
    if !settings.ignore_persisted
        && let Some(state) = load_map_state(&storage, now_ms())
    {
        tracing::info!(
            lng = state.lng,
            lat = state.lat,
            zoom = state.zoom,
            "restored persisted map state"
        );
        center = state.center();
        zoom = state.zoom;
    }

    let bytes = std::fs::read(&settings.dataset)?;
    let store = Arc::new(CafeStore::from_json_slice(&bytes)?);
    let info = store.info();
    tracing::info!(
        cafes = info.cafe_count,
        skipped = info.skipped_records,
        "loaded dataset from {}",
        settings.dataset.display()
    );

    let mut surface = HeadlessSurface::new(
        Viewport {
            bounds: BoundingBox::around(center, settings.lng_span, settings.lat_span),
            zoom,
        },
        settings.width,
    );

    let mut reconciler = MarkerReconciler::with_zoom_threshold(settings.zoom_threshold);
    reconciler.attach_store(store.clone());

    let outcome = reconciler.reconcile(&mut surface);
    print_outcome("initial", &outcome, &surface);

    if let Some(query) = &settings.query {
        let mut selection = SelectionController::new();
        match selection.search_and_select(query, &store, &mut surface)? {
            Some(cafe) => {
                println!(
                    "selected: {} {:?} at ({:.6}, {:.6})",
                    cafe.id(),
                    cafe.store_name().unwrap_or("カフェ"),
                    cafe.lng(),
                    cafe.lat()
                );
                // The fly moved the camera; converge the markers to the new view
                let outcome = reconciler.reconcile(&mut surface);
                print_outcome("after selection", &outcome, &surface);
            }
            None => println!("no café matches {query:?}"),
        }
    }

    let viewport = surface.viewport().map_err(MapError::Surface)?;
    save_map_state(&storage, viewport.bounds.center(), viewport.zoom, now_ms())?;

    Ok(())
}

fn print_outcome(label: &str, outcome: &cafe_map_lib::ReconcileOutcome, surface: &HeadlessSurface) {
    let mode = match outcome.mode {
        Some(RenderMode::Markers) => "markers",
        Some(RenderMode::Clusters) => "clusters",
        None => "none",
    };
    println!(
        "{label}: mode={mode} added={} removed={} live={}",
        outcome.added,
        outcome.removed,
        surface.marker_count()
    );
    for descriptor in surface.markers() {
        match descriptor {
            MarkerDescriptor::Cafe {
                id,
                position,
                label,
                ..
            } => println!(
                "  cafe {id} ({:.6}, {:.6}) {}",
                position.x(),
                position.y(),
                label.as_deref().unwrap_or("-")
            ),
            MarkerDescriptor::Cluster {
                id,
                position,
                count,
            } => println!(
                "  cluster {id} ({:.6}, {:.6}) x{count}",
                position.x(),
                position.y()
            ),
        }
    }
}
