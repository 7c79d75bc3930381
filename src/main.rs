use macroquad::prelude::*;
use tracing::{info, warn};

use raceline::config::SimConfig;
use raceline::pool::{Pool, PoolEvent};

mod renderer;
mod ui;

use ui::HostState;

const CONFIG_PATH: &str = "raceline.json";

fn window_conf() -> Conf {
    Conf {
        window_title: "Raceline".to_string(),
        window_width: raceline::config::CANVAS_WIDTH as i32,
        window_height: raceline::config::CANVAS_HEIGHT as i32 + ui::TOOLBAR_HEIGHT as i32,
        window_resizable: false,
        high_dpi: true,
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config() -> SimConfig {
    match SimConfig::load_or_default(CONFIG_PATH) {
        Ok(config) => config,
        Err(err) => {
            warn!(%err, path = CONFIG_PATH, "ignoring configuration file, using defaults");
            SimConfig::default()
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    init_tracing();
    let config = load_config();
    request_new_screen_size(
        config.canvas_width,
        config.canvas_height + ui::TOOLBAR_HEIGHT,
    );

    let mut host = HostState::default();
    let mut pool = match Pool::new(config.clone()) {
        Ok(pool) => Some(pool),
        Err(err) => {
            host.halt(&err);
            None
        }
    };
    let background = {
        let [r, g, b] = config.off_track_color;
        Color::from_rgba(r, g, b, 255)
    };

    loop {
        if is_key_pressed(KeyCode::Space) {
            host.paused = !host.paused;
        }
        if is_key_pressed(KeyCode::R) {
            host.show_rays = !host.show_rays;
        }
        if is_key_pressed(KeyCode::T) {
            host.show_trails = !host.show_trails;
        }
        if is_key_pressed(KeyCode::Enter) {
            host.regenerate_requested = true;
        }

        if let Some(pool) = pool.as_mut() {
            if host.halted.is_none() {
                run_frame(pool, &mut host);
            }
        }
        host.step_requested = false;
        host.regenerate_requested = false;

        clear_background(background);
        if let Some(pool) = pool.as_ref() {
            renderer::draw(pool, &host);
        }
        ui::draw_ui(pool.as_ref(), &mut host);

        next_frame().await;
    }
}

fn run_frame(pool: &mut Pool, host: &mut HostState) {
    if host.regenerate_requested {
        if let Err(err) = pool.regenerate_track() {
            host.halt(&err);
            return;
        }
    }

    let ticks = match (host.paused, host.step_requested) {
        (false, _) => host.ticks_per_frame,
        (true, true) => 1,
        (true, false) => 0,
    };
    for _ in 0..ticks {
        match pool.tick() {
            Ok(PoolEvent::Running) => {}
            Ok(event) => info!(?event, "generation boundary"),
            Err(err) => {
                host.halt(&err);
                return;
            }
        }
    }
}
