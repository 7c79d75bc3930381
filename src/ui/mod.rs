pub mod graphs;
pub mod toolbar;

use std::fmt::Display;

use tracing::error;

use raceline::pool::Pool;

/// Screen space reserved below the canvas for the toolbar.
pub const TOOLBAR_HEIGHT: f32 = 90.0;

/// Host-side controls; the simulation core never sees these.
pub struct HostState {
    pub paused: bool,
    pub step_requested: bool,
    pub regenerate_requested: bool,
    pub ticks_per_frame: u32,
    pub show_rays: bool,
    pub show_trails: bool,
    pub show_graphs: bool,
    /// Set once a fatal error stops the simulation.
    pub halted: Option<String>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            paused: false,
            step_requested: false,
            regenerate_requested: false,
            ticks_per_frame: 1,
            show_rays: false,
            show_trails: false,
            show_graphs: false,
            halted: None,
        }
    }
}

impl HostState {
    pub fn halt(&mut self, err: &impl Display) {
        error!(%err, "simulation halted");
        self.halted = Some(err.to_string());
    }
}

/// Draw all egui panels.
pub fn draw_ui(pool: Option<&Pool>, host: &mut HostState) {
    egui_macroquad::ui(|ctx| {
        toolbar::draw_toolbar(ctx, pool, host);

        if host.show_graphs {
            if let Some(pool) = pool {
                graphs::draw_graphs(ctx, &pool.history);
            }
        }
    });

    egui_macroquad::draw();
}
