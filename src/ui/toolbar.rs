use egui;

use super::{HostState, TOOLBAR_HEIGHT};
use raceline::pool::Pool;

/// Controls and generation metrics along the bottom of the window.
pub fn draw_toolbar(ctx: &egui::Context, pool: Option<&Pool>, host: &mut HostState) {
    egui::TopBottomPanel::bottom("toolbar")
        .exact_height(TOOLBAR_HEIGHT)
        .show(ctx, |ui| {
            ui.add_space(3.0);
            ui.horizontal_wrapped(|ui| {
                title_badge(ui, "RACELINE");

                ui.separator();
                compact_group(ui, "Sim", |ui| {
                    let pause_label = if host.paused { "Play" } else { "Pause" };
                    if ui.button(pause_label).clicked() {
                        host.paused = !host.paused;
                    }
                    if ui.button("Step").clicked() {
                        host.step_requested = true;
                    }
                    if ui.button("New track").clicked() {
                        host.regenerate_requested = true;
                    }
                });

                compact_group(ui, "Speed", |ui| {
                    for ticks in [1, 2, 5, 10] {
                        speed_button(ui, host, ticks);
                    }
                });

                compact_group(ui, "View", |ui| {
                    ui.toggle_value(&mut host.show_rays, "Rays");
                    ui.toggle_value(&mut host.show_trails, "Trails");
                    ui.toggle_value(&mut host.show_graphs, "Graphs");
                });
            });

            ui.add_space(4.0);
            ui.horizontal_wrapped(|ui| {
                if let Some(reason) = &host.halted {
                    status_chip(ui, &format!("HALTED: {reason}"), egui::Color32::from_rgb(230, 90, 80));
                }
                let Some(pool) = pool else {
                    return;
                };
                let snapshot = pool.snapshot();
                let track = &pool.course().track;
                metric_chip(ui, "Generation", format!("{}", snapshot.generation));
                metric_chip(ui, "Left on track", format!("{}", snapshot.generations_left));
                metric_chip(ui, "Alive", format!("{}/{}", snapshot.alive, snapshot.population));
                metric_chip(ui, "Best", format!("{:.0}", snapshot.best_score));
                metric_chip(ui, "Track", format!("{:.0}px", track.length));
                metric_chip(ui, "Attempts", format!("{}", track.quality.attempts));
                if track.quality.angle_fix_capped {
                    status_chip(
                        ui,
                        &format!("{} sharp corners", track.quality.sharp_angles),
                        egui::Color32::from_rgb(230, 190, 90),
                    );
                }
            });
            ui.add_space(3.0);
        });
}

fn speed_button(ui: &mut egui::Ui, host: &mut HostState, ticks: u32) {
    let selected = host.ticks_per_frame == ticks;
    if ui.selectable_label(selected, format!("{ticks}x")).clicked() {
        host.ticks_per_frame = ticks;
    }
}

fn title_badge(ui: &mut egui::Ui, label: &str) {
    let text = egui::RichText::new(label)
        .strong()
        .color(egui::Color32::from_rgb(190, 220, 255));
    ui.label(text);
}

fn compact_group(ui: &mut egui::Ui, heading: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(heading)
                    .small()
                    .color(egui::Color32::from_rgb(150, 170, 185)),
            );
            add_contents(ui);
        });
    });
}

fn metric_chip(ui: &mut egui::Ui, key: &str, value: String) {
    let text = egui::RichText::new(format!("{key}: {value}"))
        .small()
        .color(egui::Color32::from_rgb(205, 215, 225));
    ui.group(|ui| {
        ui.label(text);
    });
}

fn status_chip(ui: &mut egui::Ui, label: &str, color: egui::Color32) {
    ui.group(|ui| {
        ui.label(egui::RichText::new(label).small().strong().color(color));
    });
}
