use egui;

use raceline::stats::{GenerationStats, RingBuffer};

/// Fitness history per finished generation.
pub fn draw_graphs(ctx: &egui::Context, stats: &GenerationStats) {
    egui::Window::new("Fitness")
        .default_pos(egui::pos2(20.0, 20.0))
        .default_size(egui::vec2(320.0, 200.0))
        .resizable(true)
        .show(ctx, |ui| {
            ui.collapsing("Best / Mean", |ui| {
                let size = egui::vec2(ui.available_width(), 80.0);
                let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
                let rect = response.rect;
                painter.rect_filled(rect, 2.0, egui::Color32::from_gray(20));

                draw_line_in_rect(&painter, &stats.best_fitness, rect, egui::Color32::from_rgb(100, 200, 100));
                draw_line_in_rect(&painter, &stats.mean_fitness, rect, egui::Color32::from_rgb(200, 200, 100));

                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(100, 200, 100), "Best");
                    ui.colored_label(egui::Color32::from_rgb(200, 200, 100), "Mean");
                });
            });

            ui.collapsing("Best laps", |ui| {
                draw_line_graph(ui, &stats.best_laps, egui::Color32::from_rgb(200, 150, 255));
            });
        });
}

fn draw_line_graph(ui: &mut egui::Ui, buffer: &RingBuffer, color: egui::Color32) {
    let size = egui::vec2(ui.available_width(), 80.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(20));

    draw_line_in_rect(&painter, buffer, rect, color);

    if let Some(val) = buffer.last() {
        painter.text(
            egui::pos2(rect.right() - 4.0, rect.top() + 2.0),
            egui::Align2::RIGHT_TOP,
            format!("{val:.0}"),
            egui::FontId::proportional(10.0),
            egui::Color32::from_gray(200),
        );
    }
}

fn draw_line_in_rect(painter: &egui::Painter, buffer: &RingBuffer, rect: egui::Rect, color: egui::Color32) {
    let len = buffer.len();
    if len < 2 {
        return;
    }
    let samples: Vec<f32> = buffer.iter().collect();
    let max_val = samples.iter().copied().fold(1.0f32, f32::max);
    let min_val = samples.iter().copied().fold(max_val, f32::min);
    let range = (max_val - min_val).max(1.0);

    let points: Vec<egui::Pos2> = samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = rect.left() + (i as f32 / (len - 1) as f32) * rect.width();
            let y = rect.bottom() - ((v - min_val) / range) * rect.height();
            egui::pos2(x, y)
        })
        .collect();

    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], egui::Stroke::new(1.5, color));
    }
}
