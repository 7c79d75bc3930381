use macroquad::prelude::*;

use raceline::car::CarTelemetry;
use raceline::config::ROAD_COLOR;
use raceline::pool::Pool;
use raceline::stats::DrivingStats;
use raceline::track::Track;

use crate::ui::HostState;

const BORDER_COLOR: Color = Color::new(0.85, 0.85, 0.9, 1.0);
const CENTERLINE_COLOR: Color = Color::new(0.9, 0.3, 0.3, 0.35);
const HULL_COLOR: Color = Color::new(0.3, 0.6, 0.9, 0.25);
const START_COLOR: Color = Color::new(1.0, 0.8, 0.2, 1.0);
const CRASHED_COLOR: Color = Color::new(0.9, 0.2, 0.2, 0.8);
const RAY_COLOR: Color = Color::new(0.9, 0.9, 0.9, 0.2);
const CAR_RADIUS: f32 = 6.0;

/// Draw the course, every car and the HUD. The canvas occupies screen
/// coordinates `0..width, 0..height`.
pub fn draw(pool: &Pool, host: &HostState) {
    let track = &pool.course().track;
    draw_road(track);
    draw_hull(track);
    draw_borders(track);
    draw_start(track);

    for car in pool.telemetry() {
        if host.show_trails {
            draw_trail(&car);
        }
        if host.show_rays && !car.crashed {
            draw_rays(&car);
        }
        draw_car(&car);
    }

    draw_hud(pool, host);
}

fn road_color() -> Color {
    let [r, g, b] = ROAD_COLOR;
    Color::from_rgba(r, g, b, 255)
}

fn draw_road(track: &Track) {
    let color = road_color();
    let n = track.centerline.len();
    for (i, a) in track.centerline.iter().enumerate() {
        let b = track.centerline[(i + 1) % n];
        draw_line(a.x, a.y, b.x, b.y, track.path_width, color);
        draw_circle(a.x, a.y, track.path_width * 0.5, color);
    }
    for pair in track.centerline.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 1.0, CENTERLINE_COLOR);
    }
}

fn draw_hull(track: &Track) {
    for pair in track.closed_hull().windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 1.0, HULL_COLOR);
    }
}

fn draw_borders(track: &Track) {
    for (a, b) in track.walls() {
        draw_line(a.x, a.y, b.x, b.y, 2.0, BORDER_COLOR);
    }
}

fn draw_start(track: &Track) {
    let start = track.start;
    let tip = start.pos + Vec2::from_angle(start.heading) * 18.0;
    draw_circle(start.pos.x, start.pos.y, 4.0, START_COLOR);
    draw_line(start.pos.x, start.pos.y, tip.x, tip.y, 2.0, START_COLOR);
}

fn draw_trail(car: &CarTelemetry) {
    let color = Color::new(car.color.r, car.color.g, car.color.b, 0.3);
    for pair in car.trail.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 1.0, color);
    }
}

fn draw_rays(car: &CarTelemetry) {
    for hit in &car.sensor_points {
        draw_line(car.pos.x, car.pos.y, hit.x, hit.y, 1.0, RAY_COLOR);
        draw_circle(hit.x, hit.y, 2.0, RAY_COLOR);
    }
}

fn draw_car(car: &CarTelemetry) {
    let color = if car.crashed { CRASHED_COLOR } else { car.color };
    let dir = Vec2::from_angle(car.heading);
    let perp = dir.perp();

    let front = car.pos + dir * CAR_RADIUS * 1.6;
    let back_left = car.pos - dir * CAR_RADIUS * 0.8 + perp * CAR_RADIUS * 0.9;
    let back_right = car.pos - dir * CAR_RADIUS * 0.8 - perp * CAR_RADIUS * 0.9;
    if car.crashed {
        draw_triangle_lines(front, back_left, back_right, 1.0, color);
    } else {
        draw_triangle(front, back_left, back_right, color);
    }
}

fn draw_hud(pool: &Pool, host: &HostState) {
    let tc = Color::new(0.85, 0.9, 0.95, 1.0);
    let sh = Color::new(0.0, 0.0, 0.0, 0.5);
    let snapshot = pool.snapshot();

    let lines = [
        format!("FPS: {}", get_fps()),
        format!("Generation: {}", snapshot.generation),
        format!("Alive: {}/{}", snapshot.alive, snapshot.population),
    ];
    for (i, text) in lines.iter().enumerate() {
        let y = 20.0 + 20.0 * i as f32;
        draw_text(text, 11.0, y + 1.0, 18.0, sh);
        draw_text(text, 10.0, y, 18.0, tc);
    }

    draw_policy_rows(&pool.driving, pool.config().canvas_height, tc, sh);

    if host.paused {
        let pause_text = "PAUSED (Space to resume)";
        let tw = measure_text(pause_text, None, 24, 1.0).width;
        let x = pool.config().canvas_width * 0.5 - tw * 0.5;
        draw_text(pause_text, x + 1.0, 31.0, 24.0, sh);
        draw_text(pause_text, x, 30.0, 24.0, START_COLOR);
    }
}

fn draw_policy_rows(stats: &DrivingStats, canvas_height: f32, tc: Color, sh: Color) {
    let rows: Vec<_> = stats.rows().collect();
    for (i, (kind, row)) in rows.iter().rev().enumerate() {
        let text = format!(
            "{}: lap {} - speed {:.0} - score {:.0} - dist {:.0} - max speed {:.0} - last crash speed {:.0}",
            kind.label(),
            row.lap,
            row.speed,
            row.score,
            row.distance,
            row.max_speed,
            row.last_crash_speed
        );
        let y = canvas_height - 10.0 - 18.0 * i as f32;
        draw_text(&text, 11.0, y + 1.0, 16.0, sh);
        draw_text(&text, 10.0, y, 16.0, tc);
    }
}
