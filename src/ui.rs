use egui::{Context, RichText};

use crate::controller::{CameraOwner, FrameReport};

/// Build the overlay for the last finished frame and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, report: Option<&FrameReport>) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_stats_window(ctx, report);
        draw_controls_hint(ctx);
    })
}

fn owner_label(owner: CameraOwner) -> &'static str {
    match owner {
        CameraOwner::FreeLook => "free look",
        CameraOwner::Tour => "tour",
    }
}

fn draw_stats_window(ctx: &Context, report: Option<&FrameReport>) {
    egui::Window::new("Stats")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            let Some(r) = report else {
                ui.label(RichText::new("waiting for first frame").small());
                return;
            };
            ui.label(RichText::new(format!("FPS: {:.0}  ({:.1} ms)", r.fps, r.frame_ms)).small());
            ui.label(RichText::new(format!("Physics: {} steps, {:.2} s", r.physics_steps, r.simulated_time)).small());
            ui.label(RichText::new(format!("Scene: {}", r.readiness)).small());
            ui.label(RichText::new(format!("Tour pose: {}", r.tour_index)).small());
            ui.label(RichText::new(format!("Camera: {}", owner_label(r.camera_owner))).small());
            if let Some(t) = r.clip_time {
                ui.label(RichText::new(format!("Clip: {t:.1} s")).small());
            }
            if let Some(p) = r.tracked_position {
                ui.label(RichText::new(format!("Tracked: {:.2}, {:.2}, {:.2}", p.x, p.y, p.z)).small());
            }
        });
}

fn draw_controls_hint(ctx: &Context) {
    egui::Area::new(egui::Id::new("controls"))
        .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
        .show(ctx, |ui| {
            ui.label(RichText::new("Click - next viewpoint").small());
            ui.label(RichText::new("Arrows - nudge the dragon").small());
            ui.label(RichText::new("WASD/RF + mouse - free look").small());
        });
}
