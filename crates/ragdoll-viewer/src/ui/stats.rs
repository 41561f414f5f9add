//! Performance stats section of the control panel.

use std::collections::VecDeque;

use bevy::{
    diagnostic::{Diagnostic, DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};
use bevy_egui::egui;
use egui_extras::{Column, TableBuilder};
use egui_plot::{Line, Plot, PlotPoints};

/// Number of frame times kept for the plot.
const FRAME_HISTORY_SIZE: usize = 120;

/// Recent frame times in milliseconds.
#[derive(Resource, Default)]
pub struct FrameTimeHistory {
    samples: VecDeque<f32>,
}

impl FrameTimeHistory {
    /// Push a new sample, maintaining the history size limit.
    pub fn push_sample(&mut self, frame_ms: f32) {
        let frame_ms = if frame_ms.is_finite() { frame_ms } else { 0.0 };
        self.samples.push_back(frame_ms);
        if self.samples.len() > FRAME_HISTORY_SIZE {
            self.samples.pop_front();
        }
    }

    /// Slowest frame in the history.
    pub fn worst(&self) -> Option<f32> {
        self.samples.iter().copied().reduce(f32::max)
    }
}

/// Record the duration of the last frame.
pub(super) fn record_frame_time(time: Res<Time>, mut history: ResMut<FrameTimeHistory>) {
    history.push_sample(time.delta_secs() * 1000.0);
}

/// Render FPS figures and the frame time plot.
pub(super) fn render_stats(
    ui: &mut egui::Ui,
    diagnostics: &DiagnosticsStore,
    history: &FrameTimeHistory,
) {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(Diagnostic::smoothed)
        .unwrap_or(0.0);
    let frame_time = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FRAME_TIME)
        .and_then(Diagnostic::smoothed)
        .unwrap_or(0.0);
    let worst = history.worst().unwrap_or(0.0);

    TableBuilder::new(ui)
        .column(Column::exact(80.0))
        .column(Column::exact(80.0))
        .body(|mut body| {
            for (label, value) in [
                ("FPS:", format!("{fps:.0}")),
                ("Frame:", format!("{frame_time:.1} ms")),
                ("Worst:", format!("{worst:.1} ms")),
            ] {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(label);
                    });
                    row.col(|ui| {
                        ui.label(value);
                    });
                });
            }
        });

    let points: PlotPoints = history
        .samples
        .iter()
        .enumerate()
        .map(|(i, &ms)| [i as f64, f64::from(ms)])
        .collect();
    Plot::new("frame_time_plot")
        .height(60.0)
        .show_axes(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("frame time", points).color(egui::Color32::LIGHT_BLUE));
        });
}
