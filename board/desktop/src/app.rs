use std::collections::HashSet;
use std::time::Duration;

use log::info;
use teleop::{InputEvent, Key};

use crate::display::DisplayHandle;

pub const WINDOW_TITLE: &str = "Tello Drone Remote Viewer";

pub struct TeleopApp {
    handle: DisplayHandle,
    texture: Option<egui::TextureHandle>,
    shown_generation: u64,
    pressed: HashSet<Key>,
    quit_sent: bool,
    repaint_every: Duration,
}

impl TeleopApp {
    pub fn new(handle: DisplayHandle, repaint_every: Duration) -> Self {
        Self {
            handle,
            texture: None,
            shown_generation: 0,
            pressed: HashSet::new(),
            quit_sent: false,
            repaint_every,
        }
    }

    fn forward_input(&mut self, ctx: &egui::Context) {
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::Key {
                    key,
                    pressed,
                    repeat: false,
                    ..
                } => {
                    let key = map_key(key);
                    if pressed {
                        self.pressed.insert(key);
                        self.handle.send(InputEvent::KeyDown(key));
                    } else {
                        self.pressed.remove(&key);
                        self.handle.send(InputEvent::KeyUp(key));
                    }
                }
                // releases are lost while unfocused
                egui::Event::WindowFocused(false) => self.release_all(),
                _ => {}
            }
        }
    }

    fn release_all(&mut self) {
        for key in self.pressed.drain() {
            self.handle.send(InputEvent::KeyUp(key));
        }
    }

    fn request_quit(&mut self) {
        if !self.quit_sent {
            info!("Window closed, landing before exit");
            self.handle.send(InputEvent::Quit);
            self.quit_sent = true;
        }
    }

    fn upload_frame(&mut self, ctx: &egui::Context) {
        let Ok(latest) = self.handle.latest.read() else {
            return;
        };
        if latest.generation == self.shown_generation {
            return;
        }
        let Some(frame) = &latest.frame else {
            return;
        };

        let image = egui::ColorImage::from_rgb([frame.width(), frame.height()], frame.pixels());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("video", image, egui::TextureOptions::LINEAR))
            }
        }
        self.shown_generation = latest.generation;
    }
}

impl eframe::App for TeleopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.forward_input(ctx);

        let finished = self.handle.is_finished();
        if ctx.input(|i| i.viewport().close_requested()) && !finished {
            // keep the window until the loop has landed the vehicle
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.request_quit();
        }
        if finished {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        self.upload_frame(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match &self.texture {
            Some(texture) => {
                ui.add(egui::Image::new(texture).fit_to_exact_size(ui.available_size()));
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.heading(if self.quit_sent {
                        "Landing..."
                    } else {
                        "Waiting for video..."
                    });
                });
            }
        });

        ctx.request_repaint_after(self.repaint_every);
    }
}

pub fn map_key(key: egui::Key) -> Key {
    match key {
        egui::Key::W => Key::W,
        egui::Key::A => Key::A,
        egui::Key::S => Key::S,
        egui::Key::D => Key::D,
        egui::Key::Q => Key::Q,
        egui::Key::T => Key::T,
        egui::Key::ArrowUp => Key::ArrowUp,
        egui::Key::ArrowDown => Key::ArrowDown,
        egui::Key::ArrowLeft => Key::ArrowLeft,
        egui::Key::ArrowRight => Key::ArrowRight,
        egui::Key::Escape => Key::Escape,
        _ => Key::Other,
    }
}
