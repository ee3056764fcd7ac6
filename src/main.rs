//! Sim Sandbox entry point
//!
//! Web: the replay player. Reads the embedded artifact (or falls back to a
//! built-in template), drives the simulation from animation frames and
//! forwards pointer events.
//! Native: headless runner for templates and document files.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_player {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, PointerEvent};

    use sim_sandbox::Settings;
    use sim_sandbox::export::{CANVAS_ELEMENT_ID, DOCUMENT_ELEMENT_ID, ExportArtifact};
    use sim_sandbox::platform::FrameClock;
    use sim_sandbox::render::CanvasSurface;
    use sim_sandbox::sim::{BehaviorRegistry, SimOptions, Simulation, Value};
    use sim_sandbox::templates::{BuiltinTemplates, TemplateSource};

    /// Player instance holding all state
    struct Player {
        sim: Simulation,
        surface: CanvasSurface,
        canvas: HtmlCanvasElement,
        clock: FrameClock,
        speed: f32,
        frame_pending: bool,
    }

    impl Player {
        fn frame(&mut self, time: f64) {
            if let Some(dt) = self.clock.tick(time) {
                self.sim.step(dt * self.speed);
            }
            self.sim.render(&mut self.surface);
        }

        /// CSS pixels to canvas pixels
        fn canvas_point(&self, event: &PointerEvent) -> (f32, f32) {
            let sx = self.canvas.width() as f32 / self.canvas.client_width().max(1) as f32;
            let sy = self.canvas.height() as f32 / self.canvas.client_height().max(1) as f32;
            (event.offset_x() as f32 * sx, event.offset_y() as f32 * sy)
        }
    }

    thread_local! {
        static PLAYER: RefCell<Option<Rc<RefCell<Player>>>> = const { RefCell::new(None) };
    }

    fn current() -> Option<Rc<RefCell<Player>>> {
        PLAYER.with(|slot| slot.borrow().clone())
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Sim Sandbox player starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id(CANVAS_ELEMENT_ID)
            .ok_or("no canvas")?
            .dyn_into()
            .map_err(|_| "not a canvas")?;

        let settings = Settings::load();
        let mut options = settings.sim_options();
        if options.seed == 0 {
            options.seed = js_sys::Date::now() as u64;
        }

        let sim = load_simulation(&document, options)?;
        canvas.set_width(sim.canvas().width.round() as u32);
        canvas.set_height(sim.canvas().height.round() as u32);
        let surface = CanvasSurface::new(&canvas)?;

        let mut clock = FrameClock::new();
        clock.start();

        let player = Rc::new(RefCell::new(Player {
            sim,
            surface,
            canvas: canvas.clone(),
            clock,
            speed: settings.playback_speed(),
            frame_pending: false,
        }));
        PLAYER.with(|slot| *slot.borrow_mut() = Some(player.clone()));

        setup_pointer_handlers(&canvas, player.clone());
        setup_visibility(&document, player.clone());
        request_animation_frame(player);

        log::info!("Sim Sandbox running!");
        Ok(())
    }

    fn load_simulation(
        document: &web_sys::Document,
        options: SimOptions,
    ) -> Result<Simulation, JsValue> {
        let registry = BehaviorRegistry::with_builtins();
        let embedded = document
            .get_element_by_id(DOCUMENT_ELEMENT_ID)
            .and_then(|el| el.text_content());

        let result = match embedded {
            Some(json) => ExportArtifact::from_json(&json)
                .and_then(|artifact| artifact.into_simulation(registry, options))
                .map_err(|e| e.to_string()),
            None => {
                log::info!("No embedded document, loading playground template");
                BuiltinTemplates
                    .instantiate("playground", registry, options)
                    .map_err(|e| e.to_string())
            }
        };
        result.map_err(|e| JsValue::from_str(&e))
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, player: Rc<RefCell<Player>>) {
        let events = [
            ("pointermove", None),
            ("pointerdown", Some(true)),
            ("pointerup", Some(false)),
            ("pointercancel", Some(false)),
        ];
        for (name, down) in events {
            let player = player.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut p = player.borrow_mut();
                let (x, y) = p.canvas_point(&event);
                let down = down.unwrap_or(p.sim.pointer().down);
                p.sim.inject_pointer(x, y, down);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop the loop while the tab is hidden, resume when it comes back
    fn setup_visibility(document: &web_sys::Document, player: Rc<RefCell<Player>>) {
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let hidden = document_clone.visibility_state() == web_sys::VisibilityState::Hidden;
            let resume = {
                let mut p = player.borrow_mut();
                if hidden {
                    p.clock.stop();
                    false
                } else {
                    !p.clock.is_running()
                }
            };
            if resume {
                player.borrow_mut().clock.start();
                request_animation_frame(player.clone());
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(player: Rc<RefCell<Player>>) {
        if std::mem::replace(&mut player.borrow_mut().frame_pending, true) {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            frame_loop(player, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(player: Rc<RefCell<Player>>, time: f64) {
        let running = {
            let mut p = player.borrow_mut();
            p.frame_pending = false;
            p.frame(time);
            p.clock.is_running()
        };
        if running {
            request_animation_frame(player);
        }
    }

    // Host API

    #[wasm_bindgen]
    pub fn sandbox_start() {
        if let Some(player) = current() {
            player.borrow_mut().clock.start();
            request_animation_frame(player);
        }
    }

    #[wasm_bindgen]
    pub fn sandbox_stop() {
        if let Some(player) = current() {
            player.borrow_mut().clock.stop();
        }
    }

    #[wasm_bindgen]
    pub fn sandbox_reset() {
        if let Some(player) = current() {
            player.borrow_mut().sim.reset();
        }
    }

    #[wasm_bindgen]
    pub fn sandbox_press(control: &str) -> bool {
        current().is_some_and(|p| p.borrow_mut().sim.press_button(control))
    }

    #[wasm_bindgen]
    pub fn sandbox_set_value(control: &str, value: JsValue) -> bool {
        let value = if let Some(b) = value.as_bool() {
            Value::Bool(b)
        } else if let Some(n) = value.as_f64() {
            Value::Number(n)
        } else if let Some(s) = value.as_string() {
            Value::Text(s)
        } else {
            return false;
        };
        current().is_some_and(|p| p.borrow_mut().sim.set_control_value(control, value))
    }

    /// Graph control samples, oldest first
    #[wasm_bindgen]
    pub fn sandbox_graph(control: &str) -> Vec<f32> {
        let Some(player) = current() else {
            return Vec::new();
        };
        let player = player.borrow();
        player
            .sim
            .control(control)
            .map(|c| c.history().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current state as an artifact JSON string
    #[wasm_bindgen]
    pub fn sandbox_export() -> Result<String, JsValue> {
        let player = current().ok_or("player not running")?;
        let artifact = ExportArtifact::from_simulation(&player.borrow().sim);
        artifact.to_json().map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_player::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::fs;
    use std::path::PathBuf;

    use clap::{Parser, ValueEnum};
    use sim_sandbox::export::{ExportArtifact, KernelBundle};
    use sim_sandbox::render::RecordingSurface;
    use sim_sandbox::sim::{BehaviorRegistry, Simulation};
    use sim_sandbox::templates::{BuiltinTemplates, TemplateSource};
    use sim_sandbox::{Document, QualityPreset, Settings};

    #[derive(Clone, Copy, Debug, ValueEnum)]
    enum Quality {
        Low,
        Medium,
        High,
    }

    impl From<Quality> for QualityPreset {
        fn from(quality: Quality) -> Self {
            match quality {
                Quality::Low => QualityPreset::Low,
                Quality::Medium => QualityPreset::Medium,
                Quality::High => QualityPreset::High,
            }
        }
    }

    /// Run a document headless and optionally export it
    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    pub struct Args {
        /// Built-in template name or path to a document (.json)
        #[arg(default_value = "bouncing_balls")]
        source: String,

        /// Frames to simulate at 60 Hz
        #[arg(default_value_t = 300)]
        frames: u32,

        /// Quality preset (particle capacity)
        #[arg(short, long, value_enum)]
        quality: Option<Quality>,

        /// Seed for documents that do not carry one
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the JSON export artifact here
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Write a self-contained page here
        #[arg(long, requires_all = ["loader", "wasm"])]
        html: Option<PathBuf>,

        /// Kernel loader script embedded in the page
        #[arg(long)]
        loader: Option<PathBuf>,

        /// Base64-encoded kernel wasm embedded in the page
        #[arg(long)]
        wasm: Option<PathBuf>,
    }

    fn settings(args: &Args) -> Settings {
        let mut settings = match args.quality {
            Some(quality) => Settings::from_preset(quality.into()),
            None => Settings::load(),
        };
        if let Some(seed) = args.seed {
            settings.seed = seed;
        }
        settings
    }

    pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
        let settings = settings(&args);
        let registry = BehaviorRegistry::with_builtins();
        let source = args.source.as_str();

        let mut sim = if source.ends_with(".json") {
            let doc = Document::from_json(&fs::read_to_string(source)?)?;
            Simulation::from_document(doc, registry, settings.sim_options())?
        } else {
            BuiltinTemplates.instantiate(source, registry, settings.sim_options())?
        };

        log::info!("Running '{}' for {} frames", source, args.frames);
        for _ in 0..args.frames {
            sim.step(1.0 / 60.0);
        }

        let mut surface = RecordingSurface::new();
        sim.render(&mut surface);

        println!(
            "{} frames, {:.2}s simulated, {} live particles, {} draw calls",
            sim.frame_count(),
            sim.time(),
            sim.particles().active_count(),
            surface.commands().len()
        );
        for obj in sim.objects() {
            println!(
                "  {:<12} {:<7} ({:>7.1}, {:>7.1})",
                obj.id,
                obj.shape.kind_name(),
                obj.position.x,
                obj.position.y
            );
        }

        let artifact = ExportArtifact::from_simulation(&sim);
        if let Some(path) = &args.artifact {
            fs::write(path, artifact.to_json()?)?;
            log::info!("Artifact written to {}", path.display());
        }
        if let (Some(path), Some(loader), Some(wasm)) = (&args.html, &args.loader, &args.wasm) {
            let bundle = KernelBundle {
                loader_js: fs::read_to_string(loader)?,
                wasm_base64: fs::read_to_string(wasm)?.trim().to_string(),
            };
            fs::write(path, artifact.to_html(&bundle, source)?)?;
            log::info!("Page written to {}", path.display());
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let args = Args::try_parse_from(["sim-sandbox"]).unwrap();
            assert_eq!(args.source, "bouncing_balls");
            assert_eq!(args.frames, 300);
            assert_eq!(settings(&args).sim_options().particle_capacity, 500);
        }

        #[test]
        fn test_quality_and_seed() {
            let args =
                Args::try_parse_from(["sim-sandbox", "playground", "60", "-q", "low", "--seed", "9"])
                    .unwrap();
            assert_eq!(args.frames, 60);
            let options = settings(&args).sim_options();
            assert_eq!(options.particle_capacity, 100);
            assert_eq!(options.seed, 9);
        }

        #[test]
        fn test_html_needs_bundle() {
            assert!(Args::try_parse_from(["sim-sandbox", "--html", "out.html"]).is_err());
            assert!(Args::try_parse_from([
                "sim-sandbox",
                "--html",
                "out.html",
                "--loader",
                "k.js",
                "--wasm",
                "k.b64"
            ])
            .is_ok());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    log::info!("Sim Sandbox (native) starting...");

    if let Err(err) = native::run(native::Args::parse()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
