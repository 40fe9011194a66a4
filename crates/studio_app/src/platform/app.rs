use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use studio_core::{update, AppState, FlowKind, Msg};
use studio_logging::{studio_info, studio_warn};

use super::commands::{parse_command, Command, HELP};
use super::config::StudioConfig;
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::render;

const TICK: Duration = Duration::from_millis(75);
/// Engine-driven redraws (progress, autosave status) are throttled to this.
const BACKGROUND_REDRAW: Duration = Duration::from_millis(500);
const AUTOSAVE_NOTICE: &str = "autosave-intro";

pub fn run_app() -> Result<()> {
    let config = StudioConfig::from_env(std::env::args().nth(1))?;
    logging::initialize(LogDestination::File, &config.data_dir);
    studio_info!(
        "Starting studio: api={} data={}",
        config.api_base_url,
        config.data_dir.display()
    );

    let runner = EffectRunner::new(&config)?;
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut app = App::new(runner, config.initial_flow);
    if !app.runner.is_notice_dismissed(AUTOSAVE_NOTICE) {
        print_lines(&[format!(
            "Drafts are saved automatically under {}. \
             Type 'dismiss {AUTOSAVE_NOTICE}' to hide this.",
            config.data_dir.display()
        )]);
    }
    app.mount(config.initial_flow);

    loop {
        let typed = match line_rx.recv_timeout(TICK) {
            Ok(line) => {
                if !app.handle_line(&line) {
                    break;
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                app.dispatch(Msg::Tick);
                false
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        app.pump_engine();
        app.render_if_needed(typed);
    }

    studio_info!("Shutting down");
    app.runner.shutdown();
    Ok(())
}

struct App {
    runner: EffectRunner,
    state: AppState,
    needs_render: bool,
    last_render: Instant,
}

impl App {
    fn new(runner: EffectRunner, flow: FlowKind) -> Self {
        Self {
            runner,
            state: AppState::new(flow),
            needs_render: true,
            last_render: Instant::now(),
        }
    }

    fn mount(&mut self, flow: FlowKind) {
        self.state = AppState::new(flow);
        self.needs_render = true;
        if let Some(progress) = self.runner.mount(flow) {
            self.dispatch(Msg::RestoreProgress(progress));
        }
        self.render_if_needed(true);
    }

    /// Returns false when the user asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Ok(Command::Dispatch(msg)) => self.dispatch(msg),
            Ok(Command::SwitchFlow(flow)) => {
                if flow != self.state.flow() {
                    self.runner.abandon_operation();
                    self.mount(flow);
                }
            }
            Ok(Command::History) => {
                print_lines(&render::render_history(&self.runner.fetch_history()));
            }
            Ok(Command::DismissNotice(notice_id)) => self.runner.dismiss_notice(&notice_id),
            Ok(Command::Help) => print_lines(&[HELP.to_string()]),
            Ok(Command::Quit) => return false,
            Err(message) => {
                studio_warn!("Rejected input: {}", message);
                print_lines(&[format!("  ! {message}")]);
            }
        }
        true
    }

    fn pump_engine(&mut self) {
        for msg in self.runner.poll(self.state.flow()) {
            self.dispatch(msg);
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);
        self.needs_render |= self.state.consume_dirty();
    }

    fn render_if_needed(&mut self, immediate: bool) {
        if !self.needs_render {
            return;
        }
        if !immediate && self.last_render.elapsed() < BACKGROUND_REDRAW {
            return;
        }
        print_lines(&render::render(&self.state.view()));
        self.needs_render = false;
        self.last_render = Instant::now();
    }
}

fn print_lines(lines: &[String]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        if writeln!(out, "{line}").is_err() {
            return;
        }
    }
    let _ = out.flush();
}
