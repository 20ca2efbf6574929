//! Scenario replay.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use strata::window::{ClientId, GroupId};
use strata::{Config, Space, WindowAttributes, WindowId};
use strata_script::{Scenario, ScriptEvent, TimedEvent, WindowSpec};
use tracing::{debug, info, warn};

use crate::{trace_error, ReplayOptions};

/// Stacking orders of all rebuilds which were not printed yet.
type Rebuilds = Rc<RefCell<Vec<Vec<WindowId>>>>;

/// Replay a scenario file, printing the stacking order after every change.
pub fn run(options: ReplayOptions) -> Result<(), Box<dyn Error>> {
    let scenario = Scenario::load(&options.path)?;

    // Command line flags take precedence over the scenario's config.
    let mut config = Config::from_value(scenario.config)?;
    config.separate_screen_focus |= options.separate_screen_focus;
    config.auto_raise |= options.auto_raise;
    if let Some(interval) = options.auto_raise_interval {
        config.auto_raise_interval = interval;
    }

    let mut event_loop = EventLoop::try_new()?;
    let mut space = Space::new(config);
    space.set_event_loop(event_loop.handle());

    for output in &scenario.outputs {
        space.add_output(&output.name, output.geometry.rectangle());
    }

    let rebuilds = record_rebuilds(&mut space);

    info!("Replaying {} events from {:?}", scenario.events.len(), options.path);

    let finished = Rc::new(Cell::new(scenario.events.is_empty()));
    let mut events = scenario.events.into_iter().peekable();
    let start = Instant::now();

    // Dispatch all due events, then sleep until the next one.
    let done = finished.clone();
    let pending = rebuilds.clone();
    event_loop
        .handle()
        .insert_source(Timer::immediate(), move |_, _, space| {
            let elapsed = start.elapsed();
            while let Some(TimedEvent { at, event }) =
                events.next_if(|event| Duration::from_millis(event.at) <= elapsed)
            {
                if let Err(err) = apply(space, event) {
                    warn!("Skipping event at {at}ms: {err}");
                }
                print_rebuilds(space, &pending);
            }

            match events.peek() {
                Some(next) => TimeoutAction::ToInstant(start + Duration::from_millis(next.at)),
                None => {
                    done.set(true);
                    TimeoutAction::Drop
                },
            }
        })
        .map_err(|err| err.error)?;

    while !finished.get() || space.auto_raise_pending() {
        event_loop.dispatch(None, &mut space)?;

        #[cfg(feature = "profiling")]
        profiling::finish_frame!();

        // Auto-raise rebuilds happen outside of scenario events.
        print_rebuilds(&space, &rebuilds);
    }

    debug!("Replay finished after {} rebuilds", space.stacking().rebuilds());

    Ok(())
}

/// Apply a single scenario event.
fn apply(space: &mut Space, event: ScriptEvent) -> Result<(), String> {
    match event {
        ScriptEvent::Create(spec) => create(space, spec)?,
        ScriptEvent::Show { window } => {
            let window = find(space, &window)?;
            space.show_window(window);
        },
        ScriptEvent::Hide { window } => {
            let window = find(space, &window)?;
            space.hide_window(window);
        },
        ScriptEvent::Destroy { window } => {
            let window = find(space, &window)?;
            space.remove_window(window);
        },
        ScriptEvent::Raise { window } => {
            let window = find(space, &window)?;
            space.raise_window(window);
        },
        ScriptEvent::Lower { window } => {
            let window = find(space, &window)?;
            space.lower_window(window);
        },
        ScriptEvent::RaiseOrLower { window } => {
            let window = find(space, &window)?;
            space.raise_or_lower_window(window);
        },
        ScriptEvent::Restack { window, under, force } => {
            let window = find(space, &window)?;
            let under_id = find(space, &under)?;
            if !space.pre_stack().contains(&under_id) {
                return Err(format!("window {under:?} is not stacked"));
            }
            space.restack(window, under_id, force);
        },
        ScriptEvent::RestackUnderActive { window } => {
            let window = find(space, &window)?;
            space.restack_client_under_active(window);
        },
        ScriptEvent::Hover { window } => {
            let window = find(space, &window)?;
            space.start_auto_raise(window);
        },
        ScriptEvent::Activate { window } => {
            let window = find(space, &window)?;
            space.activate(window);
        },
        ScriptEvent::RequestFocus { window } => {
            let window = find(space, &window)?;
            space.request_focus(window);
        },
        ScriptEvent::KeepAbove { window, enabled } => {
            let window = find(space, &window)?;
            space.set_keep_above(window, enabled);
        },
        ScriptEvent::KeepBelow { window, enabled } => {
            let window = find(space, &window)?;
            space.set_keep_below(window, enabled);
        },
        ScriptEvent::Fullscreen { window, enabled } => {
            let window = find(space, &window)?;
            space.set_fullscreen(window, enabled);
        },
        ScriptEvent::SetLead { window, lead, annexed } => {
            let window = find(space, &window)?;
            let lead = lead.map(|lead| find(space, &lead)).transpose()?;
            space.set_transient_lead(window, lead, annexed);
        },
        ScriptEvent::Move { window, geometry } => {
            let window = find(space, &window)?;
            space.set_geometry(window, geometry.rectangle());
        },
        ScriptEvent::SetDesktop { window, desktop } => {
            let window = find(space, &window)?;
            space.set_desktop(window, desktop.into());
        },
        ScriptEvent::SwitchDesktop { desktop } => space.set_current_desktop(desktop),
        ScriptEvent::ShowDesktop { enabled } => space.set_showing_desktop(enabled),
    }

    Ok(())
}

/// Add a new window.
fn create(space: &mut Space, spec: WindowSpec) -> Result<(), String> {
    if space.find_window(&spec.name).is_some() {
        return Err(format!("window {:?} already exists", spec.name));
    }

    let attributes = WindowAttributes {
        name: spec.name,
        kind: spec.kind,
        client: ClientId(spec.client),
        group: spec.group.map(GroupId),
        desktop: spec.desktop.into(),
        geometry: spec.geometry.rectangle(),
        accepts_focus: spec.accepts_focus,
        keep_above: spec.keep_above,
        keep_below: spec.keep_below,
        fullscreen: spec.fullscreen,
    };
    let window = space.add_window(attributes);

    if spec.show {
        space.show_window(window);
    }

    Ok(())
}

fn find(space: &Space, name: &str) -> Result<WindowId, String> {
    space.find_window(name).ok_or_else(|| format!("no window named {name:?}"))
}

/// Track every stacking order rebuild.
fn record_rebuilds(space: &mut Space) -> Rebuilds {
    let rebuilds = Rebuilds::default();
    let recorder = rebuilds.clone();
    space.stacking_mut().subscribe(move |stack| recorder.borrow_mut().push(stack.to_vec()));
    rebuilds
}

fn take_rebuilds(rebuilds: &Rebuilds) -> Vec<Vec<WindowId>> {
    mem::take(&mut *rebuilds.borrow_mut())
}

/// Print all pending rebuilds.
fn print_rebuilds(space: &Space, rebuilds: &Rebuilds) {
    let mut stdout = io::stdout().lock();
    for stack in take_rebuilds(rebuilds) {
        trace_error(writeln!(stdout, "{}", format_stack(space, &stack)));
    }
}

/// Format a stacking order, topmost window first.
fn format_stack(space: &Space, stack: &[WindowId]) -> String {
    let windows: Vec<_> = stack
        .iter()
        .rev()
        .filter_map(|&window| space.window(window))
        .map(|window| match space.get_layer(window.id()) {
            Some(layer) => format!("{} ({layer:?})", window.name()),
            None => window.name().to_owned(),
        })
        .collect();

    windows.join(" > ")
}
