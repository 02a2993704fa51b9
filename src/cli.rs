//! Ticktock CLI - run an automaton document headlessly

use std::env;
use std::process::ExitCode;

use ticktock::{AutomataModel, Document, Scheduler, TickEvent};

const DEFAULT_TICKS: u64 = 20;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Ticktock CLI - timed automaton runner");
        println!("Usage: ticktock-cli <document.json> [ticks]");
        println!();
        println!("Example: ticktock-cli automaton.json 60");
        return ExitCode::SUCCESS;
    }

    let filename = &args[1];
    let ticks = match args.get(2).map(|n| n.parse::<u64>()) {
        None => DEFAULT_TICKS,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            eprintln!("❌ Invalid tick count '{}': {}", args[2], e);
            return ExitCode::FAILURE;
        }
    };

    let document = match Document::read_from(filename) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("❌ Could not read '{}': {}", filename, e);
            return ExitCode::FAILURE;
        }
    };

    let (mut model, report) = match AutomataModel::from_document(document) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Could not load '{}': {}", filename, e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "✅ Loaded {} state(s), {} transition(s)",
        report.states, report.transitions
    );
    for id in &report.dropped {
        println!("  ⚠ dropped transition {} (unknown endpoint)", id);
    }
    for id in &report.duplicates {
        println!("  ⚠ skipped duplicate id {}", id);
    }
    print_state(&model);

    let mut scheduler = Scheduler::new();
    for tick in scheduler.run(&mut model, ticks) {
        match &tick.event {
            TickEvent::TransitionStarted(id) => {
                let name = model.transition(id).map(|t| t.name.as_str()).unwrap_or("?");
                println!("  [{:>5}] --> {}", tick.tick, name);
            }
            TickEvent::StateEntered(id) => {
                let name = model.state(id).map(|s| s.name.as_str()).unwrap_or("?");
                println!("  [{:>5}] {}", tick.tick, name);
            }
            TickEvent::Advanced(_) => {}
        }
    }

    println!();
    println!("After {} tick(s):", scheduler.ticks());
    print_state(&model);
    ExitCode::SUCCESS
}

fn print_state(model: &AutomataModel) {
    if let Some(state) = model.active_state() {
        println!(
            "  Active State: {} ({}/{})",
            state.name, state.timer.elapsed_time, state.timer.duration
        );
    }
    if let Some(transition) = model.active_transition() {
        println!(
            "  Active Transition: {} ({}/{})",
            transition.name, transition.timer.elapsed_time, transition.timer.duration
        );
    }
}
