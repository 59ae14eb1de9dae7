// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use besim::lps::{DataValue, LinearProcess, MultiAction, Parameter, State};
use besim::sim::Simulator;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "explore")]
#[command(author = "Kevin Laeufer <laeufer@berkeley.edu>")]
#[command(version)]
#[command(about = "Randomly explores a small vending machine process and records a trace.", long_about = None)]
struct Args {
    #[arg(short, long)]
    verbose: bool,
    #[arg(long, default_value = "20", help = "Number of random steps to take.")]
    steps: usize,
    #[arg(long, default_value = "0", help = "Seed for the random walk.")]
    seed: u64,
    #[arg(value_name = "TRACE", index = 1, help = "Filename for the recorded trace.")]
    trace: String,
}

fn state(coins: u32, brewing: bool) -> State {
    State::new(vec![
        DataValue::term(&coins.to_string(), "Nat"),
        DataValue::term(if brewing { "true" } else { "false" }, "Bool"),
    ])
}

/// coin . coin . brew . tau . done, with a refund loop
fn vending_machine() -> LinearProcess {
    let parameters = vec![Parameter::new("coins", "Nat"), Parameter::new("brewing", "Bool")];
    let mut p = LinearProcess::new("vending_machine", parameters, state(0, false));
    p.add_transition(state(0, false), MultiAction::from_label("coin"), state(1, false));
    p.add_transition(state(1, false), MultiAction::from_label("coin"), state(2, false));
    p.add_transition(state(1, false), MultiAction::from_label("refund"), state(0, false));
    p.add_transition(state(2, false), MultiAction::from_label("brew"), state(2, true));
    p.add_transition(state(2, true), MultiAction::tau(), state(0, true));
    p.add_transition(state(0, true), MultiAction::from_label("done"), state(0, false));
    p
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("failed to initialize logging");

    let mut sim = Simulator::new(vending_machine());
    sim.set_tau_prioritisation(true);
    sim.seed_rng(args.seed);

    for _ in 0..args.steps {
        if !sim.random_step() {
            break;
        }
    }
    println!(
        "took {} steps, ending in {}",
        sim.trace_len(),
        sim.state()
    );

    sim.save_trace(&args.trace).expect("failed to save the trace");
    println!("saved trace to {}", args.trace);

    // replay the recorded trace against a fresh simulator
    let mut replayed = Simulator::new(vending_machine());
    replayed
        .load_trace(&args.trace)
        .expect("the recorded trace must replay against its own specification");
    while replayed.redo() {}
    println!("replayed {} steps", replayed.trace_len());
}
