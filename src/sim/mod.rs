// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>
mod simulator;
mod view;

pub use simulator::{SimulationError, Simulator};
pub use view::{SimulatorView, ViewId};
