// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

pub mod bes;
pub mod lps;
pub mod sim;
pub mod trace;
