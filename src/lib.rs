//! Core library for the payroll-unifier command line application.
//!
//! The library exposes high-level orchestration helpers that power the
//! command-line interface as well as the unit tests. The modules are
//! structured to keep responsibilities narrow and composable: IO adapters
//! live under [`payroll::unifier::io`], data representations inside
//! [`payroll::unifier::model`], the per-cell normalization rules in
//! [`payroll::unifier::normalize`], filename classification in
//! [`payroll::unifier::classify`], monetary aggregation and its cross-check
//! in [`payroll::unifier::aggregate`] and [`payroll::unifier::reconcile`],
//! and the per-period orchestration under [`payroll::unifier::run`].

pub mod payroll;

pub use payroll::unifier::{
    Result, UnifierError, aggregate, classify, error, io, model, normalize, period, reconcile,
    report, run, source,
};
