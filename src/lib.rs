//! Prepares the secrets and submission artifacts of HTCondor grid jobs.
//!
//! The [`launch`](commands::launch) command provisions a job's credentials
//! from the secret store and renders its artifacts into a staging directory
//! that `condor_submit` consumes; [`render`](commands::render) renders the
//! artifacts alone.

pub mod commands;
pub mod config;
