//! Test doubles for the cluster subsystems

pub mod stubs;
