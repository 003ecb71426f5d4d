#![doc = "kubesync-core: discovery and kubeconfig reconciliation for kubesync."]

//! This crate holds everything that decides *what* ends up in a kubeconfig:
//! finding EKS clusters across accounts and regions, turning them into named
//! kubeconfig entries and merging those into an existing document.
//! The CLI, settings files and terminal rendering live in the `kubesync` crate.
//!
//! # Pipeline
//! [`discover`] → [`patch`] → [`merge`], glued together by [`synchronise`].

pub mod aws_cli;
pub mod contract;
pub mod describe;
pub mod discover;
pub mod eks;
pub mod error;
pub mod format;
pub mod kubeconfig;
pub mod merge;
pub mod patch;
pub mod synchronise;
