//! Code for supporting exome analysis.

pub mod prioritize;
