//! Command-line front end over `comodes-core`: inspect persisted
//! coherent-mode datasets without writing a line of analysis code.

pub mod cli;
