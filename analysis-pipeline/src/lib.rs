pub mod aggregate;
pub mod chunker;
pub mod emotion;
pub mod linguistic;
pub mod oracle;
pub mod runner;
pub mod sentiment;
