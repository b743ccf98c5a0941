// Metalog Kernel
//
// Publishing and storage core: a fan-out publisher that durably logs every
// message per topic while indexing it into a queryable table store.

pub mod config;
pub mod log;
pub mod parse;
pub mod publish;
pub mod query;
pub mod replay;
pub mod table;
