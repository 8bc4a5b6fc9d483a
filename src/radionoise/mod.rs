pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod fsops;
pub mod glob_escape;
pub mod lock;
pub mod reconciler;
pub mod records;
pub mod scope;
pub mod sorter;
pub mod torrent;

#[cfg(test)]
pub mod testing;
