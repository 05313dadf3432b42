pub mod db;
pub mod jobdb;
pub mod memorydb;
