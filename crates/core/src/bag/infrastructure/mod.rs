pub mod bag_discovery;
pub mod cdr;
pub mod sqlite_bag_reader;
