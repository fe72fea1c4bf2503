pub mod connection_ids;
