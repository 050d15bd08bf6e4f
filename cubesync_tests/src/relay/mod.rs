mod connection;
mod remote;
mod replication;
