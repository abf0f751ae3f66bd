mod blocking;
mod persistence;
mod pub_sub;
mod replication;
mod scenarios;
mod test_utils;
mod transactions;
