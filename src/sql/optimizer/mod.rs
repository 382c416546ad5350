pub mod group_join_finder;
