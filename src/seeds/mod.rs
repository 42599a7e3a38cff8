pub mod actions_seed;
