pub mod ddpg;
