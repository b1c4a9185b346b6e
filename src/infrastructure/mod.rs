pub mod allow_list;
pub mod broker;
pub mod storage;
