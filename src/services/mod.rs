pub mod allow_list;
pub mod credentials;
pub mod signing;
pub mod storage;
