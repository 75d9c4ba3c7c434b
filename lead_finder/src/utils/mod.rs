mod reqwest_retry;

pub use reqwest_retry::*;
